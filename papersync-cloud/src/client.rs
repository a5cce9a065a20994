use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use url::Url;

const DEFAULT_STORAGE_URL: &str =
    "https://document-storage-production-dot-remarkable-production.appspot.com";

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("failed to format client timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

#[derive(Clone)]
pub struct CloudClient {
    http: Client,
    base_url: Url,
    user_token: String,
}

impl CloudClient {
    pub fn new(user_token: impl Into<String>) -> Result<Self, CloudError> {
        Self::with_base_url(DEFAULT_STORAGE_URL, user_token)
    }

    pub fn with_base_url(base_url: &str, user_token: impl Into<String>) -> Result<Self, CloudError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            user_token: user_token.into(),
        })
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>, CloudError> {
        let url = self.endpoint("/document-storage/json/2/docs")?;
        let response = self
            .http
            .get(url)
            .header("Authorization", self.auth_header_value())
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn request_upload(
        &self,
        requests: &[UploadRequest],
    ) -> Result<Vec<UploadSlot>, CloudError> {
        let url = self.endpoint("/document-storage/json/2/upload/request")?;
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .json(requests)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn update_status(
        &self,
        updates: &[MetadataUpdate],
    ) -> Result<Vec<StatusResult>, CloudError> {
        let url = self.endpoint("/document-storage/json/2/upload/update-status")?;
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .json(updates)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn delete(&self, requests: &[DeleteRequest]) -> Result<Vec<StatusResult>, CloudError> {
        let url = self.endpoint("/document-storage/json/2/delete")?;
        let response = self
            .http
            .put(url)
            .header("Authorization", self.auth_header_value())
            .json(requests)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Uploads a packaged blob to a pre-signed URL handed out by `request_upload`.
    /// The URL carries its own authorization, so no bearer header is sent.
    pub async fn upload_blob(&self, href: &str, body: Vec<u8>) -> Result<(), CloudError> {
        let url = Url::parse(href)?;
        let response = self.http.put(url).body(body).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(CloudError::Api { status, body })
        }
    }

    fn auth_header_value(&self) -> String {
        format!("Bearer {}", self.user_token)
    }

    fn endpoint(&self, path: &str) -> Result<Url, CloudError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CloudError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(CloudError::Api { status, body })
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum DocumentType {
    #[serde(rename = "DocumentType")]
    Document,
    #[serde(rename = "CollectionType")]
    Collection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Document {
    #[serde(rename = "ID")]
    pub id: String,
    pub version: u32,
    #[serde(rename = "Type")]
    pub doc_type: DocumentType,
    #[serde(rename = "VissibleName")]
    pub visible_name: String,
    #[serde(default)]
    pub parent: String,
    #[serde(default)]
    pub modified_client: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct UploadRequest {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Type")]
    pub doc_type: DocumentType,
    pub version: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UploadSlot {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub version: u32,
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "BlobURLPut", default)]
    pub blob_url_put: Option<String>,
}

impl UploadSlot {
    /// The one-time upload URL, if the slot was granted with a usable one.
    pub fn upload_url(&self) -> Option<&str> {
        self.blob_url_put.as_deref().filter(|href| !href.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataUpdate {
    #[serde(rename = "ID")]
    pub id: String,
    pub parent: String,
    #[serde(rename = "VissibleName")]
    pub visible_name: String,
    pub version: u32,
    #[serde(rename = "Type")]
    pub doc_type: DocumentType,
    pub modified_client: String,
}

impl MetadataUpdate {
    /// Builds an update stamped with the current UTC time.
    pub fn stamped(
        id: impl Into<String>,
        parent: impl Into<String>,
        visible_name: impl Into<String>,
        version: u32,
        doc_type: DocumentType,
    ) -> Result<Self, CloudError> {
        Ok(Self {
            id: id.into(),
            parent: parent.into(),
            visible_name: visible_name.into(),
            version,
            doc_type,
            modified_client: OffsetDateTime::now_utc().format(&Rfc3339)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    #[serde(rename = "ID")]
    pub id: String,
    pub version: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusResult {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub version: u32,
    pub success: bool,
    #[serde(default)]
    pub message: String,
}
