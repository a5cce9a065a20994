use async_trait::async_trait;
use papersync_cloud::{
    CloudClient, CloudError, DeleteRequest, Document, DocumentType, MetadataUpdate, UploadRequest,
};
use tracing::warn;

use super::model::{DocType, StableId, TargetDocEntry, UploadCandidate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrant {
    pub id: StableId,
    pub success: bool,
    pub upload_url: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitStatus {
    pub id: StableId,
    pub success: bool,
    pub message: String,
}

/// The document store being synced into.
#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn list_all_documents(&self) -> Result<Vec<TargetDocEntry>, CloudError>;

    async fn request_upload_slots(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<Vec<SlotGrant>, CloudError>;

    async fn commit_metadata(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<Vec<CommitStatus>, CloudError>;

    async fn delete_documents(&self, entries: &[TargetDocEntry]) -> Result<(), CloudError>;

    async fn put_content(&self, url: &str, blob: Vec<u8>) -> Result<(), CloudError>;
}

impl From<DocumentType> for DocType {
    fn from(value: DocumentType) -> Self {
        match value {
            DocumentType::Document => DocType::Document,
            DocumentType::Collection => DocType::Collection,
        }
    }
}

impl From<DocType> for DocumentType {
    fn from(value: DocType) -> Self {
        match value {
            DocType::Document => DocumentType::Document,
            DocType::Collection => DocumentType::Collection,
        }
    }
}

impl From<Document> for TargetDocEntry {
    fn from(doc: Document) -> Self {
        Self {
            id: StableId::new(doc.id),
            doc_type: doc.doc_type.into(),
            parent: StableId::new(doc.parent),
            visible_name: doc.visible_name,
            version: doc.version,
            source_size_bytes: None,
        }
    }
}

#[async_trait]
impl TargetStore for CloudClient {
    async fn list_all_documents(&self) -> Result<Vec<TargetDocEntry>, CloudError> {
        let docs = self.list_documents().await?;
        Ok(docs.into_iter().map(TargetDocEntry::from).collect())
    }

    async fn request_upload_slots(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<Vec<SlotGrant>, CloudError> {
        let requests: Vec<UploadRequest> = candidates
            .iter()
            .map(|c| UploadRequest {
                id: c.entry.id.to_string(),
                doc_type: c.entry.doc_type.into(),
                version: c.entry.version,
            })
            .collect();
        let slots = self.request_upload(&requests).await?;
        Ok(slots
            .into_iter()
            .map(|slot| SlotGrant {
                upload_url: slot.upload_url().map(str::to_string),
                id: StableId::new(slot.id),
                success: slot.success,
                message: slot.message,
            })
            .collect())
    }

    async fn commit_metadata(
        &self,
        candidates: &[UploadCandidate],
    ) -> Result<Vec<CommitStatus>, CloudError> {
        let updates = candidates
            .iter()
            .map(|c| {
                MetadataUpdate::stamped(
                    c.entry.id.as_str(),
                    c.entry.parent.as_str(),
                    c.entry.visible_name.as_str(),
                    c.entry.version,
                    c.entry.doc_type.into(),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let results = self.update_status(&updates).await?;
        Ok(results
            .into_iter()
            .map(|r| CommitStatus {
                id: StableId::new(r.id),
                success: r.success,
                message: r.message,
            })
            .collect())
    }

    async fn delete_documents(&self, entries: &[TargetDocEntry]) -> Result<(), CloudError> {
        let requests: Vec<DeleteRequest> = entries
            .iter()
            .map(|e| DeleteRequest {
                id: e.id.to_string(),
                version: e.version,
            })
            .collect();
        for result in self.delete(&requests).await? {
            if !result.success {
                warn!(id = %result.id, message = %result.message, "target refused deletion");
            }
        }
        Ok(())
    }

    async fn put_content(&self, url: &str, blob: Vec<u8>) -> Result<(), CloudError> {
        self.upload_blob(url, blob).await
    }
}
