use std::fmt;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

const DEFAULT_BASE_URL: &str = "https://webapp-production-dot-remarkable-production.appspot.com";
const DEVICE_DESCRIPTION: &str = "desktop-linux";

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("api returned an empty token")]
    EmptyToken,
}

/// Long-lived credential obtained by pairing this host with an account.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    pub device_id: String,
    pub device_token: String,
}

impl fmt::Debug for DeviceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCredentials")
            .field("device_id", &self.device_id)
            .field("device_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterDevice<'a> {
    code: &'a str,
    device_desc: &'a str,
    #[serde(rename = "deviceID")]
    device_id: &'a str,
}

#[derive(Clone)]
pub struct PairingClient {
    http: Client,
    base_url: Url,
}

impl PairingClient {
    pub fn new() -> Result<Self, PairingError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, PairingError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Exchanges a one-time code for a device credential. The code can only be
    /// used once; the returned credential must be stored by the caller.
    pub async fn register_device(
        &self,
        one_time_code: &str,
    ) -> Result<DeviceCredentials, PairingError> {
        let url = self.base_url.join("/token/json/2/device/new")?;
        let device_id = Uuid::new_v4().to_string();
        let body = RegisterDevice {
            code: one_time_code,
            device_desc: DEVICE_DESCRIPTION,
            device_id: &device_id,
        };
        let response = self.http.post(url).json(&body).send().await?;
        let device_token = Self::read_token(response).await?;
        Ok(DeviceCredentials {
            device_id,
            device_token,
        })
    }

    /// Trades the device token for a short-lived user token used by the
    /// document-storage API.
    pub async fn open_session(&self, device_token: &str) -> Result<String, PairingError> {
        let url = self.base_url.join("/token/json/2/user/new")?;
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {device_token}"))
            .send()
            .await?;
        Self::read_token(response).await
    }

    async fn read_token(response: reqwest::Response) -> Result<String, PairingError> {
        if response.status().is_success() {
            let token = response.text().await?.trim().to_string();
            if token.is_empty() {
                return Err(PairingError::EmptyToken);
            }
            Ok(token)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(PairingError::Api { status, body })
        }
    }
}
