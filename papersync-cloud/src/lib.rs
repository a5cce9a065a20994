mod client;
mod pairing;

pub use client::{
    CloudClient, CloudError, DeleteRequest, Document, DocumentType, MetadataUpdate, StatusResult,
    UploadRequest, UploadSlot,
};
pub use reqwest::StatusCode;
pub use pairing::{DeviceCredentials, PairingClient, PairingError};
