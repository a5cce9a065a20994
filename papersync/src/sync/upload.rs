use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::error::{ItemError, SyncError};
use super::model::{DocType, StableId, TargetDocEntry, UploadCandidate, UploadOutcome};
use super::package::{package_collection, package_document};
use super::registry::IdentifierRegistry;
use super::target::{SlotGrant, TargetStore};
use crate::source::{SourceItem, SourceKind, SourceStore};

/// Items per slot-request / commit round trip.
pub const CHUNK_SIZE: usize = 5;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub chunks: usize,
    pub transferred: usize,
    pub slot_rejected: usize,
    pub failed: usize,
    pub commit_rejected: usize,
}

pub struct UploadPipeline<'a> {
    source: &'a dyn SourceStore,
    target: &'a dyn TargetStore,
    registry: &'a IdentifierRegistry,
}

impl<'a> UploadPipeline<'a> {
    pub fn new(
        source: &'a dyn SourceStore,
        target: &'a dyn TargetStore,
        registry: &'a IdentifierRegistry,
    ) -> Self {
        Self {
            source,
            target,
            registry,
        }
    }

    /// Pushes `candidates` chunk by chunk, counting into `report` as it goes.
    /// Item-level failures stay inside their chunk; slot, commit and cleanup
    /// call failures end the upload with earlier chunks already applied and
    /// still counted.
    pub async fn upload(
        &self,
        mut candidates: Vec<UploadCandidate>,
        report: &mut UploadReport,
    ) -> Result<(), SyncError> {
        for chunk in candidates.chunks_mut(CHUNK_SIZE) {
            self.upload_chunk(chunk, report).await?;
            report.chunks += 1;
        }
        Ok(())
    }

    async fn upload_chunk(
        &self,
        chunk: &mut [UploadCandidate],
        report: &mut UploadReport,
    ) -> Result<(), SyncError> {
        debug!(items = chunk.len(), "requesting upload slots");
        let grants: HashMap<StableId, SlotGrant> = self
            .target
            .request_upload_slots(chunk)
            .await?
            .into_iter()
            .map(|grant| (grant.id.clone(), grant))
            .collect();

        for candidate in chunk.iter_mut() {
            let name = candidate.entry.visible_name.clone();
            candidate.outcome = match grants.get(&candidate.entry.id) {
                Some(SlotGrant {
                    success: true,
                    upload_url: Some(url),
                    ..
                }) => match self.transfer(&candidate.entry, url).await {
                    Ok(()) => {
                        info!(name = %name, version = candidate.entry.version, "uploaded");
                        report.transferred += 1;
                        UploadOutcome::Transferred
                    }
                    Err(err) => {
                        warn!(name = %name, error = %err, "upload failed, will remove from target");
                        report.failed += 1;
                        UploadOutcome::Failed(err.to_string())
                    }
                },
                Some(grant) => {
                    let message = if grant.success {
                        "slot granted without an upload url".to_string()
                    } else {
                        grant.message.clone()
                    };
                    warn!(name = %name, message = %message, "upload slot rejected");
                    report.slot_rejected += 1;
                    UploadOutcome::SlotRejected(message)
                }
                None => {
                    warn!(name = %name, "no upload slot returned");
                    report.slot_rejected += 1;
                    UploadOutcome::SlotRejected("no slot returned".to_string())
                }
            };
        }

        for status in self.target.commit_metadata(chunk).await? {
            if !status.success {
                warn!(id = %status.id, message = %status.message, "metadata commit rejected");
                report.commit_rejected += 1;
            }
        }

        let failed: Vec<TargetDocEntry> = chunk
            .iter()
            .filter(|c| matches!(c.outcome, UploadOutcome::Failed(_)))
            .map(|c| c.entry.clone())
            .collect();
        if !failed.is_empty() {
            self.target.delete_documents(&failed).await?;
        }
        Ok(())
    }

    async fn transfer(&self, entry: &TargetDocEntry, url: &str) -> Result<(), ItemError> {
        let blob = match entry.doc_type {
            DocType::Collection => package_collection(&entry.id)?,
            DocType::Document => {
                let source_id = self
                    .registry
                    .source_id_of(&entry.id)
                    .ok_or_else(|| ItemError::Unmapped(entry.id.clone()))?;
                let (content_id, file_name) = self.content_origin(source_id).await?;
                let content = self.source.content_bytes(&content_id).await?;
                package_document(&entry.id, &file_name, &content)?
            }
        };
        self.target.put_content(url, blob).await?;
        Ok(())
    }

    /// Native id and name whose bytes back `source_id`, following a shortcut.
    async fn content_origin(&self, source_id: &str) -> Result<(String, String), ItemError> {
        let meta = self.source.metadata(source_id).await?;
        if meta.kind != SourceKind::Shortcut {
            return Ok((source_id.to_string(), meta.name));
        }
        let resolved = self
            .source
            .resolve_shortcut(SourceItem {
                source_id: source_id.to_string(),
                name: meta.name,
                kind: SourceKind::Shortcut,
                size_bytes: None,
                parent_source_id: None,
            })
            .await?;
        Ok((resolved.source_id, resolved.name))
    }
}
