use std::sync::Arc;

use tracing::{error, info, warn};

use super::diff::{DiffEngine, ForceUpdate};
use super::error::SyncError;
use super::model::{StableId, UploadCandidate};
use super::prune::MirrorPruner;
use super::registry::IdentifierRegistry;
use super::remote_index::RemoteDocumentIndex;
use super::target::TargetStore;
use super::upload::{UploadPipeline, UploadReport};
use super::walker::SourceTreeWalker;
use crate::config::SyncMode;
use crate::source::{SourceItem, SourceStore};
use crate::storage::PropertyStore;

/// What a single pass syncs and how.
pub struct RunConfig {
    /// Source folder: native id or path, otherwise a folder name to search for.
    pub source_locator: String,
    /// Target folder: a document id, otherwise a visible name.
    pub target_root: String,
    pub mode: SyncMode,
    pub skip_list: Vec<String>,
    pub force_update: Option<ForceUpdate>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub walked: usize,
    pub pruned: usize,
    pub to_upload: usize,
    pub upload: UploadReport,
    pub error: Option<SyncError>,
}

pub struct SyncRunner;

impl SyncRunner {
    /// Resolves both roots and loads all state the pass needs. Nothing on the
    /// target is touched here, so an error leaves it exactly as it was.
    pub async fn prepare(
        config: RunConfig,
        source: Arc<dyn SourceStore>,
        target: Arc<dyn TargetStore>,
        store: Arc<dyn PropertyStore>,
    ) -> Result<PreparedRun, SyncError> {
        let source_root = source
            .find_folder(&config.source_locator)
            .await?
            .ok_or_else(|| {
                SyncError::Configuration(format!(
                    "source folder not found: {}",
                    config.source_locator
                ))
            })?;

        let registry = IdentifierRegistry::load(store).await?;
        let observed = RemoteDocumentIndex::new(target.list_all_documents().await?);
        let target_root = observed.resolve_root(&config.target_root).ok_or_else(|| {
            SyncError::Configuration(format!("target folder not found: {}", config.target_root))
        })?;

        info!(
            source = %source_root.name,
            target = %target_root,
            known_ids = registry.len(),
            target_documents = observed.len(),
            mode = ?config.mode,
            "sync prepared"
        );
        Ok(PreparedRun {
            config,
            source,
            target,
            registry,
            observed,
            source_root,
            target_root,
        })
    }
}

pub struct PreparedRun {
    config: RunConfig,
    source: Arc<dyn SourceStore>,
    target: Arc<dyn TargetStore>,
    registry: IdentifierRegistry,
    observed: RemoteDocumentIndex,
    source_root: SourceItem,
    target_root: StableId,
}

impl PreparedRun {
    /// Executes the pass. Failures are logged and recorded in the report;
    /// whatever was persisted or uploaded before them stays.
    pub async fn run(mut self) -> RunReport {
        let mut report = RunReport::default();
        if let Err(err) = self.execute(&mut report).await {
            error!(error = %err, "sync run aborted");
            report.error = Some(err);
        }
        report
    }

    async fn execute(&mut self, report: &mut RunReport) -> Result<(), SyncError> {
        let outcome = SourceTreeWalker::new(self.source.as_ref(), &self.config.skip_list)
            .walk(&mut self.registry, &self.source_root, &self.target_root)
            .await?;
        report.walked = outcome.candidates.len();

        if self.registry.is_dirty() {
            self.registry.persist().await?;
        }

        if self.config.mode == SyncMode::Mirror {
            let pruner = MirrorPruner::new(&self.observed, &self.target_root);
            match pruner
                .prune(
                    self.target.as_ref(),
                    &outcome.candidates,
                    &outcome.skipped_roots,
                )
                .await
            {
                Ok(count) => report.pruned = count,
                Err(err) => warn!(error = %err, "mirror prune failed, continuing with upload"),
            }
        }

        let diff = DiffEngine::new(&self.observed, self.config.force_update.as_ref());
        let pending: Vec<UploadCandidate> = outcome
            .candidates
            .into_iter()
            .filter_map(|mut entry| {
                diff.needs_update(&mut entry)
                    .then(|| UploadCandidate::new(entry))
            })
            .collect();
        report.to_upload = pending.len();
        info!(walked = report.walked, to_upload = pending.len(), "diff complete");

        let pipeline =
            UploadPipeline::new(self.source.as_ref(), self.target.as_ref(), &self.registry);
        pipeline.upload(pending, &mut report.upload).await?;
        info!(
            transferred = report.upload.transferred,
            failed = report.upload.failed,
            rejected = report.upload.slot_rejected,
            "sync run finished"
        );
        Ok(())
    }
}
