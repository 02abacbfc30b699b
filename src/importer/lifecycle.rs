//! Import lifecycle and metric ledger
//!
//! [`ImportService`] is the single place an import's status changes. Every
//! change is checked against the lifecycle graph before it is persisted.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics;
use crate::models::{Import, ImportMetric, ImportStatus, InvalidTransition};
use crate::storage::{ImportRepository, StorageError};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("import {id}: {source}")]
    InvalidTransition {
        id: Uuid,
        #[source]
        source: InvalidTransition,
    },

    #[error("import {id}: {status} is only reachable through mark_completed or mark_failed")]
    TerminalStatus { id: Uuid, status: ImportStatus },

    #[error("import {0} not found")]
    NotFound(Uuid),

    #[error("failed to {operation} for import {id}: {source}")]
    Storage {
        operation: &'static str,
        id: Uuid,
        #[source]
        source: StorageError,
    },
}

impl LifecycleError {
    fn storage(operation: &'static str, id: Uuid) -> impl FnOnce(StorageError) -> Self {
        move |source| Self::Storage {
            operation,
            id,
            source,
        }
    }
}

#[derive(Clone)]
pub struct ImportService {
    imports: Arc<dyn ImportRepository>,
}

impl ImportService {
    pub fn new(imports: Arc<dyn ImportRepository>) -> Self {
        Self { imports }
    }

    /// Create and persist a pending import for a channel
    pub async fn start(&self, channel_id: Uuid) -> Result<Import, LifecycleError> {
        let import = Import::new(channel_id);
        self.imports
            .save_import(&import)
            .await
            .map_err(LifecycleError::storage("save pending import", import.id))?;
        Ok(import)
    }

    /// Move to a non-terminal status and persist it.
    ///
    /// On any error the import is left unchanged.
    pub async fn set_status(
        &self,
        import: &mut Import,
        status: ImportStatus,
    ) -> Result<(), LifecycleError> {
        if status.is_terminal() {
            return Err(LifecycleError::TerminalStatus {
                id: import.id,
                status,
            });
        }

        let mut next = import.clone();
        next.transition(status)
            .map_err(|source| LifecycleError::InvalidTransition {
                id: import.id,
                source,
            })?;

        self.imports
            .save_import(&next)
            .await
            .map_err(LifecycleError::storage("save status", import.id))?;

        tracing::debug!(import_id = %import.id, from = %import.status(), to = %status, "import status changed");
        *import = next;
        Ok(())
    }

    pub async fn mark_completed(&self, import: &mut Import) -> Result<(), LifecycleError> {
        self.finish(import, ImportStatus::Completed, None).await
    }

    pub async fn mark_failed(
        &self,
        import: &mut Import,
        error: impl Into<String>,
    ) -> Result<(), LifecycleError> {
        self.finish(import, ImportStatus::Failed, Some(error.into()))
            .await
    }

    async fn finish(
        &self,
        import: &mut Import,
        status: ImportStatus,
        error: Option<String>,
    ) -> Result<(), LifecycleError> {
        let mut next = import.clone();
        next.transition(status)
            .map_err(|source| LifecycleError::InvalidTransition {
                id: import.id,
                source,
            })?;
        next.finish(error);

        match self.imports.get_import_metrics(import.id).await {
            Ok(rows) => next.set_metrics(rows),
            Err(e) => {
                tracing::warn!(import_id = %import.id, error = %e, "failed to reload import metrics");
            }
        }

        self.imports
            .save_import(&next)
            .await
            .map_err(LifecycleError::storage("save terminal status", import.id))?;

        let ended = next.ended_at().unwrap_or_else(Utc::now);
        let elapsed = (ended - next.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        metrics::record_import_run(status.as_str(), elapsed);

        let summary = next.summary();
        tracing::info!(
            import_id = %import.id,
            channel_id = %import.channel_id,
            status = %status,
            new = summary.new,
            updated = summary.updated,
            no_change = summary.no_change,
            missing = summary.missing,
            errors = summary.errors,
            published = summary.published,
            "import finished"
        );

        *import = next;
        Ok(())
    }

    /// Append one fact to the metric ledger
    pub async fn save_metric(
        &self,
        import_id: Uuid,
        metric: &ImportMetric,
    ) -> Result<(), LifecycleError> {
        self.imports
            .save_import_metric(import_id, metric)
            .await
            .map_err(LifecycleError::storage("save metric", import_id))
    }

    /// Find an import with its metric rows
    pub async fn find(&self, id: Uuid) -> Result<Import, LifecycleError> {
        self.imports.find_import(id).await.map_err(|e| {
            if e.is_not_found() {
                LifecycleError::NotFound(id)
            } else {
                LifecycleError::Storage {
                    operation: "find import",
                    id,
                    source: e,
                }
            }
        })
    }

    /// All imports, most recent first
    pub async fn list(&self) -> Result<Vec<Import>, LifecycleError> {
        self.imports
            .get_imports()
            .await
            .map_err(LifecycleError::storage("list imports", Uuid::nil()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricType;
    use crate::storage::MockImportRepository;

    fn service() -> (Arc<MockImportRepository>, ImportService) {
        let repo = Arc::new(MockImportRepository::new());
        (repo.clone(), ImportService::new(repo))
    }

    #[tokio::test]
    async fn test_start_persists_pending_import() {
        let (repo, service) = service();
        let channel_id = Uuid::new_v4();

        let import = service.start(channel_id).await.unwrap();

        assert_eq!(import.status(), ImportStatus::Pending);
        assert_eq!(import.channel_id, channel_id);
        assert_eq!(repo.status_history(import.id), vec![ImportStatus::Pending]);
    }

    #[tokio::test]
    async fn test_invalid_transition_is_rejected_without_saving() {
        let (repo, service) = service();
        let mut import = service.start(Uuid::new_v4()).await.unwrap();

        let err = service
            .set_status(&mut import, ImportStatus::Publishing)
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(import.status(), ImportStatus::Pending);
        assert_eq!(repo.status_history(import.id).len(), 1);
    }

    #[tokio::test]
    async fn test_set_status_rejects_terminal_targets() {
        let (repo, service) = service();
        let mut import = service.start(Uuid::new_v4()).await.unwrap();
        service
            .set_status(&mut import, ImportStatus::Fetching)
            .await
            .unwrap();

        for status in [ImportStatus::Completed, ImportStatus::Failed] {
            let err = service.set_status(&mut import, status).await.unwrap_err();
            assert!(matches!(
                err,
                LifecycleError::TerminalStatus { status: rejected, .. } if rejected == status
            ));
        }

        assert_eq!(import.status(), ImportStatus::Fetching);
        assert!(import.ended_at().is_none());
        assert_eq!(repo.status_history(import.id).len(), 2);
    }

    #[tokio::test]
    async fn test_mark_completed_derives_summary_from_ledger() {
        let (_repo, service) = service();
        let mut import = service.start(Uuid::new_v4()).await.unwrap();
        for status in [
            ImportStatus::Fetching,
            ImportStatus::Processing,
            ImportStatus::Publishing,
        ] {
            service.set_status(&mut import, status).await.unwrap();
        }

        for kind in [MetricType::New, MetricType::New, MetricType::Missing] {
            let metric = ImportMetric::new(import.id, Uuid::new_v4(), kind, None);
            service.save_metric(import.id, &metric).await.unwrap();
        }

        service.mark_completed(&mut import).await.unwrap();

        assert_eq!(import.status(), ImportStatus::Completed);
        assert!(import.ended_at().is_some());
        assert_eq!(import.summary().new, 2);
        assert_eq!(import.summary().missing, 1);

        let found = service.find(import.id).await.unwrap();
        assert_eq!(found.status(), ImportStatus::Completed);
        assert_eq!(found.metrics().len(), 3);
    }

    #[tokio::test]
    async fn test_terminal_import_cannot_fail_again() {
        let (_repo, service) = service();
        let mut import = service.start(Uuid::new_v4()).await.unwrap();
        service.mark_failed(&mut import, "boom").await.unwrap();
        assert_eq!(import.error(), Some("boom"));

        let err = service.mark_failed(&mut import, "again").await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
        assert_eq!(import.error(), Some("boom"));
    }

    #[tokio::test]
    async fn test_find_unknown_import() {
        let (_repo, service) = service();
        let id = Uuid::new_v4();
        assert!(matches!(
            service.find(id).await,
            Err(LifecycleError::NotFound(found)) if found == id
        ));
    }

    #[tokio::test]
    async fn test_save_failure_leaves_status_unchanged() {
        let (repo, service) = service();
        let mut import = service.start(Uuid::new_v4()).await.unwrap();
        repo.set_fail_import_saves(true);

        assert!(service
            .set_status(&mut import, ImportStatus::Fetching)
            .await
            .is_err());
        assert_eq!(import.status(), ImportStatus::Pending);
    }
}
