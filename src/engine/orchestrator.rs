//! Backup/Restore Orchestrator
//!
//! Backup:  list -> fetch (worker pool) -> sanitize/normalize -> write.
//! Restore: read local -> lookup remote (cached list) -> diff -> create | update.
//!
//! A backup batch is all-or-nothing: every task is awaited, and files are only
//! written once no task has failed with a non-downgradable error.

use super::cache::ResponseCache;
use super::diff::diff_values;
use super::normalize::normalize;
use super::pool::WorkerPool;
use super::report::{Action, KindReport, Outcome};
use super::sanitize::{sanitize_for_compare, sanitize_for_write};
use super::snapshot::{SnapshotFormat, SnapshotStore};
use crate::error::{BackupError, Result};
use crate::resource::{Resource, ResourceAdapter};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Canonical snapshot view of a freshly fetched resource
pub fn snapshot_view(adapter: &dyn ResourceAdapter, resource: Resource) -> Value {
    let kind = adapter.kind();
    let decorated = adapter.post_fetch(resource);
    let clean = sanitize_for_compare(&decorated, &kind.banlist);
    normalize(&adapter.envelope_wrap(clean), kind.normalize_options())
}

/// Canonical comparison view of a local snapshot.
///
/// Banlisted fields are dropped when the snapshot has the kind's envelope;
/// a snapshot without it is compared as-is.
pub fn local_view(adapter: &dyn ResourceAdapter, local: &Value) -> Value {
    let kind = adapter.kind();
    match adapter.envelope_unwrap(local.clone()) {
        Ok(resource) => {
            let clean = sanitize_for_compare(&resource, &kind.banlist);
            normalize(&adapter.envelope_wrap(clean), kind.normalize_options())
        }
        Err(_) => normalize(local, kind.normalize_options()),
    }
}

pub struct Orchestrator {
    store: SnapshotStore,
    default_format: SnapshotFormat,
    pool: WorkerPool,
    cache: ResponseCache,
}

impl Orchestrator {
    pub fn new(backup_dir: impl Into<PathBuf>, concurrency: usize, format: SnapshotFormat) -> Self {
        Self {
            store: SnapshotStore::new(backup_dir),
            default_format: format,
            pool: WorkerPool::new(concurrency),
            cache: ResponseCache::new(),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    fn format_for(&self, adapter: &dyn ResourceAdapter) -> SnapshotFormat {
        adapter.kind().format_or(self.default_format)
    }

    /// Back up every resource of the adapter's kind
    pub async fn backup(&self, adapter: Arc<dyn ResourceAdapter>) -> KindReport {
        let kind = adapter.kind().name.clone();
        let mut report = KindReport::new(&kind, Action::Backup);
        info!(
            "Starting {} backup on {} workers",
            kind,
            self.pool.max_workers()
        );

        let listed = match self.cached_list(adapter.as_ref()).await {
            Ok(listed) => listed,
            Err(e) => {
                error!("Listing {} failed: {}", kind, e);
                report.failure = Some(e.to_string());
                return report;
            }
        };

        let ids: Vec<String> = listed
            .iter()
            .filter_map(|resource| {
                let id = adapter.id_of(resource);
                if id.is_none() {
                    warn!("{} entry without '{}' ignored", kind, adapter.kind().id_field);
                }
                id
            })
            .collect();

        let format = self.format_for(adapter.as_ref());
        let task_adapter = adapter.clone();
        let results = self
            .pool
            .run(ids.clone(), move |id| {
                let adapter = task_adapter.clone();
                async move { fetch_and_render(adapter.as_ref(), &id, format).await }
            })
            .await;

        let mut rendered = Vec::new();
        let mut fatal = None;
        for (id, result) in ids.into_iter().zip(results) {
            match result.map_err(|e| BackupError::Worker(e.to_string())) {
                Ok(Ok(text)) => rendered.push((id, text)),
                Ok(Err(e)) | Err(e) if e.is_downgradable() => {
                    warn!("{} {} skipped: {}", kind, id, e);
                    report.push(id, Outcome::Skipped { reason: e.to_string() });
                }
                Ok(Err(e)) | Err(e) => {
                    error!("{} {} failed: {}", kind, id, e);
                    fatal.get_or_insert_with(|| format!("{id}: {e}"));
                    report.push(id, Outcome::Failed { reason: e.to_string() });
                }
            }
        }

        if let Some(failure) = fatal {
            for (id, _) in rendered {
                report.push(id, Outcome::Discarded);
            }
            report.failure = Some(failure);
            return report;
        }

        for (id, text) in rendered {
            match self.store.write(&kind, &id, format, &text) {
                Ok(_) => report.push(id, Outcome::BackedUp),
                Err(e) => {
                    error!("Writing {} {} failed: {}", kind, id, e);
                    report.push(id, Outcome::Failed { reason: e.to_string() });
                }
            }
        }

        info!("{}", report);
        report
    }

    /// Restore one snapshot, or every snapshot of the kind when `id` is None
    pub async fn restore(&self, adapter: &dyn ResourceAdapter, id: Option<&str>) -> KindReport {
        let kind = adapter.kind().name.clone();
        let mut report = KindReport::new(&kind, Action::Restore);
        let format = self.format_for(adapter);

        let ids = match self.select_ids(&kind, id, format) {
            Ok(ids) => ids,
            Err(e) => {
                report.failure = Some(e.to_string());
                return report;
            }
        };
        info!("Restoring {} {}", ids.len(), kind);

        for id in ids {
            match self.restore_one(adapter, &id, format).await {
                Ok(outcome) => report.push(id, outcome),
                Err(e) if e.is_downgradable() => {
                    warn!("{} {} skipped: {}", kind, id, e);
                    report.push(id, Outcome::Skipped { reason: e.to_string() });
                }
                Err(e) if e.is_local() => {
                    error!("{} {} not restored: {}", kind, id, e);
                    report.push(id, Outcome::Failed { reason: e.to_string() });
                }
                Err(e) => {
                    error!("Restoring {} {} failed: {}", kind, id, e);
                    report.failure = Some(format!("{id}: {e}"));
                    report.push(id, Outcome::Failed { reason: e.to_string() });
                    break;
                }
            }
        }

        info!("{}", report);
        report
    }

    async fn restore_one(
        &self,
        adapter: &dyn ResourceAdapter,
        id: &str,
        format: SnapshotFormat,
    ) -> Result<Outcome> {
        let kind = adapter.kind();
        let local = self.store.read(&kind.name, id, format)?;
        let path = self.store.path(&kind.name, id, format);

        match self.find_remote(adapter, id).await? {
            Some(remote) => {
                if snapshot_view(adapter, remote) == local_view(adapter, &local) {
                    debug!("{} {} unchanged", kind.name, id);
                    return Ok(Outcome::Unchanged);
                }

                let payload = write_payload(adapter, local, path)?;
                adapter.update(id, &payload).await?;
                self.cache.invalidate(&kind.name).await;
                info!("Updated {} {}", kind.name, id);
                Ok(Outcome::Updated)
            }
            None => {
                let payload = write_payload(adapter, local, path)?;
                let created = adapter.create(&payload).await?;
                self.cache.invalidate(&kind.name).await;

                let new_id = adapter.id_of(&created).unwrap_or_else(|| id.to_string());
                info!("Created {} {} as {}", kind.name, id, new_id);
                if new_id != id {
                    // The snapshot follows the server-assigned id
                    let text = format.render(&snapshot_view(adapter, created))?;
                    self.store.write(&kind.name, &new_id, format, &text)?;
                    self.store.remove(&kind.name, id, format)?;
                }
                Ok(Outcome::Created { new_id })
            }
        }
    }

    /// Diff one local snapshot against the live resource
    pub async fn diff(&self, adapter: &dyn ResourceAdapter, id: &str) -> Result<String> {
        let kind = adapter.kind();
        let local = self.store.read(&kind.name, id, self.format_for(adapter))?;

        let remote = match self.find_remote(adapter, id).await? {
            Some(remote) => snapshot_view(adapter, remote),
            None => Value::Object(Resource::new()),
        };
        diff_values(&remote, &local_view(adapter, &local))
    }

    /// Diff every local snapshot of the kind
    pub async fn diff_all(&self, adapter: &dyn ResourceAdapter, id: Option<&str>) -> KindReport {
        let kind = adapter.kind().name.clone();
        let mut report = KindReport::new(&kind, Action::Diff);

        let ids = match self.select_ids(&kind, id, self.format_for(adapter)) {
            Ok(ids) => ids,
            Err(e) => {
                report.failure = Some(e.to_string());
                return report;
            }
        };

        for id in ids {
            match self.diff(adapter, &id).await {
                Ok(diff) if diff.is_empty() => report.push(id, Outcome::Unchanged),
                Ok(diff) => report.push(id, Outcome::Differs { diff }),
                Err(e) if e.is_downgradable() => {
                    report.push(id, Outcome::Skipped { reason: e.to_string() })
                }
                Err(e) if e.is_local() => report.push(id, Outcome::Failed { reason: e.to_string() }),
                Err(e) => {
                    report.failure = Some(format!("{id}: {e}"));
                    report.push(id, Outcome::Failed { reason: e.to_string() });
                    break;
                }
            }
        }
        report
    }

    /// Snapshot ids to process. An explicit id only selects the kinds that
    /// hold a snapshot of that name.
    fn select_ids(&self, kind: &str, id: Option<&str>, format: SnapshotFormat) -> Result<Vec<String>> {
        match id {
            Some(id) if self.store.path(kind, id, format).exists() => Ok(vec![id.to_string()]),
            Some(id) => {
                debug!("No {} snapshot named {}", kind, id);
                Ok(Vec::new())
            }
            None => self.store.list_ids(kind, format),
        }
    }

    async fn cached_list(&self, adapter: &dyn ResourceAdapter) -> Result<Arc<Vec<Resource>>> {
        self.cache
            .get_or_populate(&adapter.kind().name, || adapter.list())
            .await
    }

    /// Look a resource up in the cached list; summary kinds fetch the full body
    async fn find_remote(&self, adapter: &dyn ResourceAdapter, id: &str) -> Result<Option<Resource>> {
        let listed = self.cached_list(adapter).await?;
        let found = listed
            .iter()
            .find(|r| adapter.id_of(r).as_deref() == Some(id))
            .cloned();

        match found {
            Some(_) if adapter.kind().list_is_summary => match adapter.get(id).await {
                Ok(full) => Ok(Some(full)),
                Err(BackupError::NotFound { .. }) => Ok(None),
                Err(e) => Err(e),
            },
            other => Ok(other),
        }
    }
}

async fn fetch_and_render(
    adapter: &dyn ResourceAdapter,
    id: &str,
    format: SnapshotFormat,
) -> Result<String> {
    let resource = adapter.get(id).await?;
    format.render(&snapshot_view(adapter, resource))
}

/// Request body for create/update built from a local snapshot
fn write_payload(adapter: &dyn ResourceAdapter, local: Value, path: PathBuf) -> Result<Resource> {
    let resource = adapter
        .envelope_unwrap(local)
        .map_err(|e| BackupError::SnapshotParse {
            path,
            reason: e.to_string(),
        })?;
    Ok(sanitize_for_write(&resource, &adapter.kind().write_banlist()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{get_kind, ResourceKind};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory adapter: ids are assigned as `new-<n>` on create
    struct MemoryAdapter {
        kind: ResourceKind,
        items: Mutex<Vec<Resource>>,
        lists: AtomicUsize,
        writes: AtomicUsize,
    }

    impl MemoryAdapter {
        fn new(kind: &str, items: Vec<Value>) -> Self {
            Self {
                kind: get_kind(kind).unwrap().clone(),
                items: Mutex::new(
                    items
                        .into_iter()
                        .map(|v| v.as_object().cloned().unwrap())
                        .collect(),
                ),
                lists: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ResourceAdapter for MemoryAdapter {
        fn kind(&self) -> &ResourceKind {
            &self.kind
        }

        async fn list(&self) -> Result<Vec<Resource>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.lock().unwrap().clone())
        }

        async fn get(&self, id: &str) -> Result<Resource> {
            self.items
                .lock()
                .unwrap()
                .iter()
                .find(|r| self.id_of(r).as_deref() == Some(id))
                .cloned()
                .ok_or_else(|| BackupError::NotFound { url: id.to_string() })
        }

        async fn create(&self, payload: &Resource) -> Result<Resource> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            let mut created = payload.clone();
            created.insert("id".into(), json!(format!("new-{n}")));
            self.items.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn update(&self, id: &str, payload: &Resource) -> Result<Resource> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut updated = payload.clone();
            updated.insert("id".into(), json!(id));
            Ok(updated)
        }
    }

    #[test]
    fn test_snapshot_view_stamps_type_and_drops_volatile_fields() {
        let adapter = MemoryAdapter::new("workflows", vec![]);
        let resource = json!({
            "id": "w-1",
            "attributes": {"name": "n", "modifiedAt": "yesterday"},
            "created_at": "today"
        });
        let view = snapshot_view(&adapter, resource.as_object().cloned().unwrap());
        assert_eq!(
            view,
            json!({"data": {"id": "w-1", "type": "workflows", "attributes": {"name": "n"}}})
        );
    }

    #[test]
    fn test_local_view_without_envelope_is_compared_raw() {
        let adapter = MemoryAdapter::new("workflows", vec![]);
        let local = json!({"created_at": "kept", "b": [2, 1]});
        assert_eq!(
            local_view(&adapter, &local),
            json!({"created_at": "kept", "b": [1, 2]})
        );
    }

    #[tokio::test]
    async fn test_backup_then_restore_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(dir.path(), 2, SnapshotFormat::Yaml);
        let adapter = Arc::new(MemoryAdapter::new(
            "monitors",
            vec![json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b", "overall_state": "OK"})],
        ));

        let report = orchestrator.backup(adapter.clone()).await;
        assert_eq!(report.summary().backed_up, 2);

        let report = orchestrator.restore(adapter.as_ref(), None).await;
        assert_eq!(report.summary().unchanged, 2);
        assert_eq!(adapter.writes.load(Ordering::SeqCst), 0);
        // One listing for the backup, reused by the restore
        assert_eq!(adapter.lists.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_restore_create_rekeys_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(dir.path(), 2, SnapshotFormat::Json);
        orchestrator
            .store()
            .write("monitors", "9", SnapshotFormat::Json, r#"{"id": 9, "name": "gone"}"#)
            .unwrap();
        let adapter = MemoryAdapter::new("monitors", vec![]);

        let report = orchestrator.restore(&adapter, None).await;
        assert_eq!(
            report.outcome_of("9"),
            Some(&Outcome::Created {
                new_id: "new-0".into()
            })
        );
        assert_eq!(
            orchestrator.store().list_ids("monitors", SnapshotFormat::Json).unwrap(),
            vec!["new-0"]
        );
        assert!(!orchestrator.cache().contains("monitors").await);
    }

    #[tokio::test]
    async fn test_diff_all_reports_each_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(dir.path(), 2, SnapshotFormat::Json);
        let store = orchestrator.store();
        store
            .write("monitors", "1", SnapshotFormat::Json, r#"{"id": 1, "name": "a"}"#)
            .unwrap();
        store
            .write("monitors", "2", SnapshotFormat::Json, r#"{"id": 2, "name": "changed"}"#)
            .unwrap();
        let adapter = MemoryAdapter::new(
            "monitors",
            vec![json!({"id": 1, "name": "a"}), json!({"id": 2, "name": "b"})],
        );

        let report = orchestrator.diff_all(&adapter, None).await;
        assert_eq!(report.outcome_of("1"), Some(&Outcome::Unchanged));
        match report.outcome_of("2") {
            Some(Outcome::Differs { diff }) => {
                assert!(diff.contains("-name: b"));
                assert!(diff.contains("+name: changed"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(adapter.lists.load(Ordering::SeqCst), 1);
    }
}
