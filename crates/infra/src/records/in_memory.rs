use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use siteops_auth::{ScopeCondition, SiteRestriction, StoreError};
use siteops_core::{RecordId, SiteId, UserId};

use super::{RecordQuery, RecordStatus, RecordStore, SiteRecord};

/// In-memory record store for tests/dev.
///
/// Counts list queries and write attempts so tests can prove that an empty
/// scope issued no query and a denied mutation issued no write.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<RecordId, SiteRecord>>,
    list_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: SiteRecord) {
        if let Ok(mut records) = self.records.write() {
            records.insert(record.id, record);
        }
    }

    /// Move a record to another site of the same organization.
    pub fn reassign_site(&self, id: RecordId, site_id: SiteId) -> bool {
        let Ok(mut records) = self.records.write() else {
            return false;
        };
        match records.get_mut(&id) {
            Some(record) => {
                record.site_id = site_id;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, id: RecordId) -> Option<SiteRecord> {
        self.records.read().ok()?.get(&id).cloned()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(
        &self,
        restriction: SiteRestriction<'_>,
        query: RecordQuery,
    ) -> Result<Vec<SiteRecord>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::new("site_records lock poisoned"))?;

        let mut visible: Vec<SiteRecord> = records
            .values()
            .filter(|r| restriction.allows(&r.site_id) && query.matches(r))
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.recorded_on.cmp(&a.recorded_on).then(a.id.cmp(&b.id)));
        Ok(visible)
    }

    async fn get(&self, id: RecordId) -> Result<Option<SiteRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::new("site_records lock poisoned"))?;
        Ok(records.get(&id).cloned())
    }

    async fn approve(
        &self,
        id: RecordId,
        approver: UserId,
        condition: &ScopeCondition,
    ) -> Result<u64, StoreError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::new("site_records lock poisoned"))?;

        match records.get_mut(&id) {
            Some(record) if condition.admits(record.organization_id, record.site_id) => {
                record.status = RecordStatus::Approved;
                record.approved_by = Some(approver);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
