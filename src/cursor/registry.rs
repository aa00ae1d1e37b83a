//! Process-local registry of open cursors.
//!
//! The map is guarded by a single lock held only for lookup, insert and
//! removal; documents are pulled from a cursor's sequence outside the lock.
//! A cursor is visible only to the {database, collection, user} that created
//! it; any other tenant is told it does not exist.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::QueryConfig;
use crate::document::Document;
use crate::errors::DbError;
use crate::utils::logger::CURSOR_TARGET;
use crate::utils::num::u64_to_usize_saturating;

use super::iter::{BoxedIter, take_batch};

/// Owner of a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant {
    pub db: String,
    pub collection: String,
    pub user: String,
}

impl Tenant {
    pub fn new(db: impl Into<String>, collection: impl Into<String>, user: impl Into<String>) -> Self {
        Self { db: db.into(), collection: collection.into(), user: user.into() }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} (user '{}')", self.db, self.collection, self.user)
    }
}

pub struct Cursor {
    id: i64,
    tenant: Tenant,
    iter: BoxedIter,
    created_at: DateTime<Utc>,
    closed: AtomicBool,
}

impl Cursor {
    #[must_use]
    pub const fn id(&self) -> i64 {
        self.id
    }

    #[must_use]
    pub const fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Closes the underlying sequence; returns false if it was already closed.
    fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.iter.close();
        true
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("tenant", &self.tenant)
            .field("created_at", &self.created_at)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// One page of results. `cursor_id` is 0 when nothing remains.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub cursor_id: i64,
    pub docs: Vec<Document>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillReport {
    pub killed: Vec<i64>,
    pub not_found: Vec<i64>,
}

pub struct CursorRegistry {
    cursors: Mutex<HashMap<i64, Arc<Cursor>>>,
    next_id: AtomicU32,
    default_batch: usize,
    max_batch: usize,
    created_total: AtomicU64,
    closed_total: AtomicU64,
}

impl Default for CursorRegistry {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}

impl CursorRegistry {
    #[must_use]
    pub fn new(cfg: &QueryConfig) -> Self {
        let seed = cfg.cursor_id_seed.unwrap_or_else(rand::random::<u32>);
        Self {
            cursors: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(seed),
            default_batch: cfg.default_batch_size,
            max_batch: cfg.max_batch_size,
            created_total: AtomicU64::new(0),
            closed_total: AtomicU64::new(0),
        }
    }

    fn batch_size(&self, requested: Option<i64>) -> Result<usize, DbError> {
        match requested {
            None => Ok(self.default_batch),
            Some(n) if n < 0 => {
                Err(DbError::bad_value("batchSize", format!("BatchSize value must be non-negative, but received: {n}")))
            }
            Some(n) => Ok(u64_to_usize_saturating(n.unsigned_abs()).min(self.max_batch)),
        }
    }

    /// Allocates the next free, non-zero ID. Must be called with the map locked.
    fn allocate_id(&self, live: &HashMap<i64, Arc<Cursor>>) -> i64 {
        loop {
            let id = i64::from(self.next_id.fetch_add(1, Ordering::Relaxed));
            if id != 0 && !live.contains_key(&id) {
                return id;
            }
        }
    }

    fn register(&self, tenant: Tenant, iter: BoxedIter) -> i64 {
        let mut live = self.cursors.lock();
        let id = self.allocate_id(&live);
        log::debug!(target: CURSOR_TARGET, "cursor {id} created for {tenant}");
        live.insert(id, Arc::new(Cursor { id, tenant, iter, created_at: Utc::now(), closed: AtomicBool::new(false) }));
        self.created_total.fetch_add(1, Ordering::Relaxed);
        id
    }

    fn close_cursor(&self, cursor: &Cursor, reason: &str) {
        if cursor.close() {
            self.closed_total.fetch_add(1, Ordering::Relaxed);
            log::debug!(target: CURSOR_TARGET, "cursor {} closed ({reason}) for {}", cursor.id, cursor.tenant);
        }
    }

    /// Pulls the first page from `iter`. A cursor is registered only when
    /// the page is full; otherwise the sequence is closed and the returned
    /// `cursor_id` is 0.
    ///
    /// # Errors
    /// `BadValue` for a negative batch size, or the sequence's own error
    /// (the sequence is closed in that case).
    pub fn first_batch(&self, tenant: Tenant, iter: BoxedIter, batch_size: Option<i64>) -> Result<Batch, DbError> {
        let n = match self.batch_size(batch_size) {
            Ok(n) => n,
            Err(e) => {
                iter.close();
                return Err(e);
            }
        };
        let (docs, exhausted) = match take_batch(iter.as_ref(), n) {
            Ok(page) => page,
            Err(e) => {
                iter.close();
                return Err(e);
            }
        };
        if exhausted {
            iter.close();
            return Ok(Batch { cursor_id: 0, docs });
        }
        Ok(Batch { cursor_id: self.register(tenant, iter), docs })
    }

    /// Continues the cursor `id`. The cursor is removed and closed once its
    /// sequence runs out, and the returned `cursor_id` is 0. A batch size of 0
    /// takes the configured default.
    ///
    /// # Errors
    /// `CursorNotFound` if `id` does not exist or belongs to another tenant;
    /// `BadValue` for a negative batch size; the sequence's error otherwise.
    pub fn get_more(&self, id: i64, tenant: &Tenant, batch_size: Option<i64>) -> Result<Batch, DbError> {
        let cursor = self.get(id, tenant).ok_or(DbError::CursorNotFound { id })?;
        // 0 takes the default batch, unlike first_batch.
        let n = self.batch_size(batch_size.filter(|&n| n != 0))?;
        let (docs, exhausted) = match take_batch(cursor.iter.as_ref(), n) {
            Ok(page) => page,
            Err(e) => {
                self.remove(id);
                self.close_cursor(&cursor, "error");
                return Err(e);
            }
        };
        if exhausted {
            self.remove(id);
            self.close_cursor(&cursor, "exhausted");
            return Ok(Batch { cursor_id: 0, docs });
        }
        Ok(Batch { cursor_id: id, docs })
    }

    /// Looks up `id` on behalf of `tenant`.
    #[must_use]
    pub fn get(&self, id: i64, tenant: &Tenant) -> Option<Arc<Cursor>> {
        self.cursors.lock().get(&id).filter(|c| &c.tenant == tenant).cloned()
    }

    fn remove(&self, id: i64) -> Option<Arc<Cursor>> {
        self.cursors.lock().remove(&id)
    }

    /// Kills the listed cursors owned by `tenant`. IDs that do not exist or
    /// belong to another tenant are reported as not found.
    pub fn kill_cursors(&self, ids: &[i64], tenant: &Tenant) -> KillReport {
        let mut report = KillReport::default();
        for &id in ids {
            let removed = {
                let mut live = self.cursors.lock();
                let owned = live.get(&id).is_some_and(|c| &c.tenant == tenant);
                if owned { live.remove(&id) } else { None }
            };
            match removed {
                Some(cursor) => {
                    self.close_cursor(&cursor, "killed");
                    report.killed.push(id);
                }
                None => report.not_found.push(id),
            }
        }
        report
    }

    /// Closes and forgets every cursor.
    pub fn close_all(&self) {
        let drained: Vec<Arc<Cursor>> = self.cursors.lock().drain().map(|(_, c)| c).collect();
        for cursor in drained {
            self.close_cursor(&cursor, "shutdown");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.lock().is_empty()
    }

    pub fn created_total(&self) -> u64 {
        self.created_total.load(Ordering::Relaxed)
    }

    pub fn closed_total(&self) -> u64 {
        self.closed_total.load(Ordering::Relaxed)
    }
}

impl Drop for CursorRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
