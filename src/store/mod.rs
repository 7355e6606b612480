//! Record store for RSVP rows.
//!
//! The table is append-only: rows are inserted once and read back by the
//! admin endpoints, nothing here updates or deletes.

pub mod memory;
pub mod mysql;

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Attendance, Rsvp, Stats};

pub use memory::MemoryStore;
pub use mysql::{Db, MysqlStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("rsvp `{0}` already exists")]
    Duplicate(String),
}

impl StoreError {
    pub(crate) fn pool<E: Display>(err: E) -> Self {
        StoreError::Pool(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait RsvpStore: Send + Sync {
    async fn insert(&self, record: &Rsvp) -> StoreResult<()>;

    /// Every row, newest `created_at` first.
    async fn list_all(&self) -> StoreResult<Vec<Rsvp>>;

    async fn count_by_attendance(&self, attendance: Attendance) -> StoreResult<i64>;

    async fn count_all(&self) -> StoreResult<i64>;

    /// Sum of `kids_count`, rows without a count add nothing.
    async fn sum_kids(&self) -> StoreResult<i64>;

    /// Per-attendance counts and the kids sum, all read from one snapshot.
    async fn stats(&self) -> StoreResult<Stats>;
}

/// Handle managed as Rocket state.
pub type Store = Arc<dyn RsvpStore>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Mysql,
    Memory,
}
