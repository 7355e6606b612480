//! In-process store, used for local development and the test suite.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RsvpStore, StoreError, StoreResult};
use crate::models::{Attendance, Rsvp, Stats};

#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Rsvp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RsvpStore for MemoryStore {
    async fn insert(&self, record: &Rsvp) -> StoreResult<()> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate(record.id.clone()));
        }
        rows.push(record.clone());
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<Rsvp>> {
        let rows = self.rows.read().await;
        // Later inserts win ties on identical timestamps.
        let mut newest_first: Vec<Rsvp> = rows.iter().rev().cloned().collect();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(newest_first)
    }

    async fn count_by_attendance(&self, attendance: Attendance) -> StoreResult<i64> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|r| r.attendance == attendance).count() as i64)
    }

    async fn count_all(&self) -> StoreResult<i64> {
        Ok(self.rows.read().await.len() as i64)
    }

    async fn sum_kids(&self) -> StoreResult<i64> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter_map(|r| r.kids_count).map(i64::from).sum())
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let rows = self.rows.read().await;
        let mut stats = Stats::default();
        for row in rows.iter() {
            stats.record(row.attendance, 1, row.kids_count.map_or(0, i64::from));
        }
        Ok(stats)
    }
}
