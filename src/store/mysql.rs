use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::sql;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Text};
use rocket::fairing;
use rocket::{Build, Rocket};
use rocket_db_pools::diesel::prelude::*;
use rocket_db_pools::diesel::MysqlPool;
use rocket_db_pools::Database;
use tracing::{error, info};

use super::{RsvpStore, Store, StoreError, StoreResult};
use crate::models::{Attendance, Rsvp, Stats};
use crate::schema::rsvp;

#[derive(Database)]
#[database("rsvp")]
pub struct Db(MysqlPool);

pub const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS rsvp (
    id VARCHAR(12) NOT NULL PRIMARY KEY,
    created_at VARCHAR(32) NOT NULL,
    name TEXT NOT NULL,
    guests TEXT NULL,
    kids_count INT NULL,
    attendance VARCHAR(8) NOT NULL,
    notes TEXT NULL,
    user_agent TEXT NULL,
    ip VARCHAR(64) NULL,
    CONSTRAINT rsvp_attendance_check CHECK (attendance IN ('yes', 'no', 'friday'))
)
"#;

/// One `GROUP BY attendance` bucket.
#[derive(Debug, diesel::QueryableByName)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
struct AttendanceBucket {
    #[diesel(sql_type = Text)]
    attendance: Attendance,
    #[diesel(sql_type = BigInt)]
    responses: i64,
    #[diesel(sql_type = BigInt)]
    kids: i64,
}

const STATS_QUERY: &str = "SELECT attendance, COUNT(*) AS responses, \
     CAST(COALESCE(SUM(kids_count), 0) AS SIGNED) AS kids \
     FROM rsvp GROUP BY attendance";

pub struct MysqlStore {
    pool: MysqlPool,
}

impl MysqlStore {
    pub fn new(pool: MysqlPool) -> Self {
        Self { pool }
    }

    pub async fn create_table(&self) -> StoreResult<()> {
        let mut conn = self.pool.get().await.map_err(StoreError::pool)?;
        diesel::sql_query(CREATE_TABLE).execute(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl RsvpStore for MysqlStore {
    async fn insert(&self, record: &Rsvp) -> StoreResult<()> {
        let mut conn = self.pool.get().await.map_err(StoreError::pool)?;
        diesel::insert_into(rsvp::table)
            .values(record)
            .execute(&mut *conn)
            .await
            .map_err(|e| insert_error(&record.id, e))?;
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<Rsvp>> {
        let mut conn = self.pool.get().await.map_err(StoreError::pool)?;
        let rows = rsvp::table
            .order(rsvp::created_at.desc())
            .select(Rsvp::as_select())
            .load(&mut *conn)
            .await?;
        Ok(rows)
    }

    async fn count_by_attendance(&self, attendance: Attendance) -> StoreResult<i64> {
        let mut conn = self.pool.get().await.map_err(StoreError::pool)?;
        let count = rsvp::table
            .filter(rsvp::attendance.eq(attendance))
            .count()
            .get_result(&mut *conn)
            .await?;
        Ok(count)
    }

    async fn count_all(&self) -> StoreResult<i64> {
        let mut conn = self.pool.get().await.map_err(StoreError::pool)?;
        let count = rsvp::table.count().get_result(&mut *conn).await?;
        Ok(count)
    }

    async fn sum_kids(&self) -> StoreResult<i64> {
        let mut conn = self.pool.get().await.map_err(StoreError::pool)?;
        // SUM over INT comes back as DECIMAL in MySQL.
        let kids = rsvp::table
            .select(sql::<BigInt>("CAST(COALESCE(SUM(kids_count), 0) AS SIGNED)"))
            .get_result(&mut *conn)
            .await?;
        Ok(kids)
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let mut conn = self.pool.get().await.map_err(StoreError::pool)?;
        let buckets: Vec<AttendanceBucket> =
            diesel::sql_query(STATS_QUERY).load(&mut *conn).await?;
        Ok(fold_buckets(buckets))
    }
}

fn fold_buckets(buckets: impl IntoIterator<Item = AttendanceBucket>) -> Stats {
    buckets.into_iter().fold(Stats::default(), |mut stats, b| {
        stats.record(b.attendance, b.responses, b.kids);
        stats
    })
}

/// A clash on the primary key is reported as [`StoreError::Duplicate`].
fn insert_error(id: &str, err: DieselError) -> StoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            StoreError::Duplicate(id.to_string())
        }
        other => StoreError::Query(other),
    }
}

/// Ignite step: make sure the table exists, then hand the store to Rocket.
/// Must run after `Db::init()`.
pub async fn init(rocket: Rocket<Build>) -> fairing::Result {
    let pool = match Db::fetch(&rocket) {
        Some(db) => (**db).clone(),
        None => {
            error!("rsvp database pool is not attached");
            return Err(rocket);
        }
    };

    let store = MysqlStore::new(pool);
    match store.create_table().await {
        Ok(()) => {
            info!("rsvp table ready");
            let store: Store = Arc::new(store);
            Ok(rocket.manage(store))
        }
        Err(e) => {
            error!(error = %e, "failed to create rsvp table");
            Err(rocket)
        }
    }
}
