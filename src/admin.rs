//! Read side for the couple: the full list, the counts, and a CSV download.

use chrono::{NaiveDate, Utc};
use rocket::http::{ContentType, Header};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};

use crate::models::{Rsvp, Stats};
use crate::store::{RsvpStore, StoreResult};

pub const CSV_HEADER: [&str; 9] = [
    "id",
    "created_at",
    "name",
    "guests",
    "kids_count",
    "attendance",
    "notes",
    "user_agent",
    "ip",
];

pub async fn list(store: &dyn RsvpStore) -> StoreResult<Vec<Rsvp>> {
    store.list_all().await
}

/// Counts come from a single store snapshot, so `total` always equals
/// `yes + no + friday` even while submissions are arriving.
pub async fn stats(store: &dyn RsvpStore) -> StoreResult<Stats> {
    store.stats().await
}

pub async fn export_csv(store: &dyn RsvpStore) -> StoreResult<CsvExport> {
    let rows = store.list_all().await?;
    Ok(CsvExport::new(render_csv(&rows), Utc::now().date_naive()))
}

/// Header line plus one line per row, every field quoted.
pub fn render_csv(rows: &[Rsvp]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for row in rows {
        let kids = row.kids_count.map(|k| k.to_string());
        let fields = [
            Some(row.id.as_str()),
            Some(row.created_at.as_str()),
            Some(row.name.as_str()),
            row.guests.as_deref(),
            kids.as_deref(),
            Some(row.attendance.as_str()),
            row.notes.as_deref(),
            row.user_agent.as_deref(),
            row.ip.as_deref(),
        ];
        let line: Vec<String> = fields.into_iter().map(quote).collect();
        lines.push(line.join(","));
    }
    lines.join("\n")
}

fn quote(field: Option<&str>) -> String {
    format!("\"{}\"", field.unwrap_or_default().replace('"', "\"\""))
}

/// CSV body served as a dated attachment.
#[derive(Debug)]
pub struct CsvExport {
    pub body: String,
    pub filename: String,
}

impl CsvExport {
    pub fn new(body: String, date: NaiveDate) -> Self {
        Self {
            body,
            filename: format!("rsvps_{}.csv", date.format("%Y-%m-%d")),
        }
    }
}

impl<'r> Responder<'r, 'static> for CsvExport {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        Response::build_from(self.body.respond_to(req)?)
            .header(ContentType::CSV)
            .header(Header::new("Content-Disposition", disposition))
            .ok()
    }
}
