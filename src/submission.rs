//! Guest-facing submission: validate the form input and append one row.

use chrono::{SecondsFormat, Utc};
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use tracing::info;

use crate::models::{Attendance, Rsvp};
use crate::store::{RsvpStore, StoreError};

pub const ID_LEN: usize = 12;

/// Raw form fields, already reduced to text by the route.
#[derive(Debug, Clone, Default)]
pub struct RsvpInput {
    pub name: Option<String>,
    pub guests: Option<String>,
    pub kids_count: Option<String>,
    pub attendance: Option<String>,
    pub notes: Option<String>,
}

/// Request details kept alongside the answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Please enter your name.")]
    MissingName,

    #[error("Please choose whether you are coming.")]
    UnknownAttendance,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] SubmissionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Validated answer, ready to be stamped with an id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub name: String,
    pub guests: Option<String>,
    pub kids_count: Option<i32>,
    pub attendance: Attendance,
    pub notes: Option<String>,
}

impl Answer {
    pub fn validate(input: RsvpInput) -> Result<Self, SubmissionError> {
        let attendance = input
            .attendance
            .as_deref()
            .and_then(Attendance::from_token)
            .ok_or(SubmissionError::UnknownAttendance)?;

        let name = non_empty(input.name).ok_or(SubmissionError::MissingName)?;

        Ok(Self {
            name,
            guests: non_empty(input.guests),
            kids_count: input.kids_count.as_deref().and_then(coerce_count),
            attendance,
            notes: non_empty(input.notes),
        })
    }

    pub fn into_record(self, client: ClientInfo) -> Rsvp {
        Rsvp {
            id: new_id(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            name: self.name,
            guests: self.guests,
            kids_count: self.kids_count,
            attendance: self.attendance,
            notes: self.notes,
            user_agent: client.user_agent,
            ip: client.ip,
        }
    }
}

/// Validates `input` and stores it, returning the new row's id.
pub async fn submit(
    store: &dyn RsvpStore,
    input: RsvpInput,
    client: ClientInfo,
) -> Result<String, SubmitError> {
    let record = Answer::validate(input)?.into_record(client);
    store.insert(&record).await?;

    info!(id = %record.id, attendance = %record.attendance, "rsvp stored");
    Ok(record.id)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lenient kids count: any finite number is truncated to an integer, anything
/// else (blank, text, negative, out of range) is dropped rather than rejected.
fn coerce_count(raw: &str) -> Option<i32> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let value = value.trunc();
    if value < 0.0 || value > f64::from(i32::MAX) {
        return None;
    }
    Some(value as i32)
}

fn new_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}
