use super::schema::rsvp;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::mysql::{Mysql, MysqlValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Whether (and when) a guest is coming.
///
/// Stored as `yes`, `no` or `friday`. The RSVP form sends its own tokens,
/// see [`Attendance::from_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    Yes,
    No,
    Friday,
}

const TOKENS: [(&str, Attendance); 3] = [
    ("wir_kommen", Attendance::Yes),
    ("wir_kommen_nicht", Attendance::No),
    ("wir_kommen_am_freitag", Attendance::Friday),
];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown attendance value `{0}`")]
pub struct UnknownAttendance(pub String);

impl Attendance {
    pub const ALL: [Attendance; 3] = [Attendance::Yes, Attendance::No, Attendance::Friday];

    /// Looks up the form token a guest picked.
    pub fn from_token(token: &str) -> Option<Self> {
        TOKENS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, attendance)| *attendance)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Attendance::Yes => "yes",
            Attendance::No => "no",
            Attendance::Friday => "friday",
        }
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Attendance {
    type Err = UnknownAttendance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attendance::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAttendance(s.to_string()))
    }
}

impl ToSql<Text, Mysql> for Attendance {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Mysql>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Mysql> for Attendance {
    fn from_sql(bytes: MysqlValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Mysql>>::from_sql(bytes)?;
        Ok(raw.parse()?)
    }
}

#[derive(Debug, Clone, PartialEq, Insertable, Selectable, Queryable, Serialize, Deserialize)]
#[diesel(table_name = rsvp)]
#[diesel(check_for_backend(diesel::mysql::Mysql))]
pub struct Rsvp {
    pub id: String,
    pub created_at: String,
    pub name: String,
    pub guests: Option<String>,
    pub kids_count: Option<i32>,
    pub attendance: Attendance,
    pub notes: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total: i64,
    pub yes: i64,
    pub no: i64,
    pub friday: i64,
    pub kids: i64,
}

impl Stats {
    /// Adds `responses` answers with `kids` children to the bucket for
    /// `attendance`, keeping `total` equal to the sum of the buckets.
    pub fn record(&mut self, attendance: Attendance, responses: i64, kids: i64) {
        match attendance {
            Attendance::Yes => self.yes += responses,
            Attendance::No => self.no += responses,
            Attendance::Friday => self.friday += responses,
        }
        self.total += responses;
        self.kids += kids;
    }
}
