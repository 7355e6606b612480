use rocket::form::Form;
use rocket::serde::json::{Json, Value};
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::admin::{self, CsvExport};
use crate::error::ApiResult;
use crate::guard::AdminKey;
use crate::models::{Rsvp, Stats};
use crate::store::Store;
use crate::submission::{self, ClientInfo, RsvpInput};

/// JSON body posted by the RSVP page. Fields stay loose so that a number in
/// place of a string (or the other way round) is coerced, not refused.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RsvpPayload {
    name: Option<Value>,
    guests: Option<Value>,
    #[serde(rename = "kidsCount")]
    kids_count: Option<Value>,
    attendance: Option<Value>,
    notes: Option<Value>,
}

impl From<RsvpPayload> for RsvpInput {
    fn from(payload: RsvpPayload) -> Self {
        RsvpInput {
            name: payload.name.and_then(text),
            guests: payload.guests.and_then(text),
            kids_count: payload.kids_count.and_then(text),
            attendance: payload.attendance.and_then(text),
            notes: payload.notes.and_then(text),
        }
    }
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Same fields for a plain `<form>` post.
#[derive(Debug, FromForm)]
pub struct RsvpForm {
    name: Option<String>,
    guests: Option<String>,
    #[field(name = "kidsCount")]
    kids_count: Option<String>,
    attendance: Option<String>,
    notes: Option<String>,
}

impl From<RsvpForm> for RsvpInput {
    fn from(form: RsvpForm) -> Self {
        RsvpInput {
            name: form.name,
            guests: form.guests,
            kids_count: form.kids_count,
            attendance: form.attendance,
            notes: form.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Submitted {
    pub ok: bool,
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpList {
    pub rows: Vec<Rsvp>,
}

async fn store_answer(
    store: &Store,
    input: RsvpInput,
    client: ClientInfo,
) -> ApiResult<Json<Submitted>> {
    let id = submission::submit(store.as_ref(), input, client).await?;
    Ok(Json(Submitted { ok: true, id }))
}

#[post("/rsvp", format = "json", data = "<payload>")]
pub async fn submit_json(
    payload: Json<RsvpPayload>,
    client: ClientInfo,
    store: &State<Store>,
) -> ApiResult<Json<Submitted>> {
    store_answer(store, payload.into_inner().into(), client).await
}

#[post("/rsvp", format = "form", data = "<form>", rank = 2)]
pub async fn submit_form(
    form: Form<RsvpForm>,
    client: ClientInfo,
    store: &State<Store>,
) -> ApiResult<Json<Submitted>> {
    store_answer(store, form.into_inner().into(), client).await
}

#[get("/admin/rsvps")]
pub async fn list_rsvps(_admin: AdminKey, store: &State<Store>) -> ApiResult<Json<RsvpList>> {
    let rows = admin::list(store.inner().as_ref()).await?;
    Ok(Json(RsvpList { rows }))
}

#[get("/admin/stats")]
pub async fn stats(_admin: AdminKey, store: &State<Store>) -> ApiResult<Json<Stats>> {
    Ok(Json(admin::stats(store.inner().as_ref()).await?))
}

#[get("/admin/export.csv")]
pub async fn export_csv(_admin: AdminKey, store: &State<Store>) -> ApiResult<CsvExport> {
    Ok(admin::export_csv(store.inner().as_ref()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::serde::json::{from_value, json};

    #[test]
    fn payload_values_become_text() {
        let payload: RsvpPayload = from_value(json!({
            "name": "Anna",
            "kidsCount": 2,
            "attendance": "wir_kommen",
            "notes": null,
            "guests": ["Tom"],
        }))
        .unwrap();
        let input = RsvpInput::from(payload);

        assert_eq!(input.name.as_deref(), Some("Anna"));
        assert_eq!(input.kids_count.as_deref(), Some("2"));
        assert_eq!(input.attendance.as_deref(), Some("wir_kommen"));
        assert_eq!(input.notes, None);
        assert_eq!(input.guests, None);
    }

    #[test]
    fn missing_fields_default_to_none() {
        let payload: RsvpPayload = from_value(json!({})).unwrap();
        let input = RsvpInput::from(payload);
        assert!(input.name.is_none() && input.attendance.is_none());
    }
}
