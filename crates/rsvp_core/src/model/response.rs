//! Guest attendance response.
//!
//! # Invariants
//! - `id` is generated once and never reassigned.
//! - `updated_at`, when set, is later than `created_at`.
//! - Name and email fields are stored as given; required-ness and length
//!   limits belong to the caller.

use crate::model::entity::{now_epoch_ms, Entity, EpochMillis};
use crate::store::{StoreError, StoreResult};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one response.
pub type ResponseId = Uuid;

/// One guest's answer to an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_attending: bool,
    pub dietary_restrictions: Option<String>,
    pub accessibility_requirements: Option<String>,
    pub pronouns: Option<String>,
    pub note: Option<String>,
    /// Companion response submitted alongside this one.
    pub plus_one_id: Option<ResponseId>,
    pub created_at: EpochMillis,
    pub updated_at: Option<EpochMillis>,
}

impl Response {
    /// Creates a response with a fresh id and `created_at = now`.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        is_attending: bool,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), first_name, last_name, email, is_attending)
    }

    /// Creates a response with a caller-provided id, for imports.
    pub fn with_id(
        id: ResponseId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        is_attending: bool,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            is_attending,
            dietary_restrictions: None,
            accessibility_requirements: None,
            pronouns: None,
            note: None,
            plus_one_id: None,
            created_at: now_epoch_ms(),
            updated_at: None,
        }
    }

    /// Links this response to its companion's response.
    pub fn with_plus_one(mut self, companion: ResponseId) -> Self {
        self.plus_one_id = Some(companion);
        self
    }

    /// `"first last"` with surrounding whitespace removed from each part.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }
}

impl Entity for Response {
    type Key = ResponseId;

    const NAME: &'static str = "Response";
    const TABLE: &'static str = "responses";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "first_name",
        "last_name",
        "email",
        "is_attending",
        "dietary_restrictions",
        "accessibility_requirements",
        "pronouns",
        "note",
        "plus_one_id",
        "created_at",
        "updated_at",
    ];

    fn key(&self) -> ResponseId {
        self.id
    }

    fn key_value(key: &ResponseId) -> Value {
        Value::Text(key.to_string())
    }

    fn created_at(&self) -> EpochMillis {
        self.created_at
    }

    fn updated_at(&self) -> Option<EpochMillis> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: EpochMillis) {
        self.updated_at = Some(at);
    }

    fn to_row(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.to_string()),
            Value::Text(self.first_name.clone()),
            Value::Text(self.last_name.clone()),
            Value::Text(self.email.clone()),
            Value::Integer(i64::from(self.is_attending)),
            optional_text(&self.dietary_restrictions),
            optional_text(&self.accessibility_requirements),
            optional_text(&self.pronouns),
            optional_text(&self.note),
            self.plus_one_id
                .map_or(Value::Null, |id| Value::Text(id.to_string())),
            Value::Integer(self.created_at),
            self.updated_at.map_or(Value::Null, Value::Integer),
        ]
    }

    fn from_row(row: &Row<'_>) -> StoreResult<Self> {
        let id_text: String = row.get("id")?;
        let id = parse_id(&id_text, "responses.id")?;

        let plus_one_id = match row.get::<_, Option<String>>("plus_one_id")? {
            Some(text) => Some(parse_id(&text, "responses.plus_one_id")?),
            None => None,
        };

        let is_attending = match row.get::<_, i64>("is_attending")? {
            0 => false,
            1 => true,
            other => {
                return Err(StoreError::InvalidData(format!(
                    "invalid is_attending value `{other}` in responses.is_attending"
                )));
            }
        };

        Ok(Self {
            id,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            email: row.get("email")?,
            is_attending,
            dietary_restrictions: row.get("dietary_restrictions")?,
            accessibility_requirements: row.get("accessibility_requirements")?,
            pronouns: row.get("pronouns")?,
            note: row.get("note")?,
            plus_one_id,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

fn optional_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn parse_id(text: &str, column: &str) -> StoreResult<ResponseId> {
    Uuid::parse_str(text)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid value `{text}` in {column}")))
}

#[cfg(test)]
mod tests {
    use super::Response;
    use crate::model::entity::{touch, Entity};

    #[test]
    fn new_response_has_no_optional_fields() {
        let response = Response::new("Ada", "Lovelace", "ada@example.com", true);
        assert!(response.updated_at.is_none());
        assert!(response.plus_one_id.is_none());
        assert!(response.note.is_none());
        assert!(response.created_at > 0);
    }

    #[test]
    fn row_values_follow_column_order() {
        let response = Response::new("Ada", "Lovelace", "ada@example.com", false);
        let row = response.to_row();
        assert_eq!(row.len(), Response::COLUMNS.len());
        assert_eq!(Response::COLUMNS[0], Response::KEY_COLUMN);
        assert_eq!(row[0], Response::key_value(&response.id));
    }

    #[test]
    fn touch_moves_updated_at_past_created_at() {
        let mut response = Response::new("Ada", "Lovelace", "", true);
        response.created_at = i64::MAX / 2;
        touch(&mut response);
        assert_eq!(response.updated_at, Some(i64::MAX / 2 + 1));
    }

    #[test]
    fn full_name_trims_each_part() {
        let response = Response::new("  Ada ", " Lovelace", "", true);
        assert_eq!(response.full_name(), "Ada Lovelace");
    }

    #[test]
    fn serializes_companion_reference() {
        let companion = Response::new("Charles", "Babbage", "", true);
        let response = Response::new("Ada", "Lovelace", "", true).with_plus_one(companion.id);
        let json = serde_json::to_value(&response).expect("response should serialize");
        assert_eq!(json["plus_one_id"], companion.id.to_string());
        assert_eq!(json["is_attending"], true);
    }
}
