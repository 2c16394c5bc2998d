use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Document;

pub const USERS: &str = "users";

/// Profile mirrored from the identity provider, keyed by its uid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        let mut data = document.data;
        if let Value::Object(fields) = &mut data {
            fields.insert("createdAt".to_string(), serde_json::to_value(document.created_at)?);
        }
        serde_json::from_value(data)
    }
}
