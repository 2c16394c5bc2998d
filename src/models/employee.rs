use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::rust::double_option;
use validator::Validate;

use crate::db::Document;

pub const EMPLOYEES: &str = "employees";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id_number: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub role: String,
    pub department: String,
    pub tech_stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    /// The stored body carries no timestamp; `createdAt` comes from the document metadata.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        let mut data = document.data;
        if let Value::Object(fields) = &mut data {
            fields.insert("createdAt".to_string(), serde_json::to_value(document.created_at)?);
        }
        serde_json::from_value(data)
    }
}

#[derive(Deserialize, Serialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub id_number: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub surname: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub phone: String,
    #[validate(url(message = "must be a URL"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub role: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub department: String,
    #[validate(length(min = 1, message = "must list at least one technology"))]
    pub tech_stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[validate(url(message = "must be a URL"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
}

/// Partial update. The key (`idNumber`) and `createdAt` are not updatable and
/// are dropped if present in the request. Optional links accept `null` to clear them.
#[derive(Deserialize, Serialize, Validate, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[validate(length(min = 1, message = "must not be empty"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[validate(url(message = "must be a URL"))]
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub image: Option<Option<String>>,
    #[validate(length(min = 1, message = "must not be empty"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[validate(length(min = 1, message = "must not be empty"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[validate(length(min = 1, message = "must list at least one technology"))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech_stack: Option<Vec<String>>,
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub github: Option<Option<String>>,
    #[validate(url(message = "must be a URL"))]
    #[serde(default, with = "double_option", skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<Option<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_document_takes_created_at_from_metadata() {
        let created_at = Utc::now();
        let document = Document {
            key: "E-1".to_string(),
            data: json!({
                "idNumber": "E-1",
                "name": "Ada",
                "surname": "Lovelace",
                "email": "ada@example.com",
                "phone": "555-0100",
                "role": "Engineer",
                "department": "R&D",
                "techStack": ["rust"],
            }),
            created_at,
            updated_at: created_at,
        };

        let employee = Employee::from_document(document).unwrap();
        assert_eq!(employee.created_at, created_at);
        assert_eq!(employee.image, None);

        let wire = serde_json::to_value(&employee).unwrap();
        assert!(wire.get("image").is_none());
        assert_eq!(wire["techStack"], json!(["rust"]));
    }

    #[test]
    fn update_patch_only_carries_present_fields() {
        let update: EmployeeUpdate = serde_json::from_value(json!({
            "role": "Lead",
            "idNumber": "E-2",
            "createdAt": "2020-01-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"role": "Lead"}));
    }

    #[test]
    fn null_clears_optional_links() {
        let update: EmployeeUpdate = serde_json::from_value(json!({
            "image": null,
            "github": "ada"
        }))
        .unwrap();

        assert_eq!(update.image, Some(None));
        assert_eq!(update.linkedin, None);
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"image": null, "github": "ada"})
        );
    }

    #[test]
    fn cleared_image_reads_back_as_absent() {
        let document = Document {
            key: "E-1".to_string(),
            data: json!({
                "idNumber": "E-1",
                "name": "Ada",
                "surname": "Lovelace",
                "email": "ada@example.com",
                "phone": "555-0100",
                "image": null,
                "role": "Engineer",
                "department": "R&D",
                "techStack": ["rust"]
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let employee = Employee::from_document(document).unwrap();
        assert_eq!(employee.image, None);
        assert!(serde_json::to_value(&employee).unwrap().get("image").is_none());
    }

    #[test]
    fn empty_tech_stack_is_invalid() {
        let employee: NewEmployee = serde_json::from_value(json!({
            "idNumber": "E-1",
            "name": "Ada",
            "surname": "Lovelace",
            "email": "ada@example.com",
            "phone": "555-0100",
            "role": "Engineer",
            "department": "R&D",
            "techStack": []
        }))
        .unwrap();

        let errors = employee.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("tech_stack"));
    }
}
