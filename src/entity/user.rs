use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{Entity, FieldKind, FieldSpec};
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub is_super_admin: bool,
    pub organization_id: Option<Uuid>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::column("id", FieldKind::Uuid),
        FieldSpec::text_search("email"),
        FieldSpec::text_search("first_name"),
        FieldSpec::text_search("last_name"),
        FieldSpec::column("is_super_admin", FieldKind::Bool),
        FieldSpec::column("organization_id", FieldKind::Uuid),
        FieldSpec::column("is_archived", FieldKind::Bool),
        FieldSpec::column("created_at", FieldKind::Timestamp),
        FieldSpec::column("updated_at", FieldKind::Timestamp),
    ];
}

/// Registration data after validation and hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateUserBody {
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    first_name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    last_name: Option<String>,
    is_super_admin: Option<bool>,
    organization_id: Option<Uuid>,
    is_archived: Option<bool>,
}

/// Profile update. Passwords only change through the reset flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_super_admin: Option<bool>,
    pub organization_id: Option<Uuid>,
    pub is_archived: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserChanges {
    /// `admin` unlocks role, organization and archive changes; for anyone
    /// else those keys are ignored.
    pub fn from_body(mut body: Value, admin: bool) -> Result<Self, ApiError> {
        if let Value::Object(map) = &mut body {
            map.remove("password");
        }

        let body: UpdateUserBody = serde_json::from_value(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid user body: {}", e)))?;
        body.validate()?;

        let mut changes = Self {
            email: body.email,
            first_name: body.first_name,
            last_name: body.last_name,
            updated_at: Some(Utc::now()),
            ..Self::default()
        };
        if admin {
            changes.is_super_admin = body.is_super_admin;
            changes.organization_id = body.organization_id;
            changes.is_archived = body.is_archived;
        }
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_is_never_part_of_an_update() {
        let changes = UserChanges::from_body(json!({ "first_name": "Ann", "password": "hunter2" }), false).unwrap();
        assert_eq!(changes.first_name.as_deref(), Some("Ann"));
        assert!(format!("{changes:?}").find("hunter2").is_none());
    }

    #[test]
    fn admin_fields_need_admin() {
        let body = json!({ "is_super_admin": true, "is_archived": true });
        let changes = UserChanges::from_body(body.clone(), false).unwrap();
        assert_eq!(changes.is_super_admin, None);
        assert_eq!(changes.is_archived, None);

        let changes = UserChanges::from_body(body, true).unwrap();
        assert_eq!(changes.is_super_admin, Some(true));
        assert_eq!(changes.is_archived, Some(true));
    }

    #[test]
    fn invalid_email_is_a_validation_error() {
        let result = UserChanges::from_body(json!({ "email": "not-an-email" }), false);
        assert!(matches!(result, Err(ApiError::Validation { .. })));
    }

    #[test]
    fn serialized_user_hides_password() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password: "$argon2id$hash".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            is_super_admin: false,
            organization_id: None,
            is_archived: false,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "a@b.com");
    }
}
