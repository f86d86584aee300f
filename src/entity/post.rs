use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{Entity, FieldKind, FieldSpec};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Post {
    const TABLE: &'static str = "posts";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::column("id", FieldKind::Uuid),
        FieldSpec::text_search("title"),
        FieldSpec::text_search("content"),
        FieldSpec::column("user_id", FieldKind::Uuid),
        FieldSpec::column("organization_id", FieldKind::Uuid),
        FieldSpec::column("is_archived", FieldKind::Bool),
        FieldSpec::column("created_at", FieldKind::Timestamp),
        FieldSpec::column("updated_at", FieldKind::Timestamp),
    ];
}

#[derive(Debug, Deserialize, Validate)]
struct CreatePostBody {
    #[validate(required(message = "title is required"), length(min = 1, max = 250))]
    title: Option<String>,
    #[validate(required(message = "content is required"), length(min = 1))]
    content: Option<String>,
    organization_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
struct UpdatePostBody {
    #[validate(length(min = 1, max = 250))]
    title: Option<String>,
    #[validate(length(min = 1))]
    content: Option<String>,
    is_archived: Option<bool>,
}

/// A post ready to insert. The author always comes from the caller's
/// identity, never from the body.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
}

impl NewPost {
    pub fn from_body(body: Value, author: Uuid) -> Result<Self, ApiError> {
        let body: CreatePostBody = serde_json::from_value(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid post body: {}", e)))?;
        body.validate()?;

        Ok(Self {
            title: body.title.unwrap_or_default(),
            content: body.content.unwrap_or_default(),
            user_id: author,
            organization_id: body.organization_id,
        })
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_archived: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl PostChanges {
    pub fn from_body(body: Value) -> Result<Self, ApiError> {
        let body: UpdatePostBody = serde_json::from_value(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid post body: {}", e)))?;
        body.validate()?;

        Ok(Self {
            title: body.title,
            content: body.content,
            is_archived: body.is_archived,
            updated_at: Utc::now(),
        })
    }
}
