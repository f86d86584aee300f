use uuid::Uuid;

use crate::database::store::{DatabaseError, Store};
use crate::entity::{NewPost, Post, PostChanges};

pub async fn insert(store: &Store, post: &NewPost) -> Result<Post, DatabaseError> {
    store
        .timed(async {
            let created = sqlx::query_as::<_, Post>(
                "INSERT INTO posts (title, content, user_id, organization_id)
                 VALUES ($1, $2, $3, $4)
                 RETURNING *",
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.user_id)
            .bind(post.organization_id)
            .fetch_one(store.pool())
            .await?;
            Ok(created)
        })
        .await
}

pub async fn update(store: &Store, id: Uuid, changes: &PostChanges) -> Result<Post, DatabaseError> {
    store
        .timed(async {
            let post = sqlx::query_as::<_, Post>(
                "UPDATE posts SET
                    title = COALESCE($2, title),
                    content = COALESCE($3, content),
                    is_archived = COALESCE($4, is_archived),
                    updated_at = $5
                 WHERE id = $1
                 RETURNING *",
            )
            .bind(id)
            .bind(&changes.title)
            .bind(&changes.content)
            .bind(changes.is_archived)
            .bind(changes.updated_at)
            .fetch_optional(store.pool())
            .await?;
            post.ok_or_else(|| DatabaseError::NotFound(format!("posts {} not found", id)))
        })
        .await
}
