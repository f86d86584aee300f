use sqlx::PgExecutor;
use uuid::Uuid;

use crate::database::repository::Repository;
use crate::database::store::{DatabaseError, Store};
use crate::entity::{NewUser, User, UserChanges};

pub async fn find_by_id(store: &Store, id: Uuid) -> Result<Option<User>, DatabaseError> {
    Repository::<User>::new(store.clone()).select_one(id).await
}

/// Case-insensitive lookup by login e-mail.
pub async fn find_by_email(store: &Store, email: &str) -> Result<Option<User>, DatabaseError> {
    store
        .timed(async {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(store.pool())
                .await?;
            Ok(user)
        })
        .await
}

/// Id of the account with this e-mail, on any executor.
pub async fn id_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Uuid>, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email)
        .fetch_optional(executor)
        .await?;
    Ok(id)
}

pub async fn email_exists(store: &Store, email: &str) -> Result<bool, DatabaseError> {
    store
        .timed(async {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                    .bind(email)
                    .fetch_one(store.pool())
                    .await?;
            Ok(exists)
        })
        .await
}

pub async fn create(store: &Store, user: &NewUser) -> Result<User, DatabaseError> {
    store
        .timed(async {
            let created = sqlx::query_as::<_, User>(
                "INSERT INTO users (email, password, first_name, last_name)
                 VALUES ($1, $2, $3, $4)
                 RETURNING *",
            )
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(store.pool())
            .await?;
            Ok(created)
        })
        .await
}

pub async fn update(store: &Store, id: Uuid, changes: &UserChanges) -> Result<Option<User>, DatabaseError> {
    store
        .timed(async {
            let user = sqlx::query_as::<_, User>(
                "UPDATE users SET
                    email = COALESCE($2, email),
                    first_name = COALESCE($3, first_name),
                    last_name = COALESCE($4, last_name),
                    is_super_admin = COALESCE($5, is_super_admin),
                    organization_id = COALESCE($6, organization_id),
                    is_archived = COALESCE($7, is_archived),
                    updated_at = COALESCE($8, now())
                 WHERE id = $1
                 RETURNING *",
            )
            .bind(id)
            .bind(&changes.email)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(changes.is_super_admin)
            .bind(changes.organization_id)
            .bind(changes.is_archived)
            .bind(changes.updated_at)
            .fetch_optional(store.pool())
            .await?;
            Ok(user)
        })
        .await
}

/// Takes any executor so the reset flow can run it inside its transaction.
pub async fn update_password<'e, E>(executor: E, id: Uuid, password_hash: &str) -> Result<u64, DatabaseError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("UPDATE users SET password = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

async fn set_archived(store: &Store, id: Uuid, archived: bool) -> Result<User, DatabaseError> {
    store
        .timed(async {
            let user = sqlx::query_as::<_, User>(
                "UPDATE users SET is_archived = $2, updated_at = now() WHERE id = $1 RETURNING *",
            )
            .bind(id)
            .bind(archived)
            .fetch_optional(store.pool())
            .await?;
            user.ok_or_else(|| DatabaseError::NotFound(format!("users {} not found", id)))
        })
        .await
}

pub async fn archive_user(store: &Store, id: Uuid) -> Result<User, DatabaseError> {
    set_archived(store, id, true).await
}

pub async fn reinstate_user(store: &Store, id: Uuid) -> Result<User, DatabaseError> {
    set_archived(store, id, false).await
}
