use uuid::Uuid;

use crate::database::{users, Store};
use crate::entity::{User, UserChanges};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

pub struct UserService {
    store: Store,
}

impl UserService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn profile(&self, caller: &AuthUser) -> Result<User, ApiError> {
        users::find_by_id(&self.store, caller.id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Users edit their own profile; super admins may edit anyone and are the
    /// only callers whose role, organization and archive changes apply.
    pub async fn update(&self, caller: &AuthUser, id: Uuid, body: serde_json::Value) -> Result<User, ApiError> {
        ensure_can_edit(caller, id)?;

        let changes = UserChanges::from_body(body, caller.is_super_admin())?;
        let user = users::update(&self.store, id, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        tracing::info!(user_id = %id, by = %caller.id, "User updated");
        Ok(user)
    }
}

pub fn ensure_can_edit(caller: &AuthUser, id: Uuid) -> Result<(), ApiError> {
    if caller.id == id || caller.is_super_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %id, by = %caller.id, "Profile update for another user refused");
        Err(ApiError::forbidden("You can only update your own profile"))
    }
}
