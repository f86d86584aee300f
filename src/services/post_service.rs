use uuid::Uuid;

use crate::api::Dispatch;
use crate::database::{posts, Page, Repository, Store};
use crate::entity::{NewPost, Post, PostChanges};
use crate::error::ApiError;
use crate::state::AppState;

/// CRUD over `posts`. Reads go through the allow-listed query layer; the
/// author of a new post is always the caller.
pub struct PostService {
    store: Store,
    repo: Repository<Post>,
}

impl PostService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            repo: Repository::new(state.store.clone()),
        }
    }

    pub async fn list(&self, request: Dispatch) -> Result<Page<Post>, ApiError> {
        let plan = self.repo.plan(request.query)?;
        Ok(self.repo.select_page(plan).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Post, ApiError> {
        self.repo
            .select_one(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Post not found"))
    }

    pub async fn create(&self, request: Dispatch) -> Result<Post, ApiError> {
        let author = request.user()?.id;
        let post = NewPost::from_body(request.body, author)?;
        let created = posts::insert(&self.store, &post).await?;
        tracing::info!(post_id = %created.id, user_id = %author, "Post created");
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, request: Dispatch) -> Result<Post, ApiError> {
        let changes = PostChanges::from_body(request.body)?;
        let updated = posts::update(&self.store, id, &changes).await?;
        tracing::info!(post_id = %id, "Post updated");
        Ok(updated)
    }

    /// Returns the removed row.
    pub async fn delete(&self, id: Uuid) -> Result<Post, ApiError> {
        let removed = self.repo.delete_404(id).await?;
        tracing::info!(post_id = %id, "Post deleted");
        Ok(removed)
    }
}
