pub mod auth;
pub mod response;

pub use auth::{authorize, require_auth, AuthUser};
pub use response::Reply;
