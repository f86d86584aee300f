// handlers/protected/auth/mod.rs - Session endpoints for signed-in users
pub mod valid;

pub use valid::valid_get;
