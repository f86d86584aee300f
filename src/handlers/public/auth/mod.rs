// handlers/public/auth/mod.rs - Public authentication endpoints
pub mod forgot_password;
pub mod login;
pub mod register;

pub use forgot_password::{forgot_password_patch, forgot_password_post};
pub use login::login_post;
pub use register::register_post;
