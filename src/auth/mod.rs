pub mod password;
pub mod temp_token;
pub mod token;

pub use token::{AuthClaims, IssuedToken, Role, TokenError, TokenService};
