pub mod dispatch;

pub use dispatch::{respond, Dispatch};
