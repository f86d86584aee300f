pub mod posts;
pub mod query_builder;
pub mod repository;
pub mod store;
pub mod users;

pub use repository::{Page, Repository};
pub use store::{DatabaseError, Store};
