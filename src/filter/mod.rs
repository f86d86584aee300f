pub mod error;
pub mod filter_order;
pub mod filter_where;
pub mod options;
pub mod parser;
pub mod select;
pub mod types;

pub use error::FilterError;
pub use select::SelectQuery;
pub use types::*;
