pub mod config;
pub mod error;
pub mod error_utils;
pub mod normalize;
pub mod query;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use normalize::{normalize, normalize_all};
pub use query::{parse_page, query, PostFilters, QueryPage, PAGE_SIZE};
pub use types::*;
