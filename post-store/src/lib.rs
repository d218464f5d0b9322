//! Flat-file persistence for normalized posts: deduplicating merges on the
//! write path and a time-cached collection on the read path.

pub mod cache;
pub mod convert;
pub mod file;
pub mod merge;


pub use cache::{Clock, ManualClock, PostStore, SystemClock, DEFAULT_FRESHNESS_WINDOW};
pub use convert::convert_file;
pub use merge::{merge, Deduplicator};
