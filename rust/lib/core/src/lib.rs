pub mod config;
pub mod error;
pub mod types;

pub use config::GraphConfig;
pub use error::GraphError;
pub use types::{merge_deep, RecordId};
