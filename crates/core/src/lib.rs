/// Core configuration and shared types for abibind
pub mod config;
pub mod types;

/// Re-export common types from abibind-common
pub use abibind_common::{Error, Result};
pub use types::Lang;
