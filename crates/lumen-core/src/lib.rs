pub mod config;
pub mod error;
pub mod types;

pub use config::LumenConfig;
pub use error::{LumenError, Result};
pub use types::*;
