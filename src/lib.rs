pub mod renewal;
pub mod documents;
pub mod storage;
pub mod config;
pub mod error;
pub mod utils;

pub use crate::config::Config;
pub use crate::error::{Result, TrackerError};
