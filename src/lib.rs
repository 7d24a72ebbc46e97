pub mod analytics;
pub mod config;
pub mod decoder;
pub mod error;
pub mod mapping;
pub mod models;
pub mod pipeline;

pub use error::{Error, Result, TimestampError};
