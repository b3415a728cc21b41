pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod sink;

pub use error::{RdsAuthError, Result};
