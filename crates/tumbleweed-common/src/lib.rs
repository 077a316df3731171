//! Shared types for the tumbleweed archiver: the NPF post model, the API
//! client, configuration, and the error taxonomy.

pub mod client;
pub mod config;
pub mod error;
pub mod post;

pub use crate::config::{Config, Granularity};
pub use crate::error::{ArchiveError, Result};
