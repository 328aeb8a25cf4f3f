//! OhMyOps Core - Shared functionality for the dashboard host and its plugins
//!
//! Everything OhMyOps keeps on disk lives under a single root (`~/.omo`).

pub mod config;
pub mod paths;

pub use config::{Config, SecretsConfig};
pub use paths::{Paths, PathsError};
