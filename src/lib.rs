//! Migrate YouTrack issues, with their comments, attachments and custom
//! fields, to Azure DevOps work items.

pub mod cli;
pub mod config;
pub mod error;
pub mod mapping;
pub mod migrate;
pub mod model;
pub mod providers;
pub mod util;
