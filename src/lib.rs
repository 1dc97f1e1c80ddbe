//! Local SQLite store for academic paper metadata.
//!
//! Papers, tags and their many-to-many links live in one database file.
//! [`PaperStore`] exposes insertion, lookup, substring search, tagging and
//! allow-listed field updates on top of it.

pub mod config;
pub mod logging;
pub mod models;
pub mod storage;
mod store;

pub use config::{LoggingConfig, StoreConfig};
pub use logging::init_logging;
pub use models::{NewPaper, Paper, PaperField, Tag, TagCount};
pub use storage::StoreError;
pub use store::PaperStore;
