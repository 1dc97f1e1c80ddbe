//! Storage module for SQLite database operations
//!
//! This module provides:
//! - Connection setup and schema bootstrap
//! - Repository implementations for papers and tags

pub mod db;
pub mod paper_repo;
pub mod tag_repo;

pub use db::{init_database, open_connection, StoreError};
pub use paper_repo::PaperRepo;
pub use tag_repo::TagRepo;
