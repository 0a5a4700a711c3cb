//! core
//!
//! Core domain types and configuration for sitepush.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, ObjectId, RefName, CommitAuthor
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing

pub mod config;
pub mod types;
