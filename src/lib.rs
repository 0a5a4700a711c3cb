//! Sitepush - publish a directory to a git branch through a remote object store
//!
//! Sitepush walks a local directory, stores every file as a blob and every
//! directory as a tree (deepest level first, so a parent is only written once
//! all of its children exist), creates a single parentless commit for the
//! root tree, and force-moves a branch to it.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates)
//! - [`publish`] - Walk, forest assembly, and the staged publish pipeline
//! - [`site`] - Fetch, build, publish, clean up (the deploy pipeline)
//! - [`forge`] - Object store abstraction (GitHub, local git, mock)
//! - [`core`] - Domain types and configuration
//! - [`auth`] - Bearer token resolution
//! - [`secrets`] - Secret storage abstraction
//! - [`logging`] - `tracing` subscriber setup
//! - [`ui`] - User-facing output
//!
//! # Guarantees
//!
//! 1. No tree is stored before every child it references
//! 2. The commit is created only after the root tree exists
//! 3. The branch moves only after the commit exists, and only on full success

pub mod auth;
pub mod cli;
pub mod core;
pub mod forge;
pub mod logging;
pub mod publish;
pub mod secrets;
pub mod site;
pub mod ui;
