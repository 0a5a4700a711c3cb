//! forge
//!
//! Abstraction over the content-addressable object store a site is
//! published into.
//!
//! # Architecture
//!
//! The `Forge` trait defines the git data operations the publisher needs.
//! Commands use the [`create_forge`] factory function rather than
//! constructing a backend directly.
//!
//! - Objects are append-only; the only mutation is the final ref update
//! - Same-level calls may run concurrently, so every forge is `Send + Sync`
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub git data REST API
//! - [`local`]: bare git repository through libgit2
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Forge selection and creation

mod factory;
pub mod github;
pub mod local;
pub mod mock;
mod traits;

pub use factory::{create_forge, valid_forge_names, ForgeOptions, ForgeProvider};
pub use traits::*;
