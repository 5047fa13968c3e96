//! Core types and logic for the course catalog.
//!
//! This crate has no HTTP or database dependencies. The
//! reconciler, the code resolver, and the prerequisite evaluator are written
//! against the [`store::CatalogStore`] trait; storage backends implement it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod admin;
pub mod course;
pub mod error;
pub mod prereq;
pub mod reconcile;
pub mod relationship;
pub mod resolve;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
