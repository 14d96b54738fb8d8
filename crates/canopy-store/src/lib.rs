//! # canopy-store - Store Client Contract
//!
//! The asynchronous collaborator the browser fetches its data from, plus an
//! in-memory implementation fed by a JSON fixture file.
//!
//! Depends on [`canopy_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Contract
//! - [`StoreClient`] - `Send` store client, implemented by concrete stores
//! - [`LocalStoreClient`] - Non-`Send` variant derived from the same trait
//! - [`ChildrenRequest`] / [`LeavesRequest`] - Fetch parameters
//!
//! ### Fixture store
//! - [`FixtureStore`] - Serves a [`Fixture`] loaded from JSON
//! - [`FixtureNode`] - One fixture node with its complete subtree

pub mod client;
pub mod fixture;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use client::{ChildrenRequest, LeavesRequest, LocalStoreClient, StoreClient};
pub use fixture::{Fixture, FixtureNode, FixtureStore};
