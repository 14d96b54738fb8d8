//! # canopy-core - Core Domain Types
//!
//! Foundation crate for the Canopy hierarchy browser. Provides the payload
//! union, the arena-backed browser tree, the child ordering policy, error
//! handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Payloads (`payload`)
//! - [`Payload`] - Tagged union over projects, datasets, images, tags, groups, buckets, ...
//! - [`NodeKind`] - Fieldless discriminant of a payload
//! - [`Identity`] - `(kind, id)` pair used to match nodes across reloads
//! - [`ContainerKey`] - Key of one item-count fetch (object identity or bucket index)
//!
//! ### Browser (`browser`)
//! - [`BrowserKind`] - Explorer type of a browser tab
//! - [`DisplayMode`] - Experimenter vs group organisation (and refresh scope)
//!
//! ### Tree (`tree`)
//! - [`Tree`] - Arena of [`TreeNode`]s addressed by generational [`NodeId`]s
//! - [`NodeData`] - Fetched node data as delivered by the store
//!
//! ### Ordering (`ordering`)
//! - [`order_children()`] - Tier partition + comparator sort
//! - [`NodeComparator`] - Injected comparison collaborator
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with contract-violation vs recoverable classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use canopy_core::prelude::*;
//! ```

pub mod browser;
pub mod error;
pub mod logging;
pub mod ordering;
pub mod payload;
pub mod tree;

/// Prelude for common imports used throughout all Canopy crates
pub mod prelude {
    pub use super::error::{Error, Result};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use browser::{BrowserKind, DisplayMode};
pub use error::{Error, Result};
pub use ordering::{order_children, order_node_data, NodeComparator, SortOptions};
pub use payload::{
    ContainerKey, FileBucketKind, Identity, NodeKind, Payload, PlaceholderKind, SelectionKey,
    Tier, TimePeriod, TAGSET_NAMESPACE,
};
pub use tree::{NodeData, NodeId, Tree, TreeNode, UNKNOWN_COUNT};
