//! Episonext-Common: Shared types, identifiers, and errors.
//!
//! This crate provides the vocabulary shared by the episonext engine and its
//! consumers:
//!
//! - **Identifiers**: [`SeriesId`] derived from composite watch-item keys and
//!   [`EventId`] for emitted events
//! - **Core Types**: [`MediaKind`] and the [`SuggestedAction`] vocabulary
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use episonext_common::{MediaKind, SeriesId, SuggestedAction};
//!
//! let series = SeriesId::from_item_key("tt0944947:1:5").unwrap();
//! assert_eq!(series.as_str(), "tt0944947");
//!
//! let kind: MediaKind = "series".parse().unwrap();
//! assert_eq!(kind, MediaKind::Series);
//!
//! assert_eq!(SuggestedAction::WatchNextEpisode.to_string(), "WATCH_NEXT_EPISODE");
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
