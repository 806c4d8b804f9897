//! Concrete metadata provider implementations.
//!
//! Each submodule wraps one external catalog and implements
//! [`MetadataProvider`](super::MetadataProvider).

pub mod tmdb;

pub use tmdb::TmdbProvider;
