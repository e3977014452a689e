//! Builders to construct a source from configuration.

pub mod source_builder;

pub use source_builder::{build_source, SourceBuilder};
