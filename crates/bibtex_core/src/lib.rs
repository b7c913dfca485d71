//! bibtex_core: Core utilities shared across the bibtex workspace.
//!
//! Provides text spans and line maps used for source location tracking
//! in tokens and diagnostics.

pub mod text;

pub use text::{LineAndColumn, LineMap, TextSpan};
