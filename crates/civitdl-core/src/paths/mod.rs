//! Path pattern expansion and filename-safe slugs.
//!
//! # Design
//!
//! - Pure string/path functions; nothing here touches the filesystem
//! - Patterns are opaque brace templates over [`PathData`]
//! - Stored folders are always relative to the save root

mod error;
mod pattern;
mod relative;
mod slug;

pub use error::PatternError;
pub use pattern::{PathData, expand_pattern};
pub use relative::relative_folder;
pub use slug::slugify;
