//! Shared CLI presentation utilities.
//!
//! Format-only helpers; no domain transforms.

pub mod tables;

pub use tables::{entry_row, format_size, print_entry_header, print_separator, truncate_string};
