//! URL handling module for Catalog-Ripple
//!
//! This module builds listing and detail page URLs from a site root and the
//! configured path templates.

mod template;

// Re-export main functions
pub use template::{detail_url, listing_url, parse_base};
