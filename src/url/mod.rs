//! URL handling module for Redirect-Resolver
//!
//! This module turns raw caller input into dispatchable URLs and resolves
//! `Location` header values against the hop that produced them.

mod normalize;

pub use normalize::{normalize_input, parse_target, resolve_location};
