//! # Router Module
//!
//! Ordered, regex-based url table matching.
//!
//! ## Overview
//!
//! A url table is a plain slice of [`RouteEntry`] values, each pairing a
//! pattern with an action. The router is responsible for:
//! - Normalizing the request path (one leading `/` removed)
//! - Compiling string patterns into regular expressions
//! - Testing entries in declaration order with search (unanchored) semantics
//! - Extracting positional capture groups from a match
//!
//! Resolving and invoking the matched action is the dispatcher's job; the
//! router never looks at what an action is.
//!
//! ## Example
//!
//! ```rust
//! use webdispatch::router::{first_match, normalize_path, RouteEntry};
//!
//! let table = vec![
//!     RouteEntry::new(r"^users/(\d+)$", "users.show"),
//!     RouteEntry::new(r"^users", "users.index"),
//! ];
//! let found = first_match(&table, normalize_path("/users/42")).unwrap().unwrap();
//! assert_eq!(found.index, 0);
//! assert_eq!(found.groups[0].as_deref(), Some("42"));
//! ```
//!
//! ## Ordering
//!
//! The table is a priority list: overlapping patterns are disambiguated purely
//! by declaration order.

mod core;
#[cfg(test)]
mod tests;

pub use core::{
    first_match, matches, normalize_path, ActionRef, Captures, PatternSpec, RouteEntry,
    RouteMatch, MAX_INLINE_CAPTURES,
};
