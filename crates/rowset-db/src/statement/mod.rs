//! The in-memory relational statement model.
//!
//! Statements are plain data: a [`Select`] reads from exactly one
//! [`Source`] (a table, a nested select or a [`Join`]) and carries its
//! conditions, ordering, limit and flags. Nothing here touches a store;
//! rendering for a concrete backend lives next to that backend.
//!
//! # Overview
//!
//! - [`Select`]: the statement node, nestable as a subquery.
//! - [`Join`]: an equality join of two selects under aliases.
//! - [`clause`]: conditions, ordering and limits.

pub mod clause;
pub mod join;
pub mod select;

pub use clause::{Comparison, Condition, Limit, OrderBy, Projection, SortDirection};
pub use join::{Join, LEFT_ALIAS, RIGHT_ALIAS};
pub use select::{Select, Source, COUNT_COLUMN};
