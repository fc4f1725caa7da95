//! Repository layer: persistence of records over SQLite and a body store.
//!
//! # Responsibility
//! - Define the content store contract and its SQLite implementation.
//! - Keep SQL and filesystem details out of services and the record model.
//!
//! # Invariants
//! - Writes never persist a record that carries validation errors.
//! - Repository APIs return semantic errors (`NotFound`, `Uniqueness`) in
//!   addition to transport errors.

pub mod body_store;
pub mod collection_diff;
pub mod content_repo;
mod schema;
pub mod tag_repo;
pub mod uniqueness;
