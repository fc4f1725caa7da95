//! Service layer for use-case orchestration.
//!
//! # Responsibility
//! - Compose repository operations into content use-cases.
//!
//! # Invariants
//! - Services depend on repository traits, not on SQL details.

pub mod content_service;
pub mod image_cache;
