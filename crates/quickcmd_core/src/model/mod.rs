//! Domain model for command snippets and their groupings.
//!
//! # Responsibility
//! - Define canonical records shared by repositories and the storage handle.
//! - Keep validation rules next to the data they guard.
//!
//! # Invariants
//! - Every persisted object is identified by a numeric `EntityId`.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod entity;
pub mod os;
