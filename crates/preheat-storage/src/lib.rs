//! Preheat Storage - Database layer
//!
//! This crate provides the PostgreSQL storage layer for Preheat:
//! connection pooling, data models, and per-entity repositories.

pub mod db;
pub mod models;
pub mod repository;

pub use db::{Database, DatabasePool};
pub use models::*;
pub use repository::*;
