//! Catalog database layer
//!
//! PostgreSQL repositories built on sqlx. Every repository owns a cloned `PgPool`;
//! methods that must join a larger unit of work take a `&mut PgConnection` instead.

pub mod db;

pub use db::*;
