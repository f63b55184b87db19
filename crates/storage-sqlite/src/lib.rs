//! SQLite storage implementation for QueryStream.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the store trait defined in `querystream-core` and contains:
//! - Database connection pooling and management
//! - Embedded Diesel migrations
//! - The single writer actor that serializes all writes
//! - The `message_fragments` repository
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//!
//! ```text
//! core (domain)          ai (streaming)
//!       │                      │
//!       └──────────┬───────────┘
//!                  │ ChunkStoreTrait
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod message_fragments;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use message_fragments::FragmentRepository;

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

// Re-export from querystream-core for convenience
pub use querystream_core::errors::{DatabaseError, Error, Result};
