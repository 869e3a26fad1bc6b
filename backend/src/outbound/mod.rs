//! Outbound adapters implementing the ledger's driven ports.
//!
//! - **persistence**: PostgreSQL-backed user directory and purchase store
//!   using Diesel.
//!
//! Adapters convert between domain types and storage representations and
//! contain no business logic.

pub mod persistence;
