//! Shared-expense ledger backend.
//!
//! Hexagonal layout: [`domain`] holds the ledger rules and ports,
//! [`outbound`] the PostgreSQL adapters and [`inbound`] the REST surface.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
