//! Shared HTTP adapter state.
//!
//! Handlers receive this via `actix_web::web::Data` and depend only on the
//! driving ports, so they can be tested against mocks without I/O.

use std::sync::Arc;

use crate::domain::ports::{PurchaseCommand, PurchaseQuery, UsersQuery};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub purchases: Arc<dyn PurchaseCommand>,
    pub purchases_query: Arc<dyn PurchaseQuery>,
    pub users: Arc<dyn UsersQuery>,
}

impl HttpState {
    /// Bundle the driving ports.
    ///
    /// A single service usually implements all three, so callers pass clones
    /// of one `Arc`.
    pub fn new(
        purchases: Arc<dyn PurchaseCommand>,
        purchases_query: Arc<dyn PurchaseQuery>,
        users: Arc<dyn UsersQuery>,
    ) -> Self {
        Self {
            purchases,
            purchases_query,
            users,
        }
    }
}
