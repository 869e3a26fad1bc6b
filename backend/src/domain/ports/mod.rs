//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports ([`UserDirectory`], [`PurchaseStore`]) expose strongly typed
//! errors so adapters map their failures into predictable variants. Driving
//! ports ([`PurchaseCommand`], [`PurchaseQuery`], [`UsersQuery`]) are the
//! in-process API inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod purchase_command;
mod purchase_query;
mod purchase_store;
mod user_directory;
mod users_query;

#[cfg(test)]
pub use purchase_command::MockPurchaseCommand;
pub use purchase_command::{
    CreatePurchaseOutcome, CreatePurchaseRequest, PurchaseCommand, UpdatePurchaseOutcome,
    UpdatePurchaseRequest,
};
#[cfg(test)]
pub use purchase_query::MockPurchaseQuery;
pub use purchase_query::PurchaseQuery;
pub use purchase_store::{PurchaseStore, PurchaseStoreError, PurchaseTransaction};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{UserDirectory, UserDirectoryError};
#[cfg(test)]
pub use users_query::MockUsersQuery;
pub use users_query::UsersQuery;
