//! SimpleFIN bridge access: setup-token claiming, Basic-Auth transport and
//! the accounts endpoint.

pub mod client;
pub mod model;
pub mod setup_token;
pub mod transport;

pub use client::{ClientError, GetAccountsOptions, SimpleFinClient};
pub use model::{Account, AccountSet, Organization, Transaction};
pub use setup_token::{AccessCredential, SetupTokenError, SetupTokenResolver};
pub use transport::{BasicAuthTransport, RequestSender, TransportError};
