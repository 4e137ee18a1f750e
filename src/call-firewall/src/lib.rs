//! Call-interception firewall for protected contracts.
//!
//! A protected consumer routes each guarded function through the [`Firewall`], which fans the
//! call out to the policies configured for the consumer (globally and per selector). Any policy
//! can veto the call before or after the protected logic runs; a veto reverts the transaction.
//!
//! The engine is host agnostic: chain state is read through [`host::Host`], and
//! [`transaction::Transaction`] provides the all-or-nothing commit a real chain gives for free.

pub mod access;
pub mod constants;
pub mod context;
pub mod errors;
pub mod firewall;
pub mod host;
pub mod interfaces;
pub mod invariants;
pub mod policies;
pub mod transaction;
pub mod utils;

pub use access::AccessControl;
pub use context::{CallContext, ExecutionContext};
pub use errors::{AccessError, DecodeError, FirewallError, HostError, PolicyError};
pub use firewall::Firewall;
pub use host::{Host, HostMut, MockHost};
pub use policies::{Policy, PolicyEnv, SignedApproval};
pub use transaction::{Call, Transaction};
