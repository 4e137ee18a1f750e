//! Policy contract and the built-in policy catalogue.
//!
//! A policy is a pair of hooks run around every guarded call of a consumer. `pre_execution`
//! sees the call before the protected logic runs and `post_execution` after it returns.
//! Either hook rejects the call by returning an error, which reverts the whole transaction.

use std::{any::Any, fmt};

use crate::{context::CallContext, context::ExecutionContext, errors::PolicyError, host::Host};

pub mod admin_call;
pub mod allowlist;
pub mod approvals;
pub mod approved_calls;
pub mod approved_calls_bundle;
pub mod approved_calls_with_signature;
pub mod approved_vectors;
pub mod approved_vectors_or_approved_calls;
pub mod balance_change;
pub mod combined_policies;
pub mod forbidden_methods;
pub mod non_reentrant;
pub mod only_eoa;
pub mod private_invariants;

pub use admin_call::AdminCallPolicy;
pub use allowlist::AllowlistPolicy;
pub use approvals::SignedApproval;
pub use approved_calls::ApprovedCallsPolicy;
pub use approved_calls_bundle::ApprovedCallsBundlePolicy;
pub use approved_calls_with_signature::ApprovedCallsWithSignaturePolicy;
pub use approved_vectors::ApprovedVectorsPolicy;
pub use approved_vectors_or_approved_calls::ApprovedVectorsOrApprovedCallsPolicy;
pub use balance_change::BalanceChangePolicy;
pub use combined_policies::CombinedPoliciesPolicy;
pub use forbidden_methods::ForbiddenMethodsPolicy;
pub use non_reentrant::NonReentrantPolicy;
pub use only_eoa::OnlyEoaPolicy;
pub use private_invariants::PrivateInvariantsPolicy;

/// Read-only view handed to hooks.
#[derive(Clone, Copy)]
pub struct PolicyEnv<'a> {
    pub host: &'a dyn Host,
    pub ctx: &'a ExecutionContext,
}

impl<'a> PolicyEnv<'a> {
    pub fn new(host: &'a dyn Host, ctx: &'a ExecutionContext) -> Self {
        Self { host, ctx }
    }
}

pub trait Policy: PolicyObject + fmt::Debug {
    /// Name used as the prefix of rejection reasons and in logs.
    fn name(&self) -> &'static str;

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError>;

    fn post_execution(&mut self, _env: PolicyEnv<'_>, _call: &CallContext) -> Result<(), PolicyError> {
        Ok(())
    }
}

/// Object-safety plumbing for boxed policies: cloning for transaction snapshots and
/// downcasting for typed administration.
pub trait PolicyObject {
    fn clone_box(&self) -> Box<dyn Policy>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> PolicyObject for T
where
    T: Policy + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn Policy> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn Policy> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl dyn Policy {
    pub fn downcast_ref<T: Policy + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Policy + 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}
