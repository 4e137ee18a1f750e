//! Atomic transaction runner and the consumer-side guard.
//!
//! [`Transaction::execute`] gives a closure exclusive access to the firewall and host for one
//! transaction. Any error restores both to their state at transaction start, so partial writes
//! from earlier hooks (consumed approvals, advanced nonces, snapshots) never persist. Guarded calls
//! inside it revert the same way at their own frame.

use alloy_primitives::{Address, Bytes, U256};
use tracing::{debug, warn};

use crate::{
    context::{CallContext, ExecutionContext},
    errors::FirewallError,
    firewall::Firewall,
    host::HostMut,
};

/// A call into a protected consumer, before the transaction origin is attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub consumer: Address,
    pub sender: Address,
    pub data: Bytes,
    pub value: U256,
}

impl Call {
    pub fn new(consumer: Address, sender: Address, data: impl Into<Bytes>) -> Self {
        Self {
            consumer,
            sender,
            data: data.into(),
            value: U256::ZERO,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

pub struct Transaction<'a, H: HostMut> {
    firewall: &'a mut Firewall,
    host: &'a mut H,
    ctx: ExecutionContext,
}

impl<'a, H: HostMut + Clone> Transaction<'a, H> {
    /// Run `f` as one all-or-nothing transaction sent by `origin`.
    pub fn execute<T, F>(
        firewall: &'a mut Firewall,
        host: &'a mut H,
        origin: Address,
        f: F,
    ) -> Result<T, FirewallError>
    where
        F: FnOnce(&mut Transaction<'a, H>) -> Result<T, FirewallError>,
    {
        let firewall_snapshot = firewall.clone();
        let host_snapshot = host.clone();
        let mut tx = Transaction {
            firewall,
            host,
            ctx: ExecutionContext::new(origin),
        };
        match f(&mut tx) {
            Ok(out) => Ok(out),
            Err(err) => {
                warn!(%origin, error = %err, "transaction reverted");
                *tx.firewall = firewall_snapshot;
                *tx.host = host_snapshot;
                Err(err)
            }
        }
    }
}

impl<'a, H: HostMut> Transaction<'a, H> {
    pub fn origin(&self) -> Address {
        self.ctx.origin()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn host(&self) -> &H {
        self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.host
    }

    pub fn firewall(&self) -> &Firewall {
        self.firewall
    }

    pub fn firewall_mut(&mut self) -> &mut Firewall {
        self.firewall
    }
}

impl<'a, H: HostMut + Clone> Transaction<'a, H> {
    /// Consumer shim around a protected function: credits the attached value, runs the
    /// firewall pre hook, `logic`, then the post hook. Nested guarded calls share this
    /// transaction's execution context.
    ///
    /// Each guarded call is its own revert frame: on error, firewall and host state are restored
    /// together with the execution context, so a caller that swallows the error keeps neither
    /// the frame's depth and selector nor its policy side effects.
    pub fn guarded_call<T>(
        &mut self,
        call: Call,
        logic: impl FnOnce(&mut Self) -> Result<T, FirewallError>,
    ) -> Result<T, FirewallError> {
        let firewall_snapshot = self.firewall.clone();
        let host_snapshot = self.host.clone();
        let ctx_snapshot = self.ctx.clone();
        match self.run_frame(call, logic) {
            Ok(out) => Ok(out),
            Err(err) => {
                debug!(error = %err, "guarded call reverted");
                *self.firewall = firewall_snapshot;
                *self.host = host_snapshot;
                self.ctx = ctx_snapshot;
                Err(err)
            }
        }
    }

    fn run_frame<T>(
        &mut self,
        call: Call,
        logic: impl FnOnce(&mut Self) -> Result<T, FirewallError>,
    ) -> Result<T, FirewallError> {
        let call = CallContext {
            consumer: call.consumer,
            sender: call.sender,
            origin: self.ctx.origin(),
            data: call.data,
            value: call.value,
        };
        if !call.value.is_zero() {
            self.host.transfer_native(call.sender, call.consumer, call.value)?;
        }

        self.firewall.pre_execution(&mut self.ctx, &*self.host, &call)?;
        let out = logic(self)?;
        self.firewall.post_execution(&mut self.ctx, &*self.host, &call)?;
        debug!(consumer = %call.consumer, selector = %call.selector(), "guarded call completed");
        Ok(out)
    }
}
