use super::{Policy, PolicyEnv};
use crate::{context::CallContext, errors::PolicyError};

/// Rejects a guarded call into a consumer that already has one open in this transaction.
#[derive(Clone, Debug, Default)]
pub struct NonReentrantPolicy;

impl Policy for NonReentrantPolicy {
    fn name(&self) -> &'static str {
        "NonReentrantPolicy"
    }

    fn pre_execution(&mut self, env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        if env.ctx.depth(call.consumer) > 1 {
            return Err(PolicyError::Reentrant);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::MockHost,
        policies::testing::{call, entered, CONSUMER, USER},
    };

    #[test]
    fn nested_entry_rejected() {
        let host = MockHost::new();
        let c = call(USER, &[1, 2, 3, 4], 0);
        let mut ctx = entered(&c);
        NonReentrantPolicy.pre_execution(PolicyEnv::new(&host, &ctx), &c).unwrap();

        ctx.enter(CONSUMER, c.selector());
        assert_eq!(
            NonReentrantPolicy.pre_execution(PolicyEnv::new(&host, &ctx), &c),
            Err(PolicyError::Reentrant)
        );
    }
}
