use super::{Policy, PolicyEnv};
use crate::{context::CallContext, errors::PolicyError};

/// Only the transaction origin itself may call the consumer; contract intermediaries are rejected.
#[derive(Clone, Debug, Default)]
pub struct OnlyEoaPolicy;

impl Policy for OnlyEoaPolicy {
    fn name(&self) -> &'static str {
        "OnlyEOAPolicy"
    }

    fn pre_execution(&mut self, _env: PolicyEnv<'_>, call: &CallContext) -> Result<(), PolicyError> {
        if call.sender != call.origin {
            return Err(PolicyError::OnlyEoa);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::MockHost,
        policies::testing::{call, entered, OTHER, USER},
    };

    #[test]
    fn intermediary_rejected() {
        let host = MockHost::new();
        let direct = call(USER, &[1, 2, 3, 4], 0);
        OnlyEoaPolicy
            .pre_execution(PolicyEnv::new(&host, &entered(&direct)), &direct)
            .unwrap();

        let relayed = CallContext { sender: OTHER, ..direct };
        assert_eq!(
            OnlyEoaPolicy.pre_execution(PolicyEnv::new(&host, &entered(&relayed)), &relayed),
            Err(PolicyError::OnlyEoa)
        );
    }
}
