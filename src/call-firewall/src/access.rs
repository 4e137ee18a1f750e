//! Role-based access control shared by the dispatcher and every configurable policy.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{Address, B256};
use tracing::info;

use crate::{constants::DEFAULT_ADMIN_ROLE, errors::AccessError};

/// Role membership table. Every role is administered by [`DEFAULT_ADMIN_ROLE`].
#[derive(Clone, Debug, Default)]
pub struct AccessControl {
    roles: HashMap<B256, HashSet<Address>>,
}

impl AccessControl {
    /// Table with `admin` holding the default admin role.
    pub fn new(admin: Address) -> Self {
        let mut access = Self::default();
        access.roles.entry(DEFAULT_ADMIN_ROLE).or_default().insert(admin);
        access
    }

    pub fn has_role(&self, role: B256, account: Address) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|members| members.contains(&account))
    }

    pub fn check_role(&self, role: B256, account: Address) -> Result<(), AccessError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(AccessError::MissingRole { account, role })
        }
    }

    pub fn grant_role(&mut self, caller: Address, role: B256, account: Address) -> Result<(), AccessError> {
        self.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        if self.roles.entry(role).or_default().insert(account) {
            info!(%role, %account, %caller, "role granted");
        }
        Ok(())
    }

    pub fn revoke_role(&mut self, caller: Address, role: B256, account: Address) -> Result<(), AccessError> {
        self.check_role(DEFAULT_ADMIN_ROLE, caller)?;
        self.remove(role, account);
        Ok(())
    }

    pub fn renounce_role(&mut self, caller: Address, role: B256, account: Address) -> Result<(), AccessError> {
        if caller != account {
            return Err(AccessError::RenounceForOther);
        }
        self.remove(role, account);
        Ok(())
    }

    fn remove(&mut self, role: B256, account: Address) {
        if let Some(members) = self.roles.get_mut(&role) {
            if members.remove(&account) {
                info!(%role, %account, "role revoked");
            }
        }
    }
}
