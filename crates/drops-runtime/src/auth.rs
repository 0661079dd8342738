//! Caller authorization.

use drops_core::{AccountId, DropsConfig, DropsError, Result};

/// Require that `caller` acts for `principal`.
pub fn require_auth(caller: &AccountId, principal: &AccountId) -> Result<()> {
    if caller != principal {
        return Err(DropsError::Unauthorized {
            caller: caller.clone(),
            required: principal.clone(),
        });
    }
    Ok(())
}

/// Require the system account's authority.
pub fn require_admin(config: &DropsConfig, caller: &AccountId) -> Result<()> {
    require_auth(caller, &config.contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drops_core::ErrorKind;

    #[test]
    fn only_the_contract_is_admin() {
        let config = DropsConfig::default();
        assert!(require_admin(&config, &config.contract).is_ok());
        let err = require_admin(&config, &"alice".into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
}
