//! Admin secret check shared by every privileged operation.
//!
//! There is no session: each privileged call carries the password again.

use metrics::counter;
use tracing::warn;

use crate::config::SecretsHandle;
use crate::error::CanteenError;
use crate::metrics::ADMIN_AUTH_FAILURES;

/// `Ok(())` iff `supplied` equals the stored admin password exactly.
pub fn check(secrets: &SecretsHandle, supplied: &str) -> Result<(), CanteenError> {
    if secrets.admin_matches(supplied) {
        return Ok(());
    }
    counter!(ADMIN_AUTH_FAILURES).increment(1);
    warn!(target: "admin", "rejected admin password");
    Err(CanteenError::Unauthorized)
}
