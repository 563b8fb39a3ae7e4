//! # Mystery Privilege Gate
//!
//! A visitor who knows the shared mystery code may flag their ratings as
//! mystery votes, which weigh 3 in the summary. The server does not remember
//! who verified: the flag on each submission is taken as sent.

use metrics::counter;
use tracing::info;

use crate::admin;
use crate::config::SecretsHandle;
use crate::error::CanteenError;
use crate::metrics::MYSTERY_VERIFY;
use crate::store::RecordStore;

/// Exact match against the current code.
pub fn verify(secrets: &SecretsHandle, code: &str) -> Result<(), CanteenError> {
    if secrets.mystery_matches(code) {
        counter!(MYSTERY_VERIFY, "outcome" => "granted").increment(1);
        Ok(())
    } else {
        counter!(MYSTERY_VERIFY, "outcome" => "denied").increment(1);
        Err(CanteenError::InvalidCode)
    }
}

/// Replace the code. No format rules apply to `new_code`.
pub async fn set_code(
    store: &RecordStore,
    secrets: &SecretsHandle,
    admin_secret: &str,
    new_code: &str,
) -> Result<(), CanteenError> {
    admin::check(secrets, admin_secret)?;
    secrets.store_mystery_code(store, new_code).await?;
    info!(target: "mystery", "mystery code changed");
    Ok(())
}

pub fn get_code(secrets: &SecretsHandle, admin_secret: &str) -> Result<String, CanteenError> {
    admin::check(secrets, admin_secret)?;
    Ok(secrets.mystery_code())
}
