//! JSON records and optimistic updates over [`StorageEffects`]
//!
//! Records are written only by this crate, so a record that fails to
//! decode or encode is reported as `Internal`, never as a caller error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use warden_core::effects::{Expiry, StorageEffects};
use warden_core::{Result, WardenError};

/// Outcome of one mutation attempt
pub(crate) enum Update<T, R> {
    /// Write `value` if the record is unchanged since it was read
    Write { value: T, expiry: Expiry, output: R },
    /// Leave the record as is
    Skip(R),
}

/// Decode a stored record
pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::error!(key, error = %e, "stored record is unreadable");
        WardenError::internal(format!("stored record {key} is unreadable: {e}"))
    })
}

/// Read and decode a JSON record
pub(crate) async fn load<S, T>(storage: &S, key: &str) -> Result<Option<T>>
where
    S: StorageEffects + ?Sized,
    T: DeserializeOwned,
{
    storage
        .retrieve(key)
        .await?
        .map(|bytes| decode(key, &bytes))
        .transpose()
}

/// Encode a record for storage
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| WardenError::internal(format!("record could not be encoded: {e}")))
}

/// Read-modify-write `key` with compare-and-swap, retrying on conflict
///
/// `mutate` sees the current record (or `None`) and may run several times;
/// it must not have side effects outside its return value.
pub(crate) async fn update<S, T, R, F>(
    storage: &S,
    key: &str,
    max_attempts: u32,
    mut mutate: F,
) -> Result<R>
where
    S: StorageEffects + ?Sized,
    T: Serialize + DeserializeOwned,
    F: FnMut(Option<T>) -> Result<Update<T, R>>,
{
    for attempt in 1..=max_attempts {
        let current = storage.retrieve(key).await?;
        let decoded = current
            .as_deref()
            .map(|bytes| decode(key, bytes))
            .transpose()?;
        let (value, expiry, output) = match mutate(decoded)? {
            Update::Skip(output) => return Ok(output),
            Update::Write {
                value,
                expiry,
                output,
            } => (value, expiry, output),
        };
        if storage
            .compare_and_swap(key, current.as_deref(), encode(&value)?, expiry)
            .await?
        {
            return Ok(output);
        }
        tracing::debug!(key, attempt, "concurrent update, retrying");
    }
    tracing::warn!(key, max_attempts, "update abandoned after repeated conflicts");
    Err(WardenError::storage(format!(
        "could not update {key} after {max_attempts} attempts"
    )))
}
