use std::sync::Arc;

use textmatch_core::error::{Error, Result};
use textmatch_core::traits::UnitIndex;
use textmatch_core::types::{Provisioned, UnitSchema};

use crate::retry::RetryPolicy;

/// Startup check: one ping, bounded by the call timeout, no retries.
pub async fn ping(index: &Arc<dyn UnitIndex>, retry: &RetryPolicy) -> Result<()> {
    let index = Arc::clone(index);
    let alive = retry.once().run("ping", move || Ok(index.ping())).await?;
    if alive { Ok(()) } else { Err(Error::BackendUnavailable("ping failed".into())) }
}

/// Idempotent index creation. Any failure is reported as unavailability so the
/// process refuses to start.
pub async fn ensure_index(index: &Arc<dyn UnitIndex>, name: &str, schema: &UnitSchema, retry: &RetryPolicy) -> Result<Provisioned> {
    let index = Arc::clone(index);
    let (name, schema) = (name.to_string(), schema.clone());
    retry
        .once()
        .run("ensure_index", move || index.ensure_index(&name, &schema))
        .await
        .map_err(|e| match e {
            Error::BackendUnavailable(cause) => Error::BackendUnavailable(cause),
            other => Error::BackendUnavailable(format!("ensure_index failed: {other}")),
        })
}
