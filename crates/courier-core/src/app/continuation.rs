//! Continuation Engine.
//!
//! Derives the next generation of signatures from a finished one:
//! - failure: every `OnError` template gets the error as argument 0,
//!   regardless of `Immutable`.
//! - success: every `OnSuccess` template gets the result as argument 0 unless
//!   the origin signature is immutable.
//!
//! Templates are never modified; each derived signature is a fresh value.

use crate::domain::{Outcome, PublishError, TaskSignature};
use crate::ports::Publisher;

/// Build the continuations to publish, in list order.
pub fn finalize(signature: &TaskSignature, outcome: &Outcome) -> Vec<TaskSignature> {
    match outcome {
        Outcome::Failure(_) => {
            let error_arg = outcome.to_arg();
            signature
                .on_error
                .iter()
                .map(|c| c.with_prepended(error_arg.clone()))
                .collect()
        }
        Outcome::Success(_) if signature.immutable => signature.on_success.clone(),
        Outcome::Success(_) => {
            let result_arg = outcome.to_arg();
            signature
                .on_success
                .iter()
                .map(|c| c.with_prepended(result_arg.clone()))
                .collect()
        }
    }
}

/// Publish each signature exactly once, in order. Stops at the first failure
/// and returns it; nothing is retried. Returns the number published.
pub fn publish_all<P: Publisher + ?Sized>(
    publisher: &P,
    continuations: Vec<TaskSignature>,
) -> Result<usize, PublishError> {
    let mut published = 0;
    for continuation in continuations {
        let name = continuation.name.clone();
        publisher.publish(continuation).inspect_err(|e| {
            tracing::error!(task = %name, error = %e, "Failed to publish continuation");
        })?;
        published += 1;
    }
    Ok(published)
}
