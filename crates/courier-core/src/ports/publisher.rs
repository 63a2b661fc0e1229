//! Publisher port - continuation の再投入先
//!
//! Synchronous by contract: the worker loop runs decode, invoke, finalize and
//! publish as one sequence without suspension points.

use crate::domain::{PublishError, TaskSignature};

/// Hands a derived signature back to the broker for future consumption.
///
/// One call per signature. Implementations must not retry on the caller's
/// behalf; a failure is returned as-is.
pub trait Publisher: Send + Sync {
    fn publish(&self, signature: TaskSignature) -> Result<(), PublishError>;
}
