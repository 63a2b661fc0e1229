//! Domain model (arguments, signatures, outcomes, errors, ids).

pub mod arg;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod signature;

pub use self::arg::{ArgType, ERROR_TYPE_TAG, TaskArg, TypedValue};
pub use self::errors::{DecodeError, InvokeError, PublishError};
pub use self::ids::{ConsumerId, DeliveryId};
pub use self::outcome::Outcome;
pub use self::signature::TaskSignature;
