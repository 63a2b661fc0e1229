//! Outcome of one invocation.
//!
//! Exactly one of result / error holds; there is no partial success.

use super::arg::{TaskArg, TypedValue};
use super::errors::InvokeError;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(TypedValue),
    Failure(InvokeError),
}

impl Outcome {
    pub fn success(value: TypedValue) -> Self {
        Outcome::Success(value)
    }

    pub fn failure(error: InvokeError) -> Self {
        Outcome::Failure(error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The argument this outcome contributes to a continuation:
    /// the result under its native tag, or the error message under the
    /// reserved error tag.
    pub fn to_arg(&self) -> TaskArg {
        match self {
            Outcome::Success(value) => value.clone().into_arg(),
            Outcome::Failure(error) => TaskArg::error(error.to_string()),
        }
    }
}

impl From<Result<TypedValue, InvokeError>> for Outcome {
    fn from(result: Result<TypedValue, InvokeError>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::Failure(error),
        }
    }
}
