//! Typed Argument Model.
//!
//! A `TaskArg` is what crosses the wire: a type tag and an encoded JSON value.
//! `decode` turns it into a `TypedValue`, refusing anything that does not fit
//! the tag exactly. `TypedValue::into_arg` goes the other way and is used when
//! results and errors are threaded into continuation arguments.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{DecodeError, InvokeError};

/// Tag reserved for errors propagated into `OnError` continuations.
pub const ERROR_TYPE_TAG: &str = "error";

/// Wire representation of one positional argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskArg {
    #[serde(rename = "Type")]
    pub type_tag: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

impl TaskArg {
    pub fn new(type_tag: impl Into<String>, value: Value) -> Self {
        Self {
            type_tag: type_tag.into(),
            value,
        }
    }

    pub fn bool(v: bool) -> Self {
        TypedValue::Bool(v).into_arg()
    }

    pub fn int(v: i64) -> Self {
        TypedValue::Int(v).into_arg()
    }

    pub fn uint(v: u64) -> Self {
        TypedValue::Uint(v).into_arg()
    }

    pub fn float64(v: f64) -> Self {
        TypedValue::Float64(v).into_arg()
    }

    pub fn string(v: impl Into<String>) -> Self {
        TypedValue::String(v.into()).into_arg()
    }

    /// Canonical encoding of a failure: the reserved tag plus the message.
    /// Structured error detail beyond the message is not carried.
    pub fn error(message: impl Into<String>) -> Self {
        TypedValue::Error(message.into()).into_arg()
    }

    pub fn decode(&self) -> Result<TypedValue, DecodeError> {
        decode(self)
    }
}

/// Every concrete type a handler parameter or result may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Error,
}

impl ArgType {
    pub fn tag(self) -> &'static str {
        match self {
            ArgType::Bool => "bool",
            ArgType::Int => "int",
            ArgType::Int8 => "int8",
            ArgType::Int16 => "int16",
            ArgType::Int32 => "int32",
            ArgType::Int64 => "int64",
            ArgType::Uint => "uint",
            ArgType::Uint8 => "uint8",
            ArgType::Uint16 => "uint16",
            ArgType::Uint32 => "uint32",
            ArgType::Uint64 => "uint64",
            ArgType::Float32 => "float32",
            ArgType::Float64 => "float64",
            ArgType::String => "string",
            ArgType::Error => ERROR_TYPE_TAG,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ArgType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "bool" => ArgType::Bool,
            "int" => ArgType::Int,
            "int8" => ArgType::Int8,
            "int16" => ArgType::Int16,
            "int32" => ArgType::Int32,
            "int64" => ArgType::Int64,
            "uint" => ArgType::Uint,
            "uint8" => ArgType::Uint8,
            "uint16" => ArgType::Uint16,
            "uint32" => ArgType::Uint32,
            "uint64" => ArgType::Uint64,
            "float32" => ArgType::Float32,
            "float64" => ArgType::Float64,
            "string" => ArgType::String,
            ERROR_TYPE_TAG => ArgType::Error,
            other => return Err(DecodeError::UnknownType(other.to_string())),
        };
        Ok(ty)
    }
}

/// A decoded, natively typed argument.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint(u64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Error(String),
}

impl TypedValue {
    pub fn arg_type(&self) -> ArgType {
        match self {
            TypedValue::Bool(_) => ArgType::Bool,
            TypedValue::Int(_) => ArgType::Int,
            TypedValue::Int8(_) => ArgType::Int8,
            TypedValue::Int16(_) => ArgType::Int16,
            TypedValue::Int32(_) => ArgType::Int32,
            TypedValue::Int64(_) => ArgType::Int64,
            TypedValue::Uint(_) => ArgType::Uint,
            TypedValue::Uint8(_) => ArgType::Uint8,
            TypedValue::Uint16(_) => ArgType::Uint16,
            TypedValue::Uint32(_) => ArgType::Uint32,
            TypedValue::Uint64(_) => ArgType::Uint64,
            TypedValue::Float32(_) => ArgType::Float32,
            TypedValue::Float64(_) => ArgType::Float64,
            TypedValue::String(_) => ArgType::String,
            TypedValue::Error(_) => ArgType::Error,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            TypedValue::Bool(v) => Value::from(*v),
            TypedValue::Int(v) | TypedValue::Int64(v) => Value::from(*v),
            TypedValue::Int8(v) => Value::from(*v),
            TypedValue::Int16(v) => Value::from(*v),
            TypedValue::Int32(v) => Value::from(*v),
            TypedValue::Uint(v) | TypedValue::Uint64(v) => Value::from(*v),
            TypedValue::Uint8(v) => Value::from(*v),
            TypedValue::Uint16(v) => Value::from(*v),
            TypedValue::Uint32(v) => Value::from(*v),
            // non-finite floats become null; see `ensure_encodable`
            TypedValue::Float32(v) => Value::from(*v),
            TypedValue::Float64(v) => Value::from(*v),
            TypedValue::String(v) | TypedValue::Error(v) => Value::from(v.as_str()),
        }
    }

    /// Fails for values with no wire form (NaN and infinite floats), which
    /// would otherwise encode as a `null` that never decodes again.
    pub fn ensure_encodable(&self) -> Result<(), InvokeError> {
        let finite = match self {
            TypedValue::Float32(v) => v.is_finite(),
            TypedValue::Float64(v) => v.is_finite(),
            _ => true,
        };
        if finite {
            Ok(())
        } else {
            Err(InvokeError::Unrepresentable(format!("{} {self}", self.arg_type())))
        }
    }

    /// Encode back into wire form under the value's own tag.
    pub fn into_arg(self) -> TaskArg {
        TaskArg::new(self.arg_type().tag(), self.to_json())
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::String(v) | TypedValue::Error(v) => f.write_str(v),
            TypedValue::Float32(v) => write!(f, "{v}"),
            TypedValue::Float64(v) => write!(f, "{v}"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Decode one wire argument. Never coerces between JSON kinds.
pub fn decode(arg: &TaskArg) -> Result<TypedValue, DecodeError> {
    let ty: ArgType = arg.type_tag.parse()?;
    let value = &arg.value;
    let tag = ty.tag();

    let decoded = match ty {
        ArgType::Bool => TypedValue::Bool(
            value
                .as_bool()
                .ok_or_else(|| DecodeError::invalid(tag, value, "expected a boolean"))?,
        ),
        ArgType::Int => TypedValue::Int(signed(tag, value)?),
        ArgType::Int64 => TypedValue::Int64(signed(tag, value)?),
        ArgType::Int8 => TypedValue::Int8(narrow(tag, value, signed(tag, value)?)?),
        ArgType::Int16 => TypedValue::Int16(narrow(tag, value, signed(tag, value)?)?),
        ArgType::Int32 => TypedValue::Int32(narrow(tag, value, signed(tag, value)?)?),
        ArgType::Uint => TypedValue::Uint(unsigned(tag, value)?),
        ArgType::Uint64 => TypedValue::Uint64(unsigned(tag, value)?),
        ArgType::Uint8 => TypedValue::Uint8(narrow(tag, value, unsigned(tag, value)?)?),
        ArgType::Uint16 => TypedValue::Uint16(narrow(tag, value, unsigned(tag, value)?)?),
        ArgType::Uint32 => TypedValue::Uint32(narrow(tag, value, unsigned(tag, value)?)?),
        ArgType::Float64 => TypedValue::Float64(float(tag, value)?),
        ArgType::Float32 => {
            let v = float(tag, value)?;
            if v.abs() > f64::from(f32::MAX) {
                return Err(DecodeError::invalid(tag, value, "out of range"));
            }
            TypedValue::Float32(v as f32)
        }
        ArgType::String => TypedValue::String(string(tag, value)?),
        ArgType::Error => TypedValue::Error(string(tag, value)?),
    };
    Ok(decoded)
}

/// Decode every argument in order, stopping at the first failure.
pub fn decode_all(args: &[TaskArg]) -> Result<Vec<TypedValue>, DecodeError> {
    args.iter().map(decode).collect()
}

fn signed(tag: &str, value: &Value) -> Result<i64, DecodeError> {
    value
        .as_i64()
        .ok_or_else(|| DecodeError::invalid(tag, value, "expected an integer"))
}

fn unsigned(tag: &str, value: &Value) -> Result<u64, DecodeError> {
    value
        .as_u64()
        .ok_or_else(|| DecodeError::invalid(tag, value, "expected a non-negative integer"))
}

fn narrow<W, N: TryFrom<W>>(tag: &str, value: &Value, wide: W) -> Result<N, DecodeError> {
    N::try_from(wide).map_err(|_| DecodeError::invalid(tag, value, "out of range"))
}

fn float(tag: &str, value: &Value) -> Result<f64, DecodeError> {
    value
        .as_f64()
        .ok_or_else(|| DecodeError::invalid(tag, value, "expected a number"))
}

fn string(tag: &str, value: &Value) -> Result<String, DecodeError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| DecodeError::invalid(tag, value, "expected a string"))
}
