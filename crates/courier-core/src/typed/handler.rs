//! Handler trait - 名前で呼び出される処理の定義
//!
//! # 二層構造
//! - **表層**: plain closures `Fn(A, B, ..) -> Result<R, E>` with native Rust
//!   parameter types.
//! - **内部**: `Handler`, an object-safe trait taking `Vec<TypedValue>`. The
//!   `IntoHandler` adapters erase the closure type and record its parameter
//!   list, so the invocation path only compares tags.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::arg::{ArgType, TypedValue};
use crate::domain::errors::InvokeError;

/// Object-safe handler stored in the registry.
///
/// Implement this directly when a handler needs to inspect arguments itself;
/// otherwise register a closure and let `IntoHandler` build the adapter.
pub trait Handler: Send + Sync {
    /// Declared parameter types, in positional order.
    fn params(&self) -> &[ArgType];

    /// Run with arguments that already passed `check_args`.
    fn call(&self, args: Vec<TypedValue>) -> Result<TypedValue, InvokeError>;
}

/// Compare decoded arguments against a declared parameter list.
pub fn check_args(params: &[ArgType], args: &[TypedValue]) -> Result<(), InvokeError> {
    if params.len() != args.len() {
        return Err(InvokeError::ArgumentMismatch(format!(
            "expected {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }
    for (i, (param, arg)) in params.iter().zip(args).enumerate() {
        if *param != arg.arg_type() {
            return Err(InvokeError::ArgumentMismatch(format!(
                "argument {i}: expected {param}, got {}",
                arg.arg_type()
            )));
        }
    }
    Ok(())
}

/// A Rust type that has a wire tag.
pub trait NativeArg: Sized + Send + 'static {
    const TYPE: ArgType;

    fn from_value(value: TypedValue) -> Option<Self>;

    fn into_value(self) -> TypedValue;
}

macro_rules! native_arg {
    ($($native:ty => $variant:ident),* $(,)?) => {
        $(
            impl NativeArg for $native {
                const TYPE: ArgType = ArgType::$variant;

                fn from_value(value: TypedValue) -> Option<Self> {
                    match value {
                        TypedValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                fn into_value(self) -> TypedValue {
                    TypedValue::$variant(self)
                }
            }
        )*
    };
}

native_arg! {
    bool => Bool,
    i64 => Int,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    u64 => Uint,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    f32 => Float32,
    f64 => Float64,
    String => String,
}

/// `int64` on the wire. Plain `i64` maps to `int`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int64(pub i64);

/// `uint64` on the wire. Plain `u64` maps to `uint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uint64(pub u64);

/// The error an `OnError` continuation receives as its first argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage(pub String);

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! native_newtype {
    ($($native:ident => $variant:ident),* $(,)?) => {
        $(
            impl NativeArg for $native {
                const TYPE: ArgType = ArgType::$variant;

                fn from_value(value: TypedValue) -> Option<Self> {
                    match value {
                        TypedValue::$variant(v) => Some($native(v)),
                        _ => None,
                    }
                }

                fn into_value(self) -> TypedValue {
                    TypedValue::$variant(self.0)
                }
            }
        )*
    };
}

native_newtype! {
    Int64 => Int64,
    Uint64 => Uint64,
    ErrorMessage => Error,
}

/// Conversion from a concrete callable into a registry entry.
///
/// `Args` is the parameter tuple; it only exists so closures of different
/// arity get distinct impls.
pub trait IntoHandler<Args>: Send + Sync + 'static {
    fn into_handler(self) -> Arc<dyn Handler>;
}

struct FnHandler<F, Args> {
    f: F,
    params: Vec<ArgType>,
    _marker: PhantomData<fn() -> Args>,
}

macro_rules! fn_handler {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, E, $($ty,)*> Handler for FnHandler<F, ($($ty,)*)>
        where
            F: Fn($($ty),*) -> Result<R, E> + Send + Sync + 'static,
            R: NativeArg,
            E: fmt::Display,
            $($ty: NativeArg,)*
        {
            fn params(&self) -> &[ArgType] {
                &self.params
            }

            fn call(&self, args: Vec<TypedValue>) -> Result<TypedValue, InvokeError> {
                check_args(&self.params, &args)?;
                let mut args = args.into_iter();
                $(
                    let $ty = args.next().and_then($ty::from_value).ok_or_else(|| {
                        InvokeError::ArgumentMismatch(format!("expected {}", $ty::TYPE))
                    })?;
                )*
                (self.f)($($ty),*)
                    .map(NativeArg::into_value)
                    .map_err(|e| InvokeError::Handler(e.to_string()))
            }
        }

        impl<F, R, E, $($ty,)*> IntoHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Result<R, E> + Send + Sync + 'static,
            R: NativeArg,
            E: fmt::Display + 'static,
            $($ty: NativeArg,)*
        {
            fn into_handler(self) -> Arc<dyn Handler> {
                Arc::new(FnHandler::<F, ($($ty,)*)> {
                    f: self,
                    params: vec![$($ty::TYPE),*],
                    _marker: PhantomData,
                })
            }
        }
    };
}

fn_handler!();
fn_handler!(A1);
fn_handler!(A1, A2);
fn_handler!(A1, A2, A3);
fn_handler!(A1, A2, A3, A4);
fn_handler!(A1, A2, A3, A4, A5);
