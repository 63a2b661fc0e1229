//! Typed - 型付き Handler API
//!
//! # 二層構造
//! - **表層（Typed）**: closures over native Rust types, wrapped by `IntoHandler`
//! - **内部（Dyn）**: `Handler` - object-safe, type erasure

pub mod handler;
pub mod registry;

pub use self::handler::{
    ErrorMessage, Handler, Int64, IntoHandler, NativeArg, Uint64, check_args,
};
pub use self::registry::{HandlerRegistry, RegistryError};
