//! courier-core
//!
//! Execution core of a task-queue worker: resolve a serialized
//! `TaskSignature` to a registered handler, invoke it with type-checked
//! arguments, and publish the success / error continuations it declares.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（arg, signature, outcome, errors, ids）
//! - **typed**: 型付き Handler API（Handler trait, IntoHandler, HandlerRegistry）
//! - **app**: Invoker, continuation engine, worker loop, worker group, builder
//! - **ports**: 抽象化レイヤー（Publisher, Broker, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryBroker）
//! - **config** / **observability**: settings and tracing setup

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use app::{App, AppBuilder, Processed, Worker, WorkerGroup};
pub use config::Config;
pub use domain::{Outcome, TaskArg, TaskSignature, TypedValue};
pub use typed::{ErrorMessage, Handler, HandlerRegistry};
