//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **Invoker**: 名前解決 + 型チェック付きの呼び出し
//! - **continuation**: success / error continuation の生成と publish
//! - **Worker**: 1 メッセージの decode → invoke → continue
//! - **WorkerGroup**: broker から並行に consume する tokio タスク群
//! - **AppBuilder / App**: 起動時のワイヤリング

pub mod builder;
pub mod continuation;
pub mod invoker;
pub mod worker_group;
pub mod worker_loop;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::continuation::{finalize, publish_all};
pub use self::invoker::Invoker;
pub use self::worker_group::WorkerGroup;
pub use self::worker_loop::{DropReason, Processed, Worker};
