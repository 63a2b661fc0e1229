//! Impls - ports の実装（開発用・テスト用）
//!
//! - **InMemoryBroker**: 開発用のブローカー（Publisher + Broker）
//!
//! Production brokers (AMQP etc.) live in their own crates and implement the
//! same two ports.

pub mod inmem_broker;

pub use self::inmem_broker::InMemoryBroker;
