//! Worker Loop - 1 メッセージごとの処理
//!
//! # フロー
//! 1. envelope を TaskSignature に decode（失敗したら log して破棄）
//! 2. Invoker で handler を実行 → Outcome
//! 3. Continuation Engine で次のシグネチャを生成
//! 4. Publisher に 1 件ずつ publish
//!
//! No state survives a message. Continuations are published, never run inline.

use std::sync::Arc;

use crate::app::continuation::{finalize, publish_all};
use crate::app::invoker::Invoker;
use crate::domain::{DecodeError, InvokeError, Outcome, PublishError, TaskSignature};
use crate::ports::Publisher;
use crate::typed::HandlerRegistry;

/// Why a message was dropped without firing any continuation.
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    Decode(DecodeError),
    NotRegistered(String),
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    Dropped(DropReason),
    Succeeded { published: usize },
    Failed { published: usize },
}

pub struct Worker {
    consumer_tag: String,
    invoker: Invoker,
    publisher: Arc<dyn Publisher>,
}

impl Worker {
    pub fn new(
        consumer_tag: impl Into<String>,
        registry: Arc<HandlerRegistry>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            consumer_tag: consumer_tag.into(),
            invoker: Invoker::new(registry),
            publisher,
        }
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// Handle one raw envelope. Only publish failures are returned as errors;
    /// decode and lookup failures are logged and reported as `Dropped`.
    pub fn on_message(&self, body: &[u8]) -> Result<Processed, PublishError> {
        match TaskSignature::decode(body) {
            Ok(signature) => self.process(signature),
            Err(e) => {
                tracing::warn!(consumer_tag = %self.consumer_tag, error = %e, "Dropping undecodable message");
                Ok(Processed::Dropped(DropReason::Decode(e)))
            }
        }
    }

    /// Invoke and continue an already decoded signature.
    pub fn process(&self, signature: TaskSignature) -> Result<Processed, PublishError> {
        let name = signature.name.as_str();
        tracing::debug!(consumer_tag = %self.consumer_tag, task = %name, "Started processing");

        let outcome = match self.invoker.invoke(name, &signature.args) {
            Err(InvokeError::NotRegistered(_)) => {
                tracing::warn!(consumer_tag = %self.consumer_tag, task = %name, "Task not registered, dropping");
                return Ok(Processed::Dropped(DropReason::NotRegistered(name.to_string())));
            }
            Err(InvokeError::Decode(e)) => {
                tracing::warn!(consumer_tag = %self.consumer_tag, task = %name, error = %e, "Undecodable arguments, dropping");
                return Ok(Processed::Dropped(DropReason::Decode(e)));
            }
            result => Outcome::from(result),
        };

        match &outcome {
            Outcome::Success(value) => {
                tracing::info!(consumer_tag = %self.consumer_tag, task = %name, result = %value, "Finished processing");
            }
            Outcome::Failure(e) => {
                tracing::warn!(consumer_tag = %self.consumer_tag, task = %name, error = %e, "Failed processing");
            }
        }

        let published = publish_all(&*self.publisher, finalize(&signature, &outcome))?;
        Ok(if outcome.is_success() {
            Processed::Succeeded { published }
        } else {
            Processed::Failed { published }
        })
    }
}
