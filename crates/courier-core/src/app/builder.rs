//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_tasks() で期待される task 名を登録
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば BuildError を返す
//!
//! The registry is frozen into an `Arc` by `build()`; nothing mutates it
//! afterwards.

use std::sync::Arc;

use crate::app::worker_group::WorkerGroup;
use crate::app::worker_loop::Worker;
use crate::config::{Config, ConfigError};
use crate::domain::{PublishError, TaskSignature};
use crate::impls::InMemoryBroker;
use crate::ports::{Broker, IdGenerator, Publisher, SystemClock, UlidGenerator};
use crate::typed::{HandlerRegistry, IntoHandler, RegistryError};

/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .config(Config::from_env()?)
///     .register("add", |a: i64, b: i64| -> Result<i64, String> { Ok(a + b) })?
///     .expect_tasks(&["add"])
///     .build()?;
/// app.send_task(TaskSignature::new("add").with_args([TaskArg::int(2), TaskArg::int(3)]))?;
/// app.launch().join().await;
/// ```
pub struct AppBuilder {
    registry: HandlerRegistry,
    expected_tasks: Option<Vec<String>>,
    config: Config,
    connection: Option<(Arc<dyn Broker>, Arc<dyn Publisher>)>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing task names: {0:?}. These tasks were expected but not registered.")]
    MissingTaskNames(Vec<String>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: HandlerRegistry::new(),
            expected_tasks: None,
            config: Config::default(),
            connection: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Use `broker` for both inbound deliveries and publish-back.
    /// Defaults to a fresh `InMemoryBroker`.
    pub fn broker<B: Broker + Publisher + 'static>(mut self, broker: Arc<B>) -> Self {
        self.connection = Some((broker.clone() as Arc<dyn Broker>, broker as Arc<dyn Publisher>));
        self
    }

    pub fn register<Args, H: IntoHandler<Args>>(
        mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register(name, handler)?;
        Ok(self)
    }

    pub fn expect_tasks(mut self, names: &[&str]) -> Self {
        self.expected_tasks = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        self.config.validate()?;

        if let Some(expected) = &self.expected_tasks {
            let registered = self.registry.registered_names();
            let missing: Vec<String> = expected
                .iter()
                .filter(|name| !registered.contains(*name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTaskNames(missing));
            }
        }

        let (broker, publisher) = self.connection.unwrap_or_else(|| {
            let broker = Arc::new(InMemoryBroker::new());
            (broker.clone() as Arc<dyn Broker>, broker as Arc<dyn Publisher>)
        });

        Ok(App {
            config: self.config,
            registry: Arc::new(self.registry),
            broker,
            publisher,
            ids: UlidGenerator::new(SystemClock),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Config, the frozen registry and the broker connection.
pub struct App {
    config: Config,
    registry: Arc<HandlerRegistry>,
    broker: Arc<dyn Broker>,
    publisher: Arc<dyn Publisher>,
    ids: UlidGenerator<SystemClock>,
}

impl App {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Publish a signature for some worker to pick up.
    pub fn send_task(&self, signature: TaskSignature) -> Result<(), PublishError> {
        let name = signature.name.clone();
        self.publisher.publish(signature)?;
        tracing::debug!(task = %name, "Sent task");
        Ok(())
    }

    /// A worker loop bound to this app's registry and publisher.
    pub fn worker(&self, consumer_tag: impl Into<String>) -> Worker {
        Worker::new(
            consumer_tag,
            Arc::clone(&self.registry),
            Arc::clone(&self.publisher),
        )
    }

    /// Start `config.concurrency` consumers. Join the returned group to wait
    /// until the broker closes.
    pub fn launch(&self) -> WorkerGroup {
        let consumer_tag = self
            .config
            .consumer_tag
            .clone()
            .unwrap_or_else(|| self.ids.generate_consumer_id().to_string());

        tracing::info!(
            consumer_tag = %consumer_tag,
            broker_url = %self.config.broker_url,
            exchange = %self.config.exchange,
            exchange_type = %self.config.exchange_type,
            default_queue = %self.config.default_queue,
            binding_key = %self.config.binding_key,
            concurrency = self.config.concurrency,
            registered = self.registry.len(),
            "Launching a worker"
        );

        let worker = Arc::new(self.worker(consumer_tag));
        WorkerGroup::spawn(self.config.concurrency, Arc::clone(&self.broker), worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskArg;
    use std::sync::Mutex;
    use std::time::Duration;

    fn add(a: i64, b: i64) -> Result<i64, String> {
        Ok(a + b)
    }

    #[test]
    fn test_build_success() {
        let app = AppBuilder::new()
            .register("add", add)
            .unwrap()
            .expect_tasks(&["add"])
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn test_build_missing_task_names() {
        let app = AppBuilder::new()
            .register("add", add)
            .unwrap()
            .expect_tasks(&["add", "log"])
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingTaskNames(missing)) if missing == vec!["log".to_string()]
        ));
    }

    #[test]
    fn test_build_no_expect_tasks() {
        let app = AppBuilder::new().register("add", add).unwrap().build();
        assert!(app.is_ok());
    }

    #[test]
    fn test_build_rejects_zero_concurrency() {
        let app = AppBuilder::new()
            .config(Config {
                concurrency: 0,
                ..Config::default()
            })
            .register("add", add)
            .unwrap()
            .build();
        assert!(matches!(
            app,
            Err(BuildError::Config(ConfigError::ZeroConcurrency))
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let result = AppBuilder::new()
            .register("add", add)
            .unwrap()
            .register("add", add);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn test_launch_runs_chain_until_broker_closes() {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = results.clone();
        let broker = Arc::new(InMemoryBroker::new());

        let app = AppBuilder::new()
            .config(Config {
                concurrency: 2,
                consumer_tag: Some("launch-test".into()),
                ..Config::default()
            })
            .broker(broker.clone())
            .register("add", add)
            .unwrap()
            .register("log", move |v: i64| -> Result<bool, String> {
                sink.lock().unwrap().push(v);
                Ok(true)
            })
            .unwrap()
            .build()
            .unwrap();

        app.send_task(
            TaskSignature::new("add")
                .with_args([TaskArg::int(2), TaskArg::int(3)])
                .on_success(TaskSignature::new("log")),
        )
        .unwrap();

        let group = app.launch();
        tokio::time::timeout(Duration::from_secs(5), async {
            while broker.acked() < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        broker.close();
        group.join().await;

        assert_eq!(*results.lock().unwrap(), vec![5]);
    }
}
