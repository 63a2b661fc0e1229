use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::time::{Duration, sleep, timeout};

use courier_core::domain::{TaskArg, TaskSignature};
use courier_core::impls::InMemoryBroker;
use courier_core::typed::ErrorMessage;
use courier_core::{AppBuilder, Config, observability};

/// 最初の n 回だけ失敗する backup タスク
struct FlakyBackup {
    remaining_failures: AtomicU32,
}

impl FlakyBackup {
    fn new(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
        }
    }

    fn run(&self, path: String) -> Result<bool, String> {
        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(format!("backup of {path} failed (left={left})"));
        }
        println!("backed up {path}");
        Ok(true)
    }
}

fn samples() -> Vec<TaskSignature> {
    vec![
        // (A) 結果を次のタスクの先頭引数に渡す
        TaskSignature::new("add")
            .with_args([TaskArg::int(2), TaskArg::int(3)])
            .on_success(TaskSignature::new("log")),
        // (B) immutable: 結果を渡さず、そのまま publish
        TaskSignature::new("add")
            .with_args([TaskArg::int(1), TaskArg::int(1)])
            .on_success(TaskSignature::new("log").with_arg(TaskArg::int(100)))
            .immutable(true),
        // (C) 失敗時はエラーを先頭引数に渡す
        TaskSignature::new("backup")
            .with_arg(TaskArg::string("/var/db"))
            .on_success(TaskSignature::new("log").with_arg(TaskArg::int(0)))
            .on_error(TaskSignature::new("alert").with_arg(TaskArg::string("ops"))),
        // (D) 未登録のタスクは破棄される
        TaskSignature::new("unknown").on_error(TaskSignature::new("alert")),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init_tracing()?;
    let config = Config::from_env()?;

    // (A) broker と handler を用意
    let broker = Arc::new(InMemoryBroker::new());
    let backup = Arc::new(FlakyBackup::new(1));

    let app = AppBuilder::new()
        .config(config)
        .broker(broker.clone())
        .register("add", |a: i64, b: i64| -> Result<i64, String> { Ok(a + b) })?
        .register("log", |v: i64| -> Result<bool, String> {
            println!("log: {v}");
            Ok(true)
        })?
        .register("backup", move |path: String| backup.run(path))?
        .register("alert", |err: ErrorMessage, target: String| -> Result<bool, String> {
            println!("alert {target}: {err}");
            Ok(true)
        })?
        .expect_tasks(&["add", "log", "backup", "alert"])
        .build()?;

    // (B) タスク投入
    for signature in samples() {
        tracing::info!(body = %serde_json::to_string(&signature)?, "Sending task");
        app.send_task(signature)?;
    }

    // (C) worker を起動
    let group = app.launch();

    // (D) キューが空になり、ack 数が落ち着くまで待つ
    timeout(Duration::from_secs(10), async {
        let mut settled = usize::MAX;
        loop {
            sleep(Duration::from_millis(100)).await;
            let acked = broker.acked() + broker.rejected();
            if broker.pending() == 0 && acked == settled {
                break;
            }
            settled = acked;
        }
    })
    .await?;

    println!(
        "acked={} rejected={}",
        broker.acked(),
        broker.rejected()
    );

    // (E) broker を閉じて全 consumer の終了を待つ
    broker.close();
    group.join().await;
    Ok(())
}
