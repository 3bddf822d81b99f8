#![allow(dead_code)]

use std::sync::Arc;

use cmdpipe::broker::{Broker, MemoryBroker};
use cmdpipe::config::Settings;
use cmdpipe::execute::Executor;
use tokio::task::JoinHandle;

pub use cmdpipe_test_utils::{init_tracing, with_timeout};

/// Start an executor serving `allowed` against `broker` in the background.
pub fn spawn_executor(
    settings: Settings,
    broker: Arc<MemoryBroker>,
    allowed: &str,
) -> JoinHandle<()> {
    let executor = Executor::new(settings, allowed);
    tokio::spawn(async move {
        let broker: &dyn Broker = broker.as_ref();
        if let Err(e) = executor.run(broker).await {
            panic!("executor failed: {e}");
        }
    })
}
