//! Publishing worker tasks to the message queue API.

use std::time::Duration;

use async_trait::async_trait;
use configs::TaskQueueConfig;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::errors::ServiceError;
use crate::metrics::TASKS_ENQUEUED_TOTAL;

/// Topic consumed by the deployment worker.
pub const WORKER_TOPIC: &str = "worker";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskMessage {
    pub task_type: String,
    pub task_body: Value,
    pub user: String,
}

impl TaskMessage {
    pub fn new(task_type: &str, task_body: Value) -> Self {
        Self { task_type: task_type.to_string(), task_body, user: "define".to_string() }
    }
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, message: TaskMessage) -> Result<(), ServiceError>;
}

/// JSON-over-HTTP client for the MQ API.
pub struct HttpTaskQueue {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTaskQueue {
    pub fn new(cfg: &TaskQueueConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(cfg.timeout_secs)).build()?;
        Ok(Self { client, endpoint: cfg.endpoint.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl TaskQueue for HttpTaskQueue {
    async fn enqueue(&self, message: TaskMessage) -> Result<(), ServiceError> {
        let url = format!("{}/v1/enqueue", self.endpoint);
        let task_type = message.task_type.clone();
        let body = json!({ "topic": WORKER_TOPIC, "message": message });
        let res = self.client.post(&url).json(&body).send().await;
        let outcome = match res {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(ServiceError::BackendUnavailable(format!("task queue returned {}", resp.status()))),
            Err(e) => Err(ServiceError::BackendUnavailable(format!("task queue unreachable: {e}"))),
        };
        match &outcome {
            Ok(()) => {
                TASKS_ENQUEUED_TOTAL.with_label_values(&[task_type.as_str(), "ok"]).inc();
                debug!(task_type = %task_type, "task_enqueued");
            }
            Err(e) => {
                TASKS_ENQUEUED_TOTAL.with_label_values(&[task_type.as_str(), "error"]).inc();
                error!(task_type = %task_type, error = %e, "task_enqueue_failed");
            }
        }
        outcome
    }
}

/// Simple in-memory mock queue for tests
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockTaskQueue {
        pub sent: Mutex<Vec<TaskMessage>>,
        pub fail: AtomicBool,
    }

    impl MockTaskQueue {
        pub fn messages(&self) -> Vec<TaskMessage> { self.sent.lock().unwrap().clone() }
    }

    #[async_trait]
    impl TaskQueue for MockTaskQueue {
        async fn enqueue(&self, message: TaskMessage) -> Result<(), ServiceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ServiceError::BackendUnavailable("mock queue down".into()));
            }
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_trailing_slash_is_trimmed() {
        let q = HttpTaskQueue::new(&TaskQueueConfig { endpoint: "http://mq:6300/".into(), timeout_secs: 1 }).unwrap();
        assert_eq!(q.endpoint, "http://mq:6300");
    }

    #[tokio::test]
    async fn unreachable_queue_is_backend_unavailable() {
        // nothing listens on port 9 (discard) locally
        let q = HttpTaskQueue::new(&TaskQueueConfig { endpoint: "http://127.0.0.1:9".into(), timeout_secs: 1 }).unwrap();
        let res = q.enqueue(TaskMessage::new("restart", json!({}))).await;
        assert!(matches!(res, Err(ServiceError::BackendUnavailable(_))));
    }

    #[test]
    fn message_serializes_with_default_user() {
        let m = TaskMessage::new("stop", json!({"service_id": "s1"}));
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["user"], "define");
        assert_eq!(v["task_body"]["service_id"], "s1");
    }
}
