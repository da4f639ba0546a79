//! Polling helper: wait until a property of a remote object takes one
//! of a set of values.

use crate::error::{VmwareError, VmwareResult};
use crate::vsphere::VimPort;

use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Terminal states of a CIS task.
const TASK_DONE: &[&str] = &["SUCCEEDED", "FAILED"];

#[derive(Clone)]
pub struct WaitForValues {
    port: VimPort,
    poll_interval: Duration,
}

impl WaitForValues {
    pub fn new(port: VimPort) -> Self {
        Self {
            port,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Poll `path` until `field` equals one of `expected`; returns the
    /// value that matched.
    ///
    /// `field` is either a top-level key or a JSON pointer (`/a/b`).
    pub async fn wait(
        &self,
        path: &str,
        field: &str,
        expected: &[&str],
        timeout: Duration,
    ) -> VmwareResult<String> {
        let (matched, _) = self.poll_until(path, field, expected, timeout).await?;
        Ok(matched)
    }

    /// Wait for a CIS task to finish; a `FAILED` task becomes a
    /// `TaskError`.
    pub async fn wait_for_task(&self, task_id: &str, timeout: Duration) -> VmwareResult<Value> {
        let path = format!("/api/cis/tasks/{task_id}");
        let (status, body) = self.poll_until(&path, "status", TASK_DONE, timeout).await?;
        if status == "FAILED" {
            let reason = body
                .get("error")
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(VmwareError::task(format!("Task {task_id} failed: {reason}")));
        }
        Ok(body)
    }

    async fn poll_until(
        &self,
        path: &str,
        field: &str,
        expected: &[&str],
        timeout: Duration,
    ) -> VmwareResult<(String, Value)> {
        // `None` when the timeout is too large to represent: wait forever.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            let body: Value = self.port.get(path).await?;
            let current = field_value(&body, field);
            if let Some(ref v) = current {
                if expected.iter().any(|e| *e == v.as_str()) {
                    return Ok((v.clone(), body));
                }
            }

            let expired = match (deadline, Instant::now().checked_add(self.poll_interval)) {
                (Some(deadline), Some(next_poll)) => next_poll > deadline,
                (Some(_), None) => true,
                (None, _) => false,
            };
            if expired {
                return Err(VmwareError::timeout(format!(
                    "{path}: '{field}' still {} after {:?}, expected one of {expected:?}",
                    current.as_deref().unwrap_or("<missing>"),
                    timeout
                )));
            }
            log::debug!("{path}: '{field}' = {current:?}, polling again");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Read a field as a string; non-string scalars are rendered as JSON.
fn field_value(body: &Value, field: &str) -> Option<String> {
    let v = if field.starts_with('/') {
        body.pointer(field)
    } else {
        body.get(field)
    }?;
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
