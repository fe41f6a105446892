use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::executor::RemoteExecutor;
use crate::error::RemoteError;

/// Written by cloud-init once first boot is done
pub const BOOT_FINISHED_MARKER: &str = "/var/lib/cloud/instance/boot-finished";

/// Bounded retry policy for [`wait_for_boot`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootWaitPolicy {
    pub attempts: u32,
    pub interval_ms: u64,
}

impl Default for BootWaitPolicy {
    fn default() -> Self {
        Self {
            attempts: 60,
            interval_ms: 5_000,
        }
    }
}

impl BootWaitPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Poll `host` until the boot marker exists
///
/// Returns the attempt at which the marker was seen.
pub async fn wait_for_boot(
    executor: &dyn RemoteExecutor,
    host: &str,
    policy: &BootWaitPolicy,
) -> Result<u32, RemoteError> {
    let probe = format!("test -e {}", BOOT_FINISHED_MARKER);
    for attempt in 1..=policy.attempts {
        match executor.run(host, &probe).await {
            Ok(_) => {
                info!(host, attempt, "Host finished booting");
                return Ok(attempt);
            }
            Err(e) => debug!(host, attempt, "Boot not finished yet: {}", e),
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval()).await;
        }
    }

    warn!(host, attempts = policy.attempts, "Host did not finish booting");
    Err(RemoteError::BootTimeout {
        host: host.to_string(),
        attempts: policy.attempts,
    })
}

/// Wait for every host concurrently
pub async fn wait_for_all(
    executor: Arc<dyn RemoteExecutor>,
    hosts: Vec<String>,
    policy: BootWaitPolicy,
) -> Vec<(String, Result<u32, RemoteError>)> {
    let handles: Vec<_> = hosts
        .into_iter()
        .map(|host| {
            let executor = executor.clone();
            let policy = policy.clone();
            let task_host = host.clone();
            let handle = tokio::spawn(async move {
                wait_for_boot(executor.as_ref(), &task_host, &policy).await
            });
            (host, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (host, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(RemoteError::Join {
                host: host.clone(),
                reason: e.to_string(),
            }),
        };
        results.push((host, result));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::recording::RecordingExecutor;

    fn fast(attempts: u32) -> BootWaitPolicy {
        BootWaitPolicy {
            attempts,
            interval_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let executor = RecordingExecutor::new().fail_times("boot-finished", 2);

        let attempt = wait_for_boot(&executor, "h1", &fast(10)).await.unwrap();

        assert_eq!(attempt, 3);
        assert_eq!(executor.issued().len(), 3);
        assert_eq!(
            executor.command_lines()[0],
            "test -e /var/lib/cloud/instance/boot-finished"
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_bounded_attempts() {
        let executor = RecordingExecutor::new().fail_on("boot-finished");

        let err = wait_for_boot(&executor, "h1", &fast(4)).await.unwrap_err();

        assert!(matches!(err, RemoteError::BootTimeout { attempts: 4, .. }));
        assert_eq!(executor.issued().len(), 4);
    }

    #[tokio::test]
    async fn test_wait_for_all_isolates_hosts() {
        let executor = Arc::new(RecordingExecutor::new());
        let results = wait_for_all(
            executor.clone(),
            vec!["h1".to_string(), "h2".to_string()],
            fast(2),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(executor.issued_on("h2").len(), 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = BootWaitPolicy::default();
        assert_eq!(policy.attempts, 60);
        assert_eq!(policy.interval(), Duration::from_secs(5));
    }
}
