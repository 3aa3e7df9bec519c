//! Image dimension collaborator
//!
//! The cover-image mutation stage asks an [`ImageProbe`] for the pixel
//! dimensions of an uploaded image when the caller didn't supply them.
//! Probes that reach over the network own the only retry policy in the
//! repository; attempts are always bounded.

use std::time::Duration;

/// Bounded retry policy for network-backed probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(1000),
        }
    }
}

/// Looks up the pixel dimensions of an image.
///
/// `None` means the probe couldn't determine them; the stage then leaves
/// dimensions at their stored defaults rather than failing the pipeline.
pub trait ImageProbe: Send + Sync {
    fn dimensions(&self, url: &str) -> Option<(u32, u32)>;
}

/// Probe that never answers; the default when no network fetcher is wired
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProbe;

impl ImageProbe for NoProbe {
    fn dimensions(&self, _url: &str) -> Option<(u32, u32)> {
        None
    }
}

/// Runs `attempt` under a bounded retry policy, sleeping `backoff`
/// between tries. Intended for network-backed [`ImageProbe`]
/// implementations; nothing in the pipeline core retries.
pub fn with_retry<T>(policy: RetryPolicy, mut attempt: impl FnMut() -> Option<T>) -> Option<T> {
    for tries in 0..policy.max_attempts {
        if let Some(value) = attempt() {
            return Some(value);
        }
        if tries + 1 < policy.max_attempts {
            std::thread::sleep(policy.backoff);
        }
    }
    None
}
