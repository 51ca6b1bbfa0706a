//! Exponential backoff with jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use folio_types::config::RetryConfig;

/// Backoff parameters. `attempts` counts retries, so a policy with
/// `attempts = 4` makes at most five tries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Extra random delay as a fraction of the computed delay.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_delay_ms: 200,
            max_delay_ms: 5000,
            jitter_ratio: 0.3,
        }
    }
}

/// Non-finite ratios disable jitter; the rest are clamped to `[0, 1]`.
fn sanitize_jitter(ratio: f64) -> f64 {
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            attempts: cfg.attempts,
            base_delay_ms: cfg.base_delay_ms,
            max_delay_ms: cfg.max_delay_ms,
            jitter_ratio: sanitize_jitter(cfg.jitter_ratio),
        }
    }
}

impl RetryPolicy {
    /// Deterministic part of the delay before retry number `attempt` (0-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let ratio = sanitize_jitter(self.jitter_ratio);
        if ratio == 0.0 {
            return base;
        }
        let spread = base.as_millis() as f64 * ratio;
        let extra = rand::thread_rng().gen_range(0.0..=spread);
        base + Duration::from_millis(extra.floor() as u64)
    }
}

/// Run `op` until it succeeds, `is_retryable` rejects the error, or the
/// policy's attempts are spent. The last error is returned as-is.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut op: F,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E, u32) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt >= policy.attempts || !is_retryable(&e, attempt) {
                    return Err(e);
                }
                let delay = policy.delay_with_jitter(attempt);
                warn!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn no_jitter(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay_ms: 100,
            max_delay_ms: 1000,
            jitter_ratio: 0.0,
        }
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let p = no_jitter(10);
        assert_eq!(p.base_delay(0), Duration::from_millis(100));
        assert_eq!(p.base_delay(1), Duration::from_millis(200));
        assert_eq!(p.base_delay(3), Duration::from_millis(800));
        assert_eq!(p.base_delay(4), Duration::from_millis(1000));
        assert_eq!(p.base_delay(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_jitter_stays_within_ratio() {
        let p = RetryPolicy {
            attempts: 1,
            base_delay_ms: 1000,
            max_delay_ms: 1000,
            jitter_ratio: 0.3,
        };
        for _ in 0..100 {
            let d = p.delay_with_jitter(0);
            assert!(d >= Duration::from_millis(1000) && d <= Duration::from_millis(1300));
        }
    }

    #[test]
    fn test_policy_from_config_clamps_jitter() {
        let cfg = RetryConfig {
            attempts: 2,
            base_delay_ms: 50,
            max_delay_ms: 400,
            jitter_ratio: 4.0,
        };
        let p = RetryPolicy::from(&cfg);
        assert_eq!(p.attempts, 2);
        assert_eq!(p.max_delay_ms, 400);
        assert_eq!(p.jitter_ratio, 1.0);
    }

    #[test]
    fn test_non_finite_jitter_is_disabled() {
        for ratio in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let cfg = RetryConfig {
                attempts: 1,
                base_delay_ms: 100,
                max_delay_ms: 1000,
                jitter_ratio: ratio,
            };
            assert_eq!(RetryPolicy::from(&cfg).jitter_ratio, 0.0);

            let p = RetryPolicy {
                jitter_ratio: ratio,
                ..RetryPolicy::default()
            };
            assert_eq!(p.delay_with_jitter(1), p.base_delay(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();
        let result: Result<&str, String> = retry_with_backoff(
            &no_jitter(4),
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("429".to_string())
                } else {
                    Ok("ok")
                }
            },
            |_, _| true,
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms + 200ms of backoff.
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            &no_jitter(4),
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("404".to_string())
            },
            |e, _| e == "429",
        )
        .await;

        assert_eq!(result.unwrap_err(), "404");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_return_last_error() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            &no_jitter(2),
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("fail {n}"))
            },
            |_, _| true,
        )
        .await;

        assert_eq!(result.unwrap_err(), "fail 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicate_sees_attempt_index() {
        let seen = std::sync::Mutex::new(Vec::new());
        let _: Result<(), String> = retry_with_backoff(
            &no_jitter(5),
            || async { Err("x".to_string()) },
            |_, attempt| {
                seen.lock().unwrap().push(attempt);
                attempt < 1
            },
        )
        .await;
        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}
