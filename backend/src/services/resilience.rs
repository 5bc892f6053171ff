//! Timeout, retry with jittered backoff, and circuit breaker around imagery calls
//!
//! Calls fail fast once the breaker opens; callers degrade to their own
//! fallbacks instead of waiting on a backend known to be down.

use rand::Rng;
use serde::Serialize;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ResilienceConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Breaker counters exposed on the health endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CircuitStats {
    pub service: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub rejected_calls: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    half_open_calls: u32,
    total_calls: u64,
    total_failures: u64,
    rejected_calls: u64,
}

/// Three-state circuit breaker.
///
/// Opens after `failure_threshold` consecutive failures, lets up to
/// `half_open_max_calls` trial calls through after the cooldown, closes after
/// `success_threshold` consecutive trial successes and reopens on any trial failure.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    failure_threshold: u32,
    success_threshold: u32,
    cooldown: Duration,
    half_open_max_calls: u32,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: &ResilienceConfig) -> Self {
        Self {
            service: service.into(),
            failure_threshold: config.failure_threshold.max(1),
            success_threshold: config.success_threshold.max(1),
            cooldown: Duration::from_secs(config.open_cooldown_secs),
            half_open_max_calls: config.half_open_max_calls.max(1),
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                half_open_calls: 0,
                total_calls: 0,
                total_failures: 0,
                rejected_calls: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Admit a call or reject it with `CircuitOpen`
    pub fn try_acquire(&self) -> AppResult<()> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open {
            let cooled = inner
                .opened_at
                .is_some_and(|at| at.elapsed() >= self.cooldown);
            if cooled {
                tracing::info!("Circuit for {} half-open after cooldown", self.service);
                inner.state = CircuitState::HalfOpen;
                inner.half_open_calls = 0;
                inner.consecutive_successes = 0;
            }
        }

        match inner.state {
            CircuitState::Closed => {}
            CircuitState::Open => {
                inner.rejected_calls += 1;
                return Err(AppError::CircuitOpen {
                    service: self.service.clone(),
                });
            }
            CircuitState::HalfOpen => {
                if inner.half_open_calls >= self.half_open_max_calls {
                    inner.rejected_calls += 1;
                    return Err(AppError::CircuitOpen {
                        service: self.service.clone(),
                    });
                }
                inner.half_open_calls += 1;
            }
        }
        inner.total_calls += 1;
        Ok(())
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        if inner.state == CircuitState::HalfOpen {
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= self.success_threshold {
                tracing::info!("Circuit for {} closed", self.service);
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
                inner.consecutive_successes = 0;
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.total_failures += 1;
        inner.consecutive_successes = 0;
        inner.consecutive_failures += 1;

        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            tracing::warn!(
                "Circuit for {} opened after {} consecutive failures",
                self.service,
                inner.consecutive_failures
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn stats(&self) -> CircuitStats {
        let inner = self.lock();
        CircuitStats {
            service: self.service.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            rejected_calls: inner.rejected_calls,
        }
    }
}

/// Exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retry number `attempt + 1`, jittered into [d/2, d]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)));
        let capped = exp.min(self.max_delay);
        let millis = capped.as_millis() as u64;
        if millis < 2 {
            return capped;
        }
        let jittered = rand::thread_rng().gen_range(millis / 2..=millis);
        Duration::from_millis(jittered)
    }
}

/// Runs imagery calls through timeout, retry and the breaker
#[derive(Debug)]
pub struct ResilientCaller {
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    timeout: Duration,
}

impl ResilientCaller {
    pub fn new(service: &str, config: &ResilienceConfig, timeout: Duration) -> Self {
        Self {
            breaker: CircuitBreaker::new(service, config),
            retry: RetryPolicy::from_config(config),
            timeout,
        }
    }

    pub fn stats(&self) -> CircuitStats {
        self.breaker.stats()
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Call `f` until it succeeds, fails permanently, or retries run out.
    ///
    /// An open circuit returns `CircuitOpen` without invoking `f`.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut f: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut attempt = 0;
        loop {
            self.breaker.try_acquire()?;

            let result = match tokio::time::timeout(self.timeout, f()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout {
                    operation: operation.to_string(),
                    seconds: self.timeout.as_secs(),
                }),
            };

            match result {
                Ok(value) => {
                    self.breaker.record_success();
                    return Ok(value);
                }
                Err(err) => {
                    self.breaker.record_failure();
                    if !err.is_transient() || attempt >= self.retry.max_retries {
                        return Err(err);
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        operation,
                        attempt + 1,
                        self.retry.max_retries + 1,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
