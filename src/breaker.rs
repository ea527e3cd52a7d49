//! Circuit Breaker Module
//!
//! Fault-tolerance wrapper for failure-prone cache operations (loader
//! factories in particular). After a run of consecutive failures the breaker
//! fails fast for a cooldown window, then probes recovery with limited trial
//! calls before closing again.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

// == Breaker State ==
/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakerState {
    /// Normal operation; failures are counted
    Closed,
    /// Failing fast; the wrapped operation is never invoked
    Open,
    /// Limited trial calls allowed to test recovery
    HalfOpen,
}

// == Breaker Config ==
/// Circuit breaker tuning.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long a failure streak stays relevant in the closed state; a
    /// failure arriving later than this after the previous one restarts the
    /// streak at one
    pub failure_window: Duration,
    /// Cooldown after opening before the next call may probe recovery
    pub reset_timeout: Duration,
    /// Consecutive half-open successes required to close the circuit
    pub success_threshold: u32,
    /// Maximum concurrent trial calls while half-open
    pub half_open_max_probes: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            reset_timeout: Duration::from_secs(30),
            success_threshold: 3,
            half_open_max_probes: 3,
        }
    }
}

// == Breaker Error ==
/// Outcome of a gated call: either the circuit refused it, or the wrapped
/// operation itself failed. The underlying error is passed through untouched.
#[derive(Error, Debug)]
pub enum BreakerError {
    /// The circuit is open; the operation was never attempted
    #[error("circuit breaker is open, retry in {retry_after:?}")]
    Open { retry_after: Duration },

    /// The wrapped operation failed; original error preserved
    #[error(transparent)]
    Inner(#[from] anyhow::Error),
}

// == Circuit Breaker ==
/// Circuit breaker state machine.
///
/// The open-to-half-open transition is checked lazily on each call attempt;
/// there is no background timer.
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: RwLock<BreakerState>,
    /// Consecutive failure count (closed state)
    failures: AtomicU32,
    /// Consecutive trial-success count (half-open state)
    successes: AtomicU32,
    /// Trial calls admitted since entering half-open
    probes: AtomicU32,
    /// When the circuit last opened
    opened_at: RwLock<Option<Instant>>,
    /// When the last failure was recorded (closed state, for the
    /// failure-relevance window)
    last_failure_at: RwLock<Option<Instant>>,
    /// Total times the circuit has opened, for diagnostics
    total_opens: AtomicU64,
}

impl CircuitBreaker {
    /// Creates a breaker with the given tuning.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(BreakerState::Closed),
            failures: AtomicU32::new(0),
            successes: AtomicU32::new(0),
            probes: AtomicU32::new(0),
            opened_at: RwLock::new(None),
            last_failure_at: RwLock::new(None),
            total_opens: AtomicU64::new(0),
        }
    }

    /// Creates a breaker with default tuning.
    pub fn with_defaults() -> Self {
        Self::new(BreakerConfig::default())
    }

    // == Execute ==
    /// Funnels one operation through the breaker.
    ///
    /// Checks and transitions state, invokes the operation if permitted,
    /// records the outcome, and rethrows the operation's own error
    /// untransformed. While open and before the cooldown elapses, fails
    /// immediately with [`BreakerError::Open`].
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Err(retry_after) = self.can_execute().await {
            return Err(BreakerError::Open { retry_after });
        }

        match operation().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure().await;
                Err(BreakerError::Inner(err))
            }
        }
    }

    // == Can Execute ==
    /// Checks whether a call may proceed, transitioning open → half-open
    /// when the cooldown has elapsed.
    ///
    /// Returns `Err(wait)` with the remaining cooldown when blocked.
    pub async fn can_execute(&self) -> Result<(), Duration> {
        let state = *self.state.read().await;

        match state {
            BreakerState::Closed => Ok(()),

            BreakerState::HalfOpen => {
                let admitted = self.probes.fetch_add(1, Ordering::SeqCst);
                if admitted < self.config.half_open_max_probes {
                    Ok(())
                } else {
                    // Probe slots exhausted; wait for outcomes
                    Err(Duration::from_millis(100))
                }
            }

            BreakerState::Open => {
                let opened_at = *self.opened_at.read().await;
                match opened_at {
                    Some(at) if at.elapsed() >= self.config.reset_timeout => {
                        self.transition_to_half_open().await;
                        // First probe slot goes to this caller
                        self.probes.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                    Some(at) => Err(self.config.reset_timeout - at.elapsed()),
                    None => Ok(()),
                }
            }
        }
    }

    // == Record Success ==
    /// Records a successful call: resets the failure streak when closed,
    /// advances toward recovery when half-open.
    pub async fn record_success(&self) {
        let mut state = self.state.write().await;

        match *state {
            BreakerState::Closed => {
                self.failures.store(0, Ordering::SeqCst);
            }

            BreakerState::HalfOpen => {
                let successes = self.successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    *state = BreakerState::Closed;
                    self.failures.store(0, Ordering::SeqCst);
                    self.successes.store(0, Ordering::SeqCst);
                    self.probes.store(0, Ordering::SeqCst);
                    *self.opened_at.write().await = None;
                    debug!("circuit breaker closed after recovery");
                }
            }

            // Success cannot be recorded while open; nothing to do
            BreakerState::Open => {}
        }
    }

    // == Record Failure ==
    /// Records a failed call: counts toward opening when closed, reopens
    /// immediately when half-open.
    pub async fn record_failure(&self) {
        let mut state = self.state.write().await;

        match *state {
            BreakerState::Closed => {
                // A stale streak restarts rather than accumulating
                let mut last = self.last_failure_at.write().await;
                let stale = last
                    .map(|at| at.elapsed() > self.config.failure_window)
                    .unwrap_or(false);
                if stale {
                    self.failures.store(0, Ordering::SeqCst);
                }
                *last = Some(Instant::now());
                drop(last);

                let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.config.failure_threshold {
                    *state = BreakerState::Open;
                    *self.opened_at.write().await = Some(Instant::now());
                    self.total_opens.fetch_add(1, Ordering::SeqCst);
                    warn!(failures, "circuit breaker opened");
                }
            }

            BreakerState::HalfOpen => {
                // One failed probe reopens the circuit
                *state = BreakerState::Open;
                *self.opened_at.write().await = Some(Instant::now());
                self.successes.store(0, Ordering::SeqCst);
                self.probes.store(0, Ordering::SeqCst);
                self.total_opens.fetch_add(1, Ordering::SeqCst);
                warn!("circuit breaker reopened by failed probe");
            }

            BreakerState::Open => {
                *self.opened_at.write().await = Some(Instant::now());
            }
        }
    }

    async fn transition_to_half_open(&self) {
        let mut state = self.state.write().await;
        if *state == BreakerState::Open {
            *state = BreakerState::HalfOpen;
            self.successes.store(0, Ordering::SeqCst);
            self.probes.store(0, Ordering::SeqCst);
            debug!("circuit breaker half-open, probing recovery");
        }
    }

    // == Accessors ==
    /// Current state.
    pub async fn state(&self) -> BreakerState {
        *self.state.read().await
    }

    /// Consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Total times the circuit has opened.
    pub fn total_opens(&self) -> u64 {
        self.total_opens.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("failures", &self.failures.load(Ordering::SeqCst))
            .field("total_opens", &self.total_opens.load(Ordering::SeqCst))
            .finish()
    }
}
