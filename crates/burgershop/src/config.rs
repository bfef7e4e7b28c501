//! Shop and server configuration.

use std::time::Duration;

/// Configuration rejected at startup, before any chef or session runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("burger quota must be positive")]
    ZeroQuota,
    #[error("at least one chef is required")]
    NoChefs,
    #[error("{schedule} schedule must contain at least one duration")]
    EmptySchedule { schedule: &'static str },
    #[error("{schedule} schedule entry {index} is zero; durations must be positive")]
    ZeroDuration {
        schedule: &'static str,
        index: usize,
    },
}

/// Deterministic cycle of durations.
///
/// Worker `id` takes entry `(id + n) % len` for its n-th step, so chefs (or
/// customers) sharing a schedule stay out of lockstep without randomness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    steps: Vec<Duration>,
}

impl Schedule {
    pub fn fixed(step: Duration) -> Self {
        Self { steps: vec![step] }
    }

    pub fn cycle(steps: Vec<Duration>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[Duration] {
        &self.steps
    }

    /// Duration for worker `id`'s `n`-th step. Zero for an empty schedule,
    /// which `validate` rejects.
    pub fn step(&self, id: usize, n: u64) -> Duration {
        if self.steps.is_empty() {
            return Duration::ZERO;
        }
        let offset = (n % self.steps.len() as u64) as usize;
        self.steps[(id + offset) % self.steps.len()]
    }

    pub fn validate(&self, schedule: &'static str) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptySchedule { schedule });
        }
        if let Some(index) = self.steps.iter().position(Duration::is_zero) {
            return Err(ConfigError::ZeroDuration { schedule, index });
        }
        Ok(())
    }
}

/// Time a chef spends on each burger.
pub type PrepSchedule = Schedule;

/// Time a customer spends eating each burger.
pub type EatSchedule = Schedule;

#[derive(Debug, Clone)]
pub struct ShopConfig {
    /// Total burgers ever prepared.
    pub quota: u64,
    /// Number of chef tasks.
    pub chefs: usize,
    pub prep: PrepSchedule,
    /// Keep accepting customers after selling out and answer them with
    /// `NoMoreBurgers` until the process is told to stop.
    pub keep_open_after_sellout: bool,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            quota: 25,
            chefs: 2,
            prep: Schedule::cycle(vec![Duration::from_secs(2), Duration::from_secs(4)]),
            keep_open_after_sellout: false,
        }
    }
}

impl ShopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quota == 0 {
            return Err(ConfigError::ZeroQuota);
        }
        if self.chefs == 0 {
            return Err(ConfigError::NoChefs);
        }
        self.prep.validate("prep")
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long connected customers get to leave after the shop sells out
    /// before their sessions are closed.
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 54321,
            drain_timeout: Duration::from_secs(10),
        }
    }
}
