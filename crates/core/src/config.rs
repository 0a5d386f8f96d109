//! Dispatcher configuration.
//!
//! The processing duration is the only tunable of the engine. The class
//! registry is carried here so embedders can extend the default set.

use crate::domain::ClassRegistry;
use crate::error::{AppError, Result};
use std::time::Duration;

/// Default time a bot spends on one order (10s)
pub const PROCESSING_DURATION_MS: u64 = 10_000;

/// Environment variable overriding [`PROCESSING_DURATION_MS`]
pub const PROCESSING_DURATION_ENV: &str = "DISPATCH_PROCESSING_DURATION_MS";

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub processing_duration: Duration,
    pub classes: ClassRegistry,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            processing_duration: Duration::from_millis(PROCESSING_DURATION_MS),
            classes: ClassRegistry::default(),
        }
    }
}

impl DispatchConfig {
    pub fn new(processing_duration: Duration) -> Self {
        Self {
            processing_duration,
            ..Default::default()
        }
    }

    /// Replace the class registry. An empty registry would reject every order.
    pub fn with_classes(mut self, classes: ClassRegistry) -> Result<Self> {
        if classes.is_empty() {
            return Err(AppError::Config("no order classes registered".to_string()));
        }
        self.classes = classes;
        Ok(self)
    }

    /// Load overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load overrides through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(PROCESSING_DURATION_ENV) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                AppError::Config(format!(
                    "{} must be a positive integer, got {:?}",
                    PROCESSING_DURATION_ENV, raw
                ))
            })?;
            if millis == 0 {
                return Err(AppError::Config(format!(
                    "{} must be greater than zero",
                    PROCESSING_DURATION_ENV
                )));
            }
            config.processing_duration = Duration::from_millis(millis);
        }

        Ok(config)
    }

    pub fn processing_duration_ms(&self) -> u64 {
        self.processing_duration.as_millis() as u64
    }
}
