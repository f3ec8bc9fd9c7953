// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::exec::error::ExecutionError;
use crate::txn::{AccessMode, IsolationLevel};

/// Engine-wide configuration
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a write waits for another transaction's row lock.
    /// `None` waits until that transaction ends.
    pub lock_timeout_ms: Option<u64>,

    /// Isolation level used when BEGIN does not name one
    pub default_isolation_level: IsolationLevel,

    /// Access mode used when BEGIN does not name one
    pub default_access_mode: AccessMode,

    /// Upper bound on concurrently active transactions
    pub max_active_transactions: usize,

    /// Background garbage collection
    pub gc: GcConfig,
}

/// Garbage collector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    pub enabled: bool,
    pub interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: None,
            default_isolation_level: IsolationLevel::ReadCommitted,
            default_access_mode: AccessMode::ReadWrite,
            max_active_transactions: 1024,
            gc: GcConfig::default(),
        }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout_ms = timeout.map(|t| t.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Configuration without the background collector, for deterministic runs
    pub fn without_gc(mut self) -> Self {
        self.gc.enabled = false;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ExecutionError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ExecutionError::ConfigError(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ExecutionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExecutionError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ExecutionError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ExecutionError::ConfigError(e.to_string()))
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if !self.default_isolation_level.is_supported() {
            return Err(ExecutionError::ConfigError(format!(
                "default isolation level {} is not supported",
                self.default_isolation_level
            )));
        }
        if self.max_active_transactions == 0 {
            return Err(ExecutionError::ConfigError(
                "max_active_transactions must be at least 1".to_string(),
            ));
        }
        if self.gc.enabled && self.gc.interval_ms == 0 {
            return Err(ExecutionError::ConfigError(
                "gc.interval_ms must be positive when gc is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl GcConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"lock_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.lock_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.max_active_transactions, 1024);
        assert!(config.gc.enabled);
    }

    #[test]
    fn test_isolation_level_from_json() {
        let config =
            EngineConfig::from_json_str(r#"{"default_isolation_level": "RepeatableRead"}"#)
                .unwrap();
        assert_eq!(config.default_isolation_level, IsolationLevel::RepeatableRead);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err =
            EngineConfig::from_json_str(r#"{"default_isolation_level": "Serializable"}"#)
                .unwrap_err();
        assert!(matches!(err, ExecutionError::ConfigError(_)));

        assert!(EngineConfig::from_json_str(r#"{"max_active_transactions": 0}"#).is_err());
        assert!(EngineConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default()
            .with_lock_timeout(Some(Duration::from_secs(2)))
            .without_gc();
        let json = config.to_json_string().unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }
}
