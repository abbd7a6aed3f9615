//! Send throttling
//!
//! The engine only decides policy. Whether an equivalent alert went out
//! recently is answered by an [`AlertLog`] owned by the caller.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeDelta, Utc};
use parking_lot::RwLock;
use promo_core::config::AlertConfig;

use crate::alert::{Alert, AlertLevel};

/// Durable record of sent alerts, keyed by [`Alert::dedup_key`]
pub trait AlertLog: Send + Sync {
    /// Was an alert with `key` sent in `(now - window, now]`?
    fn was_sent_within(&self, key: &str, window: Duration, now: DateTime<Utc>) -> bool;

    fn record_sent(&self, key: &str, at: DateTime<Utc>);
}

/// Never reports a recent send, so nothing is ever throttled
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysSend;

impl AlertLog for AlwaysSend {
    fn was_sent_within(&self, _key: &str, _window: Duration, _now: DateTime<Utc>) -> bool {
        false
    }

    fn record_sent(&self, _key: &str, _at: DateTime<Utc>) {}
}

/// In-memory alert log (for development/testing)
#[derive(Debug, Default)]
pub struct MemoryAlertLog {
    last_sent: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryAlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a log from previously saved `(key, last sent)` entries
    pub fn from_entries(entries: impl IntoIterator<Item = (String, DateTime<Utc>)>) -> Self {
        let log = Self::new();
        for (key, at) in entries {
            log.record_sent(&key, at);
        }
        log
    }

    /// Copy of every `(key, last sent)` entry, for saving
    pub fn entries(&self) -> HashMap<String, DateTime<Utc>> {
        self.last_sent.read().clone()
    }

    pub fn last_sent(&self, key: &str) -> Option<DateTime<Utc>> {
        self.last_sent.read().get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.last_sent.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertLog for MemoryAlertLog {
    fn was_sent_within(&self, key: &str, window: Duration, now: DateTime<Utc>) -> bool {
        self.last_sent(key)
            .is_some_and(|sent| sent <= now && now - sent < window)
    }

    fn record_sent(&self, key: &str, at: DateTime<Utc>) {
        let mut last_sent = self.last_sent.write();
        let entry = last_sent.entry(key.to_string()).or_insert(at);
        if at > *entry {
            *entry = at;
        }
    }
}

/// Suppression windows per level; critical alerts are never suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub warning_window: Duration,
    pub info_window: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::from_config(&AlertConfig::default())
    }
}

impl ThrottlePolicy {
    /// Windows beyond `TimeDelta`'s range saturate to the maximum.
    pub fn from_config(config: &AlertConfig) -> Self {
        let window = |hours: i64| TimeDelta::try_hours(hours).unwrap_or(TimeDelta::MAX);
        Self {
            warning_window: window(config.warning_window_hours),
            info_window: window(config.info_window_hours),
        }
    }

    pub fn window(&self, level: AlertLevel) -> Option<Duration> {
        match level {
            AlertLevel::Critical => None,
            AlertLevel::Warning => Some(self.warning_window),
            AlertLevel::Info => Some(self.info_window),
        }
    }

    pub fn should_send(&self, alert: &Alert, log: &dyn AlertLog, now: DateTime<Utc>) -> bool {
        match self.window(alert.level) {
            None => true,
            Some(window) => !log.was_sent_within(&alert.dedup_key(), window, now),
        }
    }
}
