//! Rest timer and background rest notifications.
//!
//! Remaining rest is always derived from the absolute expiry timestamp
//! stored in the active workout, never from counted ticks, so a restart
//! neither loses nor double-counts time.
//!
//! Every new expiry is armed through [`RestSchedule`], which hands out a
//! fresh [`RestToken`]. Notifiers use the token to drop alerts that belong
//! to an expiry that has since been replaced or cancelled.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

/// Seconds left until `end`, rounded to the nearest second, never negative
pub fn remaining_seconds(end: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (end - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    (millis as f64 / 1000.0).round() as u64
}

/// Identifies one armed rest period
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestToken {
    pub generation: u64,
    pub expires_at: DateTime<Utc>,
}

/// The currently armed rest period, if any
#[derive(Debug, Default)]
pub struct RestSchedule {
    generation: u64,
    current: Option<RestToken>,
}

impl RestSchedule {
    /// Arm a new expiry, invalidating any previous token
    pub fn arm(&mut self, expires_at: DateTime<Utc>) -> RestToken {
        self.generation += 1;
        let token = RestToken {
            generation: self.generation,
            expires_at,
        };
        self.current = Some(token);
        token
    }

    /// Drop the armed expiry, invalidating its token
    pub fn clear(&mut self) {
        if self.current.take().is_some() {
            self.generation += 1;
        }
    }

    pub fn current(&self) -> Option<RestToken> {
        self.current
    }

    pub fn is_current(&self, token: &RestToken) -> bool {
        self.current.as_ref() == Some(token)
    }
}

/// Message for the out-of-foreground rest alert
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RestNotice {
    /// Seconds from `issued_at` until the alert should fire
    pub duration: u32,
    /// "Set 2", the next exercise's name, or "Last Set!"
    pub next_up: String,
    pub issued_at: DateTime<Utc>,
    pub token: RestToken,
}

impl RestNotice {
    /// Alert body shown when rest is over
    pub fn message(&self) -> String {
        format!("Rest time is over! Time for your next set: {}", self.next_up)
    }
}

/// Side channel that alerts the user when rest is over.
///
/// Delivery is fire-and-forget: the controller logs failures and carries on.
pub trait RestNotifier {
    /// Schedule an alert `notice.duration` seconds from now, replacing any
    /// pending one
    fn schedule(&mut self, notice: &RestNotice) -> Result<()>;

    /// Withdraw the pending alert (rest skipped or workout discarded)
    fn cancel(&mut self) -> Result<()>;
}

/// Notifier that does nothing, for when notices are disabled
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl RestNotifier for NoopNotifier {
    fn schedule(&mut self, _notice: &RestNotice) -> Result<()> {
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Hands notices to an out-of-process agent through a JSON file.
///
/// Each notice overwrites the previous one; cancelling removes the file.
pub struct SignalFileNotifier {
    path: PathBuf,
}

impl SignalFileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the pending notice, if any
    pub fn read(path: &Path) -> Result<Option<RestNotice>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }
}

impl RestNotifier for SignalFileNotifier {
    fn schedule(&mut self, notice: &RestNotice) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string(notice)?)?;
        tracing::debug!(
            "Wrote rest notice ({}s, next up '{}') to {:?}",
            notice.duration,
            notice.next_up,
            self.path
        );
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

type AlertFn = dyn Fn(&RestNotice) + Send + Sync;

/// In-process notifier: one sleeping thread per notice.
///
/// A thread only fires if its token is still the pending one when it wakes.
pub struct ThreadNotifier {
    pending: Arc<Mutex<Option<RestToken>>>,
    alert: Arc<AlertFn>,
}

impl ThreadNotifier {
    pub fn new<F>(alert: F) -> Self
    where
        F: Fn(&RestNotice) + Send + Sync + 'static,
    {
        Self {
            pending: Arc::new(Mutex::new(None)),
            alert: Arc::new(alert),
        }
    }

    fn set_pending(&self, token: Option<RestToken>) {
        match self.pending.lock() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}

impl RestNotifier for ThreadNotifier {
    fn schedule(&mut self, notice: &RestNotice) -> Result<()> {
        self.set_pending(Some(notice.token));

        let pending = Arc::clone(&self.pending);
        let alert = Arc::clone(&self.alert);
        let notice = notice.clone();
        std::thread::Builder::new()
            .name("rest-alert".into())
            .spawn(move || {
                std::thread::sleep(StdDuration::from_secs(u64::from(notice.duration)));
                let still_pending = pending
                    .lock()
                    .map(|guard| *guard == Some(notice.token))
                    .unwrap_or(false);
                if still_pending {
                    alert(&notice);
                } else {
                    tracing::debug!("Rest alert {} superseded", notice.token.generation);
                }
            })?;
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        self.set_pending(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::mpsc;

    fn notice(schedule: &mut RestSchedule, duration: u32, next_up: &str) -> RestNotice {
        let now = Utc::now();
        RestNotice {
            duration,
            next_up: next_up.into(),
            issued_at: now,
            token: schedule.arm(now + Duration::seconds(i64::from(duration))),
        }
    }

    #[test]
    fn test_remaining_seconds_rounds() {
        let now = Utc::now();
        assert_eq!(remaining_seconds(now + Duration::seconds(90), now), 90);
        assert_eq!(remaining_seconds(now + Duration::milliseconds(1400), now), 1);
        assert_eq!(remaining_seconds(now + Duration::milliseconds(1600), now), 2);
        assert_eq!(remaining_seconds(now + Duration::milliseconds(400), now), 0);
        assert_eq!(remaining_seconds(now - Duration::seconds(5), now), 0);
    }

    #[test]
    fn test_remaining_derived_from_absolute_expiry() {
        let start = Utc::now();
        let end = start + Duration::seconds(90);
        // Reloaded 30s later
        assert_eq!(remaining_seconds(end, start + Duration::seconds(30)), 60);
    }

    #[test]
    fn test_schedule_tokens_invalidate() {
        let mut schedule = RestSchedule::default();
        let now = Utc::now();

        let first = schedule.arm(now + Duration::seconds(60));
        assert!(schedule.is_current(&first));

        let second = schedule.arm(now + Duration::seconds(60));
        assert_ne!(first, second);
        assert!(!schedule.is_current(&first));
        assert!(schedule.is_current(&second));

        schedule.clear();
        assert!(schedule.current().is_none());
        assert!(!schedule.is_current(&second));

        let third = schedule.arm(now + Duration::seconds(60));
        assert!(third.generation > second.generation);
    }

    #[test]
    fn test_signal_file_notifier_writes_and_clears() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("rest_notice.json");
        let mut notifier = SignalFileNotifier::new(&path);
        let mut schedule = RestSchedule::default();

        let first = notice(&mut schedule, 150, "Set 2");
        notifier.schedule(&first).unwrap();
        let second = notice(&mut schedule, 60, "Abdos (Máquina)");
        notifier.schedule(&second).unwrap();

        let stored = SignalFileNotifier::read(&path).unwrap().unwrap();
        assert_eq!(stored, second);

        notifier.cancel().unwrap();
        assert!(SignalFileNotifier::read(&path).unwrap().is_none());
        notifier.cancel().unwrap();
    }

    #[test]
    fn test_thread_notifier_fires_latest_only() {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let mut notifier = ThreadNotifier::new(move |n: &RestNotice| {
            let _ = tx.lock().unwrap().send(n.next_up.clone());
        });
        let mut schedule = RestSchedule::default();

        notifier.schedule(&notice(&mut schedule, 1, "Set 2")).unwrap();
        notifier.schedule(&notice(&mut schedule, 1, "Set 3")).unwrap();

        let fired = rx.recv_timeout(StdDuration::from_secs(5)).unwrap();
        assert_eq!(fired, "Set 3");
        assert!(rx.recv_timeout(StdDuration::from_millis(1500)).is_err());
    }

    #[test]
    fn test_thread_notifier_cancel() {
        let (tx, rx) = mpsc::channel::<String>();
        let tx = Mutex::new(tx);
        let mut notifier = ThreadNotifier::new(move |n: &RestNotice| {
            let _ = tx.lock().unwrap().send(n.next_up.clone());
        });
        let mut schedule = RestSchedule::default();

        notifier.schedule(&notice(&mut schedule, 1, "Set 2")).unwrap();
        notifier.cancel().unwrap();

        assert!(rx.recv_timeout(StdDuration::from_millis(2000)).is_err());
    }

    #[test]
    fn test_notice_message() {
        let mut schedule = RestSchedule::default();
        let n = notice(&mut schedule, 90, "Last Set!");
        assert_eq!(n.message(), "Rest time is over! Time for your next set: Last Set!");
    }
}
