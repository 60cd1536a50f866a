//! External collaborators the session engine talks to.
//!
//! The engine only needs narrow contracts:
//! - Notification scheduling for the rest-complete alert
//! - Haptic/sound feedback when a rest ends
//! - Best-effort health sync of finished sessions
//!
//! Failures from any of these are logged by the caller and never surface.

use crate::{Notification, Result, SessionSummary};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub trait NotificationScheduler: Send + Sync {
    fn schedule_one_shot(&self, id: &str, delay: Duration, notification: &Notification)
        -> Result<()>;
    fn cancel(&self, id: &str);
}

pub trait FeedbackEmitter: Send + Sync {
    fn haptic_success(&self);
    fn play_sound(&self, sound_id: u32);
}

pub trait HealthSync: Send + Sync {
    fn save_session(&self, summary: &SessionSummary) -> Result<()>;
}

/// Notifier that only logs; used where no OS notification service exists
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl NotificationScheduler for LogNotifier {
    fn schedule_one_shot(
        &self,
        id: &str,
        delay: Duration,
        notification: &Notification,
    ) -> Result<()> {
        tracing::debug!(
            "Scheduled notification {} in {}s: {}",
            id,
            delay.as_secs(),
            notification.title
        );
        Ok(())
    }

    fn cancel(&self, id: &str) {
        tracing::debug!("Cancelled notification {}", id);
    }
}

/// Feedback through the terminal bell
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalFeedback;

impl FeedbackEmitter for TerminalFeedback {
    fn haptic_success(&self) {
        tracing::debug!("Haptic feedback requested (no haptics on a terminal)");
    }

    fn play_sound(&self, sound_id: u32) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07");
        let _ = stderr.flush();
        tracing::debug!("Played sound {}", sound_id);
    }
}

/// Health sync that appends finished-session summaries to a JSONL file
pub struct JsonlHealthSync {
    path: PathBuf,
}

impl JsonlHealthSync {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl HealthSync for JsonlHealthSync {
    fn save_session(&self, summary: &SessionSummary) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(summary)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Synced session {} to {:?}", summary.session_id, self.path);
        Ok(())
    }
}

/// Read every summary written by [`JsonlHealthSync`]
pub fn read_synced_sessions(path: &Path) -> Result<Vec<SessionSummary>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut summaries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<SessionSummary>(&line) {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                tracing::warn!("Failed to parse synced session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    Ok(summaries)
}

/// Recording fakes for tests
pub mod testing {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    #[derive(Clone, Debug, PartialEq)]
    pub enum NotifierEvent {
        Scheduled { id: String, delay: Duration },
        Cancelled { id: String },
    }

    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<NotifierEvent>>,
        fail: AtomicBool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            let notifier = Self::default();
            notifier.fail.store(true, Ordering::SeqCst);
            notifier
        }

        pub fn events(&self) -> Vec<NotifierEvent> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Delays of every scheduled notification, in call order
        pub fn scheduled_delays(&self) -> Vec<Duration> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    NotifierEvent::Scheduled { delay, .. } => Some(delay),
                    NotifierEvent::Cancelled { .. } => None,
                })
                .collect()
        }

        fn push(&self, event: NotifierEvent) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }

    impl NotificationScheduler for RecordingNotifier {
        fn schedule_one_shot(
            &self,
            id: &str,
            delay: Duration,
            _notification: &Notification,
        ) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Notification("scheduler unavailable".into()));
            }
            self.push(NotifierEvent::Scheduled {
                id: id.to_string(),
                delay,
            });
            Ok(())
        }

        fn cancel(&self, id: &str) {
            self.push(NotifierEvent::Cancelled { id: id.to_string() });
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingFeedback {
        haptics: AtomicUsize,
        sounds: Mutex<Vec<u32>>,
    }

    impl RecordingFeedback {
        pub fn haptic_count(&self) -> usize {
            self.haptics.load(Ordering::SeqCst)
        }

        pub fn sounds(&self) -> Vec<u32> {
            self.sounds
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl FeedbackEmitter for RecordingFeedback {
        fn haptic_success(&self) {
            self.haptics.fetch_add(1, Ordering::SeqCst);
        }

        fn play_sound(&self, sound_id: u32) {
            self.sounds
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(sound_id);
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingHealthSync {
        saved: Mutex<Vec<SessionSummary>>,
        fail: bool,
    }

    impl RecordingHealthSync {
        pub fn failing() -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn saved(&self) -> Vec<SessionSummary> {
            self.saved
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl HealthSync for RecordingHealthSync {
        fn save_session(&self, summary: &SessionSummary) -> Result<()> {
            if self.fail {
                return Err(Error::Sync("health store rejected the workout".into()));
            }
            self.saved
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(summary.clone());
            Ok(())
        }
    }
}
