//! Rest timer state machine.
//!
//! `Idle -> Running -> Completed -> Idle`, with `adjust` re-entering
//! `Running`. The absolute end timestamp is the source of truth: every tick
//! recomputes `remaining = ceil(ends_at - now)`, so scheduling jitter or a
//! suspended process never accumulates drift.
//!
//! At most one countdown task, one auto-reset task and one scheduled
//! notification exist at a time. Every task carries the generation it was
//! spawned for and does nothing once the timer has moved on.

use crate::clock::Clock;
use crate::collaborators::{FeedbackEmitter, NotificationScheduler};
use crate::config::RestTimerConfig;
use crate::task::{TaskHandle, Tick};
use crate::Notification;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RestPhase {
    #[default]
    Idle,
    Running,
    Completed,
}

/// Point-in-time view of the timer for display
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RestTimerSnapshot {
    pub phase: RestPhase,
    pub duration: u32,
    pub remaining: u32,
    pub label: Option<String>,
    pub expanded: bool,
    pub ends_at: Option<DateTime<Utc>>,
}

impl RestTimerSnapshot {
    /// Fraction of the rest already elapsed, 0 when no duration is set
    pub fn progress(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        f64::from(self.duration.saturating_sub(self.remaining)) / f64::from(self.duration)
    }

    /// Remaining time as `m:ss`
    pub fn display_text(&self) -> String {
        format!("{}:{:02}", self.remaining / 60, self.remaining % 60)
    }

    pub fn is_active(&self) -> bool {
        self.phase != RestPhase::Idle
    }
}

#[derive(Default)]
struct TimerState {
    phase: RestPhase,
    duration: u32,
    remaining: u32,
    label: Option<String>,
    expanded: bool,
    ends_at: Option<DateTime<Utc>>,
    generation: u64,
    countdown: Option<TaskHandle>,
    auto_skip: Option<TaskHandle>,
}

struct Shared {
    state: Mutex<TimerState>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationScheduler>,
    feedback: Arc<dyn FeedbackEmitter>,
    config: RestTimerConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Countdown rest timer; clones share the same timer
#[derive(Clone)]
pub struct RestTimer {
    shared: Arc<Shared>,
}

impl RestTimer {
    pub fn new(
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationScheduler>,
        feedback: Arc<dyn FeedbackEmitter>,
        config: RestTimerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(TimerState::default()),
                clock,
                notifier,
                feedback,
                config,
            }),
        }
    }

    /// Start a fresh countdown, replacing whatever was running
    pub fn start(&self, seconds: u32, label: Option<String>) {
        let shared = &self.shared;
        let mut state = shared.lock();

        state.countdown = None;
        state.auto_skip = None;
        shared.notifier.cancel(&shared.config.notification_id);

        state.generation += 1;
        state.duration = seconds;
        state.remaining = seconds;
        state.ends_at = Some(shared.clock.now() + Duration::seconds(i64::from(seconds)));
        state.phase = RestPhase::Running;
        state.label = label;

        tracing::info!(
            "Rest timer started: {}s{}",
            seconds,
            state
                .label
                .as_deref()
                .map(|l| format!(" ({})", l))
                .unwrap_or_default()
        );

        if seconds == 0 {
            complete(shared, &mut state);
            return;
        }

        schedule_notification(shared, seconds);
        spawn_countdown(shared, &mut state);
    }

    /// Add or remove time from the current rest
    ///
    /// Remaining time never drops below zero and the duration grows to fit.
    /// Reaching zero completes the timer; going above zero from a finished
    /// timer restarts the countdown.
    pub fn adjust(&self, delta_seconds: i32) {
        let shared = &self.shared;
        let mut state = shared.lock();

        let new_remaining = (i64::from(state.remaining) + i64::from(delta_seconds)).max(0);
        if new_remaining == 0 && state.phase == RestPhase::Completed {
            tracing::debug!("Ignoring rest adjustment: timer already completed");
            return;
        }

        let remaining = clamp_seconds(new_remaining);
        let grown = clamp_seconds((i64::from(state.duration) + i64::from(delta_seconds)).max(0));
        state.remaining = remaining;
        state.duration = remaining.max(grown);
        state.ends_at = Some(shared.clock.now() + Duration::seconds(i64::from(remaining)));

        shared.notifier.cancel(&shared.config.notification_id);

        if remaining > 0 && state.phase != RestPhase::Running {
            state.phase = RestPhase::Running;
            state.auto_skip = None;
            state.generation += 1;
            spawn_countdown(shared, &mut state);
        }

        tracing::info!(
            "Rest timer adjusted by {}s: {}s remaining of {}s",
            delta_seconds,
            state.remaining,
            state.duration
        );

        if remaining > 0 {
            schedule_notification(shared, remaining);
        } else {
            complete(shared, &mut state);
        }
    }

    /// Stop the timer and clear every field
    pub fn skip(&self) {
        let shared = &self.shared;
        let mut state = shared.lock();
        reset(shared, &mut state);
    }

    /// Recompute remaining time from the end timestamp
    ///
    /// This is what the countdown task runs each period; callers may also
    /// invoke it directly to refresh a display.
    pub fn tick(&self) -> RestPhase {
        let shared = &self.shared;
        let mut state = shared.lock();
        refresh(shared, &mut state);
        state.phase
    }

    pub fn toggle_expanded(&self) {
        let mut state = self.shared.lock();
        state.expanded = !state.expanded;
    }

    pub fn snapshot(&self) -> RestTimerSnapshot {
        let state = self.shared.lock();
        RestTimerSnapshot {
            phase: state.phase,
            duration: state.duration,
            remaining: state.remaining,
            label: state.label.clone(),
            expanded: state.expanded,
            ends_at: state.ends_at,
        }
    }

    pub fn phase(&self) -> RestPhase {
        self.shared.lock().phase
    }
}

impl std::fmt::Debug for RestTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestTimer")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

fn clamp_seconds(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn seconds_until(ends_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = (ends_at - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        clamp_seconds((millis + 999) / 1000)
    }
}

fn refresh(shared: &Arc<Shared>, state: &mut TimerState) {
    if state.phase != RestPhase::Running {
        return;
    }
    let Some(ends_at) = state.ends_at else {
        return;
    };
    state.remaining = seconds_until(ends_at, shared.clock.now());
    if state.remaining == 0 {
        complete(shared, state);
    }
}

fn spawn_countdown(shared: &Arc<Shared>, state: &mut TimerState) {
    let weak: Weak<Shared> = Arc::downgrade(shared);
    let generation = state.generation;

    state.countdown = Some(TaskHandle::interval(
        shared.config.tick_interval(),
        move || {
            let Some(shared) = weak.upgrade() else {
                return Tick::Stop;
            };
            let mut state = shared.lock();
            if state.generation != generation || state.phase != RestPhase::Running {
                return Tick::Stop;
            }
            refresh(&shared, &mut state);
            if state.phase == RestPhase::Running {
                Tick::Continue
            } else {
                Tick::Stop
            }
        },
    ));
}

fn schedule_notification(shared: &Shared, seconds: u32) {
    let notification = Notification {
        title: "Rest Complete".into(),
        body: "Time to start your next set".into(),
    };
    let delay = std::time::Duration::from_secs(u64::from(seconds.max(1)));
    if let Err(e) =
        shared
            .notifier
            .schedule_one_shot(&shared.config.notification_id, delay, &notification)
    {
        tracing::warn!("Failed to schedule rest notification: {}", e);
    }
}

fn complete(shared: &Arc<Shared>, state: &mut TimerState) {
    state.phase = RestPhase::Completed;
    state.remaining = 0;
    state.countdown = None;
    shared.notifier.cancel(&shared.config.notification_id);

    shared.feedback.haptic_success();
    shared.feedback.play_sound(shared.config.completion_sound_id);
    tracing::info!("Rest timer completed");

    let weak: Weak<Shared> = Arc::downgrade(shared);
    let generation = state.generation;
    state.auto_skip = Some(TaskHandle::delayed(
        shared.config.completion_grace(),
        move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut state = shared.lock();
            if state.generation == generation && state.phase == RestPhase::Completed {
                reset(&shared, &mut state);
            }
        },
    ));
}

fn reset(shared: &Shared, state: &mut TimerState) {
    state.countdown = None;
    state.auto_skip = None;
    shared.notifier.cancel(&shared.config.notification_id);

    state.generation += 1;
    state.phase = RestPhase::Idle;
    state.duration = 0;
    state.remaining = 0;
    state.label = None;
    state.expanded = false;
    state.ends_at = None;
    tracing::debug!("Rest timer reset");
}
