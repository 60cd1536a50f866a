//! Transient "new personal record" notice.
//!
//! Showing a toast schedules its own dismissal; a newer toast replaces the
//! pending dismissal so an older one can never hide it early.

use crate::task::TaskHandle;
use crate::RecordKind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrToastSnapshot {
    pub visible: bool,
    pub exercise_name: Option<String>,
    pub kinds: Vec<RecordKind>,
}

#[derive(Default)]
struct ToastState {
    visible: bool,
    exercise_name: Option<String>,
    kinds: Vec<RecordKind>,
    generation: u64,
    dismiss: Option<TaskHandle>,
}

#[derive(Clone)]
pub struct PrToast {
    state: Arc<Mutex<ToastState>>,
    display_for: Duration,
}

fn lock(state: &Mutex<ToastState>) -> MutexGuard<'_, ToastState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PrToast {
    pub fn new(display_for: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ToastState::default())),
            display_for,
        }
    }

    pub fn show(&self, exercise_name: impl Into<String>, kinds: Vec<RecordKind>) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.visible = true;
        state.exercise_name = Some(exercise_name.into());
        state.kinds = kinds;

        let weak: Weak<Mutex<ToastState>> = Arc::downgrade(&self.state);
        let generation = state.generation;
        state.dismiss = Some(TaskHandle::delayed(self.display_for, move || {
            if let Some(state) = weak.upgrade() {
                let mut state = lock(&state);
                if state.generation == generation {
                    clear(&mut state);
                }
            }
        }));
    }

    pub fn dismiss(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        clear(&mut state);
    }

    pub fn snapshot(&self) -> PrToastSnapshot {
        let state = lock(&self.state);
        PrToastSnapshot {
            visible: state.visible,
            exercise_name: state.exercise_name.clone(),
            kinds: state.kinds.clone(),
        }
    }
}

fn clear(state: &mut ToastState) {
    state.visible = false;
    state.exercise_name = None;
    state.kinds.clear();
    state.dismiss = None;
}
