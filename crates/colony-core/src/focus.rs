//! Window focus and visibility tracking.
//!
//! One explicitly constructed tracker per process, started by the host once
//! platform focus/visibility signals are wired up. `start()` is guarded so a
//! second subscription attempt is a no-op. Consumers use the blur duration to
//! tell a deliberate tab switch from momentary focus flicker before acting on
//! a refocus, e.g. auto-marking attention items read.

use std::time::{Duration, Instant};

use crate::constants::RECENT_UNFOCUS_THRESHOLD_SECS;

/// Point-in-time view of the tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusSnapshot {
    pub is_visible: bool,
    pub is_focused: bool,
    /// Time since the window lost focus; zero while focused.
    pub unfocused_duration: Duration,
}

/// Gating for a focus-return callback.
#[derive(Debug, Clone, Copy)]
pub struct FocusReturnOptions {
    /// Minimum blur duration before the callback fires on regain.
    pub min_unfocused: Duration,
    /// Only fire when the window was also hidden at some point while
    /// unfocused, not merely behind another focused window.
    pub require_hidden: bool,
}

impl Default for FocusReturnOptions {
    fn default() -> Self {
        Self {
            min_unfocused: Duration::ZERO,
            require_hidden: false,
        }
    }
}

struct FocusReturnEntry {
    id: u64,
    options: FocusReturnOptions,
    handler: Box<dyn FnMut(Duration)>,
}

pub struct FocusTracker {
    started: bool,
    is_visible: bool,
    is_focused: bool,
    last_focused_at: Option<Instant>,
    last_blurred_at: Option<Instant>,
    /// Duration of the most recent completed blur.
    last_blur_duration: Duration,
    hidden_while_blurred: bool,
    next_callback_id: u64,
    callbacks: Vec<FocusReturnEntry>,
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusTracker {
    pub fn new() -> Self {
        Self {
            started: false,
            is_visible: true,
            is_focused: true,
            last_focused_at: None,
            last_blurred_at: None,
            last_blur_duration: Duration::ZERO,
            hidden_while_blurred: false,
            next_callback_id: 0,
            callbacks: Vec::new(),
        }
    }

    /// Arm the tracker. Returns false (and changes nothing) when already
    /// started; the host's platform subscription must happen exactly once.
    pub fn start(&mut self) -> bool {
        if self.started {
            tracing::warn!("focus tracker already started");
            return false;
        }
        self.started = true;
        self.last_focused_at = Some(Instant::now());
        true
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Feed a platform focus signal. Only transitions do anything; repeated
    /// signals in the same state are ignored, so a callback fires at most
    /// once per regain.
    pub fn handle_focus_change(&mut self, focused: bool) {
        if !self.started {
            tracing::debug!("focus signal before start ignored");
            return;
        }
        if focused == self.is_focused {
            return;
        }

        if focused {
            let now = Instant::now();
            let blur_duration = self
                .last_blurred_at
                .map(|at| now.duration_since(at))
                .unwrap_or(Duration::ZERO);
            self.is_focused = true;
            self.last_focused_at = Some(now);
            self.last_blur_duration = blur_duration;
            let was_hidden = self.hidden_while_blurred;
            self.hidden_while_blurred = false;

            for entry in &mut self.callbacks {
                if blur_duration >= entry.options.min_unfocused
                    && (!entry.options.require_hidden || was_hidden)
                {
                    (entry.handler)(blur_duration);
                }
            }
        } else {
            self.is_focused = false;
            self.last_blurred_at = Some(Instant::now());
            if !self.is_visible {
                self.hidden_while_blurred = true;
            }
        }
    }

    /// Feed a platform visibility signal.
    pub fn handle_visibility_change(&mut self, visible: bool) {
        if !self.started {
            tracing::debug!("visibility signal before start ignored");
            return;
        }
        self.is_visible = visible;
        if !visible {
            self.hidden_while_blurred = true;
        }
    }

    pub fn snapshot(&self) -> FocusSnapshot {
        FocusSnapshot {
            is_visible: self.is_visible,
            is_focused: self.is_focused,
            unfocused_duration: self.unfocused_duration(),
        }
    }

    /// Time since focus was lost; zero while focused.
    pub fn unfocused_duration(&self) -> Duration {
        if self.is_focused {
            Duration::ZERO
        } else {
            self.last_blurred_at
                .map(|at| at.elapsed())
                .unwrap_or(Duration::ZERO)
        }
    }

    pub fn last_focused_at(&self) -> Option<Instant> {
        self.last_focused_at
    }

    pub fn last_blurred_at(&self) -> Option<Instant> {
        self.last_blurred_at
    }

    /// Whether the user was away long enough for the absence to be
    /// deliberate. While unfocused this looks at the running blur; right
    /// after a regain it looks at the blur that just ended.
    pub fn was_recently_unfocused(&self) -> bool {
        self.was_recently_unfocused_for(Duration::from_secs(RECENT_UNFOCUS_THRESHOLD_SECS))
    }

    pub fn was_recently_unfocused_for(&self, threshold: Duration) -> bool {
        let effective = if self.is_focused {
            self.last_blur_duration
        } else {
            self.unfocused_duration()
        };
        effective >= threshold
    }

    /// Register a callback fired on focus regain, gated by `options`.
    pub fn on_focus_return(
        &mut self,
        options: FocusReturnOptions,
        handler: impl FnMut(Duration) + 'static,
    ) -> u64 {
        let id = self.next_callback_id;
        self.next_callback_id += 1;
        self.callbacks.push(FocusReturnEntry {
            id,
            options,
            handler: Box::new(handler),
        });
        id
    }

    pub fn remove_focus_return(&mut self, id: u64) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|entry| entry.id != id);
        self.callbacks.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;

    #[test]
    fn test_start_is_guarded() {
        let mut tracker = FocusTracker::new();
        assert!(tracker.start());
        assert!(!tracker.start());
        assert!(tracker.is_started());
    }

    #[test]
    fn test_signals_before_start_ignored() {
        let mut tracker = FocusTracker::new();
        tracker.handle_focus_change(false);
        assert!(tracker.snapshot().is_focused);
    }

    #[test]
    fn test_blur_and_regain_updates_state() {
        let mut tracker = FocusTracker::new();
        tracker.start();

        tracker.handle_focus_change(false);
        assert!(!tracker.snapshot().is_focused);
        assert!(tracker.last_blurred_at().is_some());

        tracker.handle_focus_change(true);
        assert!(tracker.snapshot().is_focused);
        assert_eq!(tracker.unfocused_duration(), Duration::ZERO);
    }

    #[test]
    fn test_callback_fires_once_per_regain() {
        let mut tracker = FocusTracker::new();
        tracker.start();
        let fired: Rc<RefCell<u32>> = Rc::default();

        let fired_clone = fired.clone();
        tracker.on_focus_return(FocusReturnOptions::default(), move |_| {
            *fired_clone.borrow_mut() += 1;
        });

        tracker.handle_focus_change(false);
        tracker.handle_focus_change(true);
        // repeated focused signals are not transitions
        tracker.handle_focus_change(true);
        assert_eq!(*fired.borrow(), 1);

        tracker.handle_focus_change(false);
        tracker.handle_focus_change(true);
        assert_eq!(*fired.borrow(), 2);
    }

    #[test]
    fn test_min_unfocused_gates_flicker() {
        let mut tracker = FocusTracker::new();
        tracker.start();
        let fired: Rc<RefCell<u32>> = Rc::default();

        let fired_clone = fired.clone();
        tracker.on_focus_return(
            FocusReturnOptions {
                min_unfocused: Duration::from_millis(50),
                require_hidden: false,
            },
            move |_| *fired_clone.borrow_mut() += 1,
        );

        // momentary flicker: below the minimum
        tracker.handle_focus_change(false);
        tracker.handle_focus_change(true);
        assert_eq!(*fired.borrow(), 0);
        assert!(!tracker.was_recently_unfocused_for(Duration::from_millis(50)));

        // a real absence
        tracker.handle_focus_change(false);
        thread::sleep(Duration::from_millis(60));
        assert!(tracker.was_recently_unfocused_for(Duration::from_millis(50)));
        tracker.handle_focus_change(true);
        assert_eq!(*fired.borrow(), 1);
        // the completed blur still counts as recent after the regain
        assert!(tracker.was_recently_unfocused_for(Duration::from_millis(50)));
    }

    #[test]
    fn test_require_hidden_gating() {
        let mut tracker = FocusTracker::new();
        tracker.start();
        let fired: Rc<RefCell<u32>> = Rc::default();

        let fired_clone = fired.clone();
        tracker.on_focus_return(
            FocusReturnOptions {
                min_unfocused: Duration::ZERO,
                require_hidden: true,
            },
            move |_| *fired_clone.borrow_mut() += 1,
        );

        // blurred but never hidden: another window took focus
        tracker.handle_focus_change(false);
        tracker.handle_focus_change(true);
        assert_eq!(*fired.borrow(), 0);

        // hidden during the blur: tab switched away
        tracker.handle_focus_change(false);
        tracker.handle_visibility_change(false);
        tracker.handle_visibility_change(true);
        tracker.handle_focus_change(true);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_remove_focus_return() {
        let mut tracker = FocusTracker::new();
        tracker.start();
        let fired: Rc<RefCell<u32>> = Rc::default();

        let fired_clone = fired.clone();
        let id = tracker.on_focus_return(FocusReturnOptions::default(), move |_| {
            *fired_clone.borrow_mut() += 1;
        });
        assert!(tracker.remove_focus_return(id));
        assert!(!tracker.remove_focus_return(id));

        tracker.handle_focus_change(false);
        tracker.handle_focus_change(true);
        assert_eq!(*fired.borrow(), 0);
    }
}
