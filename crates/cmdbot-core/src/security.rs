use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{config::BotConfig, domain::SenderId};

// ============== Authorization ==============

/// True iff `sender` is the configured owner or listed in `ADMINS`.
///
/// Fail-closed: blank ids and ids with surrounding or embedded whitespace are
/// never admins, whatever the config says.
pub fn is_admin(sender: &SenderId, cfg: &BotConfig) -> bool {
    let id = sender.as_str();
    if id.is_empty() || id.chars().any(char::is_whitespace) {
        return false;
    }
    if id == cfg.owner {
        return true;
    }
    cfg.admins.iter().any(|admin| admin == id)
}

// ============== Rate Limiter (Sliding Window) ==============

/// Length of the trailing window a sender's quota applies to.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);
/// Senders with no admission inside this horizon are dropped by a sweep.
pub const SWEEP_HORIZON: Duration = Duration::from_secs(10 * 60);
/// A sweep runs after every this many `admit` calls.
pub const SWEEP_EVERY: u64 = 100;

#[derive(Debug, Default)]
struct LimiterState {
    windows: HashMap<SenderId, VecDeque<Instant>>,
    calls: u64,
}

/// Per-sender sliding-window flood control.
///
/// Each sender owns a queue of admission instants in arrival order. Rejected
/// attempts are not recorded, so a flooding sender regains access exactly
/// one window after its oldest admitted command.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    sweep_every: u64,
    state: Mutex<LimiterState>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_WINDOW, SWEEP_EVERY)
    }
}

impl RateLimiter {
    /// `sweep_every == 0` disables call-count sweeps; `sweep_at` still works.
    pub fn new(window: Duration, sweep_every: u64) -> Self {
        Self {
            window,
            sweep_every,
            state: Mutex::new(LimiterState::default()),
        }
    }

    pub fn admit(&self, sender: &SenderId, quota_per_window: u32) -> bool {
        self.admit_at(sender, quota_per_window, Instant::now())
    }

    /// Fail-open: if the limiter state is unusable the command is admitted.
    pub fn admit_at(&self, sender: &SenderId, quota_per_window: u32, now: Instant) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::error!(sender = %sender, "rate limiter state poisoned, admitting command");
                return true;
            }
        };

        state.calls = state.calls.wrapping_add(1);

        let window = state.windows.entry(sender.clone()).or_default();
        prune(window, now, self.window);
        let admitted = if window.len() >= quota_per_window as usize {
            false
        } else {
            window.push_back(now);
            true
        };

        if self.sweep_every > 0 && state.calls % self.sweep_every == 0 {
            let removed = sweep_windows(&mut state.windows, now, SWEEP_HORIZON);
            if removed > 0 {
                tracing::debug!(removed, "rate limiter sweep dropped idle senders");
            }
        }

        admitted
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Drop every sender with no admission inside `SWEEP_HORIZON`; returns how many.
    pub fn sweep_at(&self, now: Instant) -> usize {
        match self.state.lock() {
            Ok(mut state) => sweep_windows(&mut state.windows, now, SWEEP_HORIZON),
            Err(_) => {
                tracing::error!("rate limiter state poisoned, skipping sweep");
                0
            }
        }
    }

    pub fn tracked_senders(&self) -> usize {
        self.state.lock().map(|s| s.windows.len()).unwrap_or(0)
    }

    pub fn window_len(&self, sender: &SenderId) -> usize {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.windows.get(sender).map(VecDeque::len))
            .unwrap_or(0)
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, len: Duration) {
    while let Some(&oldest) = window.front() {
        if now.saturating_duration_since(oldest) >= len {
            window.pop_front();
        } else {
            break;
        }
    }
}

fn sweep_windows(
    windows: &mut HashMap<SenderId, VecDeque<Instant>>,
    now: Instant,
    horizon: Duration,
) -> usize {
    let before = windows.len();
    windows.retain(|_, window| {
        prune(window, now, horizon);
        !window.is_empty()
    });
    before - windows.len()
}
