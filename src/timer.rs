use serde::{Deserialize, Serialize};

use crate::constants::{ESCAPE_TIME_SECS, ESCAPE_WARNING_SECS, MIN_TIME_AFTER_PENALTY_SECS};

pub trait CountdownTimer {
    fn modify_time(&mut self, delta_secs: f32);
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerConfig {
    pub initial_secs: f32,
    pub warning_secs: f32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            initial_secs: ESCAPE_TIME_SECS,
            warning_secs: ESCAPE_WARNING_SECS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerStatus {
    Running,
    TimeUp,
    Stopped,
}

#[derive(Clone, Debug)]
pub struct EscapeTimer {
    remaining_secs: f32,
    warning_secs: f32,
    status: TimerStatus,
}

impl EscapeTimer {
    pub fn new(config: &TimerConfig) -> Self {
        Self {
            remaining_secs: config.initial_secs,
            warning_secs: config.warning_secs,
            status: TimerStatus::Running,
        }
    }

    pub fn remaining_secs(&self) -> f32 {
        self.remaining_secs
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_warning(&self) -> bool {
        self.remaining_secs <= self.warning_secs
    }

    /// Returns `TimeUp` exactly once, on the tick the countdown runs out.
    pub fn tick(&mut self, dt_secs: f32) -> TimerStatus {
        if self.status != TimerStatus::Running {
            return self.status;
        }
        self.remaining_secs = (self.remaining_secs - dt_secs.max(0.0)).max(0.0);
        if self.remaining_secs <= 0.0 {
            self.status = TimerStatus::TimeUp;
        }
        self.status
    }

    pub fn stop(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Stopped;
        }
    }

    pub fn format_clock(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

impl CountdownTimer for EscapeTimer {
    fn modify_time(&mut self, delta_secs: f32) {
        if self.status != TimerStatus::Running {
            return;
        }
        // A penalty alone never ends the run.
        self.remaining_secs = (self.remaining_secs + delta_secs).max(MIN_TIME_AFTER_PENALTY_SECS);
    }
}

pub fn format_clock(secs: f32) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(initial_secs: f32) -> EscapeTimer {
        EscapeTimer::new(&TimerConfig {
            initial_secs,
            warning_secs: 15.0,
        })
    }

    #[test]
    fn penalty_never_drops_below_one_second() {
        let mut t = timer(4.0);
        t.modify_time(-10.0);
        assert_eq!(t.remaining_secs(), 1.0);
        assert_eq!(t.status(), TimerStatus::Running);
    }

    #[test]
    fn bonus_extends_remaining_time() {
        let mut t = timer(10.0);
        t.modify_time(5.0);
        assert_eq!(t.remaining_secs(), 15.0);
    }

    #[test]
    fn tick_reports_time_up_at_zero() {
        let mut t = timer(1.0);
        assert_eq!(t.tick(0.5), TimerStatus::Running);
        assert_eq!(t.tick(0.75), TimerStatus::TimeUp);
        assert_eq!(t.remaining_secs(), 0.0);
        t.modify_time(30.0);
        assert_eq!(t.remaining_secs(), 0.0);
    }

    #[test]
    fn stopped_timer_ignores_ticks() {
        let mut t = timer(20.0);
        t.stop();
        assert_eq!(t.tick(5.0), TimerStatus::Stopped);
        assert_eq!(t.remaining_secs(), 20.0);
    }

    #[test]
    fn clock_formats_minutes_and_seconds() {
        assert_eq!(format_clock(83.7), "1:23");
        assert_eq!(format_clock(9.2), "0:09");
        assert_eq!(format_clock(-3.0), "0:00");
        assert!(timer(15.0).is_warning());
        assert!(!timer(15.5).is_warning());
    }
}
