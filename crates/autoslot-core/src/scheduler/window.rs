use chrono::{Duration, NaiveDateTime, NaiveTime};
use std::fmt;

/// Daily active-hours window in local wall-clock time.
///
/// When `log_off` is earlier than `log_on` the window crosses midnight,
/// e.g. 22:00 to 06:00 the next morning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    log_on: NaiveTime,
    log_off: NaiveTime,
}

impl ActiveWindow {
    /// Returns `None` for an empty window (`log_on == log_off`).
    pub fn new(log_on: NaiveTime, log_off: NaiveTime) -> Option<Self> {
        (log_on != log_off).then_some(Self { log_on, log_off })
    }

    pub fn log_on(&self) -> NaiveTime {
        self.log_on
    }

    pub fn log_off(&self) -> NaiveTime {
        self.log_off
    }

    pub fn wraps_midnight(&self) -> bool {
        self.log_off < self.log_on
    }

    /// Whether a wall-clock time lies inside the window, bounds included.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.wraps_midnight() {
            time >= self.log_on || time <= self.log_off
        } else {
            time >= self.log_on && time <= self.log_off
        }
    }

    /// The log-off instant that closes the window `start` belongs to.
    ///
    /// For a wrapped window entered in the evening this is the next day's
    /// log-off. `start` is expected to lie inside the window.
    pub fn closing_after(&self, start: NaiveDateTime) -> NaiveDateTime {
        let same_day = start.date().and_time(self.log_off);
        if self.wraps_midnight() && start.time() >= self.log_on {
            same_day + Duration::days(1)
        } else {
            same_day
        }
    }
}

impl fmt::Display for ActiveWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.log_on.format("%H:%M"),
            self.log_off.format("%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn empty_window_is_rejected() {
        assert!(ActiveWindow::new(hm(9, 0), hm(9, 0)).is_none());
    }

    #[test]
    fn daytime_window() {
        let w = ActiveWindow::new(hm(7, 0), hm(18, 0)).unwrap();
        assert!(!w.wraps_midnight());
        assert!(w.contains(hm(7, 0)));
        assert!(w.contains(hm(18, 0)));
        assert!(!w.contains(hm(6, 45)));
        assert!(!w.contains(hm(23, 0)));
        assert_eq!(
            w.closing_after(day(2).and_time(hm(9, 0))),
            day(2).and_time(hm(18, 0))
        );
        assert_eq!(w.to_string(), "07:00-18:00");
    }

    #[test]
    fn overnight_window() {
        let w = ActiveWindow::new(hm(22, 0), hm(6, 0)).unwrap();
        assert!(w.wraps_midnight());
        assert!(w.contains(hm(23, 30)));
        assert!(w.contains(hm(0, 0)));
        assert!(w.contains(hm(6, 0)));
        assert!(!w.contains(hm(12, 0)));

        assert_eq!(
            w.closing_after(day(2).and_time(hm(23, 0))),
            day(3).and_time(hm(6, 0))
        );
        assert_eq!(
            w.closing_after(day(3).and_time(hm(2, 0))),
            day(3).and_time(hm(6, 0))
        );
    }
}
