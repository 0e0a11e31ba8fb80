//! Next-chime computation.
//!
//! Candidates are the hour boundaries after the current hour, scanned forward
//! one hour at a time for a full day. The first hour that is active and is
//! not the last chimed hour wins.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, TimeZone, Timelike};

use belfry_core::{ActiveHours, RunState, HOURS_PER_DAY};

/// A chime slot: the hour on the dial and the instant it rings.
///
/// The two only disagree when `hour` falls in a daylight-saving gap, in which
/// case `at` is the first instant after the gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledChime<Tz: TimeZone> {
    pub hour: u32,
    pub at: DateTime<Tz>,
}

/// The soonest eligible hour boundary after `now`, or `None` when no hour in
/// the next 24 is active and differs from `last_chimed_hour`.
///
/// The result has zero minutes, seconds, and sub-seconds. A chosen hour at or
/// before the current one lands on the following day.
pub fn compute_next_chime<Tz: TimeZone>(
    active_hours: &ActiveHours,
    last_chimed_hour: Option<u8>,
    now: &DateTime<Tz>,
) -> Option<DateTime<Tz>> {
    next_slot(active_hours, last_chimed_hour, now).map(|slot| slot.at)
}

/// The daemon's schedule: [`compute_next_chime`] with the last chimed hour
/// excluded. When that leaves nothing (only the last chimed hour is active),
/// the same hour may ring again once [`RunState::allows_repeat_at`] says the
/// previous chime is far enough behind.
pub fn schedule_next<Tz: TimeZone>(
    active_hours: &ActiveHours,
    state: &RunState,
    now: &DateTime<Tz>,
) -> Option<ScheduledChime<Tz>> {
    next_slot(active_hours, state.last_chimed_hour, now).or_else(|| {
        let repeat = next_slot(active_hours, None, now)?;
        state.allows_repeat_at(&repeat.at).then_some(repeat)
    })
}

fn next_slot<Tz: TimeZone>(
    active_hours: &ActiveHours,
    last_chimed_hour: Option<u8>,
    now: &DateTime<Tz>,
) -> Option<ScheduledChime<Tz>> {
    let current_hour = now.hour() as usize;
    let excluded = last_chimed_hour.map(usize::from);

    let next_hour = (1..=HOURS_PER_DAY)
        .map(|step| (current_hour + step) % HOURS_PER_DAY)
        .find(|h| active_hours.is_active(*h) && Some(*h) != excluded)?;

    let mut date = now.date_naive();
    if next_hour <= current_hour {
        date = date.succ_opt()?;
    }
    let hour = next_hour as u32;
    let naive = date.and_hms_opt(hour, 0, 0)?;
    let at = resolve_local(&now.timezone(), naive)?;
    Some(ScheduledChime { hour, at })
}

/// Map a wall-clock time to an instant. Ambiguous times (clocks falling back)
/// take the earlier instant; skipped times (clocks springing forward) move to
/// the next hour.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + ChronoDuration::hours(1))).earliest())
}

/// Seconds from `now` until `target`, never negative.
pub fn seconds_until<Tz: TimeZone>(target: &DateTime<Tz>, now: &DateTime<Tz>) -> f64 {
    let millis = target.clone().signed_duration_since(now.clone()).num_milliseconds();
    millis.max(0) as f64 / 1000.0
}

/// [`seconds_until`] as a sleepable duration.
pub fn sleep_duration<Tz: TimeZone>(target: &DateTime<Tz>, now: &DateTime<Tz>) -> Duration {
    target
        .clone()
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Strikes for a chime at `hour`, on a 12-hour dial: noon and midnight both
/// strike twelve.
pub fn strike_count(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        n => n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, FixedOffset, LocalResult, NaiveDate};
    use rstest::rstest;

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 6, day, hour, minute, 0)
            .unwrap()
    }

    fn chimed(hour: u8, when: DateTime<FixedOffset>) -> RunState {
        let mut state = RunState::default();
        state.record_chime(hour, &when);
        state
    }

    /// UTC+1 until 2026-03-29 01:00 UTC, UTC+2 after. Local 02:00 to 03:00
    /// on that day does not exist.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct SpringForward;

    impl SpringForward {
        fn switch_utc() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2026, 3, 29)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        }

        fn winter() -> FixedOffset {
            FixedOffset::east_opt(3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::east_opt(2 * 3600).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let gap_start = Self::switch_utc() + ChronoDuration::hours(1);
            if *local < gap_start {
                LocalResult::Single(Self::winter())
            } else if *local < gap_start + ChronoDuration::hours(1) {
                LocalResult::None
            } else {
                LocalResult::Single(Self::summer())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_hms_opt(0, 0, 0).unwrap())
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < Self::switch_utc() {
                Self::winter()
            } else {
                Self::summer()
            }
        }
    }

    #[test]
    fn morning_with_default_mask_picks_noon_today() {
        let now = at(10, 8, 30);
        let next = compute_next_chime(&ActiveHours::default(), None, &now).unwrap();

        assert_eq!(next, at(10, 12, 0));
        assert_eq!(strike_count(next.hour()), 12);
    }

    #[test]
    fn already_chimed_evening_hour_wraps_to_next_noon() {
        let now = at(10, 21, 30);
        let next = compute_next_chime(&ActiveHours::default(), Some(21), &now).unwrap();

        assert_eq!(next, at(11, 12, 0));
        assert_eq!(next.day(), 11);
    }

    #[test]
    fn current_hour_is_never_a_same_day_candidate() {
        let now = at(10, 14, 0);
        let next = compute_next_chime(&ActiveHours::default(), None, &now).unwrap();
        assert_eq!(next, at(10, 15, 0));
    }

    #[test]
    fn single_active_hour_equal_to_current_lands_tomorrow() {
        let now = at(10, 14, 0);
        let mask = ActiveHours::from_hours([14]);
        assert_eq!(compute_next_chime(&mask, None, &now), Some(at(11, 14, 0)));
    }

    #[test]
    fn empty_mask_has_no_next_chime() {
        assert_eq!(compute_next_chime(&ActiveHours::none(), None, &at(10, 9, 0)), None);
    }

    #[test]
    fn only_guarded_hour_active_has_no_next_chime() {
        let mask = ActiveHours::from_hours([17]);
        assert_eq!(compute_next_chime(&mask, Some(17), &at(10, 9, 0)), None);
    }

    #[test]
    fn day_old_chime_still_excludes_its_hour() {
        let state = chimed(12, at(9, 12, 0));
        let next = schedule_next(&ActiveHours::default(), &state, &at(10, 11, 30)).unwrap();

        assert_eq!(next.hour, 13);
        assert_eq!(next.at, at(10, 13, 0));
    }

    #[test]
    fn lone_active_hour_repeats_the_next_day() {
        let mask = ActiveHours::from_hours([9]);
        let state = chimed(9, at(9, 9, 0));
        let next = schedule_next(&mask, &state, &at(10, 8, 0)).unwrap();

        assert_eq!(next.hour, 9);
        assert_eq!(next.at, at(10, 9, 0));
    }

    #[test]
    fn lone_active_hour_never_rings_the_same_slot_twice() {
        // Wall clock a minute behind the recorded chime.
        let mask = ActiveHours::from_hours([9]);
        let state = chimed(9, at(10, 9, 0));
        assert_eq!(schedule_next(&mask, &state, &at(10, 8, 59)), None);
    }

    #[test]
    fn hour_inside_spring_forward_gap_keeps_its_dial_hour() {
        let now = SpringForward.with_ymd_and_hms(2026, 3, 29, 0, 30, 0).unwrap();
        let mask = ActiveHours::from_hours([2]);
        let next = schedule_next(&mask, &RunState::default(), &now).unwrap();

        assert_eq!(next.hour, 2);
        assert_eq!(strike_count(next.hour), 2);
        assert_eq!(next.at.hour(), 3);
        assert_eq!(next.at, SpringForward.with_ymd_and_hms(2026, 3, 29, 3, 0, 0).unwrap());
    }

    #[test]
    fn result_is_always_an_eligible_future_hour_boundary() {
        // Deterministic pseudo-random masks.
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..200 {
            let mut mask = ActiveHours::none();
            for hour in 0..HOURS_PER_DAY {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                mask.set(hour, seed % 3 == 0);
            }
            for current in 0..24u32 {
                let now = at(10, current, 17);
                for last in std::iter::once(None).chain((0..24u8).map(Some)) {
                    let eligible = mask.hours().any(|h| Some(h as u8) != last);
                    match compute_next_chime(&mask, last, &now) {
                        Some(next) => {
                            let hour = next.hour() as usize;
                            assert!(mask.is_active(hour));
                            assert_ne!(Some(hour as u8), last);
                            let offsets = (next.minute(), next.second(), next.nanosecond());
                            assert_eq!(offsets, (0, 0, 0));
                            assert!(next > now);
                            assert!(next - now <= ChronoDuration::hours(24));
                        }
                        None => assert!(!eligible, "mask {mask} last {last:?} at {current}"),
                    }
                }
            }
        }
    }

    #[test]
    fn seconds_until_is_never_negative() {
        let now = at(10, 12, 0);
        assert_eq!(seconds_until(&at(10, 11, 0), &now), 0.0);
        assert_eq!(seconds_until(&at(10, 12, 0), &now), 0.0);
        assert_eq!(seconds_until(&at(10, 13, 0), &now), 3600.0);
        assert_eq!(sleep_duration(&at(9, 23, 0), &now), Duration::ZERO);
        assert_eq!(sleep_duration(&at(10, 12, 30), &now), Duration::from_secs(1800));
    }

    #[rstest]
    #[case(0, 12)]
    #[case(1, 1)]
    #[case(11, 11)]
    #[case(12, 12)]
    #[case(13, 1)]
    #[case(21, 9)]
    #[case(23, 11)]
    fn strikes_follow_twelve_hour_dial(#[case] hour: u32, #[case] strikes: u32) {
        assert_eq!(strike_count(hour), strikes);
    }
}
