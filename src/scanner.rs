//! Per-minute moving average over a trailing window of events.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::stats::{Average, WindowSums};
use chrono::{NaiveDateTime, TimeDelta, Timelike};
use serde::{Serialize, Serializer};
use std::num::NonZeroU32;

/// Format of output dates, always on a whole minute.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One entry of the output series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovingAveragePoint {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDateTime,
    pub average_delivery_time: Average,
}

fn serialize_date<S>(date: &NaiveDateTime, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&date.format(DATE_FORMAT))
}

/// Compute the moving average for every minute spanned by `events`.
///
/// The series runs from the earliest event's minute through one minute past
/// the latest event's minute. The window ending at minute `t` covers
/// `[t - window_size, t]`, both ends included.
///
/// Events are sorted by timestamp internally and two cursors bound the
/// window. With integer durations the cost is linear in the number of events
/// plus minutes; fractional durations re-sum each changed window.
pub fn scan(events: &[Event], window_size: NonZeroU32) -> Result<Vec<MovingAveragePoint>> {
    let mut events = events.to_vec();
    events.sort_by_key(|event| event.timestamp);

    let (first, last) = match (events.first(), events.last()) {
        (Some(first), Some(last)) => (first.timestamp, last.timestamp),
        _ => return Err(Error::EmptyInput),
    };

    let one_minute = TimeDelta::minutes(1);
    let window = TimeDelta::minutes(i64::from(window_size.get()));

    let earliest = floor_minute(first);
    let latest = floor_minute(last)
        .checked_add_signed(one_minute)
        .ok_or_else(|| Error::OutOfRange(last.to_string()))?;

    let sums = WindowSums::new(&events);
    let n_points = (latest - earliest).num_minutes() as usize + 1;
    let mut points = Vec::with_capacity(n_points);

    // Cursors: events[lo..hi] are exactly those inside the current window.
    let mut lo = 0;
    let mut hi = 0;
    let mut prev_range = None;
    let mut average = Average::Whole(0);

    let mut minute = earliest;
    while minute <= latest {
        while hi < events.len() && events[hi].timestamp <= minute {
            hi += 1;
        }
        match minute.checked_sub_signed(window) {
            Some(start) => {
                while lo < hi && events[lo].timestamp < start {
                    lo += 1;
                }
            }
            None => lo = 0,
        }

        if prev_range != Some((lo, hi)) {
            average = sums.mean(lo..hi);
            prev_range = Some((lo, hi));
        }
        points.push(MovingAveragePoint {
            date: minute,
            average_delivery_time: average,
        });

        minute = match minute.checked_add_signed(one_minute) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(points)
}

fn floor_minute(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        - TimeDelta::seconds(i64::from(timestamp.second()))
        - TimeDelta::nanoseconds(i64::from(timestamp.nanosecond()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DurationValue;
    use chrono::NaiveDate;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn at(hour: u32, min: u32, sec: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_micro_opt(hour, min, sec, micro)
            .unwrap()
    }

    fn event(timestamp: NaiveDateTime, duration: i64) -> Event {
        Event::new(timestamp, DurationValue::Int(duration))
    }

    fn window(minutes: u32) -> NonZeroU32 {
        NonZeroU32::new(minutes).unwrap()
    }

    fn averages(points: &[MovingAveragePoint]) -> Vec<Average> {
        points.iter().map(|p| p.average_delivery_time).collect()
    }

    /// Full scan of every event for every minute.
    fn scan_naive(events: &[Event], window_size: u32) -> Vec<(NaiveDateTime, f64)> {
        let earliest = events.iter().map(|e| e.timestamp).min().unwrap();
        let latest = events.iter().map(|e| e.timestamp).max().unwrap();
        let mut minute = floor_minute(earliest);
        let latest = floor_minute(latest) + TimeDelta::minutes(1);
        let mut out = Vec::new();
        while minute <= latest {
            let start = minute - TimeDelta::minutes(i64::from(window_size));
            let in_window: Vec<f64> = events
                .iter()
                .filter(|e| start <= e.timestamp && e.timestamp <= minute)
                .map(|e| e.duration.as_f64())
                .collect();
            let mean = if in_window.is_empty() {
                0.0
            } else {
                in_window.iter().sum::<f64>() / in_window.len() as f64
            };
            out.push((minute, mean));
            minute += TimeDelta::minutes(1);
        }
        out
    }

    #[test]
    fn two_events_one_minute_window() {
        let events = vec![event(at(0, 0, 30, 0), 10), event(at(0, 1, 30, 0), 20)];

        let points = scan(&events, window(1)).unwrap();

        let dates: Vec<_> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![at(0, 0, 0, 0), at(0, 1, 0, 0), at(0, 2, 0, 0)]);
        assert_eq!(
            averages(&points),
            vec![Average::Whole(0), Average::Whole(10), Average::Whole(20)]
        );
    }

    #[test]
    fn single_event_yields_two_points() {
        let events = vec![event(at(10, 5, 12, 345_678), 7)];

        let points = scan(&events, window(3)).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, at(10, 5, 0, 0));
        assert_eq!(points[0].average_delivery_time, Average::Whole(0));
        assert_eq!(points[1].date, at(10, 6, 0, 0));
        assert_eq!(points[1].average_delivery_time, Average::Whole(7));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        // Window ending at 00:10 with size 2 is [00:08, 00:10].
        let events = vec![
            event(at(0, 7, 59, 999_999), 1000),
            event(at(0, 8, 0, 0), 4),
            event(at(0, 10, 0, 0), 6),
            event(at(0, 10, 0, 1), 1000),
        ];

        let points = scan(&events, window(2)).unwrap();

        let at_ten = points.iter().find(|p| p.date == at(0, 10, 0, 0)).unwrap();
        assert_eq!(at_ten.average_delivery_time, Average::Whole(5));
    }

    #[test]
    fn series_is_dense_and_gaps_are_zero() {
        let events = vec![event(at(0, 0, 0, 0), 3), event(at(0, 20, 15, 0), 9)];

        let points = scan(&events, window(5)).unwrap();

        assert_eq!(points.len(), 22);
        for pair in points.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, TimeDelta::minutes(1));
        }
        assert_eq!(points[0].average_delivery_time, Average::Whole(3));
        assert_eq!(points[5].average_delivery_time, Average::Whole(3));
        assert_eq!(points[6].average_delivery_time, Average::Whole(0));
        assert_eq!(points[20].average_delivery_time, Average::Whole(0));
        assert_eq!(points[21].average_delivery_time, Average::Whole(9));
    }

    #[test]
    fn unsorted_input_gives_same_series() {
        let sorted = vec![
            event(at(1, 0, 1, 0), 2),
            event(at(1, 1, 2, 0), 5),
            event(at(1, 3, 3, 0), 8),
        ];
        let mut shuffled = sorted.clone();
        shuffled.swap(0, 2);

        assert_eq!(
            scan(&sorted, window(2)).unwrap(),
            scan(&shuffled, window(2)).unwrap()
        );
    }

    #[test]
    fn fractional_mean_is_not_truncated() {
        let events = vec![event(at(0, 0, 10, 0), 5), event(at(0, 0, 20, 0), 6)];

        let points = scan(&events, window(1)).unwrap();

        assert_eq!(points[1].average_delivery_time, Average::Fractional(5.5));
    }

    #[test]
    fn huge_durations_stay_numeric() {
        let events = vec![
            Event::new(at(10, 5, 10, 0), DurationValue::Float(1e308)),
            Event::new(at(10, 5, 20, 0), DurationValue::Float(1e308)),
        ];

        let points = scan(&events, window(1)).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[1].average_delivery_time.as_f64(), 1e308);
        let json = serde_json::to_value(points).unwrap();
        assert!(json[1]["average_delivery_time"].is_number());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(scan(&[], window(1)), Err(Error::EmptyInput));
    }

    #[test]
    fn matches_full_scan_on_random_events() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let n_events = rng.random_range(1..40);
            let window_size = rng.random_range(1..15);
            let fractional = rng.random_bool(0.5);
            let events: Vec<Event> = (0..n_events)
                .map(|_| {
                    let offset = TimeDelta::microseconds(rng.random_range(0..3_600_000_000));
                    let duration = if fractional {
                        DurationValue::Float(f64::from(rng.random_range(0..400u32)) / 4.0)
                    } else {
                        DurationValue::Int(rng.random_range(0..100))
                    };
                    Event::new(at(0, 0, 0, 0) + offset, duration)
                })
                .collect();

            let points = scan(&events, window(window_size)).unwrap();
            let expected = scan_naive(&events, window_size);

            assert_eq!(points.len(), expected.len());
            for (point, (minute, mean)) in points.iter().zip(expected) {
                assert_eq!(point.date, minute);
                let got = point.average_delivery_time.as_f64();
                assert!((got - mean).abs() < 1e-9, "{got} != {mean} at {minute}");
            }
        }
    }

    #[test]
    fn serializes_to_wire_format() {
        let point = MovingAveragePoint {
            date: at(18, 11, 0, 0),
            average_delivery_time: Average::Fractional(25.5),
        };
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2023-01-01 18:11:00","average_delivery_time":25.5}"#
        );
    }
}
