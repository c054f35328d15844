use crate::event::{DurationValue, Event};
use serde::Serialize;
use std::ops::Range;

/// Mean of a window, serialized without a fractional part when it has none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Average {
    Whole(i64),
    Fractional(f64),
}

impl Average {
    pub fn from_f64(val: f64) -> Self {
        if val.fract() == 0.0 && val >= i64::MIN as f64 && val < i64::MAX as f64 {
            Average::Whole(val as i64)
        } else {
            Average::Fractional(val)
        }
    }

    #[cfg(test)]
    pub fn as_f64(self) -> f64 {
        match self {
            Average::Whole(val) => val as f64,
            Average::Fractional(val) => val,
        }
    }
}

/// Durations of time-sorted events, arranged so that the mean of any
/// contiguous run can be taken.
///
/// Integer durations are kept as exact prefix sums, so any run costs O(1).
/// As soon as one duration is fractional every run is summed in floating
/// point instead, at a cost linear in its length.
pub enum WindowSums {
    Exact(Vec<i128>),
    Float(Vec<f64>),
}

impl WindowSums {
    pub fn new(events: &[Event]) -> Self {
        let all_int = events
            .iter()
            .all(|event| matches!(event.duration, DurationValue::Int(_)));

        if all_int {
            let mut prefix = Vec::with_capacity(events.len() + 1);
            let mut sum = 0i128;
            prefix.push(sum);
            for event in events {
                if let DurationValue::Int(val) = event.duration {
                    sum += i128::from(val);
                }
                prefix.push(sum);
            }
            WindowSums::Exact(prefix)
        } else {
            WindowSums::Float(events.iter().map(|event| event.duration.as_f64()).collect())
        }
    }

    /// Mean over the events in `range`, or zero if it is empty.
    pub fn mean(&self, range: Range<usize>) -> Average {
        let n_vals = range.len();
        if n_vals == 0 {
            return Average::Whole(0);
        }

        match self {
            WindowSums::Exact(prefix) => {
                let sum = prefix[range.end] - prefix[range.start];
                let count = n_vals as i128;
                match i64::try_from(sum / count) {
                    Ok(quot) if sum % count == 0 => Average::Whole(quot),
                    _ => Average::Fractional(sum as f64 / n_vals as f64),
                }
            }
            WindowSums::Float(vals) => {
                let vals = &vals[range];
                let n_vals = n_vals as f64;
                let sum: f64 = vals.iter().sum();
                // Scale before summing when the plain sum overflows.
                let mean = if sum.is_finite() {
                    sum / n_vals
                } else {
                    vals.iter().map(|val| val / n_vals).sum()
                };
                Average::from_f64(mean)
            }
        }
    }
}
