//! Data points and the playlist they are sounded from

use std::ops::Index;

/// One sonifiable event: a titled value spanning `[start, end]`.
///
/// Timestamps are seconds since the Unix epoch. `start <= end` is expected but
/// not enforced, and `value` may be negative, zero or non-finite.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataPoint {
    pub title: String,
    pub value: f64,
    pub start: f64,
    pub end: f64,
}

impl DataPoint {
    pub fn new(title: impl Into<String>, value: f64, start: f64, end: f64) -> Self {
        Self {
            title: title.into(),
            value,
            start,
            end,
        }
    }

    /// Source-time length of the event (may be zero or negative)
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Minimum and maximum over the finite values of a playlist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// True when the range cannot be divided by (no finite values, or all equal)
    pub fn is_degenerate(&self) -> bool {
        let width = self.max - self.min;
        !(width.is_finite() && width > 0.0)
    }
}

/// Earliest start and latest end of a playlist
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSpan {
    pub start: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    /// True when the span is zero, negative or not finite
    pub fn is_degenerate(&self) -> bool {
        let width = self.width();
        !(width.is_finite() && width > 0.0)
    }
}

/// Points ordered ascending by `start`.
///
/// The order is a scheduling invariant: inter-note delays are computed from
/// adjacent starts. A playlist is never mutated after construction, only
/// replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playlist {
    points: Vec<DataPoint>,
}

impl Playlist {
    /// Build a playlist, stable-sorting by `start`.
    ///
    /// `total_cmp` gives NaN starts a fixed place instead of poisoning the sort.
    pub fn new(mut points: Vec<DataPoint>) -> Self {
        points.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&DataPoint> {
        self.points.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter()
    }

    /// Min/max over finite values; `None` for an empty playlist
    pub fn value_range(&self) -> Option<ValueRange> {
        if self.points.is_empty() {
            return None;
        }
        let (min, max) = self
            .points
            .iter()
            .map(|p| p.value)
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        Some(ValueRange { min, max })
    }

    /// Earliest start / latest end; `None` for an empty playlist
    pub fn time_span(&self) -> Option<TimeSpan> {
        if self.points.is_empty() {
            return None;
        }
        let start = self
            .points
            .iter()
            .map(|p| p.start)
            .fold(f64::INFINITY, f64::min);
        let end = self
            .points
            .iter()
            .map(|p| p.end)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(TimeSpan { start, end })
    }
}

impl Index<usize> for Playlist {
    type Output = DataPoint;

    fn index(&self, index: usize) -> &DataPoint {
        &self.points[index]
    }
}

impl From<Vec<DataPoint>> for Playlist {
    fn from(points: Vec<DataPoint>) -> Self {
        Playlist::new(points)
    }
}
