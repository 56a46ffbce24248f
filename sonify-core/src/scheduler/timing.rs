//! Per-tick pitch and timing math

use super::policy::ScorePolicy;
use crate::types::{Playlist, ValueRange};
use std::time::Duration;

/// Map a value onto a scale of `steps` pitches.
///
/// `round((value - min) * (steps - 1) / (max - min))`, clamped to
/// `[0, steps - 1]`. A degenerate range maps every value to the middle of the
/// scale; a non-finite value maps to the bottom.
pub fn pitch_index(value: f64, range: ValueRange, steps: usize) -> usize {
    if steps == 0 {
        return 0;
    }
    let top = steps - 1;
    if !value.is_finite() {
        return 0;
    }
    if range.is_degenerate() {
        return top / 2;
    }

    let scaled = ((value - range.min) * top as f64 / (range.max - range.min)).round();
    if scaled.is_nan() {
        0
    } else {
        scaled.max(0.0).min(top as f64) as usize
    }
}

/// The shortest wait between ticks is this fraction of the note duration
const MIN_DELAY_DIVISOR: u32 = 64;

/// Absolute floor on the wait between ticks
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Shortest wait allowed between two ticks at `note_duration`.
///
/// Zero-width gaps (equal starts, a zero-length last point, a zero score)
/// are legal data, but a zero delay would re-arm the tick for the same
/// instant forever.
pub fn min_delay(note_duration: Duration) -> Duration {
    (note_duration / MIN_DELAY_DIVISOR).max(MIN_DELAY)
}

/// Timing of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTiming {
    /// How long the note should sound
    pub note_length: Duration,
    /// Wait before the next tick
    pub delay: Duration,
    /// Playback seconds per source second; `None` when the time span is degenerate
    pub compression: Option<f64>,
    /// The next tick starts over from the beginning of the playlist
    pub wrapped: bool,
}

impl TickTiming {
    /// Compute timing for the point at `index`; `None` for an empty playlist.
    ///
    /// The delay to the next tick is the gap between adjacent starts scaled
    /// by the compression factor. When playback wraps to the first point the
    /// sounded point's own length is used instead, so the loop-around gap is
    /// never negative. A degenerate span spaces ticks evenly across the score.
    /// Delays never drop below [`min_delay`].
    pub fn compute(
        playlist: &Playlist,
        index: usize,
        policy: &ScorePolicy,
        note_duration: Duration,
    ) -> Option<TickTiming> {
        let len = playlist.len();
        let point = playlist.get(index)?;
        let span = playlist.time_span()?;

        let note_secs = note_duration.as_secs_f64();
        let floor = min_delay(note_duration);
        let score = policy.score_duration(note_secs, len);

        let next_index = (index + 1) % len;
        let next = &playlist[next_index];
        let wrapped = next_index == 0 || !(next.start >= point.start);

        if span.is_degenerate() {
            let (lower, _) = policy.note_bounds(note_secs);
            return Some(TickTiming {
                note_length: seconds(lower),
                delay: seconds(score / len as f64).max(floor),
                compression: None,
                wrapped,
            });
        }

        let tick = score / span.width();
        let raw_length = point.duration() * tick;
        let raw_delay = if wrapped {
            point.duration() * tick
        } else {
            (next.start - point.start) * tick
        };

        Some(TickTiming {
            note_length: seconds(policy.clamp_note(raw_length, note_secs)),
            delay: seconds(raw_delay).max(floor),
            compression: Some(tick),
            wrapped,
        })
    }
}

/// Seconds to `Duration`; negative, NaN or overflowing values become zero
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataPoint;

    fn range(min: f64, max: f64) -> ValueRange {
        ValueRange { min, max }
    }

    fn playlist(points: &[(f64, f64, f64)]) -> Playlist {
        Playlist::new(
            points
                .iter()
                .enumerate()
                .map(|(i, &(v, s, e))| DataPoint::new(format!("p{}", i), v, s, e))
                .collect(),
        )
    }

    fn approx(a: Duration, secs: f64) -> bool {
        (a.as_secs_f64() - secs).abs() < 1e-9
    }

    #[test]
    fn test_pitch_index_endpoints() {
        let r = range(1.0, 3.0);
        assert_eq!(pitch_index(1.0, r, 8), 0);
        assert_eq!(pitch_index(3.0, r, 8), 7);
        // 3.5 rounds up
        assert_eq!(pitch_index(2.0, r, 8), 4);
    }

    #[test]
    fn test_pitch_index_bounds_for_all_values() {
        let r = range(-10.0, 10.0);
        for i in -100..=100 {
            let idx = pitch_index(i as f64 * 0.1, r, 28);
            assert!(idx <= 27);
        }
        // Outside the range is clamped rather than overflowing the scale
        assert_eq!(pitch_index(50.0, r, 28), 27);
        assert_eq!(pitch_index(-50.0, r, 28), 0);
    }

    #[test]
    fn test_pitch_index_degenerate_range() {
        let r = range(5.0, 5.0);
        assert_eq!(pitch_index(5.0, r, 8), 3);
        assert_eq!(pitch_index(5.0, r, 1), 0);

        let empty = range(f64::INFINITY, f64::NEG_INFINITY);
        assert_eq!(pitch_index(1.0, empty, 8), 3);
    }

    #[test]
    fn test_pitch_index_non_finite_value() {
        let r = range(0.0, 1.0);
        assert_eq!(pitch_index(f64::NAN, r, 8), 0);
        assert_eq!(pitch_index(f64::NEG_INFINITY, r, 8), 0);
        assert_eq!(pitch_index(0.5, r, 0), 0);
    }

    #[test]
    fn test_delays_follow_start_gaps() {
        // Span 0..4, 3 points, 2s notes: score = 2 * 3 / 4 = 1.5s, tick = 0.375
        let list = playlist(&[(1.0, 0.0, 1.0), (2.0, 1.0, 3.0), (3.0, 3.0, 4.0)]);
        let policy = ScorePolicy::default();
        let note = Duration::from_secs(2);

        let t0 = TickTiming::compute(&list, 0, &policy, note).unwrap();
        let t1 = TickTiming::compute(&list, 1, &policy, note).unwrap();
        let t2 = TickTiming::compute(&list, 2, &policy, note).unwrap();

        assert_eq!(t0.compression, Some(0.375));
        assert!(approx(t0.delay, 0.375));
        assert!(approx(t1.delay, 0.75));
        // Wrap-around uses the point's own length
        assert!(t2.wrapped);
        assert!(approx(t2.delay, 0.375));
        assert!(!t0.wrapped && !t1.wrapped);
    }

    #[test]
    fn test_note_length_is_clamped() {
        let list = playlist(&[(1.0, 0.0, 0.0), (2.0, 0.0, 100.0)]);
        let policy = ScorePolicy::Fixed {
            per_point: 10.0,
            min_note: 0.1,
            max_note: 1.0,
        };
        let note = Duration::from_secs(1);

        // Zero-width event still sounds for the lower bound
        let short = TickTiming::compute(&list, 0, &policy, note).unwrap();
        assert!(approx(short.note_length, 0.1));

        // Full-span event (20s of score) never exceeds the upper bound
        let long = TickTiming::compute(&list, 1, &policy, note).unwrap();
        assert!(approx(long.note_length, 1.0));
    }

    #[test]
    fn test_degenerate_span_spaces_evenly() {
        let list = playlist(&[(1.0, 5.0, 5.0), (2.0, 5.0, 5.0), (3.0, 5.0, 5.0), (4.0, 5.0, 5.0)]);
        let policy = ScorePolicy::default();
        let timing = TickTiming::compute(&list, 1, &policy, Duration::from_secs(2)).unwrap();

        // score = 2 * 4 / 4 = 2s over 4 points
        assert!(approx(timing.delay, 0.5));
        assert!(approx(timing.note_length, 2.0));
        assert_eq!(timing.compression, None);
    }

    #[test]
    fn test_single_point_always_wraps() {
        let list = playlist(&[(1.0, 0.0, 2.0)]);
        let policy = ScorePolicy::default();
        let timing = TickTiming::compute(&list, 0, &policy, Duration::from_secs(2)).unwrap();
        assert!(timing.wrapped);
        // score = 0.5s across a 2s span: the point's own length fills the score
        assert!(approx(timing.delay, 0.5));
    }

    #[test]
    fn test_inverted_point_never_yields_negative_delay() {
        let list = playlist(&[(1.0, 0.0, 4.0), (2.0, 2.0, 1.0)]);
        let policy = ScorePolicy::default();
        let timing = TickTiming::compute(&list, 1, &policy, Duration::from_secs(2)).unwrap();
        assert!(timing.wrapped);
        assert_eq!(timing.delay, min_delay(Duration::from_secs(2)));
    }

    #[test]
    fn test_zero_width_gaps_keep_a_minimum_delay() {
        // Equal starts and a zero-length last point: every raw delay is zero
        let list = playlist(&[(1.0, 0.0, 10.0), (2.0, 0.0, 0.0)]);
        let policy = ScorePolicy::default();
        let note = Duration::from_secs(2);
        for index in 0..2 {
            let timing = TickTiming::compute(&list, index, &policy, note).unwrap();
            assert_eq!(timing.delay, Duration::from_millis(31) + Duration::from_micros(250));
        }
    }

    #[test]
    fn test_zero_score_keeps_a_minimum_delay() {
        let list = playlist(&[(1.0, 0.0, 1.0), (2.0, 1.0, 2.0)]);
        let policy = ScorePolicy::Fixed {
            per_point: 0.0,
            min_note: 0.1,
            max_note: 1.0,
        };
        let timing = TickTiming::compute(&list, 0, &policy, Duration::from_secs(1)).unwrap();
        assert_eq!(timing.delay, min_delay(Duration::from_secs(1)));
        assert!(timing.delay > Duration::ZERO);
    }

    #[test]
    fn test_min_delay_floor() {
        assert_eq!(min_delay(Duration::from_secs(2)), Duration::from_micros(31_250));
        assert_eq!(min_delay(Duration::from_micros(10)), Duration::from_millis(1));
    }

    #[test]
    fn test_empty_or_out_of_range() {
        let policy = ScorePolicy::default();
        assert!(TickTiming::compute(&Playlist::default(), 0, &policy, Duration::from_secs(1)).is_none());
        let list = playlist(&[(1.0, 0.0, 1.0)]);
        assert!(TickTiming::compute(&list, 5, &policy, Duration::from_secs(1)).is_none());
    }
}
