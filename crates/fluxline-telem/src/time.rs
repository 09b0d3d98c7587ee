use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point in time: signed 64-bit nanoseconds since the Unix epoch.
///
/// Arithmetic with [`TimeSpan`] saturates at the representable bounds, so the
/// open-ended sentinels [`TimeStamp::MIN`] and [`TimeStamp::MAX`] stay stable
/// under offsetting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStamp(pub i64);

impl TimeStamp {
    /// The earliest representable instant. Used as the start of open-ended ranges.
    pub const MIN: TimeStamp = TimeStamp(i64::MIN);
    /// The latest representable instant. Used as the end of open-ended ranges.
    pub const MAX: TimeStamp = TimeStamp(i64::MAX);

    /// Construct from raw nanoseconds since the epoch.
    pub const fn new(nanos: i64) -> Self {
        Self(nanos)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Self(i64::try_from(since_epoch.as_nanos()).unwrap_or(i64::MAX))
    }

    /// Raw nanoseconds since the epoch.
    pub const fn nanos(&self) -> i64 {
        self.0
    }

    /// True if `self` is strictly earlier than `other`.
    pub fn before(&self, other: TimeStamp) -> bool {
        self.0 < other.0
    }

    /// True if `self` is earlier than or equal to `other`.
    pub fn before_eq(&self, other: TimeStamp) -> bool {
        self.0 <= other.0
    }

    /// True if `self` is strictly later than `other`.
    pub fn after(&self, other: TimeStamp) -> bool {
        self.0 > other.0
    }

    /// True if `self` is later than or equal to `other`.
    pub fn after_eq(&self, other: TimeStamp) -> bool {
        self.0 >= other.0
    }

    /// The range starting at `self` and extending for `span`.
    pub fn span_range(&self, span: TimeSpan) -> TimeRange {
        TimeRange::new(*self, *self + span).make_valid()
    }

    /// The range between `self` and `end`.
    pub fn range(&self, end: TimeStamp) -> TimeRange {
        TimeRange::new(*self, end)
    }
}

impl Add<TimeSpan> for TimeStamp {
    type Output = TimeStamp;

    fn add(self, rhs: TimeSpan) -> TimeStamp {
        TimeStamp(self.0.saturating_add(rhs.0))
    }
}

impl Sub<TimeSpan> for TimeStamp {
    type Output = TimeStamp;

    fn sub(self, rhs: TimeSpan) -> TimeStamp {
        TimeStamp(self.0.saturating_sub(rhs.0))
    }
}

impl Sub<TimeStamp> for TimeStamp {
    type Output = TimeSpan;

    fn sub(self, rhs: TimeStamp) -> TimeSpan {
        TimeSpan(self.0.saturating_sub(rhs.0))
    }
}

impl From<i64> for TimeStamp {
    fn from(nanos: i64) -> Self {
        Self(nanos)
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// A signed span of time in nanoseconds.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeSpan(pub i64);

impl TimeSpan {
    pub const ZERO: TimeSpan = TimeSpan(0);
    pub const NANOSECOND: TimeSpan = TimeSpan(1);
    pub const MICROSECOND: TimeSpan = TimeSpan(1_000);
    pub const MILLISECOND: TimeSpan = TimeSpan(1_000_000);
    pub const SECOND: TimeSpan = TimeSpan(1_000_000_000);
    pub const MINUTE: TimeSpan = TimeSpan(60 * Self::SECOND.0);
    pub const HOUR: TimeSpan = TimeSpan(60 * Self::MINUTE.0);
    pub const MAX: TimeSpan = TimeSpan(i64::MAX);

    /// Construct from raw nanoseconds.
    pub const fn new(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Construct from a whole number of the given unit, saturating on overflow.
    pub fn from_units(count: i64, unit: TimeSpan) -> Self {
        Self(count.saturating_mul(unit.0))
    }

    /// Construct from fractional seconds, truncating below nanosecond precision.
    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * Self::SECOND.0 as f64) as i64)
    }

    /// Raw nanoseconds.
    pub const fn nanos(&self) -> i64 {
        self.0
    }

    /// This span as fractional seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / Self::SECOND.0 as f64
    }

    /// Scale by a dimensionless factor, truncating below nanosecond precision.
    pub fn scale(&self, factor: f64) -> TimeSpan {
        Self((self.0 as f64 * factor) as i64)
    }

    /// True if this span is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert to a `std::time::Duration`, clamping negatives to zero.
    pub fn as_duration(&self) -> std::time::Duration {
        std::time::Duration::from_nanos(self.0.max(0) as u64)
    }
}

impl Add for TimeSpan {
    type Output = TimeSpan;

    fn add(self, rhs: TimeSpan) -> TimeSpan {
        TimeSpan(self.0.saturating_add(rhs.0))
    }
}

impl Sub for TimeSpan {
    type Output = TimeSpan;

    fn sub(self, rhs: TimeSpan) -> TimeSpan {
        TimeSpan(self.0.saturating_sub(rhs.0))
    }
}

impl From<std::time::Duration> for TimeSpan {
    fn from(d: std::time::Duration) -> Self {
        Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// A sample rate in Hz.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(pub f64);

impl Rate {
    /// Construct from Hz.
    pub const fn hz(value: f64) -> Self {
        Self(value)
    }

    /// Construct from kHz.
    pub fn khz(value: f64) -> Self {
        Self(value * 1_000.0)
    }

    /// The period between consecutive samples at this rate.
    pub fn period(&self) -> TimeSpan {
        TimeSpan::from_secs_f64(1.0 / self.0)
    }

    /// The number of samples this rate produces over `span`.
    ///
    /// Inverse of [`Rate::span`] up to integer truncation.
    pub fn sample_count(&self, span: TimeSpan) -> usize {
        let count = (span.as_secs_f64() * self.0).round();
        if count <= 0.0 {
            0
        } else {
            count as usize
        }
    }

    /// The span covered by `sample_count` samples at this rate.
    pub fn span(&self, sample_count: usize) -> TimeSpan {
        TimeSpan::from_secs_f64(sample_count as f64 / self.0)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.0)
    }
}

/// A start-inclusive, end-exclusive range of time.
///
/// A range is valid iff `end >= start`. Operations that depend on ordering
/// normalize through [`TimeRange::make_valid`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: TimeStamp,
    pub end: TimeStamp,
}

impl TimeRange {
    /// The maximal range, containing every representable instant.
    pub const MAX: TimeRange = TimeRange {
        start: TimeStamp::MIN,
        end: TimeStamp::MAX,
    };

    /// Construct a range between two instants.
    pub const fn new(start: TimeStamp, end: TimeStamp) -> Self {
        Self { start, end }
    }

    /// The span between start and end.
    pub fn span(&self) -> TimeSpan {
        self.end - self.start
    }

    /// True iff `end >= start`.
    pub fn is_valid(&self) -> bool {
        self.end.after_eq(self.start)
    }

    /// True if the range covers no time at all.
    pub fn is_zero(&self) -> bool {
        self.span().is_zero()
    }

    /// The range with endpoints exchanged.
    pub fn swap(&self) -> TimeRange {
        TimeRange::new(self.end, self.start)
    }

    /// This range if valid, otherwise its swap.
    pub fn make_valid(&self) -> TimeRange {
        if self.is_valid() {
            *self
        } else {
            self.swap()
        }
    }

    /// True if `ts` falls within the range (start-inclusive, end-exclusive).
    pub fn contains_stamp(&self, ts: TimeStamp) -> bool {
        ts.after_eq(self.start) && ts.before(self.end)
    }

    /// True if `other` lies entirely within this range.
    pub fn contains_range(&self, other: TimeRange) -> bool {
        let other = other.make_valid();
        other.end.before_eq(self.end) && other.start.after_eq(self.start)
    }

    /// Clamp this range so it lies within `bound`.
    pub fn bound_by(&self, bound: TimeRange) -> TimeRange {
        let mut out = *self;
        if bound.start.after(out.start) {
            out.start = bound.start;
        }
        if bound.start.after(out.end) {
            out.end = bound.start;
        }
        if bound.end.before(out.end) {
            out.end = bound.end;
        }
        if bound.end.before(out.start) {
            out.start = bound.end;
        }
        out
    }

    /// True if the two ranges share at least one instant. Symmetric.
    pub fn overlaps_with(&self, other: TimeRange) -> bool {
        let a = self.make_valid();
        let b = other.make_valid();
        if a == b {
            return true;
        }
        // Touching endpoints share no instant: ends are exclusive.
        if a.start == b.end || b.start == a.end {
            return false;
        }
        a.contains_stamp(b.start) || b.contains_stamp(a.start)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
