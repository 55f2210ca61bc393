use std::fmt::Display;
use std::time::Duration;

use super::constants::{NANOS_PER_SECOND, NO_DEPTH_FLAG};
use super::error::TimeParseError;

/// The time of an event, measured from the start of the simulated run.
///
/// Stored as whole seconds plus a nanosecond remainder so that ordering is exact and the
/// textual form never suffers from floating point rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventTime(Duration);

impl EventTime {
    pub fn new(seconds: u64, nanoseconds: u32) -> Self {
        Self(Duration::new(seconds, nanoseconds))
    }

    /// Convert floating point seconds. Negative and non-finite values are rejected.
    pub fn from_secs_f64(seconds: f64) -> Option<Self> {
        Duration::try_from_secs_f64(seconds).ok().map(Self)
    }

    pub fn seconds(&self) -> u64 {
        self.0.as_secs()
    }

    pub fn nanoseconds(&self) -> u32 {
        self.0.subsec_nanos()
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Parse a decimal seconds string (i.e. `12.000345`) without going through a float.
    ///
    /// Digits past nanosecond precision are truncated.
    pub fn parse_decimal(text: &str) -> Result<Self, TimeParseError> {
        let text = text.trim();
        let bad = || TimeParseError(text.to_string());
        let (whole, frac) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(bad());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(bad());
        }
        let seconds: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| bad())?
        };
        let mut nanoseconds: u32 = 0;
        let mut scale = NANOS_PER_SECOND / 10;
        for digit in frac.bytes().take(9) {
            nanoseconds += (digit - b'0') as u32 * scale;
            scale /= 10;
        }
        Ok(Self::new(seconds, nanoseconds))
    }
}

/// Renders as `<seconds>.<nanoseconds>`, the nanoseconds zero padded to nine digits
impl Display for EventTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:0>9}", self.seconds(), self.nanoseconds())
    }
}

/// Which side of a double-sided strip detector a strip belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripAxis {
    X,
    Y,
}

impl StripAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
        }
    }
}

impl Display for StripAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single reconstructed hit on one strip.
///
/// Energy is in keV, depth in cm measured from the detector mid-plane.
#[derive(Debug, Clone, PartialEq)]
pub struct StripHit {
    pub detector_id: u32,
    pub axis: StripAxis,
    pub strip: u32,
    pub energy: f64,
    pub depth: f64,
    pub noise_flags: Vec<String>,
}

impl StripHit {
    pub fn new(detector_id: u32, axis: StripAxis, strip: u32, energy: f64, depth: f64) -> Self {
        Self {
            detector_id,
            axis,
            strip,
            energy,
            depth,
            noise_flags: Vec::new(),
        }
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.add_flag(flag);
        self
    }

    pub fn add_flag(&mut self, flag: &str) {
        if !self.has_flag(flag) {
            self.noise_flags.push(flag.to_string());
        }
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.noise_flags.iter().any(|f| f == flag)
    }

    pub fn has_depth(&self) -> bool {
        !self.has_flag(NO_DEPTH_FLAG)
    }
}

/// A reconstructed hit in a detector which is not strip segmented
#[derive(Debug, Clone, PartialEq)]
pub struct OtherHit {
    pub detector_id: u32,
    pub energy: f64,
}

/// The kinds of sub-records a reconstruction can produce. Only strip hits make it into ROA.
#[derive(Debug, Clone, PartialEq)]
pub enum SubRecord {
    Strip(StripHit),
    Other(OtherHit),
}

impl SubRecord {
    pub fn as_strip_hit(&self) -> Option<&StripHit> {
        match self {
            Self::Strip(hit) => Some(hit),
            Self::Other(_) => None,
        }
    }
}

/// One reconstructed physics event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReconstructedEvent {
    pub time: EventTime,
    pub records: Vec<SubRecord>,
}

impl ReconstructedEvent {
    pub fn new(time: EventTime) -> Self {
        Self {
            time,
            records: Vec::new(),
        }
    }

    pub fn strip_hits(&self) -> impl Iterator<Item = &StripHit> {
        self.records.iter().filter_map(SubRecord::as_strip_hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_parse_and_render() {
        let time = EventTime::parse_decimal("12.000345").unwrap();
        assert_eq!(time.seconds(), 12);
        assert_eq!(time.nanoseconds(), 345_000);
        assert_eq!(time.to_string(), "12.000345000");

        assert_eq!(EventTime::parse_decimal("7").unwrap().to_string(), "7.000000000");
        assert_eq!(EventTime::parse_decimal(".5").unwrap(), EventTime::new(0, 500_000_000));
        // Beyond nanosecond precision is truncated
        assert_eq!(
            EventTime::parse_decimal("1.1234567899").unwrap(),
            EventTime::new(1, 123_456_789)
        );
    }

    #[test]
    fn test_time_parse_rejects_garbage() {
        assert!(EventTime::parse_decimal("").is_err());
        assert!(EventTime::parse_decimal("-1.0").is_err());
        assert!(EventTime::parse_decimal("1e3").is_err());
        assert!(EventTime::parse_decimal("1.2.3").is_err());
    }

    #[test]
    fn test_time_ordering() {
        let a = EventTime::parse_decimal("3.9").unwrap();
        let b = EventTime::parse_decimal("5.0").unwrap();
        let c = EventTime::parse_decimal("5.000000001").unwrap();
        assert!(a < b && b < c);
        assert_eq!(EventTime::from_secs_f64(10.0), Some(EventTime::new(10, 0)));
        assert_eq!(EventTime::from_secs_f64(-1.0), None);
    }

    #[test]
    fn test_strip_hits_skip_other_records() {
        let mut event = ReconstructedEvent::new(EventTime::new(1, 0));
        event.records.push(SubRecord::Other(OtherHit {
            detector_id: 4,
            energy: 100.0,
        }));
        event
            .records
            .push(SubRecord::Strip(StripHit::new(2, StripAxis::Y, 5, 30.0, 0.1)));
        let hits: Vec<&StripHit> = event.strip_hits().collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].axis, StripAxis::Y);
    }

    #[test]
    fn test_noise_flags() {
        let hit = StripHit::new(1, StripAxis::X, 0, 1.0, 0.0).with_flag(NO_DEPTH_FLAG);
        assert!(!hit.has_depth());
        let hit = hit.with_flag(NO_DEPTH_FLAG);
        assert_eq!(hit.noise_flags.len(), 1);
    }
}
