//! The searchable keyspace: phone-number-shaped passwords.
//!
//! Candidate passwords are Israeli mobile numbers (`05X-XXXXXXX`). The full
//! keyspace is a priority-ordered list of disjoint ranges so that
//! statistically common prefixes are searched first; each range is carved
//! into fixed-size sub-ranges that become one job each.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MasterError;

/// Smallest valid number, `050-0000000`, without its leading zero.
const MIN_VALUE: u64 = 500_000_000;
/// Largest valid number, `059-9999999`, without its leading zero.
const MAX_VALUE: u64 = 599_999_999;

/// A validated phone number, stored as its numeric value.
///
/// Accepts the dashed form (`052-7500000`) and the bare 10-digit form
/// (`0527500000`); always renders dashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhoneNumber(u64);

impl PhoneNumber {
    fn from_value(value: u64) -> Option<Self> {
        (MIN_VALUE..=MAX_VALUE).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Value is always 9 digits starting with 5.
        let digits = self.0.to_string();
        write!(f, "0{}-{}", &digits[..2], &digits[2..])
    }
}

impl FromStr for PhoneNumber {
    type Err = MasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MasterError::InvalidPhoneNumber(s.to_string());
        if !s.is_ascii() {
            return Err(invalid());
        }
        let digits = match s.len() {
            11 if s.as_bytes()[3] == b'-' => format!("{}{}", &s[..3], &s[4..]),
            10 => s.to_string(),
            _ => return Err(invalid()),
        };
        if !digits.starts_with("05") || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u64 = digits[1..].parse().map_err(|_| invalid())?;
        PhoneNumber::from_value(value).ok_or_else(invalid)
    }
}

impl Serialize for PhoneNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PhoneNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A contiguous, inclusive slice of the keyspace. One sub-range is one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRange {
    pub start: PhoneNumber,
    pub end: PhoneNumber,
}

impl SubRange {
    pub fn new(start: PhoneNumber, end: PhoneNumber) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self { start, end }
    }

    /// Number of candidate passwords in this sub-range.
    pub fn len(&self) -> u64 {
        self.end.0 - self.start.0 + 1
    }

    /// Always false: bounds are inclusive, so a sub-range holds at least
    /// one candidate.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Splits the sub-range into chunks of at most `chunk_size` candidates,
    /// ascending and disjoint, the last one truncated to the remainder.
    pub fn chunks(self, chunk_size: u64) -> Chunks {
        assert!(chunk_size > 0, "chunk size must be positive");
        Chunks {
            next_start: self.start.0,
            end: self.end.0,
            chunk_size,
            done: false,
        }
    }
}

impl fmt::Display for SubRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Lazy iterator over the fixed-size chunks of one range.
#[derive(Debug, Clone)]
pub struct Chunks {
    next_start: u64,
    end: u64,
    chunk_size: u64,
    done: bool,
}

impl Iterator for Chunks {
    type Item = SubRange;

    fn next(&mut self) -> Option<SubRange> {
        if self.done {
            return None;
        }
        let chunk_end = self.end.min(self.next_start + self.chunk_size - 1);
        let item = SubRange {
            start: PhoneNumber(self.next_start),
            end: PhoneNumber(chunk_end),
        };
        if chunk_end == self.end {
            self.done = true;
        } else {
            self.next_start = chunk_end + 1;
        }
        Some(item)
    }
}

/// Prefix blocks actually allocated to carriers, most common first, then the
/// uncommon remainder of the 055 block and the unallocated 057 block.
const PRIORITY_RANGES: &[(&str, &str)] = &[
    ("050-0000000", "054-9999999"),
    ("055-2200000", "055-2799999"),
    ("055-3200000", "055-3399999"),
    ("055-4400000", "055-4499999"),
    ("055-5000000", "055-5199999"),
    ("055-5500000", "055-5599999"),
    ("055-6600000", "055-6899999"),
    ("055-7000000", "055-7299999"),
    ("055-8700000", "055-9999999"),
    ("056-0000000", "056-9999999"),
    ("058-0000000", "058-9999999"),
    ("059-0000000", "059-9999999"),
    ("055-0000000", "055-2199999"),
    ("055-2800000", "055-3199999"),
    ("055-3400000", "055-4399999"),
    ("055-4500000", "055-4999999"),
    ("055-5200000", "055-5499999"),
    ("055-5600000", "055-6599999"),
    ("055-6900000", "055-6999999"),
    ("055-7300000", "055-8699999"),
    ("057-0000000", "057-9999999"),
];

/// The total search space: an ordered list of disjoint ranges consumed in
/// operator-chosen priority order.
#[derive(Debug, Clone)]
pub struct Keyspace {
    ranges: Vec<SubRange>,
}

impl Keyspace {
    /// Keyspace in carrier-priority order (the default).
    pub fn priority() -> Self {
        let ranges = PRIORITY_RANGES
            .iter()
            .map(|(start, end)| {
                SubRange::new(
                    start.parse().expect("priority range start is valid"),
                    end.parse().expect("priority range end is valid"),
                )
            })
            .collect();
        Self { ranges }
    }

    /// Keyspace as one flat range in plain numeric order.
    pub fn numeric() -> Self {
        Self {
            ranges: vec![SubRange {
                start: PhoneNumber(MIN_VALUE),
                end: PhoneNumber(MAX_VALUE),
            }],
        }
    }

    pub fn ranges(&self) -> &[SubRange] {
        &self.ranges
    }

    /// Partitions the whole keyspace into job-sized sub-ranges, range by
    /// range in priority order. The iterator is lazy and restartable.
    pub fn partition(&self, chunk_size: u64) -> impl Iterator<Item = SubRange> + '_ {
        self.ranges.iter().flat_map(move |r| r.chunks(chunk_size))
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::priority()
    }
}
