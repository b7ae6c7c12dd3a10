//! Timestamp grammars used in marker and granule file names
//!
//! Marker identifiers are compact digit strings (`YYYYMMDD`, `YYYYMMDDHH`,
//! `YYYYMMDDHHMM`). Granule files use dashed day-first or ISO date names.
//! Parsing is done by slicing fixed-width fields so every accepted name
//! formats back to itself.

use crate::error::{Result, WatchError};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// Compact identifier format of a marker stem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `YYYYMMDD`
    Day,
    /// `YYYYMMDDHH`
    Hour,
    /// `YYYYMMDDHHMM`
    Minute,
}

impl TimestampFormat {
    /// Number of digits in a well-formed identifier
    pub fn width(self) -> usize {
        match self {
            Self::Day => 8,
            Self::Hour => 10,
            Self::Minute => 12,
        }
    }

    /// Parse an identifier such as `2025010100`
    pub fn parse(self, input: &str) -> Result<NaiveDateTime> {
        if input.len() != self.width() || !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(WatchError::parse("timestamp identifier", input));
        }

        let field = |range: std::ops::Range<usize>| -> u32 {
            // Digits were checked above, so the slice always parses
            input[range].parse().unwrap_or(0)
        };

        let year = field(0..4) as i32;
        let month = field(4..6);
        let day = field(6..8);
        let hour = if self.width() >= 10 { field(8..10) } else { 0 };
        let minute = if self.width() >= 12 { field(10..12) } else { 0 };

        build(year, month, day, hour, minute).ok_or_else(|| WatchError::parse("timestamp identifier", input))
    }

    /// Format a timestamp as an identifier
    pub fn format(self, ts: NaiveDateTime) -> String {
        match self {
            Self::Day => ts.format("%Y%m%d").to_string(),
            Self::Hour => ts.format("%Y%m%d%H").to_string(),
            Self::Minute => ts.format("%Y%m%d%H%M").to_string(),
        }
    }
}

/// File name grammar of a family's granules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranulePattern {
    /// `DD-MM-YYYY-HH-MM.tif`, one file per minute (radar)
    DayFirstMinute,
    /// `DD-MM-YYYY-HH.tif` or `DD-MM-YYYY-HH-MM.tif`, `.tif` or `.tiff` (wave)
    DayFirstHour,
    /// `YYYY-MM-DD.tif` or `.tiff` (sub-seasonal)
    IsoDay,
}

impl GranulePattern {
    /// Parse a granule file name into its timestamp
    pub fn parse(self, file_name: &str) -> Result<NaiveDateTime> {
        let err = || WatchError::parse("granule timestamp", file_name);

        let stem = match self {
            Self::DayFirstMinute => file_name.strip_suffix(".tif"),
            Self::DayFirstHour | Self::IsoDay => file_name
                .strip_suffix(".tiff")
                .or_else(|| file_name.strip_suffix(".tif")),
        }
        .ok_or_else(err)?;

        let parts: Vec<&str> = stem.split('-').collect();
        let numbers = parts
            .iter()
            .map(|p| {
                if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    p.parse::<u32>().ok()
                }
            })
            .collect::<Option<Vec<u32>>>()
            .ok_or_else(err)?;

        let widths: Vec<usize> = parts.iter().map(|p| p.len()).collect();

        let ts = match (self, numbers.as_slice()) {
            (Self::DayFirstMinute, &[d, mo, y, h, mi]) if widths == [2, 2, 4, 2, 2] => {
                build(y as i32, mo, d, h, mi)
            }
            (Self::DayFirstHour, &[d, mo, y, h]) if widths == [2, 2, 4, 2] => build(y as i32, mo, d, h, 0),
            (Self::DayFirstHour, &[d, mo, y, h, mi]) if widths == [2, 2, 4, 2, 2] => {
                build(y as i32, mo, d, h, mi)
            }
            (Self::IsoDay, &[y, mo, d]) if widths == [4, 2, 2] => build(y as i32, mo, d, 0, 0),
            _ => None,
        };

        ts.ok_or_else(err)
    }

    /// Canonical file name for a timestamp
    pub fn file_name(self, ts: NaiveDateTime) -> String {
        match self {
            Self::DayFirstMinute => ts.format("%d-%m-%Y-%H-%M.tif").to_string(),
            Self::DayFirstHour => {
                if ts.minute() == 0 {
                    ts.format("%d-%m-%Y-%H.tif").to_string()
                } else {
                    ts.format("%d-%m-%Y-%H-%M.tif").to_string()
                }
            }
            Self::IsoDay => format!("{:04}-{:02}-{:02}.tif", ts.year(), ts.month(), ts.day()),
        }
    }
}

/// Closed interval of timestamps encoded as `<start>-<end>` in marker names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub format: TimestampFormat,
}

impl MarkerRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, format: TimestampFormat) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self { start, end, format }
    }

    /// Parse `start-end`; a bare identifier yields a degenerate range
    pub fn parse(stem: &str, format: TimestampFormat) -> Result<Self> {
        match stem.split_once('-') {
            Some((from, to)) => {
                let start = format.parse(from)?;
                let end = format.parse(to)?;
                Ok(Self::new(start, end, format))
            }
            None => {
                let at = format.parse(stem)?;
                Ok(Self::new(at, at, format))
            }
        }
    }

    /// Smallest range covering every timestamp, if any
    pub fn spanning<I>(timestamps: I, format: TimestampFormat) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut iter = timestamps.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
        Some(Self::new(min, max, format))
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// `start-end`, or the bare identifier when both ends coincide
impl fmt::Display for MarkerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            return f.write_str(&self.format.format(self.start));
        }
        write!(f, "{}-{}", self.format.format(self.start), self.format.format(self.end))
    }
}

fn build(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}
