//! Dataset families and their per-family capabilities
//!
//! Every behaviour that differs between data families (identifier grammar,
//! ordering, coverage of published markers, debounce window, retention and
//! granule layout) is answered by a method on [`Family`].

use crate::error::WatchError;
use crate::timestamp::{GranulePattern, TimestampFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Family of externally produced datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    /// Periodic forecast mosaics, one batch per run (`YYYYMMDDHH`)
    Mosaic,
    /// Seasonal aggregates (`YYYYMMDD`)
    Seasonal,
    /// Sub-seasonal aggregates, published as a date range
    SubSeasonal,
    /// Continuously rolling radar feed, one granule per minute
    Radar,
    /// Wave forecast feed
    Wave,
}

/// How the batch identifier is cut out of a ready marker name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierRule {
    /// Everything before the ready suffix
    StripReadySuffix,
    /// Everything before the first `.`
    FirstSeparator,
}

/// How a published (or claim) marker is matched against a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// Marker named exactly after the batch identifier
    Exact,
    /// Range-named marker covers every batch up to its end timestamp
    RangeEnd,
    /// Marker records the run it published in a `Run:` line
    RecordedRun,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::Mosaic,
        Family::Seasonal,
        Family::SubSeasonal,
        Family::Radar,
        Family::Wave,
    ];

    /// Configuration tag
    pub fn tag(self) -> &'static str {
        match self {
            Self::Mosaic => "mosaic",
            Self::Seasonal => "seasonal",
            Self::SubSeasonal => "sub-seasonal",
            Self::Radar => "radar",
            Self::Wave => "wave",
        }
    }

    /// Grammar of batch identifiers (the ordering key)
    pub fn id_format(self) -> TimestampFormat {
        match self {
            Self::Mosaic | Self::Wave => TimestampFormat::Hour,
            Self::Seasonal | Self::SubSeasonal => TimestampFormat::Day,
            Self::Radar => TimestampFormat::Minute,
        }
    }

    pub fn identifier_rule(self) -> IdentifierRule {
        match self {
            Self::Mosaic | Self::Seasonal => IdentifierRule::StripReadySuffix,
            Self::SubSeasonal | Self::Radar | Self::Wave => IdentifierRule::FirstSeparator,
        }
    }

    pub fn coverage(self) -> Coverage {
        match self {
            Self::Mosaic | Self::Seasonal => Coverage::Exact,
            Self::Radar => Coverage::RangeEnd,
            Self::SubSeasonal | Self::Wave => Coverage::RecordedRun,
        }
    }

    /// Grammar of the timestamps inside range-named markers
    pub fn range_format(self) -> TimestampFormat {
        self.id_format()
    }

    /// Age after which a claim is considered stale
    pub fn debounce_secs(self) -> u64 {
        match self {
            Self::Mosaic | Self::Seasonal => 600,
            Self::Radar => 1800,
            Self::SubSeasonal | Self::Wave => 300,
        }
    }

    /// Live-data window for streaming families
    pub fn retention_hours(self) -> Option<u64> {
        match self {
            Self::Radar | Self::Wave => Some(72),
            _ => None,
        }
    }

    pub fn is_streaming(self) -> bool {
        self.retention_hours().is_some()
    }

    pub fn granule_pattern(self) -> Option<GranulePattern> {
        match self {
            Self::Radar => Some(GranulePattern::DayFirstMinute),
            Self::Wave => Some(GranulePattern::DayFirstHour),
            Self::SubSeasonal => Some(GranulePattern::IsoDay),
            Self::Mosaic | Self::Seasonal => None,
        }
    }

    /// Directory depth below the granule root where granules live
    ///
    /// Radar keeps files flat, wave nests one variable directory, sub-seasonal
    /// nests variable and value directories.
    pub fn granule_depth(self) -> usize {
        match self {
            Self::Radar => 1,
            Self::Wave => 2,
            Self::SubSeasonal => 3,
            Self::Mosaic | Self::Seasonal => 0,
        }
    }

    /// Default subdirectory (relative to the watched directory) holding granules
    pub fn default_granule_dir(self) -> Option<&'static str> {
        match self {
            Self::Radar => Some("files"),
            _ => None,
        }
    }

    /// Task submitted to the dispatcher when a batch becomes ready
    pub fn default_task(self) -> &'static str {
        match self {
            Self::Mosaic => "update_geoserver_image_mosaic",
            Self::Seasonal => "update_geoserver_seasonal_layers",
            Self::SubSeasonal => "update_geoserver_sub_seasonal_layers",
            Self::Radar => "update_geoserver_radar_layers",
            Self::Wave => "update_geoserver_ww3_layers",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Family {
    type Err = WatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .iter()
            .copied()
            .find(|family| family.tag() == s)
            .ok_or_else(|| WatchError::Config(format!("unknown family '{}'", s)))
    }
}
