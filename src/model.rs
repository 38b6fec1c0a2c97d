/// Core data types for the pond profile service.
///
/// This module defines the shared domain model imported by all other modules:
/// readings, parameters, sites, depth profiles and the error type. It holds
/// no I/O; the only logic is parameter-name parsing and coordinate checks.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Sites are numbered in creation order, starting at 0.
pub type SiteId = usize;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// A water-quality quantity measured by the sonde.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Chlorophyll,
    Phycocyanin,
    Temperature,
    DissolvedOxygen,
    Ph,
    Orp,
}

impl Parameter {
    /// Every known parameter, in dashboard dropdown order.
    pub const ALL: [Parameter; 6] = [
        Parameter::Chlorophyll,
        Parameter::Phycocyanin,
        Parameter::Temperature,
        Parameter::DissolvedOxygen,
        Parameter::Ph,
        Parameter::Orp,
    ];

    /// Canonical snake_case name, as accepted by `FromStr` and emitted in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Chlorophyll => "chlorophyll",
            Parameter::Phycocyanin => "phycocyanin",
            Parameter::Temperature => "temperature",
            Parameter::DissolvedOxygen => "dissolved_oxygen",
            Parameter::Ph => "ph",
            Parameter::Orp => "orp",
        }
    }

    /// Column header used by YSI handheld exports.
    pub fn label(&self) -> &'static str {
        match self {
            Parameter::Chlorophyll => "Chl ug/L",
            Parameter::Phycocyanin => "PC ug/L",
            Parameter::Temperature => "°C",
            Parameter::DissolvedOxygen => "DO mg/L",
            Parameter::Ph => "pH",
            Parameter::Orp => "ORP mV",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Chlorophyll | Parameter::Phycocyanin => "ug/L",
            Parameter::Temperature => "°C",
            Parameter::DissolvedOxygen => "mg/L",
            Parameter::Ph => "pH",
            Parameter::Orp => "mV",
        }
    }

    /// Matches a raw CSV column header against the known parameter columns.
    ///
    /// Headers are compared trimmed and case-insensitively. `Â°C` is accepted
    /// because Latin-1 exports opened as UTF-8 render the degree sign that way.
    pub fn from_column_header(header: &str) -> Option<Parameter> {
        let normalized = header.trim().to_lowercase();
        let parameter = match normalized.as_str() {
            "chl ug/l" | "chl" | "chlorophyll" | "chlorophyll ug/l" => Parameter::Chlorophyll,
            "pc ug/l" | "pc" | "phycocyanin" | "phycocyanin ug/l" => Parameter::Phycocyanin,
            "°c" | "â°c" | "temp °c" | "temp c" | "temperature" => Parameter::Temperature,
            "do mg/l" | "do" | "dissolved_oxygen" | "dissolved oxygen" => {
                Parameter::DissolvedOxygen
            }
            "ph" => Parameter::Ph,
            "orp mv" | "orp" => Parameter::Orp,
            _ => return None,
        };
        Some(parameter)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Parameter {
    type Err = ProfileError;

    /// Accepts canonical names (`"ph"`, `"dissolved_oxygen"`) and the YSI
    /// column headers (`"Chl ug/L"`). Anything else is `InvalidParameter`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .or_else(|| Parameter::from_column_header(s))
            .ok_or_else(|| ProfileError::InvalidParameter(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and inside [-90, 90] / [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A single sonde sample: one row of a profile export.
///
/// `values` only holds the parameters actually measured in this row. A
/// parameter that is missing from the map was not recorded; it is never
/// stored as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub coordinate: Coordinate,
    /// Metres below the surface, always `>= 0`.
    pub depth: f64,
    pub timestamp: Option<NaiveDateTime>,
    pub values: BTreeMap<Parameter, f64>,
}

impl Reading {
    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        self.values.get(&parameter).copied()
    }
}

// ---------------------------------------------------------------------------
// Site types
// ---------------------------------------------------------------------------

/// A physical sampling location resolved from a cluster of nearby readings.
///
/// Produced by `analysis::groupings::SiteResolver`. `members` are indices
/// into the reading set owned by the enclosing `SiteResolution`.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: SiteId,
    /// "Sample Site N", numbered south to north.
    pub label: String,
    /// Coordinate of the first reading assigned to this site. Never moves.
    pub centroid: Coordinate,
    pub members: Vec<usize>,
}

impl Site {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// File-safe name from the centroid rounded to five decimals,
    /// e.g. `44.38512Lat_-69.94021Lon`.
    pub fn name(&self) -> String {
        format!(
            "{:.5}Lat_{:.5}Lon",
            self.centroid.latitude, self.centroid.longitude
        )
    }

    pub fn summary(&self) -> SiteSummary {
        SiteSummary {
            id: self.id,
            label: self.label.clone(),
            name: self.name(),
            latitude: self.centroid.latitude,
            longitude: self.centroid.longitude,
            member_count: self.member_count(),
        }
    }
}

/// What the map layer needs to place a site marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub id: SiteId,
    pub label: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub member_count: usize,
}

// ---------------------------------------------------------------------------
// Profile types
// ---------------------------------------------------------------------------

/// One depth interval of a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthBucket {
    pub depth_center: f64,
    pub value: f64,
    pub sample_count: usize,
}

/// Depth-bucketed summary of one parameter at one site, shallowest first.
///
/// A profile with no buckets means the site never recorded the parameter.
/// That is a valid answer and distinct from a bucket whose value is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthProfile {
    pub site_id: SiteId,
    pub parameter: Parameter,
    pub buckets: Vec<DepthBucket>,
}

impl DepthProfile {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of readings that contributed to the profile.
    pub fn sample_count(&self) -> usize {
        self.buckets.iter().map(|b| b.sample_count).sum()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a raw row could not become a `Reading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordFault {
    /// The row had a different number of fields than the header.
    FieldCount,
    MissingCoordinate,
    /// Latitude/longitude were not numbers or fell outside valid ranges.
    InvalidCoordinate,
    MissingDepth,
    /// Depth was not a number or was negative.
    InvalidDepth,
}

impl fmt::Display for RecordFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordFault::FieldCount => write!(f, "field count does not match header"),
            RecordFault::MissingCoordinate => write!(f, "missing latitude/longitude"),
            RecordFault::InvalidCoordinate => write!(f, "invalid latitude/longitude"),
            RecordFault::MissingDepth => write!(f, "missing depth"),
            RecordFault::InvalidDepth => write!(f, "invalid depth"),
        }
    }
}

/// Errors raised while loading, configuring or querying profiles.
#[derive(Debug, PartialEq)]
pub enum ProfileError {
    /// A raw row could not be turned into a reading. The loader absorbs
    /// these and counts them; they never abort a load.
    MalformedRecord { row: usize, fault: RecordFault },
    /// Non-positive threshold or bucket width, or an unreadable config file.
    InvalidConfiguration(String),
    /// No site with this id exists in the current resolution.
    NotFound(SiteId),
    /// The requested parameter name is not one of the known parameters.
    InvalidParameter(String),
    /// A raw data directory or file could not be read.
    Io(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::MalformedRecord { row, fault } => {
                write!(f, "Malformed record at row {}: {}", row, fault)
            }
            ProfileError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            ProfileError::NotFound(id) => write!(f, "Site not found: {}", id),
            ProfileError::InvalidParameter(name) => write!(f, "Unknown parameter: {}", name),
            ProfileError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ProfileError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
