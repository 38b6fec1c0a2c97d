/// Raw data ingestion.
///
/// Turns heterogeneous sonde rows into the uniform `Reading` representation.
/// Rows missing a usable coordinate or depth are dropped and counted; a
/// malformed row never aborts a load.
///
/// Submodules:
/// - `ysi` — CSV decoding and directory loading for YSI profile exports.

pub mod ysi;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::BTreeMap;

use crate::model::{Coordinate, Parameter, ProfileError, Reading, RecordFault};

// ---------------------------------------------------------------------------
// Column aliases
// ---------------------------------------------------------------------------

const LATITUDE_COLUMNS: &[&str] = &["lat", "latitude"];
const LONGITUDE_COLUMNS: &[&str] = &["lon", "long", "longitude"];
const DEPTH_COLUMNS: &[&str] = &["dep m", "depth", "depth m", "dep"];
const TIMESTAMP_COLUMNS: &[&str] = &["timestamp", "datetime", "date time"];
const DATE_COLUMNS: &[&str] = &["date"];
const TIME_COLUMNS: &[&str] = &["time"];

// chrono's `%Y` also accepts two digits, so `%y` layouts must come first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"];

/// Deeper than any ocean; larger values are logger faults.
pub const MAX_DEPTH_M: f64 = 12_000.0;
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p"];

// ---------------------------------------------------------------------------
// Raw records
// ---------------------------------------------------------------------------

/// One raw row: header/value pairs in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// Line number in the source file (1-based), for diagnostics.
    pub row: usize,
    pub fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(row: usize, fields: Vec<(String, String)>) -> Self {
        Self { row, fields }
    }

    /// First non-blank value among the columns matching `aliases`.
    fn field(&self, aliases: &[&str]) -> Option<&str> {
        self.fields
            .iter()
            .filter(|(header, _)| aliases.contains(&header.trim().to_lowercase().as_str()))
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Load report
// ---------------------------------------------------------------------------

/// Everything a load produced: the readings, in input order, plus the
/// data-quality counters surfaced for diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub readings: Vec<Reading>,
    /// Number of files that contributed (0 when loading in-memory records).
    pub files: usize,
    pub dropped: usize,
    pub drop_reasons: BTreeMap<RecordFault, usize>,
}

impl LoadReport {
    pub fn record_drop(&mut self, fault: RecordFault) {
        self.dropped += 1;
        *self.drop_reasons.entry(fault).or_insert(0) += 1;
    }

    /// Appends another report, keeping this report's readings first.
    pub fn merge(&mut self, other: LoadReport) {
        self.readings.extend(other.readings);
        self.files += other.files;
        self.dropped += other.dropped;
        for (fault, count) in other.drop_reasons {
            *self.drop_reasons.entry(fault).or_insert(0) += count;
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Converts raw records into readings, preserving order. Malformed rows are
/// counted in the report rather than returned as errors.
pub fn load_records<I>(records: I) -> LoadReport
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut report = LoadReport::default();
    for record in records {
        match read_record(&record) {
            Ok(reading) => report.readings.push(reading),
            Err(fault) => report.record_drop(fault),
        }
    }
    report
}

/// Parses one raw record into a `Reading`.
///
/// Fails with `MalformedRecord` when the coordinate or depth is missing,
/// not numeric, or out of range. Parameter columns that are blank or not
/// numeric are simply left out of `values`.
pub fn parse_reading(record: &RawRecord) -> Result<Reading, ProfileError> {
    read_record(record).map_err(|fault| ProfileError::MalformedRecord { row: record.row, fault })
}

fn read_record(record: &RawRecord) -> Result<Reading, RecordFault> {
    let (lat, lon) = match (record.field(LATITUDE_COLUMNS), record.field(LONGITUDE_COLUMNS)) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(RecordFault::MissingCoordinate),
    };
    let coordinate = match (lat.parse::<f64>(), lon.parse::<f64>()) {
        (Ok(lat), Ok(lon)) => Coordinate::new(lat, lon),
        _ => return Err(RecordFault::InvalidCoordinate),
    };
    if !coordinate.is_valid() {
        return Err(RecordFault::InvalidCoordinate);
    }

    let depth = record
        .field(DEPTH_COLUMNS)
        .ok_or(RecordFault::MissingDepth)?
        .parse::<f64>()
        .map_err(|_| RecordFault::InvalidDepth)?;
    if !depth.is_finite() || !(0.0..=MAX_DEPTH_M).contains(&depth) {
        return Err(RecordFault::InvalidDepth);
    }

    let mut values = BTreeMap::new();
    for (header, raw) in &record.fields {
        if let Some(parameter) = Parameter::from_column_header(header) {
            if let Some(value) = parse_value(raw) {
                values.entry(parameter).or_insert(value);
            }
        }
    }

    Ok(Reading {
        coordinate,
        depth,
        timestamp: parse_record_timestamp(record),
        values,
    })
}

/// Numeric cell value, or `None` for blanks, sentinels and non-finite numbers.
fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_record_timestamp(record: &RawRecord) -> Option<NaiveDateTime> {
    if let Some(raw) = record.field(TIMESTAMP_COLUMNS) {
        return parse_timestamp(raw);
    }
    let date = record.field(DATE_COLUMNS)?;
    let time = record.field(TIME_COLUMNS)?;
    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())?;
    Some(date.and_time(time))
}

/// Parses the timestamp layouts seen in sonde exports. RFC 3339 values are
/// converted to UTC; naive values are kept as recorded.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, pairs: &[(&str, &str)]) -> RawRecord {
        RawRecord::new(
            row,
            pairs.iter().map(|(h, v)| (h.to_string(), v.to_string())).collect(),
        )
    }

    #[test]
    fn test_parses_complete_ysi_row() {
        let raw = record(
            2,
            &[
                ("DATE", "07/15/2024"),
                ("TIME", "10:42:05"),
                ("Lat", "44.38512"),
                ("Lon", "-69.94021"),
                ("DEP m", "1.25"),
                ("Chl ug/L", "3.4"),
                ("°C", "22.1"),
                ("pH", "7.2"),
            ],
        );
        let reading = parse_reading(&raw).expect("row should parse");
        assert_eq!(reading.coordinate, Coordinate::new(44.38512, -69.94021));
        assert_eq!(reading.depth, 1.25);
        assert_eq!(reading.value(Parameter::Chlorophyll), Some(3.4));
        assert_eq!(reading.value(Parameter::Temperature), Some(22.1));
        assert_eq!(reading.value(Parameter::Ph), Some(7.2));
        assert_eq!(reading.value(Parameter::Orp), None);
        assert_eq!(
            reading.timestamp,
            NaiveDate::from_ymd_opt(2024, 7, 15).and_then(|d| d.and_hms_opt(10, 42, 5))
        );
    }

    #[test]
    fn test_blank_and_non_numeric_values_are_absent_not_zero() {
        let raw = record(
            2,
            &[
                ("Lat", "44.0"),
                ("Lon", "-69.0"),
                ("DEP m", "0.5"),
                ("Chl ug/L", ""),
                ("PC ug/L", "####"),
                ("DO mg/L", "NaN"),
                ("ORP mV", "0"),
            ],
        );
        let reading = parse_reading(&raw).unwrap();
        assert_eq!(reading.value(Parameter::Chlorophyll), None);
        assert_eq!(reading.value(Parameter::Phycocyanin), None);
        assert_eq!(reading.value(Parameter::DissolvedOxygen), None);
        assert_eq!(reading.value(Parameter::Orp), Some(0.0));
    }

    #[test]
    fn test_missing_coordinate_is_malformed() {
        let raw = record(5, &[("Lat", ""), ("Lon", "-69.0"), ("DEP m", "0.5")]);
        assert_eq!(
            parse_reading(&raw),
            Err(ProfileError::MalformedRecord { row: 5, fault: RecordFault::MissingCoordinate })
        );
    }

    #[test]
    fn test_out_of_range_coordinate_is_malformed() {
        let raw = record(6, &[("Lat", "95.0"), ("Lon", "-69.0"), ("DEP m", "0.5")]);
        assert_eq!(
            parse_reading(&raw),
            Err(ProfileError::MalformedRecord { row: 6, fault: RecordFault::InvalidCoordinate })
        );
        let raw = record(7, &[("Lat", "north"), ("Lon", "-69.0"), ("DEP m", "0.5")]);
        assert!(matches!(
            parse_reading(&raw),
            Err(ProfileError::MalformedRecord { fault: RecordFault::InvalidCoordinate, .. })
        ));
    }

    #[test]
    fn test_missing_or_negative_depth_is_malformed() {
        let raw = record(8, &[("Lat", "44.0"), ("Lon", "-69.0")]);
        assert!(matches!(
            parse_reading(&raw),
            Err(ProfileError::MalformedRecord { fault: RecordFault::MissingDepth, .. })
        ));
        let raw = record(9, &[("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "-0.2")]);
        assert!(matches!(
            parse_reading(&raw),
            Err(ProfileError::MalformedRecord { fault: RecordFault::InvalidDepth, .. })
        ));
    }

    #[test]
    fn test_implausible_depth_is_malformed() {
        let raw = record(10, &[("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "1e300")]);
        assert!(matches!(
            parse_reading(&raw),
            Err(ProfileError::MalformedRecord { fault: RecordFault::InvalidDepth, .. })
        ));
        let raw = record(11, &[("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "12000")]);
        assert_eq!(parse_reading(&raw).map(|r| r.depth), Ok(MAX_DEPTH_M));
    }

    #[test]
    fn test_load_records_counts_drops_and_preserves_order() {
        let records = vec![
            record(2, &[("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "0.1")]),
            record(3, &[("Lat", ""), ("Lon", "-69.0"), ("DEP m", "0.2")]),
            record(4, &[("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "0.3")]),
            record(5, &[("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "deep")]),
            record(6, &[("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "0.5")]),
        ];
        let report = load_records(records);
        let depths: Vec<f64> = report.readings.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![0.1, 0.3, 0.5]);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.drop_reasons.get(&RecordFault::MissingCoordinate), Some(&1));
        assert_eq!(report.drop_reasons.get(&RecordFault::InvalidDepth), Some(&1));
    }

    #[test]
    fn test_unparseable_timestamp_keeps_the_reading() {
        let raw = record(
            2,
            &[("Timestamp", "yesterday"), ("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "0.5")],
        );
        let reading = parse_reading(&raw).unwrap();
        assert_eq!(reading.timestamp, None);
    }

    #[test]
    fn test_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 7, 15).and_then(|d| d.and_hms_opt(14, 30, 0));
        assert_eq!(parse_timestamp("2024-07-15 14:30:00"), expected);
        assert_eq!(parse_timestamp("2024-07-15T14:30:00"), expected);
        assert_eq!(parse_timestamp("07/15/2024 14:30"), expected);
        assert_eq!(parse_timestamp("2024-07-15T10:30:00-04:00"), expected);
        assert_eq!(parse_timestamp("07/15/24 14:30:00"), expected);
        assert_eq!(parse_timestamp("not a time"), None);
    }

    #[test]
    fn test_two_digit_year_in_date_column_is_this_century() {
        let raw = record(
            2,
            &[("DATE", "07/15/24"), ("TIME", "10:42:05"), ("Lat", "44.0"), ("Lon", "-69.0"), ("DEP m", "0.5")],
        );
        let reading = parse_reading(&raw).unwrap();
        assert_eq!(
            reading.timestamp,
            NaiveDate::from_ymd_opt(2024, 7, 15).and_then(|d| d.and_hms_opt(10, 42, 5))
        );
    }

    #[test]
    fn test_merge_sums_counters() {
        let mut a = LoadReport::default();
        a.files = 1;
        a.record_drop(RecordFault::MissingDepth);
        let mut b = LoadReport::default();
        b.files = 2;
        b.record_drop(RecordFault::MissingDepth);
        b.record_drop(RecordFault::FieldCount);
        a.merge(b);
        assert_eq!(a.files, 3);
        assert_eq!(a.dropped, 3);
        assert_eq!(a.drop_reasons.get(&RecordFault::MissingDepth), Some(&2));
        assert_eq!(a.drop_reasons.get(&RecordFault::FieldCount), Some(&1));
    }
}
