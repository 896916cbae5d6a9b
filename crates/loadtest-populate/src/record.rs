//! Synthetic time-series records.

use chrono::{DateTime, TimeZone};

/// Column order shared by the DDL and the INSERT statements.
pub const COLUMNS: [&str; 7] = [
    "node_id",
    "value_time",
    "sub_index",
    "value_time2",
    "node_value",
    "value_quality",
    "value_type",
];

pub const SUB_INDEX: u16 = 1;
pub const NODE_VALUE: &str = "1234";
pub const VALUE_QUALITY: u16 = 1;
pub const VALUE_TYPE: u16 = 2;

/// Millisecond resolution; two ticks inside the same millisecond collide on
/// the primary key.
pub const VALUE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Format a tick instant the way it is stored in `value_time`.
pub fn format_value_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(VALUE_TIME_FORMAT).to_string()
}

/// One generated row. Both time columns carry the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticRecord {
    pub node_id: String,
    pub value_time: String,
    pub sub_index: u16,
    pub node_value: &'static str,
    pub value_quality: u16,
    pub value_type: u16,
}

impl SyntheticRecord {
    pub fn new(table_name: &str, index: u64, value_time: &str) -> Self {
        Self {
            node_id: format!("{table_name}:{index}"),
            value_time: value_time.to_string(),
            sub_index: SUB_INDEX,
            node_value: NODE_VALUE,
            value_quality: VALUE_QUALITY,
            value_type: VALUE_TYPE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_value_time_has_millisecond_precision() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 5).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(format_value_time(&time), "2024-03-01 08:30:05.042");
    }

    #[test]
    fn test_record_fields() {
        let record = SyntheticRecord::new("unit_3", 17, "2024-03-01 08:30:05.042");
        assert_eq!(record.node_id, "unit_3:17");
        assert_eq!(record.value_time, "2024-03-01 08:30:05.042");
        assert_eq!(record.sub_index, 1);
        assert_eq!(record.node_value, "1234");
        assert_eq!(record.value_quality, 1);
        assert_eq!(record.value_type, 2);
    }
}
