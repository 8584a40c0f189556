use chrono::NaiveDateTime;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name of the artifact produced for `database` at instant `at`:
/// `<prefix>.<database>_<YYYYMMDD_HHMMSS>.sql`.
///
/// Names only differ when the instants differ by at least one second.
pub fn artifact_name(prefix: &str, database: &str, at: NaiveDateTime) -> String {
    format!("{}.{}_{}.sql", prefix, database, at.format(TIMESTAMP_FORMAT))
}
