//! Wall-clock helpers shared by backups, templates and the registry.

use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

const BACKUP_SUFFIX: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

const DISPLAY: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Current local time, or UTC when the local offset cannot be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// `YYYYMMDD_HHMMSS`, used in backup file and directory names.
pub fn backup_stamp(at: OffsetDateTime) -> String {
    at.format(BACKUP_SUFFIX)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// `YYYY-MM-DD HH:MM:SS`, used in generated config headers and landing pages.
pub fn display(at: OffsetDateTime) -> String {
    at.format(DISPLAY)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_formats() {
        let at = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(backup_stamp(at), "20240305_070809");
        assert_eq!(display(at), "2024-03-05 07:08:09");
    }
}
