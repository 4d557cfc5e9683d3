//! Conversion of the timestamp formats found in ZIP archives to UTC
//! [`jiff::Timestamp`]s.
//!
//! MS-DOS date/time fields carry no time zone; like most extractors we read
//! them as if the producer's local time were UTC. NTFS and the Unix-second
//! extra fields are genuinely UTC.

use jiff::civil;
use jiff::tz::TimeZone;
use jiff::Timestamp;

/// Seconds between 1601-01-01 (NTFS epoch) and 1970-01-01 (Unix epoch).
const NTFS_EPOCH_OFFSET: u64 = 11_644_473_600;

/// Decodes packed MS-DOS date and time words (4.4.6).
///
/// Out-of-range components from sloppy producers are clamped to the nearest
/// valid value rather than rejected; an unrepresentable date falls back to
/// the Unix epoch.
pub(crate) fn from_dos(dos_date: u16, dos_time: u16) -> Timestamp {
    let year = ((dos_date >> 9) & 0x7f) + 1980;
    let month = (((dos_date >> 5) & 0x0f) as i8).clamp(1, 12);
    let day = (dos_date & 0x1f) as i8;
    let hour = (((dos_time >> 11) & 0x1f) as i8).min(23);
    let minute = (((dos_time >> 5) & 0x3f) as i8).min(59);
    let second = (((dos_time & 0x1f) * 2) as i8).min(58);

    civil::Date::new(year as i16, month, 1)
        .and_then(|first| {
            let day = day.clamp(1, first.days_in_month());
            civil::Date::new(year as i16, month, day)
        })
        .and_then(|date| {
            civil::Time::new(hour, minute, second, 0).map(|time| civil::DateTime::from_parts(date, time))
        })
        .and_then(|dt| dt.to_zoned(TimeZone::UTC))
        .map(|zoned| zoned.timestamp())
        .unwrap_or(Timestamp::UNIX_EPOCH)
}

/// Converts seconds since the Unix epoch.
pub(crate) fn from_unix_seconds(seconds: u32) -> Option<Timestamp> {
    Timestamp::from_second(i64::from(seconds)).ok()
}

/// Converts an NTFS timestamp: 100ns ticks since 1601-01-01 UTC.
pub(crate) fn from_ntfs_ticks(ticks: u64) -> Option<Timestamp> {
    let seconds = (ticks / 10_000_000).checked_sub(NTFS_EPOCH_OFFSET)?;
    let nanos = (ticks % 10_000_000) * 100;
    Timestamp::new(seconds as i64, nanos as i32).ok()
}
