use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case};
use nom::character::complete as nomchar;
use nom::combinator::{all_consuming, map, map_opt, opt, value};
use nom::sequence::{pair, tuple};
use nom::IResult;

pub const UTC_DATETIME_FMT: &str = "%Y%m%dT%H%M%SZ";
pub const FLOATING_DATETIME_FMT: &str = "%Y%m%dT%H%M%S";
pub const DATE_FMT: &str = "%Y%m%d";

/// RFC 5545 DATE-TIME or DATE value, as an UTC instant.
///
/// Floating times and dates are read as if they were UTC: without the
/// calendar-timezone of the collection there is nothing better to anchor
/// them on.
pub fn date_time(dt: &str) -> Option<DateTime<Utc>> {
    tracing::trace!(raw_time = dt, "raw time");
    if dt.ends_with(['Z', 'z']) {
        return NaiveDateTime::parse_from_str(&dt.to_ascii_uppercase(), UTC_DATETIME_FMT)
            .ok()
            .map(|v| v.and_utc());
    }

    if dt.len() == 8 {
        return NaiveDate::parse_from_str(dt, DATE_FMT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|v| v.and_utc());
    }

    tracing::debug!(raw_time = dt, "floating datetime read as UTC");
    NaiveDateTime::parse_from_str(dt, FLOATING_DATETIME_FMT)
        .ok()
        .map(|v| v.and_utc())
}

/// A complete RFC 5545 duration, trailing garbage is rejected.
pub fn duration(text: &str) -> Option<TimeDelta> {
    all_consuming(dur_value)(text).ok().map(|(_, delta)| delta)
}

/// RFC 5545 Duration Value
///
/// ```abnf
/// dur-value  = (["+"] / "-") "P" (dur-date / dur-time / dur-week)
/// dur-date   = dur-day [dur-time]
/// dur-time   = "T" (dur-hour / dur-minute / dur-second)
/// dur-week   = 1*DIGIT "W"
/// dur-hour   = 1*DIGIT "H" [dur-minute]
/// dur-minute = 1*DIGIT "M" [dur-second]
/// dur-second = 1*DIGIT "S"
/// dur-day    = 1*DIGIT "D"
/// ```
pub fn dur_value(text: &str) -> IResult<&str, TimeDelta> {
    map_opt(
        tuple((
            dur_sign,
            tag_no_case("P"),
            alt((dur_date, dur_time, dur_week)),
        )),
        |(sign, _, delta)| delta.checked_mul(sign),
    )(text)
}

fn dur_sign(text: &str) -> IResult<&str, i32> {
    map(opt(alt((value(1, tag("+")), value(-1, tag("-"))))), |x| {
        x.unwrap_or(1)
    })(text)
}

fn dur_date(text: &str) -> IResult<&str, TimeDelta> {
    map_opt(pair(dur_day, opt(dur_time)), |(day, time)| {
        day.checked_add(&time.unwrap_or(TimeDelta::zero()))
    })(text)
}

fn dur_time(text: &str) -> IResult<&str, TimeDelta> {
    map(
        pair(tag_no_case("T"), alt((dur_hour, dur_minute, dur_second))),
        |(_, x)| x,
    )(text)
}

fn dur_week(text: &str) -> IResult<&str, TimeDelta> {
    map_opt(pair(nomchar::i64, tag_no_case("W")), |(i, _)| {
        TimeDelta::try_weeks(i)
    })(text)
}

fn dur_day(text: &str) -> IResult<&str, TimeDelta> {
    map_opt(pair(nomchar::i64, tag_no_case("D")), |(i, _)| {
        TimeDelta::try_days(i)
    })(text)
}

fn dur_hour(text: &str) -> IResult<&str, TimeDelta> {
    map_opt(
        tuple((nomchar::i64, tag_no_case("H"), opt(dur_minute))),
        |(i, _, mm)| TimeDelta::try_hours(i)?.checked_add(&mm.unwrap_or(TimeDelta::zero())),
    )(text)
}

fn dur_minute(text: &str) -> IResult<&str, TimeDelta> {
    map_opt(
        tuple((nomchar::i64, tag_no_case("M"), opt(dur_second))),
        |(i, _, ms)| TimeDelta::try_minutes(i)?.checked_add(&ms.unwrap_or(TimeDelta::zero())),
    )(text)
}

fn dur_second(text: &str) -> IResult<&str, TimeDelta> {
    map_opt(pair(nomchar::i64, tag_no_case("S")), |(i, _)| {
        TimeDelta::try_seconds(i)
    })(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_date_time() {
        assert_eq!(
            date_time("20060104T140000Z"),
            Some(Utc.with_ymd_and_hms(2006, 1, 4, 14, 0, 0).unwrap())
        );
    }

    #[test]
    fn floating_and_date() {
        assert_eq!(
            date_time("20060104T140000"),
            Some(Utc.with_ymd_and_hms(2006, 1, 4, 14, 0, 0).unwrap())
        );
        assert_eq!(
            date_time("20060104"),
            Some(Utc.with_ymd_and_hms(2006, 1, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(date_time("tomorrow"), None);
        assert_eq!(date_time(""), None);
    }

    #[test]
    fn rfc5545_durations() {
        // A duration of 15 days, 5 hours, and 20 seconds would be:
        assert_eq!(
            duration("P15DT5H0M20S"),
            Some(
                TimeDelta::try_days(15).unwrap()
                    + TimeDelta::try_hours(5).unwrap()
                    + TimeDelta::try_seconds(20).unwrap()
            )
        );
        // A duration of 7 weeks would be:
        assert_eq!(duration("P7W"), TimeDelta::try_weeks(7));
    }

    #[test]
    fn negative_durations() {
        // 10 minutes before
        assert_eq!(duration("-PT10M"), TimeDelta::try_minutes(-10));
        // 2 days before the due date of a to-do
        assert_eq!(duration("-P2D"), TimeDelta::try_days(-2));
    }

    #[test]
    fn trailing_garbage() {
        assert_eq!(duration("PT1Hxx"), None);
        assert!(dur_value("PT1Hxx").is_ok());
    }

    #[test]
    fn durations_out_of_range() {
        // largest whole number of days a TimeDelta holds
        assert_eq!(duration("P106751991167D"), TimeDelta::try_days(106751991167));
        assert_eq!(duration("P106751991167DT23H"), None);
        assert_eq!(duration("P106751991168D"), None);
        assert_eq!(duration("PT2562047788015H59M"), None);
        assert_eq!(duration("PT153722867280912M59S"), None);
        assert_eq!(duration("PT9223372036854775807S"), None);
        assert_eq!(duration("P99999999999999999999W"), None);
    }

    #[test]
    fn date_time_limits() {
        assert_eq!(
            date_time("99991231T235959Z"),
            Some(Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap())
        );
        assert_eq!(date_time("00000101"), Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).single());
    }
}
