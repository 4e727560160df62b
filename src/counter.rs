/*!
  # Seconds-counter codec
  Counter RTCs hold a single running count of seconds instead of calendar registers. Two models
  are in use:

  * **time of day**: `hour * 3600 + minute * 60 + second`. The date is not kept and the counter
    is read modulo one day.
  * **simplified calendar**: seconds since 2000-01-01 00:00:00 where every month has 30 days and
    every year 365. This is not the Gregorian calendar: it only agrees with a wall clock on
    timestamps it produced itself, which is what the hardware counter holds.

    Twelve 30-day months cover 360 days, so each model year ends with a five-day month 13
    ([`TAIL_MONTH`], days 1 to 5). The counter passes through it every year and
    [`decode_calendar`] reports it as is; [`encode_calendar`] accepts it back.

  Counters wider than the register bus are split into 16-bit halves with [`split_counter`].
*/

use crate::bcd::CENTURY;
use crate::datetime::CalendarTime;
use embedded_time::duration::Seconds;

pub const SECONDS_PER_MINUTE: u32 = 60;
pub const SECONDS_PER_HOUR: u32 = 3_600;
pub const SECONDS_PER_DAY: u32 = 86_400;
/// Thirty-day month.
pub const SECONDS_PER_MONTH: u32 = 2_592_000;
/// 365-day year, no leap days.
pub const SECONDS_PER_YEAR: u32 = 31_536_000;
/// Month number of the five days left after twelve 30-day months.
pub const TAIL_MONTH: u8 = 13;
/// Last year whose every second still fits a 32-bit simplified-calendar counter.
pub const LAST_CALENDAR_YEAR: u16 = 2135;

/// Seconds since midnight for the time fields of `time`. Date fields are ignored.
pub const fn encode_time_of_day(time: &CalendarTime) -> u32 {
    time.hour as u32 * SECONDS_PER_HOUR + time.minute as u32 * SECONDS_PER_MINUTE + time.second as u32
}

/// Time of day held by `count`; whole days are discarded and the date fields stay zero.
pub fn decode_time_of_day(count: u32) -> CalendarTime {
    let seconds = count % SECONDS_PER_DAY;
    CalendarTime::from_hms(
        (seconds / SECONDS_PER_HOUR) as u8,
        (seconds % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as u8,
        (seconds % SECONDS_PER_MINUTE) as u8,
    )
}

/// Simplified-calendar seconds since 2000-01-01 00:00:00.
///
/// Years before 2000, month 0 and day 0 wrap the arithmetic; callers are expected to pass
/// calendar values. The weekday is not represented.
pub const fn encode_calendar(time: &CalendarTime) -> u32 {
    let years = time.year.wrapping_sub(CENTURY) as u32;
    let months = time.month.wrapping_sub(1) as u32;
    let days = time.day_month.wrapping_sub(1) as u32;

    years
        .wrapping_mul(SECONDS_PER_YEAR)
        .wrapping_add(months.wrapping_mul(SECONDS_PER_MONTH))
        .wrapping_add(days.wrapping_mul(SECONDS_PER_DAY))
        .wrapping_add(encode_time_of_day(time))
}

/// Inverse of [`encode_calendar`]. The weekday comes back as zero.
///
/// The last five days of every year decode to month [`TAIL_MONTH`].
pub fn decode_calendar(count: u32) -> CalendarTime {
    let mut rest = count;
    let years = rest / SECONDS_PER_YEAR;
    rest %= SECONDS_PER_YEAR;
    let months = rest / SECONDS_PER_MONTH;
    rest %= SECONDS_PER_MONTH;
    let days = rest / SECONDS_PER_DAY;
    rest %= SECONDS_PER_DAY;

    let mut time = decode_time_of_day(rest);
    time.year = CENTURY + years as u16;
    time.month = months as u8 + 1;
    time.day_month = days as u8 + 1;
    time
}

/// `(high, low)` 16-bit halves of a 32-bit counter.
pub const fn split_counter(count: u32) -> (u32, u32) {
    (count >> 16, count & 0xFFFF)
}

pub const fn join_counter(high: u32, low: u32) -> u32 {
    ((high & 0xFFFF) << 16) | (low & 0xFFFF)
}

/// The counter value as an `embedded-time` duration.
pub const fn as_duration(count: u32) -> Seconds<u32> {
    Seconds(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Oracle written independently of the codec, with the same 30/365-day model.
    fn simplified_seconds(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> u32 {
        let days = (year as u32 - 2000) * 365 + (month as u32 - 1) * 30 + (day as u32 - 1);
        ((days * 24 + hour as u32) * 60 + minute as u32) * 60 + second as u32
    }

    #[test]
    fn constants_agree() {
        assert_eq!(SECONDS_PER_HOUR, 60 * SECONDS_PER_MINUTE);
        assert_eq!(SECONDS_PER_DAY, 24 * SECONDS_PER_HOUR);
        assert_eq!(SECONDS_PER_MONTH, 30 * SECONDS_PER_DAY);
        assert_eq!(SECONDS_PER_YEAR, 365 * SECONDS_PER_DAY);
    }

    #[test]
    fn time_of_day_round_trip() {
        for hour in 0..24u8 {
            for minute in [0u8, 1, 29, 59] {
                for second in [0u8, 7, 59] {
                    let t = CalendarTime::from_hms(hour, minute, second);
                    assert_eq!(decode_time_of_day(encode_time_of_day(&t)), t);
                }
            }
        }
    }

    #[test]
    fn time_of_day_ignores_date_and_wraps_days() {
        let t = CalendarTime::new(2024, 2, 2, 3, 5, 0).with_day_week(1);
        assert_eq!(encode_time_of_day(&t), 3 * 3600 + 5 * 60);
        assert_eq!(decode_time_of_day(encode_time_of_day(&t)), t.time_of_day());

        let next_day = SECONDS_PER_DAY + 3 * 3600 + 5 * 60;
        assert_eq!(decode_time_of_day(next_day), CalendarTime::from_hms(3, 5, 0));
    }

    #[test]
    fn calendar_matches_oracle() {
        assert_eq!(encode_calendar(&CalendarTime::new(2000, 1, 1, 0, 0, 0)), 0);
        for (y, mo, d, h, mi, s) in [
            (2000, 1, 1, 0, 0, 1),
            (2000, 2, 1, 0, 0, 0),
            (2001, 1, 1, 0, 0, 0),
            (2024, 2, 2, 3, 5, 0),
            (2099, 12, 30, 23, 59, 59),
            (2135, 12, 30, 23, 59, 59),
        ] {
            let t = CalendarTime::new(y, mo, d, h, mi, s);
            let expected = simplified_seconds(y, mo, d, h, mi, s);
            assert_eq!(encode_calendar(&t), expected);
            assert_eq!(decode_calendar(expected), t);
        }
    }

    #[test]
    fn calendar_round_trip_over_model_range() {
        for year in [2000u16, 2001, 2024, 2077, 2099] {
            for month in 1..=12u8 {
                for day in [1u8, 15, 30] {
                    let t = CalendarTime::new(year, month, day, 12, 34, 56);
                    assert_eq!(decode_calendar(encode_calendar(&t)), t);
                }
            }
        }
    }

    #[test]
    fn day_31_is_not_representable() {
        // 31 January is the same instant as 1 February in a 30-day month model.
        let jan31 = encode_calendar(&CalendarTime::new(2024, 1, 31, 0, 0, 0));
        let feb1 = encode_calendar(&CalendarTime::new(2024, 2, 1, 0, 0, 0));
        assert_eq!(jan31, feb1);
        assert_eq!(decode_calendar(jan31), CalendarTime::new(2024, 2, 1, 0, 0, 0));
    }

    #[test]
    fn last_calendar_year_fits() {
        let last = CalendarTime::new(LAST_CALENDAR_YEAR, 12, 30, 23, 59, 59);
        assert!(encode_calendar(&last) > encode_calendar(&CalendarTime::new(2135, 1, 1, 0, 0, 0)));
        // The counter tops out early in the following year.
        assert_eq!(decode_calendar(u32::MAX).year, LAST_CALENDAR_YEAR + 1);
    }

    #[test]
    fn year_ends_with_five_day_tail_month() {
        let dec30 = encode_calendar(&CalendarTime::new(2024, 12, 30, 23, 59, 59));
        assert_eq!(decode_calendar(dec30 + 1), CalendarTime::new(2024, TAIL_MONTH, 1, 0, 0, 0));

        let last_tail_second = CalendarTime::new(2024, TAIL_MONTH, 5, 23, 59, 59);
        assert_eq!(encode_calendar(&last_tail_second), simplified_seconds(2025, 1, 1, 0, 0, 0) - 1);
        assert_eq!(decode_calendar(encode_calendar(&last_tail_second)), last_tail_second);
        assert_eq!(
            decode_calendar(encode_calendar(&last_tail_second) + 1),
            CalendarTime::new(2025, 1, 1, 0, 0, 0)
        );
    }

    #[test]
    fn counter_halves() {
        assert_eq!(split_counter(0x1234_5678), (0x1234, 0x5678));
        assert_eq!(join_counter(0x1234, 0x5678), 0x1234_5678);
        assert_eq!(join_counter(0xFFFF_1234, 0xABCD_5678), 0x1234_5678);
        assert_eq!(as_duration(90), Seconds(90_u32));
    }
}
