//! Calendar date and time of day, as exchanged with every RTC driver

/// Broken-down calendar time.
///
/// The struct carries no validation: drivers encode whatever they are given, so an hour of 24 or a
/// BCD month of 13 ends up as bit artifacts in the registers. Values read back from hardware are
/// always a valid date-time for the family's calendar model, which for the GD32 counter calendar
/// includes its five-day month 13.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarTime {
    /// 0-59
    pub second: u8,
    /// 0-59
    pub minute: u8,
    /// 0-23
    pub hour: u8,
    /// Weekday index, stored as-is in a 3-bit register field. Its meaning is up to the caller.
    pub day_week: u8,
    /// 1-31
    pub day_month: u8,
    /// 1-12. The simplified counter calendar also reports a five-day month 13, see
    /// [`crate::counter`].
    pub month: u8,
    /// Full four-digit year, e.g. 2024
    pub year: u16,
}

impl CalendarTime {
    pub const fn new(year: u16, month: u8, day_month: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            second,
            minute,
            hour,
            day_week: 0,
            day_month,
            month,
            year,
        }
    }

    /// Time of day only; the date fields stay zero.
    pub const fn from_hms(hour: u8, minute: u8, second: u8) -> Self {
        Self::new(0, 0, 0, hour, minute, second)
    }

    pub const fn with_day_week(mut self, day_week: u8) -> Self {
        self.day_week = day_week;
        self
    }

    /// Copy of `self` with the date fields cleared, as a time-of-day-only RTC reports it.
    pub const fn time_of_day(self) -> Self {
        Self::from_hms(self.hour, self.minute, self.second)
    }
}
