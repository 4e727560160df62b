/*!
  # BCD register codec
  Calendar RTCs keep every decimal field as two packed nibbles, a tens digit and a units digit,
  at fixed bit positions of a 32-bit time or date word. Only the positions differ between vendors,
  so a family describes its words with a [`TimeLayout`] and a [`DateLayout`] and shares the
  arithmetic here.

  Encoding never masks: a field outside its nominal range spills into the neighbouring bits.
  Decoding masks each nibble to its field width.

  Years are stored as two digits. [`DateLayout::encode`] drops the century when the year is 2000
  or later and [`DateLayout::decode`] always adds 2000 back, so only 2000-2099 round-trip.
*/

use crate::datetime::CalendarTime;

/// The century every BCD calendar assumes.
pub const CENTURY: u16 = 2000;

const UNITS_MASK: u32 = 0xF;
const WEEKDAY_MASK: u32 = 0x7;

/// Splits `value` into its `(tens, units)` decimal digits.
#[inline]
pub const fn split(value: u8) -> (u8, u8) {
    let units = value % 10;
    ((value - units) / 10, units)
}

/// Inverse of [`split`].
#[inline]
pub const fn join(tens: u8, units: u8) -> u8 {
    tens * 10 + units
}

/// Position of one two-digit field inside a register word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BcdField {
    pub units_shift: u8,
    pub tens_shift: u8,
    /// Bits the tens digit occupies; the units digit always has four.
    pub tens_width: u8,
}

impl BcdField {
    pub const fn new(units_shift: u8, tens_shift: u8, tens_width: u8) -> Self {
        BcdField {
            units_shift,
            tens_shift,
            tens_width,
        }
    }

    /// Places `value` at this field's position.
    pub const fn place(&self, value: u8) -> u32 {
        let (tens, units) = split(value);
        ((units as u32) << self.units_shift) | ((tens as u32) << self.tens_shift)
    }

    /// Reads this field back out of `word`.
    pub const fn extract(&self, word: u32) -> u8 {
        let units = (word >> self.units_shift) & UNITS_MASK;
        let tens = (word >> self.tens_shift) & self.tens_mask();
        join(tens as u8, units as u8)
    }

    /// Bits of `word` owned by this field.
    pub const fn mask(&self) -> u32 {
        (UNITS_MASK << self.units_shift) | (self.tens_mask() << self.tens_shift)
    }

    const fn tens_mask(&self) -> u32 {
        (1 << self.tens_width) - 1
    }
}

/// Layout of a time-of-day register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeLayout {
    pub second: BcdField,
    pub minute: BcdField,
    pub hour: BcdField,
}

impl TimeLayout {
    pub const fn encode(&self, time: &CalendarTime) -> u32 {
        self.second.place(time.second) | self.minute.place(time.minute) | self.hour.place(time.hour)
    }

    /// Fills the time fields of `time` from `word`, leaving the date untouched.
    pub fn decode_into(&self, word: u32, time: &mut CalendarTime) {
        time.second = self.second.extract(word);
        time.minute = self.minute.extract(word);
        time.hour = self.hour.extract(word);
    }

    pub fn decode(&self, word: u32) -> CalendarTime {
        let mut time = CalendarTime::default();
        self.decode_into(word, &mut time);
        time
    }

    /// Bits carrying time digits; everything else is reserved or a flag such as AM/PM.
    pub const fn mask(&self) -> u32 {
        self.second.mask() | self.minute.mask() | self.hour.mask()
    }
}

/// Layout of a date register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateLayout {
    pub day: BcdField,
    pub month: BcdField,
    pub year: BcdField,
    /// The weekday is a raw 3-bit number, not BCD.
    pub weekday_shift: u8,
}

impl DateLayout {
    pub const fn encode(&self, time: &CalendarTime) -> u32 {
        let year = if time.year >= CENTURY {
            time.year - CENTURY
        } else {
            time.year
        };

        ((time.day_week as u32) << self.weekday_shift)
            | self.day.place(time.day_month)
            | self.month.place(time.month)
            | self.year.place(year as u8)
    }

    /// Fills the date fields of `time` from `word`, leaving the time of day untouched.
    pub fn decode_into(&self, word: u32, time: &mut CalendarTime) {
        time.year = self.year.extract(word) as u16 + CENTURY;
        time.month = self.month.extract(word);
        time.day_month = self.day.extract(word);
        time.day_week = ((word >> self.weekday_shift) & WEEKDAY_MASK) as u8;
    }

    pub fn decode(&self, word: u32) -> CalendarTime {
        let mut time = CalendarTime::default();
        self.decode_into(word, &mut time);
        time
    }

    pub const fn mask(&self) -> u32 {
        (WEEKDAY_MASK << self.weekday_shift)
            | self.day.mask()
            | self.month.mask()
            | self.year.mask()
    }
}

/// Decodes a time word and a date word into one value.
pub fn decode(time_layout: &TimeLayout, date_layout: &DateLayout, time: u32, date: u32) -> CalendarTime {
    let mut out = CalendarTime::default();
    time_layout.decode_into(time, &mut out);
    date_layout.decode_into(date, &mut out);
    out
}

/// STM32 `RTC_TR`: ST/SU in 6:4/3:0, MNT/MNU in 14:12/11:8, HT/HU in 21:20/19:16, PM in 22.
pub const STM32_TIME: TimeLayout = TimeLayout {
    second: BcdField::new(0, 4, 3),
    minute: BcdField::new(8, 12, 3),
    hour: BcdField::new(16, 20, 2),
};

/// STM32 `RTC_DR`: DT/DU in 5:4/3:0, MT/MU in 12/11:8, WDU in 15:13, YT/YU in 23:20/19:16.
pub const STM32_DATE: DateLayout = DateLayout {
    day: BcdField::new(0, 4, 2),
    month: BcdField::new(8, 12, 1),
    year: BcdField::new(16, 20, 4),
    weekday_shift: 13,
};

/// PIC32 `RTCTIME`: seconds in 14:8, minutes in 22:16, hours in 29:24.
pub const PIC32_TIME: TimeLayout = TimeLayout {
    second: BcdField::new(8, 12, 3),
    minute: BcdField::new(16, 20, 3),
    hour: BcdField::new(24, 28, 2),
};

/// PIC32 `RTCDATE`: weekday in 2:0, day in 13:8, month in 20:16, year in 31:24.
pub const PIC32_DATE: DateLayout = DateLayout {
    day: BcdField::new(8, 12, 2),
    month: BcdField::new(16, 20, 1),
    year: BcdField::new(24, 28, 4),
    weekday_shift: 0,
};

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUTS: [(&str, TimeLayout, DateLayout); 2] = [
        ("stm32", STM32_TIME, STM32_DATE),
        ("pic32", PIC32_TIME, PIC32_DATE),
    ];

    #[test]
    fn digit_split_covers_sexagesimal_range() {
        for v in 0..=59u8 {
            let (tens, units) = split(v);
            assert_eq!(tens, v / 10);
            assert_eq!(units, v % 10);
            assert_eq!(join(tens, units), v);
        }
    }

    #[test]
    fn stm32_known_words() {
        let t = CalendarTime::new(2024, 2, 2, 3, 5, 0).with_day_week(1);
        assert_eq!(STM32_TIME.encode(&t), 0x0003_0500);
        assert_eq!(STM32_DATE.encode(&t), 0x0024_2202);

        let t = CalendarTime::new(2099, 12, 31, 23, 59, 59).with_day_week(7);
        assert_eq!(STM32_TIME.encode(&t), 0x0023_5959);
        assert_eq!(STM32_DATE.encode(&t), 0x0099_F231);
    }

    #[test]
    fn pic32_known_words() {
        let t = CalendarTime::new(2024, 2, 2, 3, 5, 0).with_day_week(1);
        assert_eq!(PIC32_TIME.encode(&t), 0x0305_0000);
        assert_eq!(PIC32_DATE.encode(&t), 0x2402_0201);
    }

    #[test]
    fn stm32_reset_defaults_decode_to_midnight_new_year_2000() {
        let t = decode(&STM32_TIME, &STM32_DATE, 0x0040_0000, 0x0000_2101);
        assert_eq!(t, CalendarTime::new(2000, 1, 1, 0, 0, 0).with_day_week(1));
    }

    #[test]
    fn pic32_reset_defaults_decode_to_midnight_new_year_2000() {
        let t = decode(&PIC32_TIME, &PIC32_DATE, 0, 0x0001_0107);
        assert_eq!(t, CalendarTime::new(2000, 1, 1, 0, 0, 0).with_day_week(7));
    }

    #[test]
    fn round_trip_over_valid_range() {
        for (name, time_layout, date_layout) in LAYOUTS.iter() {
            for year in [2000u16, 2009, 2024, 2050, 2099] {
                for month in 1..=12u8 {
                    for day in [1u8, 9, 10, 19, 28, 31] {
                        for (hour, minute, second) in [(0, 0, 0), (9, 9, 9), (12, 30, 45), (23, 59, 59)] {
                            let t = CalendarTime::new(year, month, day, hour, minute, second)
                                .with_day_week(day % 7 + 1);
                            let back = decode(time_layout, date_layout, time_layout.encode(&t), date_layout.encode(&t));
                            assert_eq!(back, t, "{} round trip", name);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn every_time_of_day_round_trips() {
        for hour in 0..24u8 {
            for minute in 0..60u8 {
                for second in 0..60u8 {
                    let t = CalendarTime::from_hms(hour, minute, second);
                    assert_eq!(STM32_TIME.decode(STM32_TIME.encode(&t)), t);
                    assert_eq!(PIC32_TIME.decode(PIC32_TIME.encode(&t)), t);
                }
            }
        }
    }

    #[test]
    fn encode_stays_inside_field_masks() {
        let t = CalendarTime::new(2099, 12, 31, 23, 59, 59).with_day_week(7);
        for (_, time_layout, date_layout) in LAYOUTS.iter() {
            assert_eq!(time_layout.encode(&t) & !time_layout.mask(), 0);
            assert_eq!(date_layout.encode(&t) & !date_layout.mask(), 0);
        }
    }

    #[test]
    fn reserved_bits_are_dropped_on_decode() {
        // PM flag and reserved bits set around a valid STM32 time.
        let word = 0x0003_0500 | 0x0040_0000 | 0x8000_0080;
        assert_eq!(STM32_TIME.decode(word), CalendarTime::from_hms(3, 5, 0));
        assert_ne!(STM32_TIME.encode(&STM32_TIME.decode(word)), word);
    }

    #[test]
    fn year_before_century_is_not_normalized() {
        // 1999 keeps its century, so the tens digit (199) overflows the 4-bit field and the
        // decoded year is not 1999. Drivers reject such years before encoding.
        let t = CalendarTime::new(1999, 1, 1, 0, 0, 0);
        let word = STM32_DATE.encode(&t);
        assert_ne!(STM32_DATE.decode(word).year, 1999);
    }

    #[test]
    fn out_of_range_value_spills_into_neighbour() {
        // Month 20 has a tens digit of 2, which does not fit the 1-bit field and lands in the
        // weekday bits right above it.
        let word = STM32_DATE.encode(&CalendarTime::new(2000, 20, 1, 0, 0, 0));
        assert_eq!(word, 0x0000_2001);

        let back = STM32_DATE.decode(word);
        assert_eq!(back.month, 0);
        assert_eq!(back.day_week, 1);
    }
}
