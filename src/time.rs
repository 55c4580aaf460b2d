use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Weekday};

use crate::{
    error::{TimeError, TimezoneError},
    registry::TimezoneRegistry,
};

const SECONDS_PER_DAY: i64 = 86_400;
/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAY: i64 = 719_163;

/// Which clock a [`CalendarTime`] is read against.
///
/// Named zones are looked up in a [`TimezoneRegistry`] whenever an offset is
/// needed, so a `CalendarTime` never owns the timezone definition itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Wall-clock time with no zone, e.g. "9am wherever you are".
    Floating,
    Utc,
    Fixed(FixedOffset),
    Named(String),
}

impl Zone {
    pub fn named(tzid: impl Into<String>) -> Zone {
        Zone::Named(tzid.into())
    }

    pub fn tzid(&self) -> Option<&str> {
        match self {
            Zone::Named(tzid) => Some(tzid),
            _ => None,
        }
    }

    /// The offset of zones that never change, i.e. everything but named
    /// zones.
    pub fn fixed_offset(&self) -> Option<i32> {
        match self {
            Zone::Floating | Zone::Utc => Some(0),
            Zone::Fixed(offset) => Some(offset.local_minus_utc()),
            Zone::Named(_) => None,
        }
    }
}

impl Default for Zone {
    fn default() -> Self {
        Zone::Floating
    }
}

/// A date or date-time with explicit fields and a zone reference.
///
/// Fields may hold out of range values (month 13, day 0, hour -1, ...) while a
/// caller is doing arithmetic; [`CalendarTime::normalize`] carries them into
/// the neighbouring fields. Every method that interprets the value works on a
/// normalized copy.
///
/// The derived `PartialEq` compares fields, not instants. Use
/// [`CalendarTime::compare`] for chronological comparison across zones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalendarTime {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub is_date: bool,
    pub zone: Zone,
}

impl CalendarTime {
    pub fn new(
        year: i32,
        month: i32,
        day: i32,
        hour: i32,
        minute: i32,
        second: i32,
        zone: Zone,
    ) -> CalendarTime {
        CalendarTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            is_date: false,
            zone,
        }
    }

    /// A floating, date only value.
    pub fn date(year: i32, month: i32, day: i32) -> CalendarTime {
        CalendarTime {
            year,
            month,
            day,
            hour: 0,
            minute: 0,
            second: 0,
            is_date: true,
            zone: Zone::Floating,
        }
    }

    pub fn utc(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> Self {
        CalendarTime::new(year, month, day, hour, minute, second, Zone::Utc)
    }

    pub fn floating(year: i32, month: i32, day: i32, hour: i32, minute: i32, second: i32) -> Self {
        CalendarTime::new(year, month, day, hour, minute, second, Zone::Floating)
    }

    pub fn with_zone(mut self, zone: Zone) -> CalendarTime {
        self.zone = zone;
        self
    }

    pub fn from_naive(naive: NaiveDateTime, zone: Zone) -> CalendarTime {
        CalendarTime::new(
            naive.year(),
            naive.month() as i32,
            naive.day() as i32,
            naive.hour() as i32,
            naive.minute() as i32,
            naive.second() as i32,
            zone,
        )
    }

    /// Build a UTC date-time from seconds since the Unix epoch.
    pub fn from_unix_time(seconds: i64) -> CalendarTime {
        let mut time = CalendarTime::utc(1970, 1, 1, 0, 0, 0);
        time.set_local_seconds(seconds);
        time
    }

    /// Build a date from a 1-based day of the year.
    pub fn from_day_of_year(day_of_year: i32, year: i32) -> CalendarTime {
        let mut time = CalendarTime::date(year, 1, day_of_year);
        time.normalize();
        time
    }

    /// Parse the compact iCalendar forms `YYYYMMDD`, `YYYYMMDDTHHMMSS` and
    /// `YYYYMMDDTHHMMSSZ`. A trailing `Z` overrides `zone`.
    pub fn parse_ical(value: &str, zone: Zone) -> Result<CalendarTime, TimeError> {
        let err = || TimeError::Parse {
            value: value.to_string(),
        };

        let digits = |s: &str| -> Result<i32, TimeError> {
            if s.bytes().all(|b| b.is_ascii_digit()) {
                s.parse().map_err(|_| err())
            } else {
                Err(err())
            }
        };

        if !value.is_ascii() {
            return Err(err());
        }

        let (date, time) = match value.split_once(|c: char| c == 'T' || c == 't') {
            Some((date, time)) => (date, Some(time)),
            None => (value, None),
        };

        if date.len() != 8 {
            return Err(err());
        }

        let year = digits(&date[0..4])?;
        let month = digits(&date[4..6])?;
        let day = digits(&date[6..8])?;

        if !(1..=12).contains(&month) || day < 1 || day > days_in_month(month, year) {
            return Err(err());
        }

        let time = match time {
            None => return Ok(CalendarTime::date(year, month, day)),
            Some(time) => time,
        };

        let (time, zone) = match time.strip_suffix(|c: char| c == 'Z' || c == 'z') {
            Some(time) => (time, Zone::Utc),
            None => (time, zone),
        };

        if time.len() != 6 {
            return Err(err());
        }

        let hour = digits(&time[0..2])?;
        let minute = digits(&time[2..4])?;
        let second = digits(&time[4..6])?;

        if hour > 23 || minute > 59 || second > 60 {
            return Err(err());
        }

        Ok(CalendarTime::new(year, month, day, hour, minute, second, zone))
    }

    /// Carry out of range fields into their neighbours, e.g. month 13 becomes
    /// January of the next year and day 0 becomes the last day of the previous
    /// month. Date values have their time fields cleared.
    pub fn normalize(&mut self) -> &mut CalendarTime {
        if self.is_date {
            self.hour = 0;
            self.minute = 0;
            self.second = 0;
        }

        let seconds = self.local_seconds();
        self.set_local_seconds(seconds);
        self
    }

    pub fn normalized(&self) -> CalendarTime {
        let mut time = self.clone();
        time.normalize();
        time
    }

    /// Seconds since the epoch as read on the wall clock, ignoring the zone.
    pub(crate) fn local_seconds(&self) -> i64 {
        let (hour, minute, second) = if self.is_date {
            (0, 0, 0)
        } else {
            (self.hour as i64, self.minute as i64, self.second as i64)
        };

        self.day_number() * SECONDS_PER_DAY + hour * 3600 + minute * 60 + second
    }

    fn set_local_seconds(&mut self, seconds: i64) {
        let days = seconds.div_euclid(SECONDS_PER_DAY);
        let rem = seconds.rem_euclid(SECONDS_PER_DAY);
        let date = date_from_day_number(days);

        self.year = date.year();
        self.month = date.month() as i32;
        self.day = date.day() as i32;
        self.hour = (rem / 3600) as i32;
        self.minute = (rem % 3600 / 60) as i32;
        self.second = (rem % 60) as i32;
    }

    /// Days since 1970-01-01 for the (normalized) date part.
    pub(crate) fn day_number(&self) -> i64 {
        let months = self.year as i64 * 12 + (self.month as i64 - 1);
        let year = months.div_euclid(12);
        let month = months.rem_euclid(12) + 1;

        first_of_month(year, month as u32).num_days_from_ce() as i64 - UNIX_EPOCH_DAY
            + self.day as i64
            - 1
    }

    /// The normalized date part as a chrono date.
    fn calendar_date(&self) -> NaiveDate {
        date_from_day_number(self.day_number())
    }

    pub fn to_naive(&self) -> Result<NaiveDateTime, TimeError> {
        let time = self.normalized();
        NaiveDate::from_ymd_opt(time.year, time.month as u32, time.day as u32)
            .and_then(|d| d.and_hms_opt(time.hour as u32, time.minute as u32, time.second as u32))
            .ok_or_else(|| TimeError::OutOfRange(time.to_string()))
    }

    pub fn to_naive_date(&self) -> Result<NaiveDate, TimeError> {
        Ok(self.to_naive()?.date())
    }

    /// The offset from UTC, in seconds, in effect for this wall-clock time.
    pub fn utc_offset(&self, zones: &TimezoneRegistry) -> Result<i32, TimezoneError> {
        match &self.zone {
            Zone::Named(tzid) => Ok(zones.resolve(tzid)?.utc_offset(self)),
            zone => Ok(zone.fixed_offset().unwrap_or(0)),
        }
    }

    /// Seconds since the Unix epoch. Floating times are read as UTC.
    pub fn to_unix_time(&self, zones: &TimezoneRegistry) -> Result<i64, TimezoneError> {
        Ok(self.local_seconds() - self.utc_offset(zones)? as i64)
    }

    /// Chronological comparison. Both sides are converted through UTC unless
    /// they share a zone, in which case no lookup is needed.
    pub fn compare(
        &self,
        other: &CalendarTime,
        zones: &TimezoneRegistry,
    ) -> Result<Ordering, TimezoneError> {
        if self.zone == other.zone {
            return Ok(self.local_seconds().cmp(&other.local_seconds()));
        }

        Ok(self.to_unix_time(zones)?.cmp(&other.to_unix_time(zones)?))
    }

    /// Compare only the dates of both values after moving them into `zone`.
    pub fn compare_date_only_tz(
        &self,
        other: &CalendarTime,
        zone: &Zone,
        zones: &TimezoneRegistry,
    ) -> Result<Ordering, TimezoneError> {
        let a = self.convert_to_zone(zone, zones)?;
        let b = other.convert_to_zone(zone, zones)?;

        Ok(a.day_number().cmp(&b.day_number()))
    }

    /// The same instant read in another zone. Dates and floating values keep
    /// their fields and only change their label.
    pub fn convert_to_zone(
        &self,
        zone: &Zone,
        zones: &TimezoneRegistry,
    ) -> Result<CalendarTime, TimezoneError> {
        let mut converted = self.normalized();

        if &self.zone == zone
            || self.is_date
            || self.zone == Zone::Floating
            || *zone == Zone::Floating
        {
            converted.zone = zone.clone();
            return Ok(converted);
        }

        let utc = self.to_unix_time(zones)?;
        let offset = match zone {
            Zone::Named(tzid) => zones.resolve(tzid)?.utc_offset_at_utc(utc),
            other => other.fixed_offset().unwrap_or(0),
        };

        converted.set_local_seconds(utc + offset as i64);
        converted.zone = zone.clone();
        Ok(converted)
    }

    /// Day of the week, 1 (Sunday) to 7 (Saturday).
    pub fn day_of_week(&self) -> u32 {
        self.day_of_week_from(Weekday::Sun)
    }

    /// Day of the week counted from `week_start`, which is day 1.
    pub fn day_of_week_from(&self, week_start: Weekday) -> u32 {
        days_since_week_start(self.weekday(), week_start) as u32 + 1
    }

    pub fn weekday(&self) -> Weekday {
        self.calendar_date().weekday()
    }

    pub fn day_of_year(&self) -> u32 {
        self.calendar_date().ordinal()
    }

    /// The date week one of `year` starts on, for weeks beginning on
    /// `week_start`.
    pub fn week_one_starts(year: i32, week_start: Weekday) -> CalendarTime {
        match week_one_start(year, week_start) {
            Some(date) => CalendarTime::date(date.year(), date.month() as i32, date.day() as i32),
            None => CalendarTime::date(year, 1, 1),
        }
    }

    /// Week number within the week numbering year, ISO 8601 style but
    /// honouring `week_start`.
    pub fn week_number(&self, week_start: Weekday) -> u32 {
        week_year_and_number(self.calendar_date(), week_start).1 as u32
    }

    /// The day of this month that is the `pos`th `weekday`, counting from the
    /// end for negative positions. Position 0 is treated as 1.
    ///
    /// The result may fall outside the month when the position is too large.
    pub fn nth_week_day(&self, weekday: Weekday, pos: i32) -> i32 {
        let time = self.normalized();

        if pos >= 0 {
            let first = time.start_of_month().weekday();
            let offset = days_since_week_start(weekday, first) as i32;
            1 + offset + (pos.max(1) - 1) * 7
        } else {
            let last = time.end_of_month().weekday();
            let offset = days_since_week_start(last, weekday) as i32;
            days_in_month(time.month, time.year) - offset + (pos + 1) * 7
        }
    }

    pub fn is_nth_week_day(&self, weekday: Weekday, pos: i32) -> bool {
        let time = self.normalized();

        if pos == 0 {
            return time.weekday() == weekday;
        }

        time.nth_week_day(weekday, pos) == time.day
    }

    pub fn start_of_week(&self, week_start: Weekday) -> CalendarTime {
        let mut time = self.as_date();
        time.day -= time.day_of_week_from(week_start) as i32 - 1;
        time.normalize();
        time
    }

    pub fn end_of_week(&self, week_start: Weekday) -> CalendarTime {
        let mut time = self.as_date();
        time.day += 7 - time.day_of_week_from(week_start) as i32;
        time.normalize();
        time
    }

    pub fn start_of_month(&self) -> CalendarTime {
        let mut time = self.as_date();
        time.day = 1;
        time
    }

    pub fn end_of_month(&self) -> CalendarTime {
        let mut time = self.as_date();
        time.day = days_in_month(time.month, time.year);
        time
    }

    pub fn start_of_year(&self) -> CalendarTime {
        let mut time = self.as_date();
        time.month = 1;
        time.day = 1;
        time
    }

    pub fn end_of_year(&self) -> CalendarTime {
        let mut time = self.as_date();
        time.month = 12;
        time.day = 31;
        time
    }

    fn as_date(&self) -> CalendarTime {
        let mut time = self.normalized();
        time.is_date = true;
        time.normalize();
        time
    }

    /// Add a duration on the wall clock. Dates only move by whole days.
    pub fn add_duration(&mut self, duration: Duration) -> &mut CalendarTime {
        let seconds = if self.is_date {
            duration.num_days() * SECONDS_PER_DAY
        } else {
            duration.num_seconds()
        };

        let total = self.local_seconds() + seconds;
        self.set_local_seconds(total);
        self
    }

    /// Wall-clock difference `self - other`, ignoring zones.
    pub fn subtract_date(&self, other: &CalendarTime) -> Duration {
        Duration::seconds(self.local_seconds() - other.local_seconds())
    }

    /// Absolute difference `self - other`, converting both through UTC.
    pub fn subtract_date_tz(
        &self,
        other: &CalendarTime,
        zones: &TimezoneRegistry,
    ) -> Result<Duration, TimezoneError> {
        Ok(Duration::seconds(
            self.to_unix_time(zones)? - other.to_unix_time(zones)?,
        ))
    }

    /// The compact iCalendar form, e.g. `20150101T090000Z`.
    pub fn to_ical_string(&self) -> String {
        let time = self.normalized();
        let mut result = format!("{:04}{:02}{:02}", time.year, time.month, time.day);

        if !time.is_date {
            result.push_str(&format!(
                "T{:02}{:02}{:02}",
                time.hour, time.minute, time.second
            ));
            if time.zone == Zone::Utc {
                result.push('Z');
            }
        }

        result
    }
}

/// The dashed form, e.g. `2015-01-01T09:00:00Z`.
impl fmt::Display for CalendarTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)?;

        if !self.is_date {
            write!(f, "T{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
            if self.zone == Zone::Utc {
                write!(f, "Z")?;
            }
        }

        Ok(())
    }
}

/// Accepts both the dashed and the compact form. Values without a `Z` are
/// floating.
impl FromStr for CalendarTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| *c != '-' && *c != ':').collect();
        CalendarTime::parse_ical(&compact, Zone::Floating).map_err(|_| TimeError::Parse {
            value: s.to_string(),
        })
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(month: i32, year: i32) -> i32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

pub fn days_in_year(year: i32) -> i32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

/// Days counted from `week_start`, which is day 0.
pub(crate) fn days_since_week_start(weekday: Weekday, week_start: Weekday) -> i64 {
    (weekday.num_days_from_monday() as i64 + 7 - week_start.num_days_from_monday() as i64) % 7
}

/// First day of week one: the first week with at least four days in `year`.
pub(crate) fn week_one_start(year: i32, week_start: Weekday) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let back = days_since_week_start(jan1.weekday(), week_start);
    let start = jan1.checked_sub_signed(Duration::days(back))?;

    if back > 3 {
        start.checked_add_signed(Duration::days(7))
    } else {
        Some(start)
    }
}

pub(crate) fn weeks_in_year(week_year: i32, week_start: Weekday) -> i64 {
    match (
        week_one_start(week_year, week_start),
        week_one_start(week_year + 1, week_start),
    ) {
        (Some(this), Some(next)) => (next - this).num_days() / 7,
        _ => 52,
    }
}

/// The week numbering year and week number, e.g. 2014-12-29 is in week 1 of
/// 2015 with Monday starts.
pub(crate) fn week_year_and_number(date: NaiveDate, week_start: Weekday) -> (i32, i64) {
    let year = date.year();

    let week_year = match week_one_start(year + 1, week_start) {
        Some(next) if date >= next => year + 1,
        _ => match week_one_start(year, week_start) {
            Some(this) if date < this => year - 1,
            _ => year,
        },
    };

    match week_one_start(week_year, week_start) {
        Some(first) => (week_year, (date - first).num_days() / 7 + 1),
        None => (week_year, 1),
    }
}

fn first_of_month(year: i64, month: u32) -> NaiveDate {
    let clamped = year.clamp(NaiveDate::MIN.year() as i64, NaiveDate::MAX.year() as i64);
    if clamped != year {
        tracing::error!(year, "year outside the supported calendar, clamping");
    }

    NaiveDate::from_ymd_opt(clamped as i32, month, 1).unwrap_or(NaiveDate::MIN)
}

fn date_from_day_number(days: i64) -> NaiveDate {
    i32::try_from(days + UNIX_EPOCH_DAY)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .unwrap_or_else(|| {
            tracing::error!(days, "date outside the supported calendar, clamping");
            if days < 0 {
                NaiveDate::MIN
            } else {
                NaiveDate::MAX
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_carries_overflow() {
        let mut time = CalendarTime::floating(2015, 13, 32, 25, 61, 61);
        time.normalize();
        assert_eq!(time, CalendarTime::floating(2016, 2, 2, 2, 2, 1));

        let mut time = CalendarTime::floating(2016, 3, 0, 0, 0, -1);
        time.normalize();
        assert_eq!(time, CalendarTime::floating(2016, 2, 28, 23, 59, 59));

        let mut time = CalendarTime::date(2015, 1, 31);
        time.month += 1;
        time.normalize();
        assert_eq!(time, CalendarTime::date(2015, 3, 3));
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut time = CalendarTime::floating(2012, 2, 29, 12, 30, 0);
        time.normalize();
        let once = time.clone();
        time.normalize();
        assert_eq!(time, once);
    }

    #[test]
    fn unix_time_round_trip() {
        let zones = TimezoneRegistry::new();

        for &secs in &[0i64, 1, -1, 951_782_400, 1_330_000_000, -2_208_988_800, 4_102_444_800] {
            let time = CalendarTime::from_unix_time(secs);
            assert_eq!(time.to_unix_time(&zones).unwrap(), secs, "{}", time);
        }

        assert_eq!(
            CalendarTime::from_unix_time(951_782_400),
            CalendarTime::utc(2000, 2, 29, 0, 0, 0)
        );
    }

    #[test]
    fn day_of_week_and_year() {
        // 1970-01-01 was a Thursday.
        assert_eq!(CalendarTime::date(1970, 1, 1).day_of_week(), 5);
        assert_eq!(CalendarTime::date(1970, 1, 1).weekday(), Weekday::Thu);
        assert_eq!(CalendarTime::date(2000, 1, 1).weekday(), Weekday::Sat);
        assert_eq!(CalendarTime::date(1970, 1, 4).day_of_week_from(Weekday::Mon), 7);

        assert_eq!(CalendarTime::date(2016, 12, 31).day_of_year(), 366);
        assert_eq!(CalendarTime::date(2015, 3, 1).day_of_year(), 60);
        assert_eq!(
            CalendarTime::from_day_of_year(60, 2016),
            CalendarTime::date(2016, 2, 29)
        );
    }

    #[test]
    fn week_numbers() {
        assert_eq!(
            CalendarTime::week_one_starts(2015, Weekday::Mon),
            CalendarTime::date(2014, 12, 29)
        );
        assert_eq!(
            CalendarTime::week_one_starts(2016, Weekday::Mon),
            CalendarTime::date(2016, 1, 4)
        );

        assert_eq!(CalendarTime::date(2014, 12, 29).week_number(Weekday::Mon), 1);
        assert_eq!(CalendarTime::date(2016, 1, 3).week_number(Weekday::Mon), 53);
        assert_eq!(CalendarTime::date(2016, 6, 15).week_number(Weekday::Mon), 24);
        assert_eq!(CalendarTime::date(2016, 1, 3).week_number(Weekday::Sun), 1);
    }

    #[test]
    fn week_numbering_years() {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();

        assert_eq!(week_one_start(2015, Weekday::Mon), Some(date(2014, 12, 29)));
        assert_eq!(week_one_start(2021, Weekday::Mon), Some(date(2021, 1, 4)));
        assert_eq!(week_year_and_number(date(2021, 1, 3), Weekday::Mon), (2020, 53));
        assert_eq!(week_year_and_number(date(2014, 12, 31), Weekday::Mon), (2015, 1));
        assert_eq!(weeks_in_year(2020, Weekday::Mon), 53);
        assert_eq!(weeks_in_year(2021, Weekday::Mon), 52);
    }

    #[test_log::test]
    fn far_dates_clamp_instead_of_panicking() {
        let time = CalendarTime::from_unix_time(i64::MAX / 2);
        assert_eq!(time.year, NaiveDate::MAX.year());

        let mut time = CalendarTime::date(i32::MAX, 14, 1);
        time.normalize();
        assert_eq!(time.year, NaiveDate::MAX.year());
    }

    #[test]
    fn nth_week_day() {
        let jan = CalendarTime::date(1970, 1, 1);
        assert_eq!(jan.nth_week_day(Weekday::Mon, 2), 12);
        assert_eq!(jan.nth_week_day(Weekday::Mon, -3), 12);
        assert_eq!(jan.nth_week_day(Weekday::Sun, -1), 25);
        assert_eq!(jan.nth_week_day(Weekday::Thu, 1), 1);
        assert!(jan.nth_week_day(Weekday::Thu, 6) > 31);

        assert!(CalendarTime::date(1970, 1, 25).is_nth_week_day(Weekday::Sun, -1));
        assert!(!CalendarTime::date(1970, 1, 18).is_nth_week_day(Weekday::Sun, -1));
        assert!(CalendarTime::date(1970, 1, 18).is_nth_week_day(Weekday::Sun, 0));
    }

    #[test]
    fn period_boundaries() {
        let time = CalendarTime::floating(2016, 2, 17, 13, 0, 0);

        assert_eq!(time.start_of_week(Weekday::Mon), CalendarTime::date(2016, 2, 15));
        assert_eq!(time.end_of_week(Weekday::Mon), CalendarTime::date(2016, 2, 21));
        assert_eq!(time.start_of_week(Weekday::Sun), CalendarTime::date(2016, 2, 14));
        assert_eq!(time.start_of_month(), CalendarTime::date(2016, 2, 1));
        assert_eq!(time.end_of_month(), CalendarTime::date(2016, 2, 29));
        assert_eq!(time.start_of_year(), CalendarTime::date(2016, 1, 1));
        assert_eq!(time.end_of_year(), CalendarTime::date(2016, 12, 31));
    }

    #[test]
    fn durations() {
        let mut time = CalendarTime::floating(2015, 12, 31, 23, 0, 0);
        time.add_duration(Duration::hours(2));
        assert_eq!(time, CalendarTime::floating(2016, 1, 1, 1, 0, 0));

        let mut date = CalendarTime::date(2016, 2, 28);
        date.add_duration(Duration::hours(30));
        assert_eq!(date, CalendarTime::date(2016, 2, 29));

        let a = CalendarTime::floating(2016, 3, 1, 0, 0, 0);
        let b = CalendarTime::floating(2016, 2, 28, 12, 0, 0);
        assert_eq!(a.subtract_date(&b), Duration::hours(36));
    }

    #[test]
    fn compare_across_zones() {
        let zones = TimezoneRegistry::new();
        let utc = CalendarTime::utc(2015, 1, 1, 12, 0, 0);
        let plus_one = CalendarTime::new(
            2015,
            1,
            1,
            13,
            0,
            0,
            Zone::Fixed(FixedOffset::east_opt(3600).unwrap()),
        );

        assert_eq!(utc.compare(&plus_one, &zones).unwrap(), Ordering::Equal);
        assert_eq!(
            utc.compare(&CalendarTime::utc(2015, 1, 1, 12, 0, 1), &zones).unwrap(),
            Ordering::Less
        );

        let converted = utc
            .convert_to_zone(&Zone::Fixed(FixedOffset::west_opt(5 * 3600).unwrap()), &zones)
            .unwrap();
        assert_eq!((converted.day, converted.hour), (1, 7));

        let missing = CalendarTime::new(2015, 1, 1, 0, 0, 0, Zone::named("Nowhere/Else"));
        assert_eq!(
            missing.compare(&utc, &zones),
            Err(TimezoneError::NotFound("Nowhere/Else".to_string()))
        );
    }

    #[test]
    fn date_values_compare_as_midnight() {
        let zones = TimezoneRegistry::new();
        let date = CalendarTime::date(2015, 1, 2);
        let midnight = CalendarTime::floating(2015, 1, 2, 0, 0, 0);
        let later = CalendarTime::floating(2015, 1, 2, 0, 0, 1);

        assert_eq!(date.compare(&midnight, &zones).unwrap(), Ordering::Equal);
        assert_eq!(date.compare(&later, &zones).unwrap(), Ordering::Less);
    }

    #[test]
    fn string_forms() {
        let time = CalendarTime::parse_ical("20150101T090000Z", Zone::Floating).unwrap();
        assert_eq!(time, CalendarTime::utc(2015, 1, 1, 9, 0, 0));
        assert_eq!(time.to_string(), "2015-01-01T09:00:00Z");
        assert_eq!(time.to_ical_string(), "20150101T090000Z");

        let date: CalendarTime = "2016-02-29".parse().unwrap();
        assert_eq!(date, CalendarTime::date(2016, 2, 29));
        assert_eq!(date.to_ical_string(), "20160229");

        assert!(CalendarTime::parse_ical("20150229", Zone::Floating).is_err());
        assert!(CalendarTime::parse_ical("2015011", Zone::Floating).is_err());
        assert!(CalendarTime::parse_ical("20150101T2500", Zone::Floating).is_err());
    }
}
