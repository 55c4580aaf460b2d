use std::{fmt, str::FromStr};

use chrono::Weekday;

use crate::{
    error::{Error, RecurError, TimezoneError},
    recur_iterator::RecurIterator,
    registry::TimezoneRegistry,
    time::{CalendarTime, Zone},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Secondly => "SECONDLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Hourly => "HOURLY",
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    /// Whether the period is shorter than a day.
    pub fn is_sub_daily(self) -> bool {
        self < Frequency::Daily
    }
}

impl FromStr for Frequency {
    type Err = RecurError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match &value.to_ascii_uppercase() as &str {
            "SECONDLY" => Frequency::Secondly,
            "MINUTELY" => Frequency::Minutely,
            "HOURLY" => Frequency::Hourly,
            "DAILY" => Frequency::Daily,
            "WEEKLY" => Frequency::Weekly,
            "MONTHLY" => Frequency::Monthly,
            "YEARLY" => Frequency::Yearly,
            _ => {
                return Err(RecurError::invalid_value(
                    RulePart::Freq,
                    value,
                    "unknown frequency",
                ))
            }
        })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndCondition {
    Count(u32),
    /// Inclusive bound. A date value covers the whole of that day.
    Until(CalendarTime),
    Infinite,
}

/// A BYDAY entry: a weekday with an optional signed ordinal, e.g. `-1SU`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayDesignator {
    pub ordinal: Option<i8>,
    pub weekday: Weekday,
}

impl DayDesignator {
    pub fn every(weekday: Weekday) -> DayDesignator {
        DayDesignator {
            ordinal: None,
            weekday,
        }
    }

    pub fn nth(ordinal: i8, weekday: Weekday) -> DayDesignator {
        DayDesignator {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl FromStr for DayDesignator {
    type Err = RecurError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.trim().to_ascii_uppercase();
        if upper.len() < 2 || !upper.is_ascii() {
            return Err(RecurError::invalid_value(
                RulePart::ByDay,
                value,
                "expected a weekday",
            ));
        }

        let (ordinal, day) = upper.split_at(upper.len() - 2);
        let weekday = parse_weekday(day).ok_or_else(|| {
            RecurError::invalid_value(RulePart::ByDay, value, "unknown weekday")
        })?;

        let ordinal = if ordinal.is_empty() {
            None
        } else {
            let ordinal: i32 = ordinal.parse().map_err(|_| {
                RecurError::invalid_value(RulePart::ByDay, value, "malformed ordinal")
            })?;
            if !(1..=53).contains(&ordinal.abs()) {
                return Err(RecurError::invalid_value(
                    RulePart::ByDay,
                    value,
                    "ordinal must be within ±1..53",
                ));
            }
            Some(ordinal as i8)
        };

        Ok(DayDesignator { ordinal, weekday })
    }
}

impl fmt::Display for DayDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ordinal) = self.ordinal {
            write!(f, "{}", ordinal)?;
        }
        f.write_str(weekday_token(self.weekday))
    }
}

/// The keys that may appear in a recurrence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulePart {
    Freq,
    Until,
    Count,
    Interval,
    BySecond,
    ByMinute,
    ByHour,
    ByDay,
    ByMonthDay,
    ByYearDay,
    ByWeekNo,
    ByMonth,
    BySetPos,
    Wkst,
}

impl RulePart {
    /// The BY parts in the order they are written out.
    pub const BY_PARTS: [RulePart; 9] = [
        RulePart::BySecond,
        RulePart::ByMinute,
        RulePart::ByHour,
        RulePart::ByDay,
        RulePart::ByMonthDay,
        RulePart::ByYearDay,
        RulePart::ByWeekNo,
        RulePart::ByMonth,
        RulePart::BySetPos,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RulePart::Freq => "FREQ",
            RulePart::Until => "UNTIL",
            RulePart::Count => "COUNT",
            RulePart::Interval => "INTERVAL",
            RulePart::BySecond => "BYSECOND",
            RulePart::ByMinute => "BYMINUTE",
            RulePart::ByHour => "BYHOUR",
            RulePart::ByDay => "BYDAY",
            RulePart::ByMonthDay => "BYMONTHDAY",
            RulePart::ByYearDay => "BYYEARDAY",
            RulePart::ByWeekNo => "BYWEEKNO",
            RulePart::ByMonth => "BYMONTH",
            RulePart::BySetPos => "BYSETPOS",
            RulePart::Wkst => "WKST",
        }
    }

    /// Allowed magnitude of a numeric BY part, and whether negatives count
    /// from the end of the period.
    fn numeric_range(self) -> Option<(i32, i32, bool)> {
        match self {
            RulePart::BySecond => Some((0, 60, false)),
            RulePart::ByMinute => Some((0, 59, false)),
            RulePart::ByHour => Some((0, 23, false)),
            RulePart::ByMonthDay => Some((1, 31, true)),
            RulePart::ByYearDay => Some((1, 366, true)),
            RulePart::ByWeekNo => Some((1, 53, true)),
            RulePart::ByMonth => Some((1, 12, false)),
            RulePart::BySetPos => Some((1, 366, true)),
            _ => None,
        }
    }
}

impl FromStr for RulePart {
    type Err = RecurError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match &value.trim().to_ascii_uppercase() as &str {
            "FREQ" => RulePart::Freq,
            "UNTIL" => RulePart::Until,
            "COUNT" => RulePart::Count,
            "INTERVAL" => RulePart::Interval,
            "BYSECOND" => RulePart::BySecond,
            "BYMINUTE" => RulePart::ByMinute,
            "BYHOUR" => RulePart::ByHour,
            "BYDAY" => RulePart::ByDay,
            "BYMONTHDAY" => RulePart::ByMonthDay,
            "BYYEARDAY" => RulePart::ByYearDay,
            "BYWEEKNO" => RulePart::ByWeekNo,
            "BYMONTH" => RulePart::ByMonth,
            "BYSETPOS" => RulePart::BySetPos,
            "WKST" => RulePart::Wkst,
            _ => {
                return Err(RecurError::UnknownPart {
                    part: value.to_string(),
                })
            }
        })
    }
}

impl fmt::Display for RulePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed RRULE.
///
/// Rules parsed from text are validated. Rules assembled through
/// [`RecurrenceRule::new`] and the part mutation methods only have their
/// individual values checked; the cross-part checks run in
/// [`RecurrenceRule::validate`], which the iterator constructors call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub end_condition: EndCondition,
    pub by_second: Vec<u8>,
    pub by_minute: Vec<u8>,
    pub by_hour: Vec<u8>,
    pub by_day: Vec<DayDesignator>,
    pub by_month_day: Vec<i8>,
    pub by_year_day: Vec<i16>,
    pub by_week_number: Vec<i8>,
    pub by_month: Vec<u8>,
    pub by_set_pos: Vec<i16>,
    pub week_start: Weekday,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency) -> RecurrenceRule {
        RecurrenceRule {
            frequency,
            interval: 1,
            end_condition: EndCondition::Infinite,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_number: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
            week_start: Weekday::Mon,
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = coerce_interval(interval as i64);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.end_condition = EndCondition::Count(count);
        self
    }

    pub fn with_until(mut self, until: CalendarTime) -> Self {
        self.end_condition = EndCondition::Until(until);
        self
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// Builder form of [`RecurrenceRule::set_part`].
    pub fn with_part(mut self, part: RulePart, value: &str) -> Result<Self, RecurError> {
        self.set_part(part, value)?;
        Ok(self)
    }

    pub fn is_finite(&self) -> bool {
        !matches!(self.end_condition, EndCondition::Infinite)
    }

    pub fn is_by_count(&self) -> bool {
        matches!(self.end_condition, EndCondition::Count(_))
    }

    pub fn count(&self) -> Option<u32> {
        match self.end_condition {
            EndCondition::Count(count) => Some(count),
            _ => None,
        }
    }

    pub fn until(&self) -> Option<&CalendarTime> {
        match &self.end_condition {
            EndCondition::Until(until) => Some(until),
            _ => None,
        }
    }

    /// Replace the value of a part with the comma separated `value`.
    pub fn set_part(&mut self, part: RulePart, value: &str) -> Result<&mut Self, RecurError> {
        match part {
            RulePart::Freq => self.frequency = value.parse()?,
            RulePart::Interval => {
                let interval: i64 = value.trim().parse().map_err(|_| {
                    RecurError::invalid_value(part, value, "expected an integer")
                })?;
                self.interval = coerce_interval(interval);
            }
            RulePart::Count => {
                let count = value.trim().parse().map_err(|_| {
                    RecurError::invalid_value(part, value, "expected a non-negative integer")
                })?;
                self.end_condition = EndCondition::Count(count);
            }
            RulePart::Until => {
                let until = CalendarTime::parse_ical(value.trim(), Zone::Floating).map_err(|_| {
                    RecurError::InvalidUntil {
                        value: value.to_string(),
                    }
                })?;
                self.end_condition = EndCondition::Until(until);
            }
            RulePart::Wkst => {
                self.week_start = parse_weekday(&value.trim().to_ascii_uppercase())
                    .ok_or_else(|| RecurError::invalid_value(part, value, "unknown weekday"))?;
            }
            _ => {
                self.clear_part(part);
                self.add_part(part, value)?;
            }
        }

        Ok(self)
    }

    /// Append values to a BY part, skipping ones already present. For the
    /// single valued parts this is the same as [`RecurrenceRule::set_part`].
    pub fn add_part(&mut self, part: RulePart, value: &str) -> Result<&mut Self, RecurError> {
        match part {
            RulePart::ByDay => {
                let days = value
                    .split(',')
                    .map(str::parse)
                    .collect::<Result<Vec<DayDesignator>, _>>()?;
                extend_unique(&mut self.by_day, days);
            }
            RulePart::BySecond => extend_unique(&mut self.by_second, parse_numbers(part, value)?),
            RulePart::ByMinute => extend_unique(&mut self.by_minute, parse_numbers(part, value)?),
            RulePart::ByHour => extend_unique(&mut self.by_hour, parse_numbers(part, value)?),
            RulePart::ByMonthDay => {
                extend_unique(&mut self.by_month_day, parse_numbers(part, value)?)
            }
            RulePart::ByYearDay => {
                extend_unique(&mut self.by_year_day, parse_numbers(part, value)?)
            }
            RulePart::ByWeekNo => {
                extend_unique(&mut self.by_week_number, parse_numbers(part, value)?)
            }
            RulePart::ByMonth => extend_unique(&mut self.by_month, parse_numbers(part, value)?),
            RulePart::BySetPos => {
                extend_unique(&mut self.by_set_pos, parse_numbers(part, value)?)
            }
            _ => {
                self.set_part(part, value)?;
            }
        }

        Ok(self)
    }

    /// Reset a part to its default. Returns whether the rule changed.
    pub fn remove_part(&mut self, part: RulePart) -> bool {
        match part {
            RulePart::Freq => false,
            RulePart::Interval => std::mem::replace(&mut self.interval, 1) != 1,
            RulePart::Wkst => std::mem::replace(&mut self.week_start, Weekday::Mon) != Weekday::Mon,
            RulePart::Count if self.is_by_count() => {
                self.end_condition = EndCondition::Infinite;
                true
            }
            RulePart::Until if self.until().is_some() => {
                self.end_condition = EndCondition::Infinite;
                true
            }
            RulePart::Count | RulePart::Until => false,
            _ => {
                let had_values = self.has_part(part);
                self.clear_part(part);
                had_values
            }
        }
    }

    pub fn has_part(&self, part: RulePart) -> bool {
        match part {
            RulePart::Freq => true,
            RulePart::Interval => self.interval != 1,
            RulePart::Wkst => self.week_start != Weekday::Mon,
            RulePart::Count => self.is_by_count(),
            RulePart::Until => self.until().is_some(),
            RulePart::BySecond => !self.by_second.is_empty(),
            RulePart::ByMinute => !self.by_minute.is_empty(),
            RulePart::ByHour => !self.by_hour.is_empty(),
            RulePart::ByDay => !self.by_day.is_empty(),
            RulePart::ByMonthDay => !self.by_month_day.is_empty(),
            RulePart::ByYearDay => !self.by_year_day.is_empty(),
            RulePart::ByWeekNo => !self.by_week_number.is_empty(),
            RulePart::ByMonth => !self.by_month.is_empty(),
            RulePart::BySetPos => !self.by_set_pos.is_empty(),
        }
    }

    /// The values of a part as wire tokens, empty if the part is not set.
    pub fn component(&self, part: RulePart) -> Vec<String> {
        fn tokens<T: ToString>(values: &[T]) -> Vec<String> {
            values.iter().map(ToString::to_string).collect()
        }

        match part {
            RulePart::Freq => vec![self.frequency.to_string()],
            RulePart::Interval => vec![self.interval.to_string()],
            RulePart::Wkst => vec![weekday_token(self.week_start).to_string()],
            RulePart::Count => self.count().map(|c| c.to_string()).into_iter().collect(),
            RulePart::Until => self.until().map(|u| u.to_ical_string()).into_iter().collect(),
            RulePart::BySecond => tokens(&self.by_second),
            RulePart::ByMinute => tokens(&self.by_minute),
            RulePart::ByHour => tokens(&self.by_hour),
            RulePart::ByDay => tokens(&self.by_day),
            RulePart::ByMonthDay => tokens(&self.by_month_day),
            RulePart::ByYearDay => tokens(&self.by_year_day),
            RulePart::ByWeekNo => tokens(&self.by_week_number),
            RulePart::ByMonth => tokens(&self.by_month),
            RulePart::BySetPos => tokens(&self.by_set_pos),
        }
    }

    fn clear_part(&mut self, part: RulePart) {
        match part {
            RulePart::BySecond => self.by_second.clear(),
            RulePart::ByMinute => self.by_minute.clear(),
            RulePart::ByHour => self.by_hour.clear(),
            RulePart::ByDay => self.by_day.clear(),
            RulePart::ByMonthDay => self.by_month_day.clear(),
            RulePart::ByYearDay => self.by_year_day.clear(),
            RulePart::ByWeekNo => self.by_week_number.clear(),
            RulePart::ByMonth => self.by_month.clear(),
            RulePart::BySetPos => self.by_set_pos.clear(),
            _ => {}
        }
    }

    /// Check which parts may be combined, per RFC 5545 section 3.3.10.
    pub fn validate(&self) -> Result<(), RecurError> {
        use RulePart::*;

        if self.has_part(ByYearDay)
            && (self.has_part(ByMonth) || self.has_part(ByWeekNo) || self.has_part(ByMonthDay))
        {
            return Err(RecurError::combination(
                ByYearDay,
                "cannot be combined with BYMONTH, BYWEEKNO or BYMONTHDAY",
            ));
        }

        if self.has_part(ByWeekNo) && self.has_part(ByMonthDay) {
            return Err(RecurError::combination(
                ByWeekNo,
                "cannot be combined with BYMONTHDAY",
            ));
        }

        match self.frequency {
            Frequency::Monthly => {
                for part in &[ByYearDay, ByWeekNo] {
                    if self.has_part(*part) {
                        return Err(RecurError::combination(
                            *part,
                            "not allowed with FREQ=MONTHLY",
                        ));
                    }
                }
            }
            Frequency::Weekly => {
                for part in &[ByYearDay, ByMonthDay] {
                    if self.has_part(*part) {
                        return Err(RecurError::combination(
                            *part,
                            "not allowed with FREQ=WEEKLY",
                        ));
                    }
                }
            }
            _ => {}
        }

        if self.frequency != Frequency::Yearly {
            for part in &[ByYearDay, ByWeekNo] {
                if self.has_part(*part) {
                    return Err(RecurError::combination(
                        *part,
                        format!("only allowed with FREQ=YEARLY, not {}", self.frequency),
                    ));
                }
            }
        }

        for day in &self.by_day {
            let ordinal = match day.ordinal {
                Some(ordinal) => ordinal,
                None => continue,
            };

            match self.frequency {
                Frequency::Monthly if ordinal.abs() > 5 => {
                    return Err(RecurError::combination(
                        ByDay,
                        format!("ordinal in '{}' is out of range for a month", day),
                    ))
                }
                Frequency::Yearly if self.has_part(ByWeekNo) => {
                    return Err(RecurError::combination(
                        ByDay,
                        format!("ordinal in '{}' cannot be combined with BYWEEKNO", day),
                    ))
                }
                Frequency::Monthly | Frequency::Yearly => {}
                other => {
                    return Err(RecurError::combination(
                        ByDay,
                        format!(
                            "ordinal in '{}' is only allowed with MONTHLY or YEARLY, not {}",
                            day, other
                        ),
                    ))
                }
            }
        }

        Ok(())
    }

    /// Expand the rule from `dtstart`.
    ///
    /// An UNTIL in a different zone than `dtstart` is converted when both
    /// zones are fixed; anything involving a named zone needs
    /// [`RecurrenceRule::iterator_in`].
    pub fn iterator(&self, dtstart: &CalendarTime) -> Result<RecurIterator, Error> {
        self.validate()?;
        let until = self.local_until(dtstart, None)?;
        Ok(RecurIterator::new(self.clone(), dtstart.clone(), until))
    }

    /// Like [`RecurrenceRule::iterator`], resolving named zones through
    /// `zones`.
    pub fn iterator_in(
        &self,
        dtstart: &CalendarTime,
        zones: &TimezoneRegistry,
    ) -> Result<RecurIterator, Error> {
        self.validate()?;
        let until = self.local_until(dtstart, Some(zones))?;
        Ok(RecurIterator::new(self.clone(), dtstart.clone(), until))
    }

    /// The first occurrence strictly after `recurrence_id`, expressed in the
    /// zone of `recurrence_id`.
    pub fn next_occurrence(
        &self,
        dtstart: &CalendarTime,
        recurrence_id: &CalendarTime,
        zones: &TimezoneRegistry,
    ) -> Result<Option<CalendarTime>, Error> {
        let after = recurrence_id.to_unix_time(zones)?;

        for occurrence in self.iterator_in(dtstart, zones)? {
            if occurrence.to_unix_time(zones)? > after {
                return Ok(Some(occurrence.convert_to_zone(&recurrence_id.zone, zones)?));
            }
        }

        Ok(None)
    }

    /// UNTIL as a wall-clock time in `dtstart`'s zone.
    fn local_until(
        &self,
        dtstart: &CalendarTime,
        zones: Option<&TimezoneRegistry>,
    ) -> Result<Option<CalendarTime>, Error> {
        let until = match self.until() {
            Some(until) => until.normalized(),
            None => return Ok(None),
        };

        if until.is_date {
            let mut end_of_day = until;
            end_of_day.is_date = false;
            end_of_day.hour = 23;
            end_of_day.minute = 59;
            end_of_day.second = 59;
            end_of_day.zone = dtstart.zone.clone();
            return Ok(Some(end_of_day));
        }

        if until.zone == dtstart.zone
            || until.zone == Zone::Floating
            || dtstart.zone == Zone::Floating
        {
            return Ok(Some(until.with_zone(dtstart.zone.clone())));
        }

        if let (Some(from), Some(to)) = (until.zone.fixed_offset(), dtstart.zone.fixed_offset()) {
            let mut local = until;
            local.second += to - from;
            local.normalize();
            local.zone = dtstart.zone.clone();
            return Ok(Some(local));
        }

        let zones = zones.ok_or_else(|| {
            let tzid = dtstart
                .zone
                .tzid()
                .or_else(|| until.zone.tzid())
                .unwrap_or_default();
            TimezoneError::Unresolved(tzid.to_string())
        })?;

        Ok(Some(until.convert_to_zone(&dtstart.zone, zones)?))
    }
}

impl FromStr for RecurrenceRule {
    type Err = RecurError;

    fn from_str(rule_value_string: &str) -> Result<Self, Self::Err> {
        let mut rule = RecurrenceRule::new(Frequency::Yearly);
        let mut frequency = None;
        let mut seen_count = false;
        let mut seen_until = false;

        for part in rule_value_string.split(';').filter(|p| !p.trim().is_empty()) {
            let (name, value) = part.split_once('=').ok_or_else(|| RecurError::UnknownPart {
                part: part.to_string(),
            })?;

            let name: RulePart = name.parse()?;
            match name {
                RulePart::Freq => frequency = Some(value.parse()?),
                RulePart::Count => seen_count = true,
                RulePart::Until => seen_until = true,
                _ => {}
            }

            if seen_count && seen_until {
                return Err(RecurError::CountAndUntil);
            }

            rule.set_part(name, value)?;
        }

        rule.frequency = frequency.ok_or(RecurError::MissingFrequency)?;
        rule.validate()?;

        Ok(rule)
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FREQ={}", self.frequency)?;

        if let Some(count) = self.count() {
            write!(f, ";COUNT={}", count)?;
        }

        if self.interval > 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }

        for part in RulePart::BY_PARTS.iter() {
            if self.has_part(*part) {
                write!(f, ";{}={}", part, self.component(*part).join(","))?;
            }
        }

        if let Some(until) = self.until() {
            write!(f, ";UNTIL={}", until.to_ical_string())?;
        }

        if self.week_start != Weekday::Mon {
            write!(f, ";WKST={}", weekday_token(self.week_start))?;
        }

        Ok(())
    }
}

fn coerce_interval(interval: i64) -> u32 {
    if interval < 1 {
        tracing::warn!(interval, "INTERVAL must be positive, using 1");
        1
    } else {
        interval.min(u32::MAX as i64) as u32
    }
}

fn parse_numbers<T>(part: RulePart, value: &str) -> Result<Vec<T>, RecurError>
where
    T: TryFrom<i32>,
{
    let (min, max, signed) = match part.numeric_range() {
        Some(range) => range,
        None => return Err(RecurError::invalid_value(part, value, "not a numeric part")),
    };

    value
        .split(',')
        .map(|token| {
            let number: i32 = token
                .trim()
                .parse()
                .map_err(|_| RecurError::invalid_value(part, token, "expected an integer"))?;

            let magnitude = if signed { number.abs() } else { number };
            if !(min..=max).contains(&magnitude) {
                let reason = if signed {
                    format!("must be within ±{}..{}", min, max)
                } else {
                    format!("must be within {}..{}", min, max)
                };
                return Err(RecurError::invalid_value(part, token, reason));
            }

            T::try_from(number)
                .map_err(|_| RecurError::invalid_value(part, token, "out of range"))
        })
        .collect()
}

fn extend_unique<T: PartialEq>(values: &mut Vec<T>, new: Vec<T>) {
    for value in new {
        if !values.contains(&value) {
            values.push(value);
        }
    }
}

pub(crate) fn parse_weekday(token: &str) -> Option<Weekday> {
    Some(match token {
        "MO" => Weekday::Mon,
        "TU" => Weekday::Tue,
        "WE" => Weekday::Wed,
        "TH" => Weekday::Thu,
        "FR" => Weekday::Fri,
        "SA" => Weekday::Sat,
        "SU" => Weekday::Sun,
        _ => return None,
    })
}

pub(crate) fn weekday_token(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
