use std::{collections::VecDeque, fmt};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::{
    recur::{DayDesignator, Frequency, RecurrenceRule},
    time::{
        days_in_month, days_in_year, days_since_week_start, week_year_and_number, weeks_in_year,
        CalendarTime, Zone,
    },
};

/// Bounds on how far an iterator searches for the next occurrence.
///
/// Rules such as `FREQ=MONTHLY;BYMONTHDAY=31;BYMONTH=2` can never match, and
/// without a bound the iterator would spin forever looking for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Consecutive periods without a candidate before giving up.
    pub max_empty_periods: u32,
    /// Years without a candidate before giving up, counted in steps of the
    /// rule's INTERVAL when one step spans more than a year. 400 years is one
    /// full Gregorian cycle, after which every calendar pattern has come
    /// round.
    pub max_empty_years: u32,
    /// Periods starting after this year are never generated.
    pub max_year: i32,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_empty_periods: 150_000,
            max_empty_years: 400,
            max_year: 9999,
        }
    }
}

/// Lazily expands a [`RecurrenceRule`] from a start time.
///
/// Occurrences come out in strictly increasing order, carrying the zone of
/// the start time. The first one may equal the start itself. Once the rule
/// is exhausted every further call to `next` returns `None`.
///
/// Created by [`RecurrenceRule::iterator`] or
/// [`RecurrenceRule::iterator_in`].
#[derive(Debug, Clone)]
pub struct RecurIterator {
    rule: RecurrenceRule,
    zone: Zone,
    date_only: bool,
    start: NaiveDateTime,
    until: Option<NaiveDateTime>,
    limits: Limits,

    /// Start of the period to expand next.
    cursor: NaiveDateTime,
    /// Next day to expand and last day of the period being walked.
    walk: Option<(NaiveDate, NaiveDate)>,
    /// Times of day used for DAILY and coarser periods, sorted.
    times: Vec<(u32, u32, u32)>,
    by_second: Vec<u32>,
    by_month_day: Vec<i8>,
    by_month: Vec<u8>,
    by_day: Vec<DayDesignator>,

    queue: VecDeque<NaiveDateTime>,
    yielded: u32,
    empty_periods: u32,
    period_hit: bool,
    last_hit_year: i32,
    exhausted: bool,
}

impl RecurIterator {
    /// `until` must already be a wall-clock time on the same clock as
    /// `dtstart`.
    pub(crate) fn new(
        rule: RecurrenceRule,
        dtstart: CalendarTime,
        until: Option<CalendarTime>,
    ) -> RecurIterator {
        let dtstart = dtstart.normalized();
        let date_only = dtstart.is_date && !rule.frequency.is_sub_daily();

        let mut exhausted = false;
        let start = match dtstart.to_naive() {
            Ok(start) => start,
            Err(err) => {
                tracing::error!(error = %err, "recurrence start is not representable");
                exhausted = true;
                NaiveDateTime::MIN
            }
        };

        let until = until.and_then(|until| match until.to_naive() {
            Ok(until) => Some(until),
            Err(err) => {
                tracing::error!(error = %err, "recurrence end is not representable, ignoring it");
                None
            }
        });

        if rule.by_second.contains(&60) {
            tracing::warn!(rule = %rule, "BYSECOND=60 never occurs, skipping it");
        }
        let by_second: Vec<u32> = rule
            .by_second
            .iter()
            .filter(|s| **s < 60)
            .map(|s| *s as u32)
            .collect();

        let mut by_month = rule.by_month.clone();
        let mut by_month_day = rule.by_month_day.clone();
        let mut by_day = rule.by_day.clone();

        // Without any day level parts the day is taken from the start.
        if rule.by_week_number.is_empty()
            && rule.by_year_day.is_empty()
            && rule.by_month_day.is_empty()
            && rule.by_day.is_empty()
        {
            match rule.frequency {
                Frequency::Yearly => {
                    if by_month.is_empty() {
                        by_month.push(start.month() as u8);
                    }
                    by_month_day.push(start.day() as i8);
                }
                Frequency::Monthly => by_month_day.push(start.day() as i8),
                Frequency::Weekly => by_day.push(DayDesignator::every(start.weekday())),
                _ => {}
            }
        }

        let times = if date_only {
            vec![(0, 0, 0)]
        } else {
            time_set(&rule, &by_second, start)
        };

        let cursor = period_start(&rule, start);

        RecurIterator {
            zone: dtstart.zone.clone(),
            date_only,
            start,
            until,
            limits: Limits::default(),
            cursor,
            walk: None,
            times,
            by_second,
            by_month_day,
            by_month,
            by_day,
            queue: VecDeque::new(),
            yielded: 0,
            empty_periods: 0,
            period_hit: false,
            last_hit_year: start.year(),
            exhausted,
            rule,
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// How many occurrences have been returned so far.
    pub fn yielded(&self) -> u32 {
        self.yielded
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn exhaust(&mut self, reason: &'static str) {
        tracing::debug!(rule = %self.rule, yielded = self.yielded, reason, "recurrence exhausted");
        self.exhausted = true;
        self.queue.clear();
    }

    fn occurrence(&self, naive: NaiveDateTime) -> CalendarTime {
        let mut time = CalendarTime::from_naive(naive, self.zone.clone());
        time.is_date = self.date_only;
        time
    }

    /// Put the next slice of candidates into the queue. DAILY and coarser
    /// rules are walked one day at a time, unless BYSETPOS needs to see the
    /// whole period at once.
    fn fill_queue(&mut self) {
        if self.walk.is_none() && !self.period_in_bounds() {
            return;
        }

        if self.rule.frequency.is_sub_daily() {
            let period = self.cursor;
            let candidates = self.expand_sub_daily();
            let candidates = self.apply_set_pos(candidates);
            self.enqueue(period, candidates);
            self.finish_period(period.year());
        } else if !self.rule.by_set_pos.is_empty() {
            let period = self.cursor;
            let candidates = self.expand_period();
            let candidates = self.apply_set_pos(candidates);
            self.enqueue(period, candidates);
            self.finish_period(period.year());
        } else {
            self.walk_period();
        }
    }

    fn period_in_bounds(&mut self) -> bool {
        if self.cursor.year() > self.limits.max_year {
            self.exhaust("year ceiling reached");
            return false;
        }

        if let Some(until) = self.until {
            if self.cursor > until {
                self.exhaust("UNTIL passed");
                return false;
            }
        }

        true
    }

    fn enqueue(&mut self, period: impl fmt::Display, candidates: Vec<NaiveDateTime>) {
        tracing::trace!(
            %period,
            candidates = candidates.len(),
            "expanded recurrence period"
        );

        let start = self.start;
        let before = self.queue.len();
        self.queue
            .extend(candidates.into_iter().filter(|candidate| *candidate >= start));

        if self.queue.len() > before {
            self.period_hit = true;
        }
    }

    /// Book-keeping once a period has been fully expanded.
    fn finish_period(&mut self, year: i32) {
        if std::mem::take(&mut self.period_hit) {
            self.empty_periods = 0;
            self.last_hit_year = year;
            return;
        }

        self.empty_periods += 1;

        let allowed_years = self.limits.max_empty_years as i64 * self.years_per_period();
        if self.empty_periods >= self.limits.max_empty_periods {
            self.exhaust("too many consecutive empty periods");
        } else if (year as i64 - self.last_hit_year as i64) > allowed_years {
            self.exhaust("too many years without an occurrence");
        }
    }

    /// Whole years spanned by one step of the rule, at least one.
    fn years_per_period(&self) -> i64 {
        let interval = self.rule.interval.max(1) as i64;
        match self.rule.frequency {
            Frequency::Yearly => interval,
            Frequency::Monthly => (interval + 11) / 12,
            Frequency::Weekly => (interval * 7 + 364) / 365,
            Frequency::Daily => (interval + 364) / 365,
            _ => 1,
        }
    }

    /// First and last day of the period at the cursor.
    fn period_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.cursor.date();
        let last = match self.rule.frequency {
            Frequency::Yearly => NaiveDate::from_ymd_opt(first.year(), 12, 31),
            Frequency::Monthly => NaiveDate::from_ymd_opt(
                first.year(),
                first.month(),
                days_in_month(first.month() as i32, first.year()) as u32,
            ),
            Frequency::Weekly => first.checked_add_signed(Duration::days(6)),
            _ => Some(first),
        }?;
        Some((first, last))
    }

    /// Every time of the time set on `date`, if the day passes the filters.
    fn expand_day(&self, date: NaiveDate) -> Vec<NaiveDateTime> {
        if !self.matches_date(date) {
            return Vec::new();
        }

        self.times
            .iter()
            .filter_map(|(h, m, s)| date.and_hms_opt(*h, *m, *s))
            .collect()
    }

    /// Expand the next day of the current period, starting the period at
    /// the cursor if none is in progress.
    fn walk_period(&mut self) {
        let (day, last) = match self.walk {
            Some(walk) => walk,
            None => match self.period_range() {
                // Days of the first period before the start cannot match.
                Some((first, last)) => (first.max(self.start.date()), last),
                None => {
                    tracing::error!(cursor = %self.cursor, "recurrence period left the calendar");
                    return self.exhaust("cursor out of range");
                }
            },
        };

        if let Some(until) = self.until {
            if day > until.date() {
                return self.exhaust("UNTIL passed");
            }
        }

        let candidates = self.expand_day(day);
        self.enqueue(day, candidates);

        match day.succ_opt().filter(|next| *next <= last) {
            Some(next) => self.walk = Some((next, last)),
            None => {
                self.walk = None;
                let year = self.cursor.year();
                self.advance_period();
                self.finish_period(year);
            }
        }
    }

    /// Every candidate of the period at the cursor, then move the cursor on.
    fn expand_period(&mut self) -> Vec<NaiveDateTime> {
        let mut candidates = Vec::new();
        if let Some((first, last)) = self.period_range() {
            let mut day = Some(first);
            while let Some(date) = day.filter(|d| *d <= last) {
                candidates.extend(self.expand_day(date));
                day = date.succ_opt();
            }
        }

        self.advance_period();
        candidates
    }

    fn advance_period(&mut self) {
        let interval = self.rule.interval as i64;
        let date = self.cursor.date();

        let next = match self.rule.frequency {
            Frequency::Yearly => i32::try_from(date.year() as i64 + interval)
                .ok()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1)),
            Frequency::Monthly => {
                let months = date.year() as i64 * 12 + date.month0() as i64 + interval;
                i32::try_from(months.div_euclid(12)).ok().and_then(|year| {
                    NaiveDate::from_ymd_opt(year, months.rem_euclid(12) as u32 + 1, 1)
                })
            }
            Frequency::Weekly => date.checked_add_signed(Duration::days(7 * interval)),
            _ => date.checked_add_signed(Duration::days(interval)),
        };

        match next.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            Some(next) => self.cursor = next,
            None => {
                tracing::error!(cursor = %self.cursor, "recurrence cursor left the calendar");
                self.exhaust("cursor out of range");
            }
        }
    }

    /// HOURLY, MINUTELY and SECONDLY. The cursor is itself the candidate,
    /// filtered by the coarser parts and expanded by the finer ones.
    fn expand_sub_daily(&mut self) -> Vec<NaiveDateTime> {
        let cursor = self.cursor;
        let frequency = self.rule.frequency;

        if !self.matches_date(cursor.date()) {
            self.skip_to(cursor.date().and_hms_opt(0, 0, 0).map(|d| d + Duration::days(1)));
            return Vec::new();
        }

        if !self.rule.by_hour.is_empty() && !self.rule.by_hour.contains(&(cursor.hour() as u8)) {
            if frequency == Frequency::Hourly {
                self.advance_sub_daily();
            } else {
                self.skip_to(truncate_to_hour(cursor).map(|d| d + Duration::hours(1)));
            }
            return Vec::new();
        }

        if !self.rule.by_minute.is_empty()
            && frequency != Frequency::Hourly
            && !self.rule.by_minute.contains(&(cursor.minute() as u8))
        {
            if frequency == Frequency::Minutely {
                self.advance_sub_daily();
            } else {
                self.skip_to(
                    cursor
                        .with_second(0)
                        .map(|d| d + Duration::minutes(1)),
                );
            }
            return Vec::new();
        }

        if frequency == Frequency::Secondly
            && !self.by_second.is_empty()
            && !self.by_second.contains(&cursor.second())
        {
            self.advance_sub_daily();
            return Vec::new();
        }

        let seconds = if self.by_second.is_empty() || frequency == Frequency::Secondly {
            vec![cursor.second()]
        } else {
            self.by_second.clone()
        };

        let minutes = if self.rule.by_minute.is_empty() || frequency != Frequency::Hourly {
            vec![cursor.minute()]
        } else {
            sorted(self.rule.by_minute.iter().map(|m| *m as u32))
        };

        let date = cursor.date();
        let hour = cursor.hour();
        let candidates = minutes
            .iter()
            .flat_map(|m| seconds.iter().map(move |s| (*m, *s)))
            .filter_map(|(m, s)| date.and_hms_opt(hour, m, s))
            .collect();

        self.advance_sub_daily();
        candidates
    }

    fn step(&self) -> i64 {
        let unit = match self.rule.frequency {
            Frequency::Hourly => 3600,
            Frequency::Minutely => 60,
            _ => 1,
        };
        unit * self.rule.interval as i64
    }

    fn advance_sub_daily(&mut self) {
        match self.cursor.checked_add_signed(Duration::seconds(self.step())) {
            Some(next) => self.cursor = next,
            None => self.exhaust("cursor out of range"),
        }
    }

    /// Move the cursor forward by whole steps until it reaches `boundary`.
    fn skip_to(&mut self, boundary: Option<NaiveDateTime>) {
        let boundary = match boundary {
            Some(boundary) => boundary,
            None => return self.exhaust("cursor out of range"),
        };

        let step = self.step();
        let gap = (boundary - self.cursor).num_seconds().max(1);
        let steps = (gap + step - 1) / step;

        match self
            .cursor
            .checked_add_signed(Duration::seconds(steps * step))
        {
            Some(next) => self.cursor = next,
            None => self.exhaust("cursor out of range"),
        }
    }

    fn apply_set_pos(&self, mut candidates: Vec<NaiveDateTime>) -> Vec<NaiveDateTime> {
        candidates.sort();
        candidates.dedup();

        if self.rule.by_set_pos.is_empty() || candidates.is_empty() {
            return candidates;
        }

        let len = candidates.len() as i64;
        let mut selected: Vec<_> = self
            .rule
            .by_set_pos
            .iter()
            .filter_map(|pos| {
                let pos = *pos as i64;
                let idx = if pos > 0 { pos - 1 } else { len + pos };
                if (0..len).contains(&idx) {
                    Some(candidates[idx as usize])
                } else {
                    None
                }
            })
            .collect();

        selected.sort();
        selected.dedup();
        selected
    }

    fn matches_date(&self, date: NaiveDate) -> bool {
        let rule = &self.rule;

        if !self.by_month.is_empty() && !self.by_month.contains(&(date.month() as u8)) {
            return false;
        }

        if !rule.by_week_number.is_empty() {
            let (week_year, week) = week_year_and_number(date, rule.week_start);
            let weeks = weeks_in_year(week_year, rule.week_start);
            let matched = rule.by_week_number.iter().any(|n| {
                let n = *n as i64;
                let wanted = if n > 0 { n } else { weeks + n + 1 };
                wanted == week
            });
            if !matched {
                return false;
            }
        }

        if !rule.by_year_day.is_empty() {
            let day = date.ordinal() as i64;
            let len = days_in_year(date.year()) as i64;
            if !rule
                .by_year_day
                .iter()
                .any(|n| resolve_from_end(*n as i64, len) == day)
            {
                return false;
            }
        }

        if !self.by_month_day.is_empty() {
            let day = date.day() as i64;
            let len = days_in_month(date.month() as i32, date.year()) as i64;
            if !self
                .by_month_day
                .iter()
                .any(|n| resolve_from_end(*n as i64, len) == day)
            {
                return false;
            }
        }

        if !self.by_day.is_empty() && !self.by_day.iter().any(|d| self.matches_day(d, date)) {
            return false;
        }

        true
    }

    fn matches_day(&self, designator: &DayDesignator, date: NaiveDate) -> bool {
        if designator.weekday != date.weekday() {
            return false;
        }

        let ordinal = match designator.ordinal {
            Some(ordinal) => ordinal as i64,
            None => return true,
        };

        // Ordinals count within the month for MONTHLY rules, and for YEARLY
        // rules narrowed by BYMONTH; otherwise within the year.
        let by_month_scope = self.rule.frequency == Frequency::Monthly
            || (self.rule.frequency == Frequency::Yearly && !self.rule.by_month.is_empty());

        let (index, len) = if by_month_scope {
            (
                date.day0() as i64,
                days_in_month(date.month() as i32, date.year()) as i64,
            )
        } else {
            (date.ordinal0() as i64, days_in_year(date.year()) as i64)
        };

        let from_start = index / 7 + 1;
        let from_end = -((len - 1 - index) / 7 + 1);

        ordinal == from_start || ordinal == from_end
    }
}

impl Iterator for RecurIterator {
    type Item = CalendarTime;

    fn next(&mut self) -> Option<CalendarTime> {
        loop {
            if self.exhausted {
                return None;
            }

            if let Some(count) = self.rule.count() {
                if self.yielded >= count {
                    self.exhaust("COUNT reached");
                    return None;
                }
            }

            if let Some(candidate) = self.queue.pop_front() {
                if let Some(until) = self.until {
                    if candidate > until {
                        self.exhaust("UNTIL passed");
                        return None;
                    }
                }

                self.yielded += 1;
                return Some(self.occurrence(candidate));
            }

            self.fill_queue();
        }
    }
}

/// The start of the period containing `start`.
fn period_start(rule: &RecurrenceRule, start: NaiveDateTime) -> NaiveDateTime {
    let date = start.date();
    let first = match rule.frequency {
        Frequency::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        Frequency::Monthly => NaiveDate::from_ymd_opt(date.year(), date.month(), 1),
        Frequency::Weekly => {
            let back = days_since_week_start(date.weekday(), rule.week_start);
            date.checked_sub_signed(Duration::days(back))
        }
        Frequency::Daily => Some(date),
        _ => return start,
    };

    first
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(start)
}

/// Times of day for DAILY and coarser rules: BYHOUR x BYMINUTE x BYSECOND,
/// each falling back to the start's own field.
fn time_set(
    rule: &RecurrenceRule,
    by_second: &[u32],
    start: NaiveDateTime,
) -> Vec<(u32, u32, u32)> {
    let hours = if rule.by_hour.is_empty() {
        vec![start.hour()]
    } else {
        sorted(rule.by_hour.iter().map(|h| *h as u32))
    };
    let minutes = if rule.by_minute.is_empty() {
        vec![start.minute()]
    } else {
        sorted(rule.by_minute.iter().map(|m| *m as u32))
    };
    let seconds = if by_second.is_empty() {
        vec![start.second()]
    } else {
        sorted(by_second.iter().copied())
    };

    let mut times = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
    for h in &hours {
        for m in &minutes {
            for s in &seconds {
                times.push((*h, *m, *s));
            }
        }
    }
    times
}

fn sorted(values: impl Iterator<Item = u32>) -> Vec<u32> {
    let mut values: Vec<_> = values.collect();
    values.sort_unstable();
    values.dedup();
    values
}

fn truncate_to_hour(time: NaiveDateTime) -> Option<NaiveDateTime> {
    time.date().and_hms_opt(time.hour(), 0, 0)
}

/// A 1-based position, negative counting back from `len`.
fn resolve_from_end(n: i64, len: i64) -> i64 {
    if n > 0 {
        n
    } else {
        len + n + 1
    }
}
