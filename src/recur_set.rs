use std::{collections::HashSet, sync::Arc};

use itertools::Itertools;

use crate::{
    error::Error,
    recur::RecurrenceRule,
    registry::TimezoneRegistry,
    time::{CalendarTime, Zone},
    timezone::Timezone,
};

/// Where an [`Occurrence`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OccurrenceSource {
    /// The start of a set without any rules.
    Start,
    Rule,
    RDate,
    /// An overridden instance, by index into [`RecurrenceSet::exceptions`].
    Exception(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub start: CalendarTime,
    /// The instance this occurrence stands for. Only differs from `start`
    /// for exceptions that moved their instance.
    pub recurrence_id: CalendarTime,
    pub source: OccurrenceSource,
}

/// An instance that replaces the one generated at `recurrence_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceException {
    pub recurrence_id: CalendarTime,
    pub start: CalendarTime,
}

/// The occurrences of a recurring item: its rules plus RDATEs, minus EXDATEs,
/// with overridden instances swapped in.
#[derive(Debug, Clone)]
pub struct RecurrenceSet {
    pub dtstart: CalendarTime,
    pub rules: Vec<RecurrenceRule>,
    pub rdates: Vec<CalendarTime>,
    pub exdates: Vec<CalendarTime>,
    pub exceptions: Vec<RecurrenceException>,
}

impl RecurrenceSet {
    pub fn new(dtstart: CalendarTime) -> RecurrenceSet {
        RecurrenceSet {
            dtstart,
            rules: Vec::new(),
            rdates: Vec::new(),
            exdates: Vec::new(),
            exceptions: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_rdate(mut self, rdate: CalendarTime) -> Self {
        self.rdates.push(rdate);
        self
    }

    pub fn with_exdate(mut self, exdate: CalendarTime) -> Self {
        self.exdates.push(exdate);
        self
    }

    pub fn with_exception(mut self, recurrence_id: CalendarTime, start: CalendarTime) -> Self {
        self.exceptions.push(RecurrenceException {
            recurrence_id,
            start,
        });
        self
    }

    pub fn is_recurring(&self) -> bool {
        !self.rules.is_empty() || !self.rdates.is_empty()
    }

    /// Occurrences in chronological order.
    ///
    /// Every zone named by the set is resolved up front, so the returned
    /// iterator itself cannot fail.
    pub fn iter(
        &self,
        zones: &TimezoneRegistry,
    ) -> Result<impl Iterator<Item = Occurrence>, Error> {
        let clock = ZoneClock::resolve(&self.dtstart.zone, zones)?;

        let rule_iters = self
            .rules
            .iter()
            .map(|rule| rule.iterator_in(&self.dtstart, zones))
            .collect::<Result<Vec<_>, _>>()?;

        let generated = rule_iters
            .into_iter()
            .map(|iter| {
                let clock = clock.clone();
                iter.map(move |time| (clock.instant(&time), time, OccurrenceSource::Rule))
            })
            .kmerge_by(|a, b| a.0 < b.0);

        let mut extra = self
            .rdates
            .iter()
            .map(|rdate| {
                let rdate = rdate.normalized();
                Ok((rdate.to_unix_time(zones)?, rdate, OccurrenceSource::RDate))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        if self.rules.is_empty() {
            let start = self.dtstart.normalized();
            extra.push((clock.instant(&start), start, OccurrenceSource::Start));
        }
        extra.sort_by_key(|(instant, _, _)| *instant);

        let mut excluded_instants = HashSet::new();
        let mut excluded_days = HashSet::new();
        for exdate in &self.exdates {
            let exdate = exdate.normalized();
            if exdate.is_date {
                excluded_days.insert((exdate.year, exdate.month, exdate.day));
            } else {
                excluded_instants.insert(exdate.to_unix_time(zones)?);
            }
        }

        let mut exceptions = Vec::with_capacity(self.exceptions.len());
        let mut overridden = HashSet::new();
        for (idx, exception) in self.exceptions.iter().enumerate() {
            overridden.insert(exception.recurrence_id.to_unix_time(zones)?);

            let occurrence = Occurrence {
                start: exception.start.clone(),
                recurrence_id: exception.recurrence_id.clone(),
                source: OccurrenceSource::Exception(idx),
            };
            exceptions.push((exception.start.to_unix_time(zones)?, occurrence));
        }
        exceptions.sort_by_key(|(instant, _)| *instant);

        let base = generated
            .merge_by(extra, |a, b| a.0 <= b.0)
            .dedup_by(|a, b| a.0 == b.0)
            .filter(move |(instant, time, _)| {
                !excluded_instants.contains(instant)
                    && !excluded_days.contains(&(time.year, time.month, time.day))
                    && !overridden.contains(instant)
            })
            .map(|(instant, time, source)| {
                let occurrence = Occurrence {
                    recurrence_id: time.clone(),
                    start: time,
                    source,
                };
                (instant, occurrence)
            });

        Ok(base
            .merge_by(exceptions, |a, b| a.0 <= b.0)
            .map(|(_, occurrence)| occurrence))
    }
}

/// Turns wall-clock times in one zone into instants without going back to
/// the registry for every value.
#[derive(Debug, Clone)]
struct ZoneClock {
    timezone: Option<Arc<Timezone>>,
    fixed_offset: i32,
}

impl ZoneClock {
    fn resolve(zone: &Zone, zones: &TimezoneRegistry) -> Result<ZoneClock, Error> {
        Ok(match zone {
            Zone::Named(tzid) => ZoneClock {
                timezone: Some(zones.resolve(tzid)?),
                fixed_offset: 0,
            },
            other => ZoneClock {
                timezone: None,
                fixed_offset: other.fixed_offset().unwrap_or(0),
            },
        })
    }

    fn instant(&self, time: &CalendarTime) -> i64 {
        let offset = match &self.timezone {
            Some(timezone) => timezone.utc_offset(time),
            None => self.fixed_offset,
        };
        time.local_seconds() - offset as i64
    }
}

#[cfg(test)]
mod tests {
    use chrono::FixedOffset;

    use super::*;

    fn utc(s: &str) -> CalendarTime {
        let time: CalendarTime = s.parse().unwrap();
        time.with_zone(Zone::Utc)
    }

    fn starts(set: &RecurrenceSet, zones: &TimezoneRegistry, take: usize) -> Vec<String> {
        set.iter(zones)
            .unwrap()
            .take(take)
            .map(|o| o.start.to_string())
            .collect()
    }

    fn daily_set() -> RecurrenceSet {
        RecurrenceSet::new(utc("2020-01-01T09:00:00"))
            .with_rule("FREQ=DAILY;COUNT=5".parse().unwrap())
    }

    #[test]
    fn exdates_are_dropped() {
        let zones = TimezoneRegistry::new();
        let set = daily_set()
            .with_exdate(utc("2020-01-02T09:00:00"))
            .with_exdate(utc("2020-01-04T10:00:00"));

        assert_eq!(
            starts(&set, &zones, 10),
            vec![
                "2020-01-01T09:00:00Z",
                "2020-01-03T09:00:00Z",
                "2020-01-04T09:00:00Z",
                "2020-01-05T09:00:00Z",
            ]
        );
    }

    #[test]
    fn exdate_matches_instant_not_fields() {
        let zones = TimezoneRegistry::new();
        let plus_two = Zone::Fixed(FixedOffset::east_opt(2 * 3600).unwrap());
        let set = daily_set().with_exdate(
            CalendarTime::parse_ical("20200103T110000", plus_two).unwrap(),
        );

        assert_eq!(set.iter(&zones).unwrap().count(), 4);
    }

    #[test]
    fn date_exdate_drops_whole_day() {
        let zones = TimezoneRegistry::new();
        let set = RecurrenceSet::new(utc("2020-01-01T09:00:00"))
            .with_rule("FREQ=DAILY;BYHOUR=9,17;COUNT=4".parse().unwrap())
            .with_exdate(CalendarTime::date(2020, 1, 1));

        assert_eq!(
            starts(&set, &zones, 10),
            vec!["2020-01-02T09:00:00Z", "2020-01-02T17:00:00Z"]
        );
    }

    #[test]
    fn rdates_merge_in_order_without_duplicates() {
        let zones = TimezoneRegistry::new();
        let set = daily_set()
            .with_rdate(utc("2020-01-10T09:00:00"))
            .with_rdate(utc("2020-01-02T12:00:00"))
            .with_rdate(utc("2020-01-03T09:00:00"));

        let occurrences: Vec<_> = set.iter(&zones).unwrap().collect();
        let sources: Vec<_> = occurrences.iter().map(|o| o.source).collect();

        assert_eq!(occurrences.len(), 7);
        assert_eq!(occurrences[2].start, utc("2020-01-02T12:00:00"));
        assert_eq!(sources[3], OccurrenceSource::Rule);
        assert_eq!(sources[6], OccurrenceSource::RDate);
    }

    #[test]
    fn exceptions_replace_instances() {
        let zones = TimezoneRegistry::new();
        let set = daily_set()
            .with_exception(utc("2020-01-02T09:00:00"), utc("2020-01-04T15:00:00"))
            .with_exception(utc("2021-06-01T09:00:00"), utc("2020-01-03T08:00:00"));

        let occurrences: Vec<_> = set.iter(&zones).unwrap().collect();
        let starts: Vec<_> = occurrences.iter().map(|o| o.start.to_string()).collect();

        assert_eq!(
            starts,
            vec![
                "2020-01-01T09:00:00Z",
                "2020-01-03T08:00:00Z",
                "2020-01-03T09:00:00Z",
                "2020-01-04T09:00:00Z",
                "2020-01-04T15:00:00Z",
                "2020-01-05T09:00:00Z",
            ]
        );
        assert_eq!(occurrences[4].recurrence_id, utc("2020-01-02T09:00:00"));
        assert_eq!(occurrences[4].source, OccurrenceSource::Exception(0));
        assert_eq!(occurrences[1].source, OccurrenceSource::Exception(1));
    }

    #[test]
    fn rules_are_merged() {
        let zones = TimezoneRegistry::new();
        let set = RecurrenceSet::new(utc("2020-01-06T09:00:00"))
            .with_rule("FREQ=WEEKLY;BYDAY=MO;COUNT=2".parse().unwrap())
            .with_rule("FREQ=WEEKLY;BYDAY=MO,WE;COUNT=2".parse().unwrap());

        assert_eq!(
            starts(&set, &zones, 10),
            vec![
                "2020-01-06T09:00:00Z",
                "2020-01-08T09:00:00Z",
                "2020-01-13T09:00:00Z",
            ]
        );
    }

    #[test]
    fn single_instance_without_rules() {
        let zones = TimezoneRegistry::new();
        let set = RecurrenceSet::new(utc("2020-01-01T09:00:00"))
            .with_rdate(utc("2020-02-01T09:00:00"));

        let occurrences: Vec<_> = set.iter(&zones).unwrap().collect();
        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].source, OccurrenceSource::Start);
    }

    #[test]
    fn unknown_zone_fails_up_front() {
        let zones = TimezoneRegistry::new();
        let start =
            CalendarTime::floating(2020, 1, 1, 9, 0, 0).with_zone(Zone::named("Mars/Base"));
        let set = RecurrenceSet::new(start).with_rule("FREQ=DAILY".parse().unwrap());

        assert!(set.iter(&zones).is_err());
    }
}
