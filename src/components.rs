use crate::{
    parser,
    property::{Property, RecurrenceDate},
    recur::RecurrenceRule,
    recur_set::{Occurrence, OccurrenceSource, RecurrenceSet},
    registry::TimezoneRegistry,
    time::CalendarTime,
};
use std::collections::BTreeMap;
use std::convert::{TryFrom, TryInto};
use std::str::FromStr;

use anyhow::{bail, ensure, format_err, Context, Error};
use chrono::Duration;

/// A parsed VCALENDAR.
///
/// The calendar's VTIMEZONEs are registered in its own
/// [`TimezoneRegistry`], which is what the events' TZIDs resolve against.
#[derive(Debug)]
pub struct VCalendar {
    pub prodid: String,
    pub version: String,

    /// Events grouped by UID.
    pub events: BTreeMap<String, EventCollection>,
    pub timezones: TimezoneRegistry,

    pub properties: Vec<Property>,
}

impl TryFrom<parser::Component> for VCalendar {
    type Error = Error;

    fn try_from(component: parser::Component) -> Result<Self, Self::Error> {
        ensure!(component.name.to_ascii_uppercase() == "VCALENDAR");

        let timezones = TimezoneRegistry::new();

        let mut events: BTreeMap<String, Vec<VEvent>> = BTreeMap::new();
        for component in component.sub_components {
            match &component.name.to_ascii_uppercase() as &str {
                "VEVENT" => {
                    let event = VEvent::try_from(component).with_context(|| "parsing VEVENT")?;
                    events.entry(event.uid.clone()).or_default().push(event);
                }
                "VTIMEZONE" => {
                    timezones
                        .register_component(component)
                        .with_context(|| "parsing VTIMEZONE")?;
                }
                name => tracing::debug!(component = name, "ignoring unsupported component"),
            }
        }

        let mut prodid = None;
        let mut version = None;

        let mut properties = Vec::new();
        for prop in component.properties {
            let parsed: Property = prop.try_into()?;

            match parsed {
                Property::ProductIdentifier(value) => prodid = Some(value.value),
                Property::Version(value) => version = Some(value.value),
                p => properties.push(p),
            }
        }

        let events = events
            .into_iter()
            .map(|(uid, events)| -> Result<_, Error> {
                let collection = EventCollection::new(events)
                    .with_context(|| format!("grouping events for {}", uid))?;
                Ok((uid, collection))
            })
            .collect::<Result<_, _>>()?;

        Ok(VCalendar {
            prodid: prodid.ok_or_else(|| format_err!("Missing PRODID field in calendar"))?,
            version: version.ok_or_else(|| format_err!("Missing VERSION field in calendar"))?,
            events,
            timezones,
            properties,
        })
    }
}

impl FromStr for VCalendar {
    type Err = Error;

    /// Parse text holding exactly one VCALENDAR.
    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut components = parser::Component::from_str_to_stream(data)?;

        if components.len() != 1 {
            bail!("Expected one VCALENDAR, found {} components", components.len());
        }

        components
            .pop()
            .ok_or_else(|| format_err!("Missing VCALENDAR"))?
            .try_into()
    }
}

/// Purpose: Provide a grouping of component properties that describe an event.
///
/// An event without RRULE or RDATE has a single instance at its DTSTART. An
/// event carrying a RECURRENCE-ID replaces one instance of the recurring
/// event with the same UID (and, with `RANGE=THISANDFUTURE`, shifts the ones
/// after it).
#[derive(Debug, Clone)]
pub struct VEvent {
    pub uid: String,
    pub dtstamp: CalendarTime,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub sequence: Option<u32>,

    pub start: Option<CalendarTime>,
    pub end: Option<CalendarTime>,
    pub duration: Option<Duration>,

    pub rrules: Vec<RecurrenceRule>,
    pub rdates: Vec<RecurrenceDate>,
    pub exdates: Vec<CalendarTime>,

    pub recurrence_id: Option<CalendarTime>,
    this_and_future: bool,

    pub properties: Vec<Property>,
}

impl VEvent {
    pub fn is_recurring(&self) -> bool {
        !self.rrules.is_empty() || !self.rdates.is_empty()
    }

    pub fn is_recurrence_exception(&self) -> bool {
        self.recurrence_id.is_some()
    }

    /// Whether this exception also applies to every later instance.
    pub fn modifies_future(&self) -> bool {
        self.this_and_future
    }

    /// Whether the event is for a full day.
    pub fn is_full_day_event(&self) -> bool {
        self.start.as_ref().map_or(false, |start| start.is_date)
    }

    /// How long each instance lasts.
    ///
    /// DTEND wins over DURATION. A date-only DTSTART with neither lasts one
    /// day, anything else lasts no time at all.
    pub fn duration(&self, zones: &TimezoneRegistry) -> Result<Duration, Error> {
        match (&self.start, &self.end, self.duration) {
            (Some(start), Some(end), _) => {
                if start.zone == end.zone {
                    Ok(end.subtract_date(start))
                } else {
                    Ok(end.subtract_date_tz(start, zones)?)
                }
            }
            (_, None, Some(duration)) => Ok(duration),
            (Some(start), None, None) if start.is_date => Ok(Duration::days(1)),
            _ => Ok(Duration::zero()),
        }
    }

    /// The occurrences of this event on its own, ignoring any exceptions.
    pub fn recurrence_set(&self) -> Result<RecurrenceSet, Error> {
        let start = self
            .start
            .clone()
            .with_context(|| format!("VEVENT {} has no DTSTART", self.uid))?;

        let mut set = RecurrenceSet::new(start);
        set.rules = self.rrules.clone();
        set.rdates = self.rdates.iter().map(|d| d.start().clone()).collect();
        set.exdates = self.exdates.clone();

        Ok(set)
    }
}

impl TryFrom<parser::Component> for VEvent {
    type Error = Error;

    fn try_from(component: parser::Component) -> Result<Self, Self::Error> {
        ensure!(component.name.to_ascii_uppercase() == "VEVENT");

        for sub_component in &component.sub_components {
            tracing::debug!(component = %sub_component.name, "ignoring VEVENT sub component");
        }

        let mut uid = None;
        let mut dtstamp = None;
        let mut rrules = Vec::new();
        let mut start = None;
        let mut rdates = Vec::new();
        let mut exdates = Vec::new();
        let mut duration = None;
        let mut end = None;
        let mut recurrence_id = None;
        let mut this_and_future = false;
        let mut summary = None;
        let mut description = None;
        let mut location = None;
        let mut sequence = None;

        let mut properties = Vec::new();
        for prop in component.properties {
            let parsed: Property = prop.try_into()?;

            match parsed {
                Property::RecurrenceRule(value) => rrules.push(value.value),
                Property::UID(value) => uid = Some(value.value),
                Property::DateTimeStamp(value) => dtstamp = Some(value.value),
                Property::Start(value) => start = Some(value.value),
                Property::RecurrenceDateTimes(value) => rdates.extend(value.value),
                Property::ExceptionDateTimes(value) => exdates.extend(value.value),
                Property::Duration(value) => duration = Some(value.value),
                Property::End(value) => end = Some(value.value),
                Property::RecurrenceID(value) => {
                    this_and_future = value.parameters.is_this_and_future();
                    recurrence_id = Some(value.value);
                }
                Property::Summary(value) => summary = Some(value.value),
                Property::Description(value) => description = Some(value.value),
                Property::Location(value) => location = Some(value.value),
                Property::SequenceNumber(value) => sequence = Some(value.value),
                p => properties.push(p),
            }
        }

        let uid = uid.ok_or_else(|| format_err!("Missing UID field in VEVENT"))?;

        if duration.is_some() && end.is_some() {
            bail!("VEVENT {} has both DURATION and DTEND", uid);
        }

        match (&start, &end) {
            (None, Some(_)) => bail!("VEVENT {} has a DTEND without DTSTART", uid),
            (Some(start), Some(end)) if start.is_date != end.is_date => {
                bail!("VEVENT {} has different types for DTSTART and DTEND", uid)
            }
            _ => {}
        }

        if !rrules.is_empty() && start.is_none() {
            bail!("VEVENT {} has an RRULE without DTSTART", uid);
        }

        Ok(VEvent {
            dtstamp: dtstamp.ok_or_else(|| format_err!("Missing DTSTAMP field in {}", uid))?,
            uid,
            summary,
            description,
            location,
            sequence,
            start,
            end,
            duration,
            rrules,
            rdates,
            exdates,
            recurrence_id,
            this_and_future,
            properties,
        })
    }
}

/// Where and when one instance of an event happens, with the event that
/// describes it.
#[derive(Debug, Clone)]
pub struct OccurrenceDetails<'a> {
    pub recurrence_id: CalendarTime,
    pub start: CalendarTime,
    pub end: CalendarTime,
    pub item: &'a VEvent,
}

/// A recurring event together with the exceptions that override some of its
/// instances. All of them share a UID.
#[derive(Debug, Clone)]
pub struct EventCollection {
    pub base_event: VEvent,
    /// Every one of these has a RECURRENCE-ID.
    pub exceptions: Vec<VEvent>,
}

impl EventCollection {
    pub fn new(events: Vec<VEvent>) -> Result<EventCollection, Error> {
        let mut base_event = None;
        let mut exceptions = Vec::new();

        let event_id = events.first().map(|e| e.uid.clone()).unwrap_or_default();

        for event in events {
            if event.is_recurrence_exception() {
                exceptions.push(event);
            } else if base_event.is_some() {
                bail!("multiple base events for {}", event_id);
            } else {
                base_event = Some(event);
            }
        }

        let base_event = base_event.with_context(|| format!("missing base event: {}", event_id))?;

        Ok(EventCollection {
            base_event,
            exceptions,
        })
    }

    /// The base event's occurrences with the exceptions swapped in.
    pub fn recurrence_set(&self) -> Result<RecurrenceSet, Error> {
        let mut set = self.base_event.recurrence_set()?;

        for exception in &self.exceptions {
            let recurrence_id = exception
                .recurrence_id
                .clone()
                .with_context(|| format!("exception of {} without RECURRENCE-ID", exception.uid))?;
            let start = exception
                .start
                .clone()
                .unwrap_or_else(|| recurrence_id.clone());

            set = set.with_exception(recurrence_id, start);
        }

        Ok(set)
    }

    /// Iterate over every occurrence in order, paired with the event that
    /// describes it: the matching exception, else the nearest earlier
    /// THISANDFUTURE exception, else the base event.
    ///
    /// Note: This may be an infinite iterator if the event recurs forever.
    pub fn recur_iter<'a>(
        &'a self,
        zones: &'a TimezoneRegistry,
    ) -> Result<impl Iterator<Item = (Occurrence, &'a VEvent)> + 'a, Error> {
        let ranges = self.range_exceptions(zones)?;
        let occurrences = self.recurrence_set()?.iter(zones)?;

        Ok(occurrences.map(move |occurrence| {
            let event = match occurrence.source {
                OccurrenceSource::Exception(idx) => self.exceptions.get(idx),
                _ => occurrence
                    .recurrence_id
                    .to_unix_time(zones)
                    .ok()
                    .and_then(|instant| nearest_range(&ranges, instant))
                    .and_then(|idx| self.exceptions.get(idx)),
            };

            (occurrence, event.unwrap_or(&self.base_event))
        }))
    }

    /// Resolve the instance identified by `recurrence_id`.
    ///
    /// An exception for exactly that instance wins, matched first on its
    /// local fields and then as an instant. Otherwise the nearest earlier
    /// THISANDFUTURE exception moves the instance by the same amount it moved
    /// its own. Failing both, the base event applies unchanged.
    pub fn occurrence_details(
        &self,
        recurrence_id: &CalendarTime,
        zones: &TimezoneRegistry,
    ) -> Result<OccurrenceDetails<'_>, Error> {
        if let Some(item) = self.find_exception(recurrence_id, zones)? {
            let start = item
                .start
                .clone()
                .unwrap_or_else(|| recurrence_id.clone());
            let end = end_of(&start, item.duration(zones)?);

            return Ok(OccurrenceDetails {
                recurrence_id: recurrence_id.clone(),
                start,
                end,
                item,
            });
        }

        let instant = recurrence_id.to_unix_time(zones)?;
        let range = nearest_range(&self.range_exceptions(zones)?, instant)
            .and_then(|idx| self.exceptions.get(idx));

        if let Some(item) = range {
            let (original, moved) = match (&item.recurrence_id, &item.start) {
                (Some(original), Some(moved)) => (original, moved),
                _ => bail!("THISANDFUTURE exception of {} without DTSTART", item.uid),
            };

            // The shift is measured on the exception's own wall clock.
            let shift = moved.subtract_date(original);
            let mut start = recurrence_id.clone().with_zone(moved.zone.clone());
            start.add_duration(shift);
            let end = end_of(&start, item.duration(zones)?);

            return Ok(OccurrenceDetails {
                recurrence_id: recurrence_id.clone(),
                start,
                end,
                item,
            });
        }

        let start = recurrence_id.clone();
        let end = end_of(&start, self.base_event.duration(zones)?);

        Ok(OccurrenceDetails {
            recurrence_id: recurrence_id.clone(),
            start,
            end,
            item: &self.base_event,
        })
    }

    fn find_exception(
        &self,
        recurrence_id: &CalendarTime,
        zones: &TimezoneRegistry,
    ) -> Result<Option<&VEvent>, Error> {
        let local = recurrence_id.normalized();
        let by_local = self.exceptions.iter().find(|exception| {
            exception
                .recurrence_id
                .as_ref()
                .map_or(false, |id| id.normalized() == local)
        });

        if by_local.is_some() {
            return Ok(by_local);
        }

        let instant = recurrence_id.to_unix_time(zones)?;
        for exception in &self.exceptions {
            if let Some(id) = &exception.recurrence_id {
                if id.to_unix_time(zones)? == instant {
                    return Ok(Some(exception));
                }
            }
        }

        Ok(None)
    }

    /// `(instant, index)` of every THISANDFUTURE exception, sorted.
    fn range_exceptions(&self, zones: &TimezoneRegistry) -> Result<Vec<(i64, usize)>, Error> {
        let mut ranges = Vec::new();

        for (idx, exception) in self.exceptions.iter().enumerate() {
            if let (true, Some(id)) = (exception.modifies_future(), &exception.recurrence_id) {
                ranges.push((id.to_unix_time(zones)?, idx));
            }
        }
        ranges.sort_unstable();

        Ok(ranges)
    }
}

/// The THISANDFUTURE exception governing `instant`, i.e. the last one that
/// starts strictly before it.
fn nearest_range(ranges: &[(i64, usize)], instant: i64) -> Option<usize> {
    let pos = ranges.partition_point(|(at, _)| *at < instant);
    pos.checked_sub(1).map(|pos| ranges[pos].1)
}

fn end_of(start: &CalendarTime, duration: Duration) -> CalendarTime {
    let mut end = start.clone();
    end.add_duration(duration);
    end
}
