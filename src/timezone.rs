use std::{
    convert::{TryFrom, TryInto},
    sync::Mutex,
};

use anyhow::{bail, ensure, format_err, Error};
use chrono::FixedOffset;

use crate::{
    error::TimezoneError,
    parser,
    property::{Property, RecurrenceDate},
    recur::{EndCondition, RecurrenceRule},
    time::{CalendarTime, Zone},
};

/// How many years past the latest queried year a VTIMEZONE's transitions are
/// expanded.
pub const TRANSITION_COVERAGE_YEARS: i32 = 5;

/// A zone that can be stored in a [`TimezoneRegistry`].
///
/// [`TimezoneRegistry`]: crate::registry::TimezoneRegistry
#[derive(Debug, Clone)]
pub enum Timezone {
    Utc,
    Fixed { tzid: String, offset: FixedOffset },
    Defined(VTimeZone),
}

impl Timezone {
    pub fn tzid(&self) -> &str {
        match self {
            Timezone::Utc => "UTC",
            Timezone::Fixed { tzid, .. } => tzid,
            Timezone::Defined(vtimezone) => &vtimezone.id,
        }
    }

    /// The UTC offset, in seconds, for a wall-clock time in this zone.
    pub fn utc_offset(&self, time: &CalendarTime) -> i32 {
        match self {
            Timezone::Utc => 0,
            Timezone::Fixed { offset, .. } => offset.local_minus_utc(),
            Timezone::Defined(vtimezone) => vtimezone.utc_offset(time),
        }
    }

    /// The UTC offset, in seconds, at an absolute instant.
    pub fn utc_offset_at_utc(&self, unix_time: i64) -> i32 {
        match self {
            Timezone::Utc => 0,
            Timezone::Fixed { offset, .. } => offset.local_minus_utc(),
            Timezone::Defined(vtimezone) => vtimezone.utc_offset_at_utc(unix_time),
        }
    }
}

impl From<VTimeZone> for Timezone {
    fn from(vtimezone: VTimeZone) -> Self {
        Timezone::Defined(vtimezone)
    }
}

/// A STANDARD or DAYLIGHT sub-component: the offsets either side of an onset
/// and when the onsets happen.
#[derive(Debug, Clone)]
pub struct OffsetRule {
    pub offset_from: FixedOffset,
    pub offset_to: FixedOffset,
    /// First onset, as a floating local time in `offset_from`.
    pub start: CalendarTime,
    pub recur: Option<RecurrenceRule>,
    pub name: Option<String>,
    pub rdates: Vec<CalendarTime>,
    pub exdates: Vec<CalendarTime>,
    pub properties: Vec<Property>,
}

impl OffsetRule {
    pub fn new(offset_from: FixedOffset, offset_to: FixedOffset, start: CalendarTime) -> Self {
        OffsetRule {
            offset_from,
            offset_to,
            start,
            recur: None,
            name: None,
            rdates: Vec::new(),
            exdates: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn with_recur(mut self, recur: RecurrenceRule) -> Self {
        self.recur = Some(recur);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Local onset times up to and including `until_year`.
    fn onsets(&self, until_year: i32) -> Vec<CalendarTime> {
        let mut onsets = vec![self.start.clone()];

        onsets.extend(self.rdates.iter().filter(|d| d.year <= until_year).map(|d| {
            let mut onset = d.clone();
            if onset.is_date {
                onset.is_date = false;
                onset.hour = self.start.hour;
                onset.minute = self.start.minute;
                onset.second = self.start.second;
            }
            onset
        }));

        if let Some(recur) = &self.recur {
            let mut recur = recur.clone();

            // Onsets are expanded as floating times in `offset_from`, so an
            // absolute UNTIL has to be moved onto the same clock.
            if let EndCondition::Until(until) = &recur.end_condition {
                if let Some(offset) = until.zone.fixed_offset() {
                    let mut local = until.clone();
                    local.second += self.offset_from.local_minus_utc() - offset;
                    local.zone = Zone::Floating;
                    local.normalize();
                    recur.end_condition = EndCondition::Until(local);
                }
            }

            let start = self.start.clone().with_zone(Zone::Floating);
            match recur.iterator(&start) {
                Ok(iter) => onsets.extend(iter.take_while(|d| d.year <= until_year)),
                Err(err) => tracing::error!(error = %err, "invalid RRULE in timezone rule"),
            }
        }

        onsets.retain(|onset| {
            !self
                .exdates
                .iter()
                .any(|ex| ex.local_seconds() == onset.local_seconds())
        });

        onsets
    }
}

impl TryFrom<parser::Component> for OffsetRule {
    type Error = Error;

    fn try_from(component: parser::Component) -> Result<Self, Self::Error> {
        let kind = component.name.to_ascii_uppercase();
        ensure!(kind == "DAYLIGHT" || kind == "STANDARD");

        if !component.sub_components.is_empty() {
            bail!("Neither DAYLIGHT nor STANDARD can have sub components");
        }

        let mut offset_from = None;
        let mut offset_to = None;
        let mut start = None;
        let mut recur = None;
        let mut name = None;

        let mut rdates = Vec::new();
        let mut exdates = Vec::new();

        let mut properties = Vec::new();
        for prop in component.properties {
            let parsed: Property = prop.try_into()?;

            match parsed {
                Property::TimeZoneOffsetFrom(value) => offset_from = Some(value.value),
                Property::TimeZoneOffsetTo(value) => offset_to = Some(value.value),
                Property::Start(value) => {
                    if value.value.is_date || value.value.zone != Zone::Floating {
                        bail!("Invalid timezone start time, must be local time")
                    }
                    start = Some(value.value)
                }
                Property::RecurrenceRule(value) => recur = Some(value.value),
                Property::TimeZoneName(value) => name = Some(value.value),
                Property::RecurrenceDateTimes(value) => {
                    for date in value.value {
                        match date {
                            RecurrenceDate::Time(time) if time.zone == Zone::Floating => {
                                rdates.push(time)
                            }
                            _ => bail!("Unexpected type for RDATE in {}", kind),
                        }
                    }
                }
                Property::ExceptionDateTimes(value) => {
                    for time in value.value {
                        if time.zone != Zone::Floating {
                            bail!("Unexpected type for EXDATE in {}", kind)
                        }
                        exdates.push(time);
                    }
                }
                p => properties.push(p),
            }
        }

        Ok(OffsetRule {
            offset_from: offset_from
                .ok_or_else(|| format_err!("Missing TZOFFSETFROM field in offset rule"))?,
            offset_to: offset_to
                .ok_or_else(|| format_err!("Missing TZOFFSETTO field in offset rule"))?,
            start: start.ok_or_else(|| format_err!("Missing DTSTART field in offset rule"))?,
            recur,
            rdates,
            exdates,
            name,
            properties,
        })
    }
}

/// One onset, resolved to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transition {
    onset_utc: i64,
    offset_from: i32,
    offset_to: i32,
}

impl Transition {
    /// The earliest local time that reads in `offset_to`.
    ///
    /// Spring-forward gaps resolve to the new offset and fall-back overlaps
    /// resolve to the later, standard, reading.
    fn local_threshold(&self) -> i64 {
        self.onset_utc + self.offset_from.min(self.offset_to) as i64
    }
}

#[derive(Debug, Default)]
struct TransitionCache {
    expanded_until: Option<i32>,
    transitions: Vec<Transition>,
}

/// A VTIMEZONE definition. The zone owns its STANDARD and DAYLIGHT rules
/// outright; their expanded transitions are cached and extended as later
/// years are queried.
#[derive(Debug)]
pub struct VTimeZone {
    pub id: String,
    pub standard: Vec<OffsetRule>,
    pub daylight: Vec<OffsetRule>,

    pub properties: Vec<Property>,

    transitions: Mutex<TransitionCache>,
}

impl Clone for VTimeZone {
    fn clone(&self) -> Self {
        VTimeZone {
            id: self.id.clone(),
            standard: self.standard.clone(),
            daylight: self.daylight.clone(),
            properties: self.properties.clone(),
            transitions: Mutex::default(),
        }
    }
}

impl VTimeZone {
    pub fn new(
        id: impl Into<String>,
        standard: Vec<OffsetRule>,
        daylight: Vec<OffsetRule>,
    ) -> Result<VTimeZone, TimezoneError> {
        let id = id.into();

        if standard.is_empty() && daylight.is_empty() {
            return Err(TimezoneError::InvalidDefinition(format!(
                "{} must have one of DAYLIGHT or STANDARD components",
                id
            )));
        }

        for rule in standard.iter().chain(&daylight) {
            if let Some(recur) = &rule.recur {
                recur.validate().map_err(|err| {
                    TimezoneError::InvalidDefinition(format!("{}: {}", id, err))
                })?;
            }
        }

        Ok(VTimeZone {
            id,
            standard,
            daylight,
            properties: Vec::new(),
            transitions: Mutex::default(),
        })
    }

    /// Offset in seconds for a local wall-clock time.
    pub fn utc_offset(&self, time: &CalendarTime) -> i32 {
        let time = time.normalized();
        let local = time.local_seconds();

        self.with_transitions(time.year, |transitions| {
            let idx = transitions.partition_point(|t| t.local_threshold() <= local);
            offset_before(transitions, idx)
        })
    }

    /// Offset in seconds at an absolute instant.
    pub fn utc_offset_at_utc(&self, unix_time: i64) -> i32 {
        let year = CalendarTime::from_unix_time(unix_time).year;

        self.with_transitions(year, |transitions| {
            let idx = transitions.partition_point(|t| t.onset_utc <= unix_time);
            offset_before(transitions, idx)
        })
    }

    fn with_transitions<R>(&self, year: i32, f: impl FnOnce(&[Transition]) -> R) -> R {
        let mut cache = match self.transitions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if cache.expanded_until.map_or(true, |until| until < year) {
            let until = year + TRANSITION_COVERAGE_YEARS;
            cache.transitions = self.expand_transitions(until);
            cache.expanded_until = Some(until);
        }

        f(&cache.transitions)
    }

    fn expand_transitions(&self, until_year: i32) -> Vec<Transition> {
        tracing::trace!(tzid = %self.id, until_year, "expanding timezone transitions");

        let mut transitions: Vec<Transition> = self
            .standard
            .iter()
            .chain(&self.daylight)
            .flat_map(|rule| {
                let offset_from = rule.offset_from.local_minus_utc();
                let offset_to = rule.offset_to.local_minus_utc();

                rule.onsets(until_year)
                    .into_iter()
                    .map(move |onset| Transition {
                        onset_utc: onset.local_seconds() - offset_from as i64,
                        offset_from,
                        offset_to,
                    })
            })
            .collect();

        transitions.sort_by_key(|t| t.onset_utc);
        transitions.dedup();
        transitions
    }
}

/// The offset in effect before the transition at `idx`. Before the first
/// onset that is the first rule's `TZOFFSETFROM`.
fn offset_before(transitions: &[Transition], idx: usize) -> i32 {
    match idx.checked_sub(1) {
        Some(prev) => transitions[prev].offset_to,
        None => transitions.first().map_or(0, |t| t.offset_from),
    }
}

impl TryFrom<parser::Component> for VTimeZone {
    type Error = Error;

    fn try_from(component: parser::Component) -> Result<Self, Self::Error> {
        ensure!(component.name.to_ascii_uppercase() == "VTIMEZONE");

        let mut standard = Vec::new();
        let mut daylight = Vec::new();
        for component in component.sub_components {
            match &component.name.to_ascii_uppercase() as &str {
                "STANDARD" => standard.push(component.try_into()?),
                "DAYLIGHT" => daylight.push(component.try_into()?),
                other => tracing::debug!(component = other, "ignoring VTIMEZONE sub component"),
            }
        }

        let mut id = None;

        let mut properties = Vec::new();
        for prop in component.properties {
            let parsed: Property = prop.try_into()?;

            match parsed {
                Property::TimeZoneID(value) => id = Some(value.value),
                p => properties.push(p),
            }
        }

        let id = id.ok_or_else(|| format_err!("Missing TZID field in VTIMEZONE"))?;

        let mut vtimezone = VTimeZone::new(id, standard, daylight)?;
        vtimezone.properties = properties;

        Ok(vtimezone)
    }
}
