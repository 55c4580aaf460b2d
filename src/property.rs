use crate::{
    parameters::ParameterSet,
    parser,
    recur::RecurrenceRule,
    text::unescape,
    time::{CalendarTime, Zone},
};
use std::convert::TryFrom;
use std::fmt::Debug;

use anyhow::{bail, ensure, format_err, Context, Error};
use chrono::{Duration, FixedOffset};
use url::Url;

/// A decoded content line.
///
/// Values are decoded eagerly: date-times are resolved against their `TZID`
/// and `VALUE` parameters, TEXT is unescaped and RRULEs are parsed and
/// validated. Properties that aren't understood are kept as
/// [`Property::Other`].
#[derive(Debug, Clone)]
pub enum Property {
    /// Purpose: This property provides the capability to associate a
    /// document object with a calendar component.
    ///
    /// Either a URI or, with `VALUE=BINARY;ENCODING=BASE64`, inline data.
    Attach(PropertyValue<AttachEnum>),
    Comment(PropertyValue<String>),
    Description(PropertyValue<String>),
    Location(PropertyValue<String>),
    Summary(PropertyValue<String>),

    End(PropertyValue<CalendarTime>),
    /// DTSTART. For recurring components this is also the first instance.
    Start(PropertyValue<CalendarTime>),
    Duration(PropertyValue<Duration>),

    TimeZoneID(PropertyValue<String>),
    TimeZoneName(PropertyValue<String>),
    TimeZoneOffsetFrom(PropertyValue<FixedOffset>),
    TimeZoneOffsetTo(PropertyValue<FixedOffset>),

    /// Identifies the instance of a recurring component that this component
    /// overrides. A `RANGE=THISANDFUTURE` parameter extends the override to
    /// every later instance.
    RecurrenceID(PropertyValue<CalendarTime>),
    URL(PropertyValue<Url>),
    UID(PropertyValue<String>),

    /// EXDATE. One property may list several values.
    ExceptionDateTimes(PropertyValue<Vec<CalendarTime>>),
    /// RDATE. One property may list several values, either dates, date-times
    /// or (with `VALUE=PERIOD`) periods.
    RecurrenceDateTimes(PropertyValue<Vec<RecurrenceDate>>),
    RecurrenceRule(PropertyValue<RecurrenceRule>),

    DateTimeStamp(PropertyValue<CalendarTime>),
    SequenceNumber(PropertyValue<u32>),

    ProductIdentifier(PropertyValue<String>),
    Version(PropertyValue<String>),

    /// Any other property, with its raw value.
    Other(String, PropertyValue<String>),
}

impl TryFrom<parser::Property> for Property {
    type Error = Error;

    fn try_from(property: parser::Property) -> Result<Self, Self::Error> {
        let parameters: ParameterSet = property.parameters.iter().cloned().into();

        let prop = match &property.name.to_ascii_uppercase() as &str {
            "ATTACH" => {
                let value = match parameters.get_value_data_type() {
                    Some(data_type) if data_type.eq_ignore_ascii_case("BINARY") => {
                        if !parameters
                            .get_encoding()
                            .map_or(false, |e| e.eq_ignore_ascii_case("BASE64"))
                        {
                            bail!("Unknown encoding for binary attach property");
                        }

                        AttachEnum::Binary(base64::decode(&property.value)?)
                    }
                    Some(data_type) if !data_type.eq_ignore_ascii_case("URI") => {
                        AttachEnum::Other {
                            data_type: data_type.to_string(),
                            value: property.value.clone(),
                        }
                    }
                    _ => AttachEnum::Url(property.value.parse()?),
                };

                Property::Attach(PropertyValue { value, parameters })
            }
            "COMMENT" => Property::Comment(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "DESCRIPTION" => Property::Description(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "LOCATION" => Property::Location(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "SUMMARY" => Property::Summary(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "DTEND" => Property::End(PropertyValue {
                value: parse_time(&property.value, &parameters)?,
                parameters,
            }),
            "DTSTART" => Property::Start(PropertyValue {
                value: parse_time(&property.value, &parameters)?,
                parameters,
            }),
            "DURATION" => Property::Duration(PropertyValue {
                value: parse_duration(&property.value)?,
                parameters,
            }),
            "TZID" => Property::TimeZoneID(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "TZNAME" => Property::TimeZoneName(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "TZOFFSETFROM" => Property::TimeZoneOffsetFrom(PropertyValue {
                value: parse_offset(&property.value)?,
                parameters,
            }),
            "TZOFFSETTO" => Property::TimeZoneOffsetTo(PropertyValue {
                value: parse_offset(&property.value)?,
                parameters,
            }),
            "RECURRENCE-ID" => Property::RecurrenceID(PropertyValue {
                value: parse_time(&property.value, &parameters)?,
                parameters,
            }),
            "URL" => Property::URL(PropertyValue {
                value: property.value.parse()?,
                parameters,
            }),
            "UID" => Property::UID(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "EXDATE" => Property::ExceptionDateTimes(PropertyValue {
                value: property
                    .value
                    .split(',')
                    .map(|v| parse_time(v, &parameters))
                    .collect::<Result<_, _>>()?,
                parameters,
            }),
            "RDATE" => Property::RecurrenceDateTimes(PropertyValue {
                value: property
                    .value
                    .split(',')
                    .map(|v| RecurrenceDate::parse_from(v, &parameters))
                    .collect::<Result<_, _>>()?,
                parameters,
            }),
            "RRULE" => Property::RecurrenceRule(PropertyValue {
                value: property
                    .value
                    .parse()
                    .with_context(|| format!("parsing RRULE {:?}", property.value))?,
                parameters,
            }),
            "DTSTAMP" => Property::DateTimeStamp(PropertyValue {
                value: parse_utc_time(&property.value, &parameters, "DTSTAMP")?,
                parameters,
            }),
            "SEQUENCE" => Property::SequenceNumber(PropertyValue {
                value: property.value.parse()?,
                parameters,
            }),
            "PRODID" => Property::ProductIdentifier(PropertyValue {
                value: unescape(&property.value)?,
                parameters,
            }),
            "VERSION" => Property::Version(PropertyValue {
                value: property.value.clone(),
                parameters,
            }),
            _ => Property::Other(
                property.name,
                PropertyValue {
                    value: property.value,
                    parameters,
                },
            ),
        };

        Ok(prop)
    }
}

/// Parse a DATE or DATE-TIME value. A `TZID` parameter makes the value local
/// to that zone, a trailing `Z` makes it UTC and otherwise it is floating.
fn parse_time(value: &str, parameters: &ParameterSet) -> Result<CalendarTime, Error> {
    let zone = match parameters.get_tzid() {
        Some(tzid) => Zone::named(tzid),
        None => Zone::Floating,
    };

    let time = CalendarTime::parse_ical(value.trim(), zone)?;

    if parameters.is_value_type("DATE") && !time.is_date {
        bail!("Expected a DATE value, got {:?}", value);
    }

    Ok(time)
}

fn parse_utc_time(value: &str, parameters: &ParameterSet, name: &str) -> Result<CalendarTime, Error> {
    let time = parse_time(value, parameters)?;
    ensure!(!time.is_date && time.zone == Zone::Utc, "{} must be UTC", name);

    Ok(time)
}

/// Parse a UTC offset, `+HHMM` or `-HHMMSS`.
fn parse_offset(value: &str) -> Result<FixedOffset, Error> {
    if !value.starts_with(&['+', '-'] as &[char])
        || !(value.len() == 5 || value.len() == 7)
        || !value[1..].bytes().all(|b| b.is_ascii_digit())
    {
        bail!("Invalid UTC offset: {}", value)
    }

    let hours: i32 = value[1..3].parse()?;
    let minutes: i32 = value[3..5].parse()?;
    let seconds: i32 = if value.len() == 7 {
        value[5..].parse()?
    } else {
        0
    };

    let total = hours * 60 * 60 + minutes * 60 + seconds;

    let offset = if value.starts_with('+') {
        FixedOffset::east_opt(total)
    } else {
        FixedOffset::west_opt(total)
    };

    offset.ok_or_else(|| format_err!("UTC offset out of range: {}", value))
}

/// Parse a DURATION value such as `PT1H30M`, `-P2D` or `P1W`.
pub fn parse_duration(value: &str) -> Result<Duration, Error> {
    let re = regex::Regex::new(
        r"^([+-])?P(?:(\d+)W)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$",
    )?;

    let value = value.trim();
    let captures = re
        .captures(value)
        .ok_or_else(|| format_err!("Invalid duration: {:?}", value))?;

    if value.ends_with('P') || value.ends_with('T') {
        bail!("Invalid duration: {:?}", value);
    }

    const UNIT_SECONDS: [i64; 5] = [7 * 24 * 60 * 60, 24 * 60 * 60, 60 * 60, 60, 1];

    let mut total: i64 = 0;
    for (idx, unit) in UNIT_SECONDS.iter().enumerate() {
        if let Some(digits) = captures.get(idx + 2) {
            let amount: i64 = digits.as_str().parse()?;
            total = amount
                .checked_mul(*unit)
                .and_then(|seconds| total.checked_add(seconds))
                .ok_or_else(|| format_err!("Duration out of range: {:?}", value))?;
        }
    }

    if captures.get(1).map(|m| m.as_str()) == Some("-") {
        total = -total;
    }

    Duration::try_seconds(total).ok_or_else(|| format_err!("Duration out of range: {:?}", value))
}

#[derive(Debug, Clone)]
pub struct PropertyValue<T: Debug + Clone> {
    pub value: T,
    pub parameters: ParameterSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachEnum {
    Url(Url),
    Binary(Vec<u8>),
    Other { data_type: String, value: String },
}

/// One value of an RDATE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceDate {
    Time(CalendarTime),
    Period(Period),
}

impl RecurrenceDate {
    fn parse_from(value: &str, parameters: &ParameterSet) -> Result<Self, Error> {
        if parameters.is_value_type("PERIOD") || value.contains('/') {
            Ok(RecurrenceDate::Period(Period::parse_from(value, parameters)?))
        } else {
            Ok(RecurrenceDate::Time(parse_time(value, parameters)?))
        }
    }

    /// When the instance starts.
    pub fn start(&self) -> &CalendarTime {
        match self {
            RecurrenceDate::Time(time) => time,
            RecurrenceDate::Period(period) => &period.start,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodEnd {
    End(CalendarTime),
    Duration(Duration),
}

/// A PERIOD value, either `start/end` or `start/duration`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub start: CalendarTime,
    pub end: PeriodEnd,
}

impl Period {
    fn parse_from(value: &str, parameters: &ParameterSet) -> Result<Self, Error> {
        let (start, end) = value
            .split_once('/')
            .with_context(|| format!("invalid period {:?}", value))?;

        let start = parse_time(start, parameters)?;
        if start.is_date {
            bail!("Invalid start time in period: {:?}", value);
        }

        let end = if end.trim_start().starts_with(&['P', '+', '-'] as &[char]) {
            PeriodEnd::Duration(parse_duration(end)?)
        } else {
            let end = parse_time(end, parameters)?;
            if end.is_date {
                bail!("Invalid end time in period: {:?}", value);
            }
            PeriodEnd::End(end)
        };

        Ok(Period { start, end })
    }

    /// The end of the period. For the duration form this is the start moved
    /// by the duration on the wall clock.
    pub fn end(&self) -> CalendarTime {
        match &self.end {
            PeriodEnd::End(end) => end.clone(),
            PeriodEnd::Duration(duration) => {
                let mut end = self.start.clone();
                end.add_duration(*duration);
                end
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::TryInto;

    use super::*;

    fn prop(name: &str, params: &[(&str, &str)], value: &str) -> Result<Property, Error> {
        let mut property = parser::Property::new(name, value);
        for (name, value) in params {
            property = property.with_parameter(*name, *value);
        }
        property.try_into()
    }

    #[test]
    fn dates_pick_up_their_zone() {
        match prop("DTSTART", &[("TZID", "Europe/London")], "20200101T090000").unwrap() {
            Property::Start(value) => {
                assert_eq!(value.value.zone, Zone::named("Europe/London"));
                assert_eq!(value.value.hour, 9);
            }
            p => panic!("unexpected {:?}", p),
        }

        match prop("DTEND", &[], "20200101T090000Z").unwrap() {
            Property::End(value) => assert_eq!(value.value.zone, Zone::Utc),
            p => panic!("unexpected {:?}", p),
        }

        match prop("RECURRENCE-ID", &[("VALUE", "DATE")], "20200101").unwrap() {
            Property::RecurrenceID(value) => assert!(value.value.is_date),
            p => panic!("unexpected {:?}", p),
        }

        assert!(prop("DTSTART", &[("VALUE", "DATE")], "20200101T090000").is_err());
        assert!(prop("DTSTART", &[], "2020-01-01").is_err());
    }

    #[test]
    fn dtstamp_must_be_utc() {
        assert!(prop("DTSTAMP", &[], "20200101T090000Z").is_ok());
        assert!(prop("DTSTAMP", &[], "20200101T090000").is_err());
        assert!(prop("DTSTAMP", &[], "20200101").is_err());
    }

    #[test]
    fn exdate_lists() {
        match prop("EXDATE", &[("TZID", "America/New_York")], "20200101T090000,20200108T090000")
            .unwrap()
        {
            Property::ExceptionDateTimes(value) => {
                assert_eq!(value.value.len(), 2);
                assert_eq!(value.value[1].day, 8);
                assert_eq!(value.value[1].zone, Zone::named("America/New_York"));
            }
            p => panic!("unexpected {:?}", p),
        }
    }

    #[test]
    fn rdate_periods() {
        let parsed = prop(
            "RDATE",
            &[("VALUE", "PERIOD")],
            "19960403T020000Z/19960403T040000Z,19960404T010000Z/PT3H",
        )
        .unwrap();

        let dates = match parsed {
            Property::RecurrenceDateTimes(value) => value.value,
            p => panic!("unexpected {:?}", p),
        };

        assert_eq!(dates.len(), 2);
        match &dates[1] {
            RecurrenceDate::Period(period) => {
                assert_eq!(period.end, PeriodEnd::Duration(Duration::hours(3)));
                assert_eq!(period.end().hour, 4);
            }
            d => panic!("unexpected {:?}", d),
        }
        assert_eq!(dates[0].start().hour, 2);

        assert!(prop("RDATE", &[("VALUE", "PERIOD")], "19960403T020000Z").is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("PT1H30M").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("P1W").unwrap(), Duration::weeks(1));
        assert_eq!(parse_duration("-P1DT12H").unwrap(), -Duration::hours(36));
        assert_eq!(parse_duration("+PT15S").unwrap(), Duration::seconds(15));

        assert!(parse_duration("P99999999999999W").is_err());
        assert!(parse_duration("PT99999999999999999999S").is_err());
        assert!(parse_duration("-P9999999999999D").is_err());

        assert!(parse_duration("P").is_err());
        assert!(parse_duration("PT").is_err());
        assert!(parse_duration("1H").is_err());
        assert!(parse_duration("P1H").is_err());
    }

    #[test]
    fn offsets() {
        assert_eq!(parse_offset("+0100").unwrap(), FixedOffset::east_opt(3600).unwrap());
        assert_eq!(
            parse_offset("-0530").unwrap(),
            FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(parse_offset("+001730").unwrap().local_minus_utc(), 17 * 60 + 30);

        assert!(parse_offset("0100").is_err());
        assert!(parse_offset("+1").is_err());
        assert!(parse_offset("+2500").is_err());
    }

    #[test]
    fn rrule_is_validated() {
        match prop("RRULE", &[], "FREQ=WEEKLY;BYDAY=MO,WE").unwrap() {
            Property::RecurrenceRule(value) => assert_eq!(value.value.by_day.len(), 2),
            p => panic!("unexpected {:?}", p),
        }

        assert!(prop("RRULE", &[], "FREQ=MONTHLY;BYWEEKNO=1").is_err());
    }

    #[test]
    fn text_values() {
        match prop("SUMMARY", &[], r"Lunch\; bring snacks").unwrap() {
            Property::Summary(value) => assert_eq!(value.value, "Lunch; bring snacks"),
            p => panic!("unexpected {:?}", p),
        }

        match prop("X-CUSTOM", &[], r"raw\,value").unwrap() {
            Property::Other(name, value) => {
                assert_eq!(name, "X-CUSTOM");
                assert_eq!(value.value, r"raw\,value");
            }
            p => panic!("unexpected {:?}", p),
        }
    }

    #[test]
    fn unread_properties_stay_raw() {
        for (name, value) in &[
            ("STATUS", "CONFIRMED"),
            ("TRANSP", "OPAQUE"),
            ("CATEGORIES", r"WORK,Team\, Blue"),
            ("ATTENDEE", "mailto:a@example.org"),
            ("ORGANIZER", "mailto:b@example.org"),
            ("CONTACT", "Jim Dolittle"),
            ("RELATED-TO", "parent@example.org"),
            ("TZURL", "http://tz.example.org/London"),
            ("DUE", "20200101T090000Z"),
            ("CREATED", "20200101T090000Z"),
            ("LAST-MODIFIED", "20200101"),
        ] {
            match prop(name, &[], value).unwrap() {
                Property::Other(other, raw) => {
                    assert_eq!(other, *name);
                    assert_eq!(raw.value, *value);
                }
                p => panic!("unexpected {:?}", p),
            }
        }
    }

    #[test]
    fn attachments() {
        match prop(
            "ATTACH",
            &[("VALUE", "BINARY"), ("ENCODING", "BASE64")],
            "aGVsbG8=",
        )
        .unwrap()
        {
            Property::Attach(value) => assert_eq!(value.value, AttachEnum::Binary(b"hello".to_vec())),
            p => panic!("unexpected {:?}", p),
        }

        match prop("ATTACH", &[], "https://example.org/agenda.pdf").unwrap() {
            Property::Attach(value) => assert!(matches!(value.value, AttachEnum::Url(_))),
            p => panic!("unexpected {:?}", p),
        }

        assert!(prop("ATTACH", &[("VALUE", "BINARY")], "aGVsbG8=").is_err());
    }
}
