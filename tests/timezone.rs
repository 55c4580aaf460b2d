use std::cmp::Ordering;

use ical_recur::{parser, CalendarTime, TimezoneError, TimezoneRegistry, Zone};

const LOS_ANGELES: &str = "BEGIN:VTIMEZONE\r
TZID:America/Los_Angeles\r
BEGIN:DAYLIGHT\r
TZOFFSETFROM:-0800\r
TZOFFSETTO:-0700\r
TZNAME:PDT\r
DTSTART:20070311T020000\r
RRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=2SU\r
END:DAYLIGHT\r
BEGIN:STANDARD\r
TZOFFSETFROM:-0700\r
TZOFFSETTO:-0800\r
TZNAME:PST\r
DTSTART:20071104T020000\r
RRULE:FREQ=YEARLY;BYMONTH=11;BYDAY=1SU\r
END:STANDARD\r
END:VTIMEZONE\r
";

const HOUR: i32 = 3600;

fn registry() -> TimezoneRegistry {
    let zones = TimezoneRegistry::new();
    for component in parser::Component::from_str_to_stream(LOS_ANGELES).unwrap() {
        zones.register_component(component).unwrap();
    }
    zones
}

fn la(year: i32, month: i32, day: i32, hour: i32, minute: i32) -> CalendarTime {
    CalendarTime::new(year, month, day, hour, minute, 0, Zone::named("America/Los_Angeles"))
}

#[test]
fn spring_forward() {
    let zones = registry();

    assert_eq!(la(2012, 3, 11, 1, 59).utc_offset(&zones).unwrap(), -8 * HOUR);
    assert_eq!(la(2012, 3, 11, 2, 0).utc_offset(&zones).unwrap(), -7 * HOUR);
    assert_eq!(la(2012, 3, 11, 3, 0).utc_offset(&zones).unwrap(), -7 * HOUR);

    let timezone = zones.resolve("America/Los_Angeles").unwrap();
    let onset = CalendarTime::utc(2012, 3, 11, 10, 0, 0).to_unix_time(&zones).unwrap();
    assert_eq!(timezone.utc_offset_at_utc(onset - 1), -8 * HOUR);
    assert_eq!(timezone.utc_offset_at_utc(onset), -7 * HOUR);
}

#[test]
fn fall_back() {
    let zones = registry();

    assert_eq!(la(2012, 11, 4, 0, 59).utc_offset(&zones).unwrap(), -7 * HOUR);
    // The repeated hour reads as standard time.
    assert_eq!(la(2012, 11, 4, 1, 30).utc_offset(&zones).unwrap(), -8 * HOUR);
    assert_eq!(la(2012, 11, 4, 2, 0).utc_offset(&zones).unwrap(), -8 * HOUR);
}

#[test]
fn far_future_and_past() {
    let zones = registry();

    assert_eq!(la(2090, 7, 1, 12, 0).utc_offset(&zones).unwrap(), -7 * HOUR);
    assert_eq!(la(2090, 12, 1, 12, 0).utc_offset(&zones).unwrap(), -8 * HOUR);

    // Before the first onset the zone keeps its earliest TZOFFSETFROM.
    assert_eq!(la(2000, 7, 1, 12, 0).utc_offset(&zones).unwrap(), -8 * HOUR);
}

#[test]
fn conversions_between_zones() {
    let zones = registry();
    let noon_utc = CalendarTime::utc(2012, 7, 1, 12, 0, 0);

    let local = noon_utc
        .convert_to_zone(&Zone::named("America/Los_Angeles"), &zones)
        .unwrap();
    assert_eq!(local, la(2012, 7, 1, 5, 0));
    assert_eq!(local.compare(&noon_utc, &zones).unwrap(), Ordering::Equal);

    let back = local.convert_to_zone(&Zone::Utc, &zones).unwrap();
    assert_eq!(back, noon_utc);

    assert_eq!(
        la(2012, 1, 1, 0, 0).compare(&CalendarTime::utc(2012, 1, 1, 0, 0, 0), &zones).unwrap(),
        Ordering::Greater
    );
}

#[test]
fn date_only_comparison_depends_on_zone() {
    let zones = registry();
    let early = CalendarTime::utc(2012, 7, 1, 6, 0, 0);
    let late = CalendarTime::utc(2012, 7, 1, 12, 0, 0);

    assert_eq!(
        early.compare_date_only_tz(&late, &Zone::Utc, &zones).unwrap(),
        Ordering::Equal
    );
    // 06:00Z is still the evening before in Los Angeles.
    assert_eq!(
        early
            .compare_date_only_tz(&late, &Zone::named("America/Los_Angeles"), &zones)
            .unwrap(),
        Ordering::Less
    );
}

#[test_log::test]
fn registry_lifecycle() {
    let zones = registry();
    let other = TimezoneRegistry::new();

    assert!(zones.has("America/Los_Angeles"));
    assert!(!other.has("America/Los_Angeles"));
    assert_eq!(
        la(2012, 1, 1, 0, 0).utc_offset(&other).unwrap_err(),
        TimezoneError::NotFound("America/Los_Angeles".to_string())
    );

    let removed = zones.remove("America/Los_Angeles").unwrap();
    assert_eq!(removed.tzid(), "America/Los_Angeles");
    assert!(!zones.has("America/Los_Angeles"));

    other.register((*removed).clone());
    assert_eq!(la(2012, 7, 1, 0, 0).utc_offset(&other).unwrap(), -7 * HOUR);

    other.register_as("US/Pacific", (*removed).clone());
    let pacific = CalendarTime::new(2012, 1, 1, 0, 0, 0, Zone::named("US/Pacific"));
    assert_eq!(pacific.utc_offset(&other).unwrap(), -8 * HOUR);

    other.reset();
    assert!(!other.has("America/Los_Angeles"));
    assert!(other.has("UTC"));
}

#[test]
fn rejects_other_components() {
    let zones = TimezoneRegistry::new();
    let event = parser::Component::new("VEVENT");

    assert_eq!(
        zones.register_component(event).unwrap_err(),
        TimezoneError::NotATimezone("VEVENT".to_string())
    );

    let broken = parser::Component::from_str_to_stream(
        "BEGIN:VTIMEZONE\r\nBEGIN:STANDARD\r\nTZOFFSETTO:-0800\r\nEND:STANDARD\r\nEND:VTIMEZONE\r\n",
    )
    .unwrap();
    for component in broken {
        assert!(matches!(
            zones.register_component(component),
            Err(TimezoneError::InvalidDefinition(_))
        ));
    }
}
