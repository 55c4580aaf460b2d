use ical_recur::{
    CalendarTime, Limits, RecurError, RecurrenceRule, RulePart, TimezoneRegistry,
};

fn expand(rule: &str, start: &str, take: usize) -> Vec<String> {
    let rule: RecurrenceRule = rule.parse().unwrap();
    let start: CalendarTime = start.parse().unwrap();

    rule.iterator(&start)
        .unwrap()
        .take(take)
        .map(|d| d.to_string())
        .collect()
}

fn utc(year: i32, month: i32, day: i32) -> CalendarTime {
    CalendarTime::utc(year, month, day, 0, 0, 0)
}

#[test]
fn count_is_exact() {
    let rule: RecurrenceRule = "FREQ=DAILY;COUNT=5".parse().unwrap();
    let mut iter = rule.iterator(&utc(2015, 1, 1)).unwrap();

    let dates: Vec<_> = iter.by_ref().map(|d| d.to_string()).collect();
    assert_eq!(
        dates,
        vec![
            "2015-01-01T00:00:00Z",
            "2015-01-02T00:00:00Z",
            "2015-01-03T00:00:00Z",
            "2015-01-04T00:00:00Z",
            "2015-01-05T00:00:00Z",
        ]
    );

    assert!(iter.is_exhausted());
    assert_eq!(iter.yielded(), 5);
    assert_eq!(iter.next(), None);
}

#[test]
fn until_is_inclusive() {
    let rule: RecurrenceRule = "FREQ=DAILY;UNTIL=20150103T000000Z".parse().unwrap();
    let dates: Vec<_> = rule
        .iterator(&utc(2015, 1, 1))
        .unwrap()
        .map(|d| d.to_string())
        .collect();

    assert_eq!(
        dates,
        vec![
            "2015-01-01T00:00:00Z",
            "2015-01-02T00:00:00Z",
            "2015-01-03T00:00:00Z",
        ]
    );
}

#[test]
fn last_day_of_month_in_leap_year() {
    assert_eq!(
        expand("FREQ=MONTHLY;BYMONTHDAY=-1", "2016-01-15T09:00:00", 3),
        vec![
            "2016-01-31T09:00:00",
            "2016-02-29T09:00:00",
            "2016-03-31T09:00:00",
        ]
    );
}

#[test]
fn nth_weekday_of_month() {
    let rule: RecurrenceRule = "FREQ=MONTHLY;BYDAY=-1SU".parse().unwrap();
    let first = rule.iterator(&utc(1970, 1, 1)).unwrap().next().unwrap();
    assert_eq!(first, utc(1970, 1, 25));

    // 2MO and -3MO fall on the same day in four week months and must not
    // produce the date twice.
    let rule: RecurrenceRule = "FREQ=MONTHLY;BYDAY=2MO,-3MO".parse().unwrap();
    let dates: Vec<_> = rule
        .iterator(&utc(1970, 1, 1))
        .unwrap()
        .take(4)
        .map(|d| d.to_ical_string())
        .collect();

    assert_eq!(
        dates,
        vec![
            "19700112T000000Z",
            "19700209T000000Z",
            "19700309T000000Z",
            "19700316T000000Z",
        ]
    );
}

#[test]
fn invalid_combinations_are_rejected() {
    let err = "FREQ=MONTHLY;BYYEARDAY=1;BYMONTH=2"
        .parse::<RecurrenceRule>()
        .unwrap_err();
    assert_eq!(err.part(), Some(RulePart::ByYearDay));
    assert!(err.to_string().contains("BYYEARDAY"), "{}", err);

    let err = "FREQ=YEARLY;BYWEEKNO=1;BYMONTHDAY=2"
        .parse::<RecurrenceRule>()
        .unwrap_err();
    assert_eq!(err.part(), Some(RulePart::ByWeekNo));
    assert!(err.to_string().contains("BYWEEKNO"), "{}", err);

    let err = "FREQ=MONTHLY;BYDAY=MO,XX1"
        .parse::<RecurrenceRule>()
        .unwrap_err();
    assert!(matches!(err, RecurError::InvalidValue { part: RulePart::ByDay, .. }));
    assert!(err.to_string().contains("XX1"), "{}", err);
}

#[test]
fn serialized_rules_expand_the_same() {
    let start: CalendarTime = "1997-09-02T09:00:00".parse().unwrap();

    for rule in &[
        "FREQ=YEARLY;BYMONTH=1;BYDAY=SU;BYHOUR=8,9;BYMINUTE=30;INTERVAL=2",
        "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-2",
        "FREQ=YEARLY;BYWEEKNO=20;BYDAY=MO;WKST=SU",
        "FREQ=YEARLY;BYYEARDAY=1,100,200;UNTIL=20060101T000000",
        "FREQ=WEEKLY;COUNT=10;WKST=SU;BYDAY=TU,TH",
        "FREQ=HOURLY;INTERVAL=3;UNTIL=19970902T170000",
    ] {
        let original: RecurrenceRule = rule.parse().unwrap();
        let reparsed: RecurrenceRule = original.to_string().parse().unwrap();

        let a: Vec<_> = original.iterator(&start).unwrap().take(100).collect();
        let b: Vec<_> = reparsed.iterator(&start).unwrap().take(100).collect();

        assert!(!a.is_empty(), "{}", rule);
        assert_eq!(a, b, "{}", rule);
    }
}

#[test]
fn iteration_is_deterministic_and_increasing() {
    let zones = TimezoneRegistry::new();
    let start = CalendarTime::utc(2000, 2, 29, 12, 30, 0);

    for rule in &[
        "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29",
        "FREQ=MONTHLY;BYMONTHDAY=1,15,-1;BYHOUR=6,18",
        "FREQ=WEEKLY;INTERVAL=3;BYDAY=MO,SU;WKST=SU",
        "FREQ=DAILY;BYMONTH=1,7;BYMINUTE=0,45",
        "FREQ=MINUTELY;INTERVAL=17;BYHOUR=0,12",
        "FREQ=SECONDLY;INTERVAL=3601",
        "FREQ=YEARLY;BYDAY=20MO",
        "FREQ=YEARLY;BYSETPOS=1,-1;BYDAY=FR;BYMONTH=3,9",
    ] {
        let rule: RecurrenceRule = rule.parse().unwrap();

        let first: Vec<_> = rule.iterator(&start).unwrap().take(200).collect();
        let second: Vec<_> = rule.iterator(&start).unwrap().take(200).collect();
        assert_eq!(first, second, "{}", rule);
        assert!(first.len() > 1, "{}", rule);

        let instants: Vec<_> = first
            .iter()
            .map(|d| d.to_unix_time(&zones).unwrap())
            .collect();
        assert!(instants[0] >= start.to_unix_time(&zones).unwrap(), "{}", rule);
        for pair in instants.windows(2) {
            assert!(pair[0] < pair[1], "{}: {:?}", rule, first);
        }
    }
}

#[test]
fn matching_start_is_the_first_occurrence() {
    // 2020-01-02 is a Thursday.
    assert_eq!(
        expand("FREQ=WEEKLY;BYDAY=TH", "2020-01-02T10:00:00", 2),
        vec!["2020-01-02T10:00:00", "2020-01-09T10:00:00"]
    );

    // A start that does not match the rule is not an occurrence.
    assert_eq!(
        expand("FREQ=WEEKLY;BYDAY=FR", "2020-01-02T10:00:00", 2),
        vec!["2020-01-03T10:00:00", "2020-01-10T10:00:00"]
    );
}

#[test]
fn date_only_starts() {
    let rule: RecurrenceRule = "FREQ=WEEKLY;COUNT=3".parse().unwrap();
    let dates: Vec<_> = rule
        .iterator(&CalendarTime::date(2021, 12, 20))
        .unwrap()
        .map(|d| d.to_string())
        .collect();

    assert_eq!(dates, vec!["2021-12-20", "2021-12-27", "2022-01-03"]);
}

#[test_log::test]
fn impossible_rules_exhaust() {
    let rule: RecurrenceRule = "FREQ=MONTHLY;BYMONTH=2;BYMONTHDAY=30".parse().unwrap();
    let mut iter = rule.iterator(&utc(2000, 1, 1)).unwrap();

    assert_eq!(iter.next(), None);
    assert!(iter.is_exhausted());

    let rule: RecurrenceRule = "FREQ=YEARLY;BYMONTH=2;BYMONTHDAY=29".parse().unwrap();
    let limits = Limits {
        max_empty_years: 1,
        ..Limits::default()
    };
    let dates: Vec<_> = rule
        .iterator(&utc(2001, 1, 1))
        .unwrap()
        .with_limits(limits)
        .collect();
    assert!(dates.is_empty());

    let limits = Limits {
        max_year: 2010,
        ..Limits::default()
    };
    let dates: Vec<_> = rule
        .iterator(&utc(2001, 1, 1))
        .unwrap()
        .with_limits(limits)
        .collect();
    assert_eq!(dates, vec![utc(2004, 2, 29), utc(2008, 2, 29)]);
}
