//! Weekdays, availability patterns and upcoming delivery dates.
//!
//! All date math runs in one reference time zone, the store's fixed UTC
//! offset ([`StoreTimeZone`]). "Today" and every slot instant are derived
//! from it, never from the host's local time.

use core::fmt;
use core::iter::FusedIterator;

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Default store offset: Indian Standard Time (UTC+05:30).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    /// Monday-first order.
    pub const ALL: [Self; 7] = [
        Self::Mon,
        Self::Tue,
        Self::Wed,
        Self::Thu,
        Self::Fri,
        Self::Sat,
        Self::Sun,
    ];

    /// Lowercase three-letter abbreviation (`"mon"`).
    #[must_use]
    pub const fn abbrev(&self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
            Self::Sun => "sun",
        }
    }

    /// Full English name (`"Monday"`), used as the cart's day label.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mon => "Monday",
            Self::Tue => "Tuesday",
            Self::Wed => "Wednesday",
            Self::Thu => "Thursday",
            Self::Fri => "Friday",
            Self::Sat => "Saturday",
            Self::Sun => "Sunday",
        }
    }

    /// Saturday or Sunday.
    #[must_use]
    pub const fn is_weekend(&self) -> bool {
        matches!(self, Self::Sat | Self::Sun)
    }

    /// Weekday of a calendar date.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    /// Parse a single free-text token. Only the first three letters matter,
    /// so `"Mon"`, `"monday"` and `"MONDAYS"` are all Monday.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let prefix: String = token
            .trim()
            .chars()
            .take(3)
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL.into_iter().find(|day| day.abbrev() == prefix)
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Mon,
            chrono::Weekday::Tue => Self::Tue,
            chrono::Weekday::Wed => Self::Wed,
            chrono::Weekday::Thu => Self::Thu,
            chrono::Weekday::Fri => Self::Fri,
            chrono::Weekday::Sat => Self::Sat,
            chrono::Weekday::Sun => Self::Sun,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// A set of weekdays an item is offered on.
///
/// An empty set means the item is never shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Parse an availability cell such as `"mon, wed | Fri;sat"`.
    ///
    /// Tokens are separated by whitespace, commas, semicolons or pipes.
    /// Unrecognised tokens are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        text.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '|'))
            .filter(|token| !token.is_empty())
            .filter_map(Weekday::from_token)
            .collect()
    }

    /// Add a day.
    pub fn insert(&mut self, day: Weekday) {
        self.0 |= day.bit();
    }

    /// Membership test.
    #[must_use]
    pub const fn contains(&self, day: Weekday) -> bool {
        self.0 & day.bit() != 0
    }

    /// No days at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Days in Monday-first order.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        Weekday::ALL.into_iter().filter(|day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl Serialize for WeekdaySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for WeekdaySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let days = Vec::<Weekday>::deserialize(deserializer)?;
        Ok(days.into_iter().collect())
    }
}

/// The store's reference time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeZone(FixedOffset);

impl StoreTimeZone {
    /// Build from an offset in minutes east of UTC.
    ///
    /// Returns `None` for offsets outside ±24h.
    #[must_use]
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self)
    }

    /// The underlying offset.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.0
    }

    /// Calendar date at `now` in the store's zone.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.0).date_naive()
    }

    /// The instant a wall-clock time on `date` occurs in the store's zone.
    #[must_use]
    pub fn instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        // A fixed offset has no gaps or folds, so the mapping is always single.
        self.0
            .from_local_datetime(&date.and_time(time))
            .single()
            .map_or_else(
                || date.and_time(time).and_utc(),
                |local| local.with_timezone(&Utc),
            )
    }
}

impl Default for StoreTimeZone {
    fn default() -> Self {
        Self::from_offset_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap_or_else(|| Self(Utc.fix()))
    }
}

/// One date yielded by [`upcoming_dates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpcomingDate {
    pub date: NaiveDate,
    pub weekday: Weekday,
}

impl UpcomingDate {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weekday: Weekday::of(date),
        }
    }

    /// ISO-8601 date string (`2026-10-20`).
    #[must_use]
    pub fn iso(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Lazy, finite sequence of upcoming dates. Consumed once; not restartable.
#[derive(Debug)]
pub struct UpcomingDates {
    next: Option<NaiveDate>,
    remaining: usize,
}

impl Iterator for UpcomingDates {
    type Item = UpcomingDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let date = self.next?;
        self.remaining -= 1;
        self.next = date.checked_add_days(Days::new(1));
        Some(UpcomingDate::new(date))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.next.is_some() {
            (0, Some(self.remaining))
        } else {
            (0, Some(0))
        }
    }
}

impl FusedIterator for UpcomingDates {}

/// The next `n` calendar dates, **starting tomorrow** relative to `today`.
///
/// Today is never offered: every category with a cutoff has already closed
/// for same-day delivery, and the storefront only takes pre-orders.
#[must_use]
pub fn upcoming_dates(today: NaiveDate, n: usize) -> UpcomingDates {
    UpcomingDates {
        next: today.checked_add_days(Days::new(1)),
        remaining: n,
    }
}

/// The next occurrence of `weekday` strictly after `from`.
#[must_use]
pub fn next_date_for_weekday(weekday: Weekday, from: NaiveDate) -> Option<NaiveDate> {
    let current = i64::from(Weekday::of(from) as u8);
    let target = i64::from(weekday as u8);
    let mut ahead = (target - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    from.checked_add_days(Days::new(ahead.unsigned_abs()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_weekday_from_token() {
        assert_eq!(Weekday::from_token("Mon"), Some(Weekday::Mon));
        assert_eq!(Weekday::from_token("thursday"), Some(Weekday::Thu));
        assert_eq!(Weekday::from_token(" FRIDAYS "), Some(Weekday::Fri));
        assert_eq!(Weekday::from_token("mo"), None);
        assert_eq!(Weekday::from_token("xyz"), None);
    }

    #[test]
    fn test_weekday_set_parse_mixed_separators() {
        let set = WeekdaySet::parse("mon, Wed | friday;sat");
        let days: Vec<_> = set.iter().collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri, Weekday::Sat]);
        assert!(!set.contains(Weekday::Tue));
    }

    #[test]
    fn test_weekday_set_parse_empty_and_junk() {
        assert!(WeekdaySet::parse("").is_empty());
        assert!(WeekdaySet::parse(" , ;| ").is_empty());
        assert!(WeekdaySet::parse("daily").is_empty());
    }

    #[test]
    fn test_weekday_set_serde() {
        let set = WeekdaySet::parse("tue thu");
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["tue","thu"]"#);
        let back: WeekdaySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_upcoming_dates_start_tomorrow_and_cross_year() {
        let dates: Vec<_> = upcoming_dates(date(2026, 12, 30), 4).collect();
        let isos: Vec<_> = dates.iter().map(UpcomingDate::iso).collect();
        assert_eq!(
            isos,
            vec!["2026-12-31", "2027-01-01", "2027-01-02", "2027-01-03"]
        );
        assert_eq!(dates[0].weekday, Weekday::Thu);
    }

    #[test]
    fn test_upcoming_dates_is_consumed_once() {
        let mut dates = upcoming_dates(date(2026, 10, 19), 2);
        assert!(dates.next().is_some());
        assert!(dates.next().is_some());
        assert!(dates.next().is_none());
        assert!(dates.next().is_none());
    }

    #[test]
    fn test_next_date_for_weekday_is_strictly_after() {
        // 2026-10-19 is a Monday
        let monday = date(2026, 10, 19);
        assert_eq!(next_date_for_weekday(Weekday::Mon, monday), Some(date(2026, 10, 26)));
        assert_eq!(next_date_for_weekday(Weekday::Tue, monday), Some(date(2026, 10, 20)));
        assert_eq!(next_date_for_weekday(Weekday::Sun, monday), Some(date(2026, 10, 25)));
    }

    #[test]
    fn test_next_date_for_weekday_crosses_month() {
        // 2026-02-27 is a Friday
        assert_eq!(
            next_date_for_weekday(Weekday::Tue, date(2026, 2, 27)),
            Some(date(2026, 3, 3))
        );
    }

    #[test]
    fn test_store_time_zone_today_and_instant() {
        let tz = StoreTimeZone::default();
        // 20:00 UTC on the 19th is 01:30 on the 20th in IST
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 20, 0, 0).unwrap();
        assert_eq!(tz.today(now), date(2026, 10, 20));

        let eleven = NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        let instant = tz.instant(date(2026, 10, 20), eleven);
        assert_eq!(instant, Utc.with_ymd_and_hms(2026, 10, 20, 5, 30, 0).unwrap());
    }
}
