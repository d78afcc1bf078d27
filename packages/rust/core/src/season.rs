//! Season windows evaluated in a reference timezone.
//!
//! A window runs from `start` to `end` inclusive, opens `lead_in_days`
//! before `start`, and may wrap the year boundary (`12-31`..`01-07`). When
//! several windows are active the first declared one wins.

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use shopscribe_shared::{MonthDay, Result, SeasonWindowConfig, ShopscribeError};

/// Ordered season rules bound to a timezone.
#[derive(Debug, Clone)]
pub struct SeasonCalendar {
    tz: Tz,
    windows: Vec<SeasonWindowConfig>,
}

impl SeasonCalendar {
    pub fn new(timezone: &str, windows: Vec<SeasonWindowConfig>) -> Result<Self> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|e| ShopscribeError::config(format!("invalid timezone '{timezone}': {e}")))?;
        Ok(Self { tz, windows })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn windows(&self) -> &[SeasonWindowConfig] {
        &self.windows
    }

    /// Calendar date of `now` in the reference timezone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Noon of a local date, as an instant. Used for `--date` overrides.
    pub fn noon_utc(&self, date: NaiveDate) -> Result<DateTime<Utc>> {
        let naive = date
            .and_hms_opt(12, 0, 0)
            .ok_or_else(|| ShopscribeError::validation(format!("invalid date {date}")))?;
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| ShopscribeError::validation(format!("{date} has no noon in {}", self.tz)))
    }

    pub fn active_at(&self, now: DateTime<Utc>) -> Option<&SeasonWindowConfig> {
        self.active_on(self.local_date(now))
    }

    pub fn active_on(&self, date: NaiveDate) -> Option<&SeasonWindowConfig> {
        self.windows.iter().find(|w| window_contains(w, date))
    }
}

/// `md` in `year`; Feb 29 falls back to Feb 28 outside leap years.
fn anchor(year: i32, md: MonthDay) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, md.month, md.day).or_else(|| {
        (md.month == 2 && md.day == 29)
            .then(|| NaiveDate::from_ymd_opt(year, 2, 28))
            .flatten()
    })
}

/// Whether `date` falls inside the window, lead-in included.
pub fn window_contains(window: &SeasonWindowConfig, date: NaiveDate) -> bool {
    use chrono::Datelike;

    let wraps = window.end < window.start;
    // The occurrence containing `date` may have started last year (wrapping
    // windows, long lead-ins) or start next year (lead-in across Jan 1).
    (date.year() - 1..=date.year() + 1).any(|year| {
        let end_year = if wraps { year + 1 } else { year };
        let (Some(start), Some(end)) = (anchor(year, window.start), anchor(end_year, window.end))
        else {
            return false;
        };
        let opens = start
            .checked_sub_days(Days::new(u64::from(window.lead_in_days)))
            .unwrap_or(start);
        opens <= date && date <= end
    })
}

#[cfg(test)]
mod tests {
    use shopscribe_shared::{SeasonTag, default_seasons};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> SeasonCalendar {
        SeasonCalendar::new("America/New_York", default_seasons()).unwrap()
    }

    fn active_tag(y: i32, m: u32, d: u32) -> Option<SeasonTag> {
        calendar().active_on(date(y, m, d)).map(|w| w.tag)
    }

    #[test]
    fn halloween_lead_in_and_end() {
        assert_eq!(active_tag(2024, 9, 17), Some(SeasonTag::Halloween));
        assert_eq!(active_tag(2024, 10, 31), Some(SeasonTag::Halloween));
        assert_eq!(active_tag(2024, 9, 16), None);
        assert_eq!(active_tag(2024, 11, 1), None);
    }

    #[test]
    fn new_year_wraps_and_outranks_holidays() {
        assert_eq!(active_tag(2024, 12, 31), Some(SeasonTag::NewYear));
        assert_eq!(active_tag(2025, 1, 7), Some(SeasonTag::NewYear));
        assert_eq!(active_tag(2025, 1, 8), None);
        assert_eq!(active_tag(2024, 12, 30), Some(SeasonTag::WinterHoliday));
        // Holiday lead-in starts in November.
        assert_eq!(active_tag(2024, 11, 21), Some(SeasonTag::BlackFriday));
        assert_eq!(active_tag(2024, 12, 1), Some(SeasonTag::WinterHoliday));
    }

    #[test]
    fn declaration_order_breaks_ties() {
        // The observance month outranks the Valentine's lead-in by default.
        assert_eq!(active_tag(2025, 2, 10), Some(SeasonTag::HeritageMonth));
        assert_eq!(active_tag(2025, 2, 14), Some(SeasonTag::HeritageMonth));
        assert_eq!(active_tag(2025, 2, 20), Some(SeasonTag::HeritageMonth));

        let mut seasons = default_seasons();
        let valentines = seasons.remove(1);
        assert_eq!(valentines.tag, SeasonTag::Valentines);
        seasons.insert(0, valentines);
        let cal = SeasonCalendar::new("America/New_York", seasons).unwrap();
        assert_eq!(
            cal.active_on(date(2025, 2, 10)).map(|w| w.tag),
            Some(SeasonTag::Valentines)
        );
    }

    #[test]
    fn leap_day_end_clamps_in_common_years() {
        assert_eq!(active_tag(2025, 2, 28), Some(SeasonTag::HeritageMonth));
        assert_eq!(active_tag(2024, 2, 29), Some(SeasonTag::HeritageMonth));
        assert_eq!(active_tag(2025, 3, 1), None);
    }

    #[test]
    fn evaluates_in_reference_timezone() {
        let cal = calendar();
        // 03:00 UTC on Nov 1 is still Oct 31 in New York.
        let now = "2024-11-01T03:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(cal.local_date(now), date(2024, 10, 31));
        assert_eq!(cal.active_at(now).map(|w| w.tag), Some(SeasonTag::Halloween));

        let utc = SeasonCalendar::new("UTC", default_seasons()).unwrap();
        assert_eq!(utc.active_at(now), None);
    }

    #[test]
    fn noon_utc_respects_offset() {
        let instant = calendar().noon_utc(date(2024, 7, 4)).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-07-04T16:00:00+00:00");
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert!(SeasonCalendar::new("Nowhere/Special", vec![]).is_err());
    }
}
