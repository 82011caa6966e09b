//! Date detection in source lines.

use chrono::{Datelike, NaiveDate};
use regex::Regex;

/// Finds the first date on a line.
#[derive(Debug, Clone)]
pub struct DateFinder {
    /// `M/d/yyyy` or `yyyy-MM-dd`.
    pattern: Regex,
}

impl DateFinder {
    /// Compiles the date pattern.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(
                r"(?P<local>(?P<m>\d{1,2})/(?P<d>\d{1,2})/(?P<y>\d{4}))|(?P<iso>\d{4}-\d{2}-\d{2})",
            )?,
        })
    }

    /// Returns the first date on `line` as `yyyyMMdd`.
    ///
    /// Only the first candidate is considered; an impossible date such as `13/45/2020`
    /// yields `None` rather than falling through to a later one.
    pub fn find(&self, line: &str) -> Option<u64> {
        let caps = self.pattern.captures(line)?;
        let date = if caps.name("local").is_some() {
            NaiveDate::from_ymd_opt(
                caps["y"].parse().ok()?,
                caps["m"].parse().ok()?,
                caps["d"].parse().ok()?,
            )?
        } else {
            NaiveDate::parse_from_str(&caps["iso"], "%Y-%m-%d").ok()?
        };
        Some(date_number(date))
    }
}

/// Encodes a date as the number `yyyyMMdd`.
pub fn date_number(date: NaiveDate) -> u64 {
    let year = u64::try_from(date.year()).unwrap_or(0);
    year * 10_000 + u64::from(date.month()) * 100 + u64::from(date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_us_style_dates() {
        let finder = DateFinder::new().unwrap();
        assert_eq!(finder.find("// changed 3/7/2019 by jd"), Some(20190307));
        assert_eq!(finder.find("12/31/1999"), Some(19991231));
    }

    #[test]
    fn finds_iso_dates() {
        let finder = DateFinder::new().unwrap();
        assert_eq!(finder.find("since 2021-11-05"), Some(20211105));
    }

    #[test]
    fn first_candidate_only() {
        let finder = DateFinder::new().unwrap();
        assert_eq!(finder.find("13/45/2020 then 2021-01-01"), None);
        assert_eq!(finder.find("1/2/2003 and 2021-01-01"), Some(20030102));
    }

    #[test]
    fn lines_without_dates() {
        let finder = DateFinder::new().unwrap();
        assert_eq!(finder.find("int x = 2020;"), None);
    }
}
