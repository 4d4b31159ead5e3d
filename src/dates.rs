use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate};
use regex::Regex;

pub const DATE_FORMAT: &str = "%Y%m%d";
const RANGE_DELIMITER: char = '~';

// Resolves the date argument to the list of dates a run covers. No argument
// means yesterday relative to `today`. A range is normalized to ascending
// order regardless of how the endpoints were given.
pub fn resolve_dates(input: Option<&str>, today: NaiveDate) -> Result<Vec<String>> {
    let Some(raw) = input else {
        let yesterday = today - Duration::days(1);
        return Ok(vec![yesterday.format(DATE_FORMAT).to_string()]);
    };
    if raw.contains(RANGE_DELIMITER) {
        let parts: Vec<&str> = raw.split(RANGE_DELIMITER).collect();
        if parts.len() != 2 {
            bail!(
                "Date must be 8 digits in YYYYMMDD format. For a date range, please use the format YYYYMMDD~YYYYMMDD. Input value: {raw}"
            );
        }
        let first = parse_date(parts[0], today)?;
        let second = parse_date(parts[1], today)?;
        Ok(expand_range(first, second))
    } else {
        let date = parse_date(raw, today)?;
        Ok(vec![date.format(DATE_FORMAT).to_string()])
    }
}

fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate> {
    let eight_digits = Regex::new(r"^\d{8}$").unwrap();
    if !eight_digits.is_match(input) {
        bail!(
            "Date must be 8 digits in YYYYMMDD format. For a date range, please use the format YYYYMMDD~YYYYMMDD. Input value: {input}"
        );
    }
    let date = NaiveDate::parse_from_str(input, DATE_FORMAT)
        .with_context(|| format!("Invalid calendar date. Input value: {input}"))?;
    if date > today {
        bail!("Future date specified. Input value: {input}");
    }
    Ok(date)
}

fn expand_range(first: NaiveDate, second: NaiveDate) -> Vec<String> {
    let (mut current, end) = if first <= second { (first, second) } else { (second, first) };
    let mut dates = Vec::new();
    while current <= end {
        dates.push(current.format(DATE_FORMAT).to_string());
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(1988, 2, 15).unwrap()
    }

    #[test]
    fn defaults_to_yesterday() {
        let dates = resolve_dates(None, today()).unwrap();
        assert_eq!(dates, vec!["19880214".to_string()]);
    }

    #[test]
    fn single_date_passes_through() {
        let dates = resolve_dates(Some("19880209"), today()).unwrap();
        assert_eq!(dates, vec!["19880209".to_string()]);
    }

    #[test]
    fn descending_range_is_normalized() {
        let dates = resolve_dates(Some("19880211~19880209"), today()).unwrap();
        assert_eq!(dates, vec!["19880209", "19880210", "19880211"]);
    }

    #[test]
    fn range_spans_month_boundary() {
        let dates = resolve_dates(Some("19880130~19880202"), today()).unwrap();
        assert_eq!(dates, vec!["19880130", "19880131", "19880201", "19880202"]);
    }

    #[test]
    fn rejects_malformed_date() {
        let err = resolve_dates(Some("1988029"), today()).unwrap_err();
        assert!(err.to_string().contains("8 digits"));
        let err = resolve_dates(Some("1988-02-09"), today()).unwrap_err();
        assert!(err.to_string().contains("8 digits"));
    }

    #[test]
    fn rejects_impossible_calendar_date() {
        let err = resolve_dates(Some("19880230"), today()).unwrap_err();
        assert!(err.to_string().contains("Invalid calendar date"));
    }

    #[test]
    fn rejects_future_date() {
        let err = resolve_dates(Some("19880216"), today()).unwrap_err();
        assert!(err.to_string().contains("Future date specified"));
        let err = resolve_dates(Some("19880209~19880216"), today()).unwrap_err();
        assert!(err.to_string().contains("Future date specified"));
    }

    #[test]
    fn rejects_range_with_extra_delimiter() {
        let err = resolve_dates(Some("19880209~19880210~19880211"), today()).unwrap_err();
        assert!(err.to_string().contains("YYYYMMDD~YYYYMMDD"));
    }
}
