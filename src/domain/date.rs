//! Date resolution for log headers and time references
//!
//! Log headers rarely carry a full date: `15 march`, `29`, `monday` are all
//! valid and are resolved against the date of the previous header. The
//! running date is an explicit [`DateContext`] value threaded through every
//! call rather than ambient state, so resolution is a pure function.
//!
//! ## Resolution rules
//!
//! | Expression | Missing parts taken from |
//! |------------|--------------------------|
//! | `2016-03-15`, `15 march 2016` | nothing |
//! | `15 march`, `15/03` | context year |
//! | `15` | context month and year |
//! | `monday` | nearest monday on/after the context date |
//!
//! A partial date never rolls into the next year: `june 27` after a
//! `2012-06-28` context resolves to `2012-06-27`.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use chrono::format::{Item, StrftimeItems};
use thiserror::Error;

use super::lang::Lang;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("empty date expression")]
    Empty,

    #[error("unrecognised word {0:?}")]
    UnknownWord(String),

    #[error("too many numbers in {0:?}")]
    TooManyNumbers(String),

    #[error("number out of range in {0:?}")]
    OutOfRange(String),

    #[error("no such calendar date: {0}")]
    InvalidDate(String),
}

/// The running date that partial expressions are resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateContext {
    anchor: NaiveDate,
}

impl DateContext {
    /// Creates a context anchored at a date
    pub fn new(anchor: NaiveDate) -> Self {
        Self { anchor }
    }

    /// Creates a context anchored at January 1st of a year
    pub fn start_of_year(year: i32) -> Self {
        let anchor = NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default();
        Self { anchor }
    }

    /// Returns the anchor date
    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// Returns the anchor year
    pub fn year(&self) -> i32 {
        self.anchor.year()
    }
}

/// How precise a time reference is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Year,
    Month,
    Day,
}

/// A parsed, not yet resolved, date expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateExpr {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub weekday: Option<Weekday>,
}

impl DateExpr {
    /// Returns the most precise component present
    pub fn granularity(&self) -> Granularity {
        if self.day.is_some() || self.weekday.is_some() {
            Granularity::Day
        } else if self.month.is_some() {
            Granularity::Month
        } else {
            Granularity::Year
        }
    }
}

/// Resolves date expressions written in one language
#[derive(Debug, Clone, Copy, Default)]
pub struct Resolver {
    lang: Lang,
}

impl Resolver {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }

    pub fn lang(&self) -> &Lang {
        &self.lang
    }

    /// Parses an expression into its components without resolving it
    pub fn parse(&self, expr: &str) -> Result<DateExpr, DateError> {
        let tokens: Vec<&str> = expr
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '/' | '-' | '.'))
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Err(DateError::Empty);
        }

        let mut out = DateExpr::default();
        let mut numbers: Vec<&str> = Vec::new();
        let year_first = tokens[0].len() == 4 && tokens[0].bytes().all(|b| b.is_ascii_digit());

        for token in &tokens {
            let digits = strip_ordinal(token);
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                if digits.len() == 4 {
                    if out.year.is_some() {
                        return Err(DateError::TooManyNumbers(expr.to_string()));
                    }
                    out.year = digits.parse().ok();
                } else if digits.len() <= 2 {
                    numbers.push(digits);
                } else {
                    return Err(DateError::OutOfRange(expr.to_string()));
                }
            } else if let Some(month) = self.lang.month(token).filter(|_| out.month.is_none()) {
                out.month = Some(month);
            } else if let Some(weekday) = self.lang.weekday(token) {
                out.weekday = Some(weekday);
            } else {
                return Err(DateError::UnknownWord(token.to_string()));
            }
        }

        let nums: Vec<u32> = numbers.iter().filter_map(|n| n.parse().ok()).collect();
        match (out.month.is_some(), year_first, nums.as_slice()) {
            (_, _, []) => {}
            (true, _, [d]) => out.day = Some(*d),
            (false, true, [m]) => out.month = Some(*m),
            (false, true, [m, d]) => {
                out.month = Some(*m);
                out.day = Some(*d);
            }
            (false, false, [d]) => out.day = Some(*d),
            (false, false, [d, m]) => {
                out.day = Some(*d);
                out.month = Some(*m);
            }
            (false, false, [d, m, y]) if out.year.is_none() => {
                out.day = Some(*d);
                out.month = Some(*m);
                out.year = Some(2000 + *y as i32);
            }
            _ => return Err(DateError::TooManyNumbers(expr.to_string())),
        }

        if out.day.is_some_and(|d| !(1..=31).contains(&d))
            || out.month.is_some_and(|m| !(1..=12).contains(&m))
        {
            return Err(DateError::OutOfRange(expr.to_string()));
        }

        Ok(out)
    }

    /// Resolves an expression, returning the date and the updated context
    pub fn resolve(&self, expr: &str, ctx: DateContext) -> Result<(NaiveDate, DateContext), DateError> {
        let parsed = self.parse(expr)?;
        let date = complete(&parsed, ctx.anchor, expr)?;
        Ok((date, DateContext::new(date)))
    }

    /// Resolves a time reference line
    ///
    /// Components below the expression's granularity start at their
    /// minimum instead of being inherited: `2016` means 2016-01-01 and
    /// `march 2016` means 2016-03-01.
    pub fn resolve_reference(
        &self,
        expr: &str,
        ctx: DateContext,
    ) -> Result<(NaiveDate, Granularity, DateContext), DateError> {
        let mut parsed = self.parse(expr)?;
        let granularity = parsed.granularity();
        match granularity {
            Granularity::Year => {
                parsed.month = Some(1);
                parsed.day = Some(1);
            }
            Granularity::Month => parsed.day = Some(1),
            Granularity::Day => {}
        }
        let date = complete(&parsed, ctx.anchor, expr)?;
        Ok((date, granularity, DateContext::new(date)))
    }

    /// Returns true if the expression parses as a date at all
    pub fn is_date(&self, expr: &str) -> bool {
        self.parse(expr).is_ok()
    }
}

fn strip_ordinal(token: &str) -> &str {
    let lower = token.to_ascii_lowercase();
    for suffix in ["st", "nd", "rd", "th"] {
        if lower.len() > suffix.len() && lower.ends_with(suffix) {
            return &token[..token.len() - suffix.len()];
        }
    }
    token
}

fn complete(expr: &DateExpr, anchor: NaiveDate, source: &str) -> Result<NaiveDate, DateError> {
    let year = expr.year.unwrap_or(anchor.year());
    let month = expr.month.unwrap_or(anchor.month());
    let day = match expr.day {
        Some(day) => day,
        None => anchor.day().min(days_in_month(year, month)),
    };

    let mut date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| DateError::InvalidDate(source.to_string()))?;

    if let Some(weekday) = expr.weekday {
        let ahead = (7 + weekday.num_days_from_monday() as i64
            - date.weekday().num_days_from_monday() as i64)
            % 7;
        date = date
            .checked_add_days(Days::new(ahead as u64))
            .ok_or_else(|| DateError::InvalidDate(source.to_string()))?;
    }

    Ok(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// Formats a date and time with a strftime pattern
///
/// `%B`, `%b`, `%A` and `%a` use the language's names; every other
/// specifier is handed to chrono. Invalid specifiers are copied verbatim.
pub fn format_datetime(pattern: &str, value: NaiveDateTime, lang: &Lang) -> String {
    let mut out = String::new();
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('B') => out.push_str(lang.month_name(value.month())),
            Some('b') => out.push_str(lang.month_abbr(value.month())),
            Some('A') => out.push_str(lang.weekday_name(value.weekday())),
            Some('a') => out.push_str(lang.weekday_abbr(value.weekday())),
            Some(flag @ ('-' | '_' | '0')) => {
                let spec = match chars.next() {
                    Some(next) => format!("%{}{}", flag, next),
                    None => format!("%{}", flag),
                };
                push_chrono(&mut out, &spec, value);
            }
            Some(spec) => push_chrono(&mut out, &format!("%{}", spec), value),
            None => out.push('%'),
        }
    }

    out
}

fn push_chrono(out: &mut String, spec: &str, value: NaiveDateTime) {
    let items = StrftimeItems::new(spec);
    if items.clone().any(|item| matches!(item, Item::Error)) {
        out.push_str(spec);
    } else {
        out.push_str(&value.format_with_items(items).to_string());
    }
}
