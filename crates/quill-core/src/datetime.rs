//! Timestamp rendering.
//!
//! Two renderings exist: a UTC form that is byte-identical wherever it is
//! produced, and a locale-aware form in the host's timezone. Both return an
//! empty string for absent or unparsable input and never fail.

use std::fmt;

use chrono::{DateTime, Local, Locale, NaiveDate, NaiveDateTime, TimeZone, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Values that can be read as a point in time.
///
/// Strings are ISO 8601 (offset-less forms are read as UTC), integers are
/// epoch milliseconds.
pub trait Timestamp {
    fn to_utc(&self) -> Option<DateTime<Utc>>;
}

impl Timestamp for str {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        let s = self.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .map(|naive| naive.and_utc())
    }
}

impl Timestamp for String {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        self.as_str().to_utc()
    }
}

impl Timestamp for i64 {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(*self)
    }
}

impl<Tz: TimeZone> Timestamp for DateTime<Tz> {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        Some(self.with_timezone(&Utc))
    }
}

impl<T: Timestamp + ?Sized> Timestamp for &T {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        (**self).to_utc()
    }
}

impl<T: Timestamp> Timestamp for Option<T> {
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        self.as_ref()?.to_utc()
    }
}

/// Formats as `YYYY-MM-DD HH:MM UTC`, independent of host timezone and locale.
pub fn format_date_utc<T: Timestamp + ?Sized>(value: &T) -> String {
    value
        .to_utc()
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default()
}

/// Formats in the host timezone and locale (medium date, short time).
pub fn format_date_local<T: Timestamp + ?Sized>(value: &T) -> String {
    format_date_in(value, &Local, DisplayLocale::detect())
}

/// Formats in `tz` using `locale`'s medium date and short time style.
pub fn format_date_in<T, Tz>(value: &T, tz: &Tz, locale: DisplayLocale) -> String
where
    T: Timestamp + ?Sized,
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    value
        .to_utc()
        .map(|dt| {
            dt.with_timezone(tz)
                .format_localized(locale.pattern, locale.locale)
                .to_string()
        })
        .unwrap_or_default()
}

/// Locale used for human-facing timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLocale {
    locale: Locale,
    pattern: &'static str,
}

impl Default for DisplayLocale {
    fn default() -> Self {
        Self::english(Locale::en_US)
    }
}

impl DisplayLocale {
    const ENGLISH_PATTERN: &str = "%b %-d, %Y, %-I:%M %p";
    const DAY_FIRST_PATTERN: &str = "%-d %b %Y, %H:%M";

    fn english(locale: Locale) -> Self {
        Self {
            locale,
            pattern: Self::ENGLISH_PATTERN,
        }
    }

    /// Parses a POSIX locale name such as `fr_FR.UTF-8` or `de_DE@euro`.
    ///
    /// Unknown names fall back to `en_US`.
    pub fn from_name(name: &str) -> Self {
        let base = name
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();
        if base.is_empty() || base == "C" || base == "POSIX" {
            return Self::default();
        }

        match Locale::try_from(base) {
            Ok(locale) if base.starts_with("en") => Self::english(locale),
            Ok(locale) => Self {
                locale,
                pattern: Self::DAY_FIRST_PATTERN,
            },
            Err(_) => Self::default(),
        }
    }

    /// Reads the locale from `LC_ALL`, `LC_TIME` or `LANG`, in that order.
    pub fn detect() -> Self {
        ["LC_ALL", "LC_TIME", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .map(|value| Self::from_name(&value))
            .unwrap_or_default()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

/// Timestamp label that starts in its stable UTC form and can be refined to
/// the local rendering once, when running interactively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLabel {
    instant: Option<DateTime<Utc>>,
    text: String,
    localized: bool,
}

impl TimeLabel {
    pub fn new<T: Timestamp + ?Sized>(value: &T) -> Self {
        let instant = value.to_utc();
        Self {
            instant,
            text: format_date_utc(&instant),
            localized: false,
        }
    }

    /// Swaps to the local rendering. Repeated calls are no-ops.
    pub fn localize(&mut self) {
        self.localize_with(&Local, DisplayLocale::detect());
    }

    pub fn localize_with<Tz>(&mut self, tz: &Tz, locale: DisplayLocale)
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        if self.localized {
            return;
        }
        self.text = format_date_in(&self.instant, tz, locale);
        self.localized = true;
    }

    pub fn is_localized(&self) -> bool {
        self.localized
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for TimeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
