use std::fmt::{Debug, Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::ValidationError;

/// A date layout paired with the label shown to users when parsing fails.
#[derive(Clone, Copy)]
pub struct DateFormat {
    label: &'static str,
    items: &'static [BorrowedFormatItem<'static>],
}

impl DateFormat {
    /// Calendar dates as `YYYY-MM-DD`, the layout used by the provider and the API.
    pub const ISO: Self = Self {
        label: "YYYY-MM-DD",
        items: format_description!("[year]-[month]-[day]"),
    };

    pub const fn label(self) -> &'static str {
        self.label
    }

    pub fn parse(self, input: &str) -> Result<Date, ValidationError> {
        Date::parse(input, self.items).map_err(|_| ValidationError::InvalidDate {
            value: input.to_owned(),
            format: self.label,
        })
    }
}

impl Debug for DateFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DateFormat").field(&self.label).finish()
    }
}

impl PartialEq for DateFormat {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for DateFormat {}

/// Calendar date of one trading session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(Date);

impl TradingDate {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        DateFormat::ISO.parse(input).map(Self)
    }
}

impl Display for TradingDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl Serialize for TradingDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TradingDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_iso_dates() {
        let date = TradingDate::parse("2024-03-01").expect("date should parse");
        assert_eq!(date.to_string(), "2024-03-01");
    }

    #[test]
    fn orders_chronologically() {
        let earlier = TradingDate::parse("2023-12-29").expect("date");
        let later = TradingDate::parse("2024-01-02").expect("date");
        assert!(earlier < later);
    }

    #[test]
    fn rejects_impossible_and_malformed_dates() {
        for input in ["2024-02-30", "2024/03/01", "20240301", "", "yesterday"] {
            let err = TradingDate::parse(input).expect_err("must fail");
            assert!(matches!(err, ValidationError::InvalidDate { format: "YYYY-MM-DD", .. }));
        }
    }
}
