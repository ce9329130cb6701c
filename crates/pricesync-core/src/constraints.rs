//! Rule checks for string request parameters.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::domain::DateFormat;

/// One check applied to a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// The value must not be empty.
    Required,
    /// The value must parse as a date in the given layout.
    DateString(DateFormat),
    /// The value must be an integer greater than zero.
    PositiveInteger,
    /// The value must not be longer than this many characters.
    MaxLength(usize),
}

impl Constraint {
    /// `Ok` when the value satisfies the rule, otherwise the message shown to
    /// the caller.
    pub fn verify(&self, value: &str) -> Result<(), String> {
        match self {
            Self::Required => {
                if value.is_empty() {
                    return Err(String::from("missing parameter"));
                }
            }
            Self::DateString(format) => {
                if format.parse(value).is_err() {
                    return Err(format!("not a valid date string ({})", format.label()));
                }
            }
            Self::PositiveInteger => {
                if !matches!(value.trim().parse::<i64>(), Ok(parsed) if parsed > 0) {
                    return Err(String::from("not a positive integer"));
                }
            }
            Self::MaxLength(max) => {
                if value.chars().count() > *max {
                    return Err(format!("cannot exceed {max} characters"));
                }
            }
        }
        Ok(())
    }
}

/// Failing messages per field. Fields keep the order they were declared in
/// and messages the order of their rules. Valid fields are absent.
///
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, Vec<String>)>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    fn push(&mut self, field: &str, messages: Vec<String>) {
        match self.0.iter_mut().find(|(name, _)| name == field) {
            Some((_, existing)) => existing.extend(messages),
            None => self.0.push((field.to_owned(), messages)),
        }
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, messages) in &self.0 {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// Named fields with the rules each must satisfy.
///
/// Built per request and consumed by [`ConstraintSet::validate`].
#[derive(Debug, Default)]
pub struct ConstraintSet<'a> {
    fields: Vec<(&'a str, &'a str, Vec<Constraint>)>,
}

impl<'a> ConstraintSet<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'a str, value: &'a str, rules: &[Constraint]) -> Self {
        self.fields.push((name, value, rules.to_vec()));
        self
    }

    /// Evaluates every rule of every field.
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        for (name, value, rules) in &self.fields {
            let messages: Vec<String> = rules
                .iter()
                .filter_map(|rule| rule.verify(value).err())
                .collect();
            if !messages.is_empty() {
                errors.push(name, messages);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_report_their_messages() {
        assert_eq!(
            Constraint::Required.verify(""),
            Err(String::from("missing parameter"))
        );
        assert_eq!(Constraint::Required.verify("IBM"), Ok(()));

        let date = Constraint::DateString(DateFormat::ISO);
        assert_eq!(date.verify("2024-03-01"), Ok(()));
        assert_eq!(
            date.verify("2024-13-01"),
            Err(String::from("not a valid date string (YYYY-MM-DD)"))
        );
        assert!(date.verify("").is_err());

        assert_eq!(Constraint::MaxLength(3).verify("IBM"), Ok(()));
        assert_eq!(
            Constraint::MaxLength(3).verify("AAPL"),
            Err(String::from("cannot exceed 3 characters"))
        );
    }

    #[test]
    fn positive_integer_accepts_only_values_above_zero() {
        let rule = Constraint::PositiveInteger;

        assert_eq!(rule.verify("5"), Ok(()));
        assert_eq!(rule.verify(" 12 "), Ok(()));
        for bad in ["0", "-3", "1.5", "five", ""] {
            assert_eq!(
                rule.verify(bad),
                Err(String::from("not a positive integer")),
                "{bad}"
            );
        }
    }

    #[test]
    fn max_length_counts_characters() {
        assert_eq!(Constraint::MaxLength(2).verify("éé"), Ok(()));
    }

    #[test]
    fn accumulates_every_failing_rule_in_order() {
        let errors = ConstraintSet::new()
            .field(
                "start_date",
                "",
                &[Constraint::Required, Constraint::DateString(DateFormat::ISO)],
            )
            .field("symbol", "IBM", &[Constraint::Required, Constraint::MaxLength(20)])
            .validate();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get("start_date"),
            Some(
                &[
                    String::from("missing parameter"),
                    String::from("not a valid date string (YYYY-MM-DD)"),
                ][..]
            )
        );
        assert_eq!(errors.get("symbol"), None);
    }

    #[test]
    fn fields_serialize_in_declaration_order() {
        let errors = ConstraintSet::new()
            .field("symbol", "", &[Constraint::Required])
            .field("end_date", "someday", &[Constraint::DateString(DateFormat::ISO)])
            .field("limit", "0", &[Constraint::PositiveInteger])
            .validate();

        assert_eq!(errors.fields().collect::<Vec<_>>(), ["symbol", "end_date", "limit"]);
        assert_eq!(
            serde_json::to_string(&errors).expect("json"),
            r#"{"symbol":["missing parameter"],"end_date":["not a valid date string (YYYY-MM-DD)"],"limit":["not a positive integer"]}"#
        );
    }

    #[test]
    fn all_valid_fields_give_an_empty_map() {
        let errors = ConstraintSet::new()
            .field("limit", "5", &[Constraint::PositiveInteger])
            .validate();

        assert!(errors.is_empty());
        assert_eq!(serde_json::to_string(&errors).expect("json"), "{}");
    }
}
