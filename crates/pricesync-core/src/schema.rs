//! Declarative shape checks for untrusted provider payloads.
//!
//! A [`PayloadSchema`] is an ordered list of `(key path, assertion)` pairs.
//! Checking a payload walks every pair and collects every violation it finds;
//! nothing short-circuits except the resolution of a single path. A payload
//! that produces an empty report can be turned into a [`ValidatedPayload`],
//! which is the only input the record transformer accepts.

use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::adapters::alphavantage::layout;
use crate::domain::{DateFormat, Symbol, MAX_VOLUME};
use crate::ValidationError;

/// Ordered sequence of nested keys identifying a value inside a payload.
///
/// Displayed as `$/Meta Data/2. Symbol`; the empty path is the root, `$`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("$")?;
        for key in &self.0 {
            write!(f, "/{key}")?;
        }
        Ok(())
    }
}

/// Outcome of looking a path up in a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Found(&'a Value),
    /// Some key along the path is absent, or a value along the way is not a
    /// mapping that could contain the next key.
    Missing,
}

pub fn resolve<'a>(payload: &'a Value, path: &KeyPath) -> Resolution<'a> {
    let mut current = payload;
    for key in path.keys() {
        match current.get(key.as_str()) {
            Some(next) => current = next,
            None => return Resolution::Missing,
        }
    }
    Resolution::Found(current)
}

/// How a numeric observation field must parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Finite, non-negative decimal.
    Decimal,
    /// Whole number written without a fraction, from zero up to
    /// [`MAX_VOLUME`].
    Integer,
}

/// A required numeric field of every time-series entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesField {
    pub key: &'static str,
    pub kind: NumberKind,
}

/// Expected layout of a date-keyed time series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesShape {
    pub date_format: DateFormat,
    pub fields: Vec<SeriesField>,
}

/// A single structural expectation about the value at a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    IsMapping,
    NonEmpty,
    /// Text that [`Symbol::parse`] accepts.
    Symbol,
    TimeSeries(SeriesShape),
}

/// Why a value failed a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationCause {
    KeyMissing,
    NotAMapping,
    Empty,
    NotText,
    InvalidSymbol { reason: String },
    InvalidDateKey { format: &'static str },
    MissingField { field: &'static str },
    NotNumeric { field: &'static str },
    NonFinite { field: &'static str },
    Negative { field: &'static str },
    NotInteger { field: &'static str },
    OutOfRange { field: &'static str, max: u64 },
}

impl Display for ViolationCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeyMissing => f.write_str("key missing"),
            Self::NotAMapping => f.write_str("value not a mapping"),
            Self::Empty => f.write_str("value empty"),
            Self::NotText => f.write_str("value not text"),
            Self::InvalidSymbol { reason } => write!(f, "invalid symbol: {reason}"),
            Self::InvalidDateKey { format } => write!(f, "not a valid date string ({format})"),
            Self::MissingField { field } => write!(f, "field '{field}' missing"),
            Self::NotNumeric { field } => write!(f, "field '{field}' is not a number"),
            Self::NonFinite { field } => write!(f, "field '{field}' is not finite"),
            Self::Negative { field } => write!(f, "field '{field}' is negative"),
            Self::NotInteger { field } => write!(f, "field '{field}' is not a whole number"),
            Self::OutOfRange { field, max } => write!(f, "field '{field}' exceeds {max}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: KeyPath,
    pub cause: ViolationCause,
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.cause)
    }
}

/// Every violation found by one check run, in the order the checks were
/// declared. Empty means the payload was accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    fn push(&mut self, path: KeyPath, cause: ViolationCause) {
        self.violations.push(Violation { path, cause });
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, violation) in self.violations.iter().enumerate() {
            if index > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

/// A payload that passed a [`PayloadSchema`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayload(Value);

impl ValidatedPayload {
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Check {
    path: KeyPath,
    assertion: Assertion,
}

/// Ordered set of structural checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadSchema {
    checks: Vec<Check>,
}

impl PayloadSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layout of a `TIME_SERIES_DAILY_ADJUSTED` response.
    pub fn alphavantage_daily() -> Self {
        Self::new()
            .mapping(KeyPath::root())
            .symbol(KeyPath::new([layout::META_DATA, layout::SYMBOL]))
            .time_series(
                KeyPath::new([layout::TIME_SERIES]),
                SeriesShape {
                    date_format: DateFormat::ISO,
                    fields: vec![
                        SeriesField {
                            key: layout::OPEN,
                            kind: NumberKind::Decimal,
                        },
                        SeriesField {
                            key: layout::CLOSE,
                            kind: NumberKind::Decimal,
                        },
                        SeriesField {
                            key: layout::VOLUME,
                            kind: NumberKind::Integer,
                        },
                    ],
                },
            )
    }

    pub fn assert(mut self, path: KeyPath, assertion: Assertion) -> Self {
        self.checks.push(Check { path, assertion });
        self
    }

    pub fn mapping(self, path: KeyPath) -> Self {
        self.assert(path, Assertion::IsMapping)
    }

    pub fn non_empty(self, path: KeyPath) -> Self {
        self.assert(path, Assertion::NonEmpty)
    }

    pub fn symbol(self, path: KeyPath) -> Self {
        self.assert(path, Assertion::Symbol)
    }

    pub fn time_series(self, path: KeyPath, shape: SeriesShape) -> Self {
        self.assert(path, Assertion::TimeSeries(shape))
    }

    /// Run every check against `payload`. Never fails; malformed input only
    /// adds violations to the report.
    pub fn check(&self, payload: &Value) -> ValidationReport {
        let mut report = ValidationReport::default();
        for check in &self.checks {
            let Resolution::Found(value) = resolve(payload, &check.path) else {
                report.push(check.path.clone(), ViolationCause::KeyMissing);
                continue;
            };

            match &check.assertion {
                Assertion::IsMapping => {
                    if !value.is_object() {
                        report.push(check.path.clone(), ViolationCause::NotAMapping);
                    }
                }
                Assertion::NonEmpty => {
                    if value_len(value) == Some(0) {
                        report.push(check.path.clone(), ViolationCause::Empty);
                    }
                }
                Assertion::Symbol => {
                    if let Err(cause) = check_symbol(value) {
                        report.push(check.path.clone(), cause);
                    }
                }
                Assertion::TimeSeries(shape) => {
                    check_series(&check.path, value, shape, &mut report);
                }
            }
        }
        report
    }

    pub fn accept(&self, payload: Value) -> Result<ValidatedPayload, ValidationReport> {
        let report = self.check(&payload);
        if report.is_empty() {
            Ok(ValidatedPayload(payload))
        } else {
            Err(report)
        }
    }
}

fn value_len(value: &Value) -> Option<usize> {
    match value {
        Value::String(text) => Some(text.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Object(entries) => Some(entries.len()),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

fn check_symbol(value: &Value) -> Result<(), ViolationCause> {
    let text = value.as_str().ok_or(ViolationCause::NotText)?;
    match Symbol::parse(text) {
        Ok(_) => Ok(()),
        Err(ValidationError::EmptySymbol) => Err(ViolationCause::Empty),
        Err(error) => Err(ViolationCause::InvalidSymbol {
            reason: error.to_string(),
        }),
    }
}

fn check_series(path: &KeyPath, value: &Value, shape: &SeriesShape, report: &mut ValidationReport) {
    let Some(entries) = value.as_object() else {
        report.push(path.clone(), ViolationCause::NotAMapping);
        return;
    };

    for (key, entry) in entries {
        let entry_path = path.child(key.as_str());
        if shape.date_format.parse(key).is_err() {
            report.push(
                entry_path.clone(),
                ViolationCause::InvalidDateKey {
                    format: shape.date_format.label(),
                },
            );
        }

        let Some(fields) = entry.as_object() else {
            report.push(entry_path, ViolationCause::NotAMapping);
            continue;
        };

        for field in &shape.fields {
            let Some(raw) = fields.get(field.key) else {
                report.push(
                    entry_path.clone(),
                    ViolationCause::MissingField { field: field.key },
                );
                continue;
            };

            let defect = match field.kind {
                NumberKind::Decimal => read_decimal(raw).err(),
                NumberKind::Integer => read_integer(raw).err(),
            };
            if let Some(defect) = defect {
                report.push(entry_path.clone(), defect.cause(field.key));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumberDefect {
    NotNumeric,
    NonFinite,
    Negative,
    NotInteger,
    OutOfRange,
}

impl NumberDefect {
    fn cause(self, field: &'static str) -> ViolationCause {
        match self {
            Self::NotNumeric => ViolationCause::NotNumeric { field },
            Self::NonFinite => ViolationCause::NonFinite { field },
            Self::Negative => ViolationCause::Negative { field },
            Self::NotInteger => ViolationCause::NotInteger { field },
            Self::OutOfRange => ViolationCause::OutOfRange {
                field,
                max: MAX_VOLUME,
            },
        }
    }
}

/// Reads a JSON number or numeric string as a finite, non-negative decimal.
pub(crate) fn read_decimal(raw: &Value) -> Result<f64, NumberDefect> {
    let value = match raw {
        Value::Number(number) => number.as_f64().ok_or(NumberDefect::NotNumeric)?,
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| NumberDefect::NotNumeric)?,
        _ => return Err(NumberDefect::NotNumeric),
    };

    if !value.is_finite() {
        return Err(NumberDefect::NonFinite);
    }
    if value < 0.0 {
        return Err(NumberDefect::Negative);
    }
    Ok(value)
}

/// Reads a JSON number or numeric string as a whole number in
/// `0..=MAX_VOLUME`. Fractional notation such as `1.0` is rejected in both
/// forms.
pub(crate) fn read_integer(raw: &Value) -> Result<u64, NumberDefect> {
    let value = match raw {
        Value::Number(number) => match number.as_u64() {
            Some(value) => value,
            None => {
                let value = number.as_f64().ok_or(NumberDefect::NotNumeric)?;
                return Err(non_integer_defect(value));
            }
        },
        Value::String(text) => {
            let text = text.trim();
            match text.parse::<u64>() {
                Ok(value) => value,
                Err(_) => {
                    let value = text.parse::<f64>().map_err(|_| NumberDefect::NotNumeric)?;
                    return Err(non_integer_defect(value));
                }
            }
        }
        _ => return Err(NumberDefect::NotNumeric),
    };

    if value > MAX_VOLUME {
        return Err(NumberDefect::OutOfRange);
    }
    Ok(value)
}

/// Classifies a number that did not parse as an unsigned integer.
fn non_integer_defect(value: f64) -> NumberDefect {
    if !value.is_finite() {
        NumberDefect::NonFinite
    } else if value < 0.0 {
        NumberDefect::Negative
    } else if value.fract() == 0.0 && value > MAX_VOLUME as f64 {
        NumberDefect::OutOfRange
    } else {
        NumberDefect::NotInteger
    }
}
