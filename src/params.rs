//! Bound parameters collected while a query is compiled.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ast::{Value, Var};
use crate::error::{QueryError, QueryResult};
use crate::parser::is_identifier;

/// Prefix of every generated parameter name.
pub const PARAM_PREFIX: &str = "@param_";

/// `dd-MMM-yyyy`, the literal form accepted by `convert(datetime, ..., 106)`.
pub const DATE_FORMAT: &str = "%d-%b-%Y";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Declared database type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    BigInt,
    Decimal,
    NChar,
    NVarChar,
    DateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    pub name: String,
    /// Value already formatted for the script (dates as `dd-MMM-yyyy`).
    pub value: String,
    pub kind: ParamKind,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }
}

/// Text of a float as SQL accepts it. NaN and infinities have no literal form.
pub fn format_float(n: f64) -> QueryResult<String> {
    if n.is_finite() {
        Ok(n.to_string())
    } else {
        Err(QueryError::InvalidValue(format!(
            "{} cannot be written as a SQL number",
            n
        )))
    }
}

/// Kind and formatted text for a scalar value.
pub fn classify(value: &Value) -> QueryResult<(ParamKind, String)> {
    match value {
        Value::Int(n) => Ok((ParamKind::BigInt, n.to_string())),
        Value::Float(n) => Ok((ParamKind::Decimal, format_float(*n)?)),
        Value::Char(c) => Ok((ParamKind::NChar, c.to_string())),
        Value::Text(s) => Ok((ParamKind::NVarChar, s.clone())),
        Value::Date(d) => Ok((ParamKind::DateTime, format_date(*d))),
        other => Err(QueryError::not_implemented(format!(
            "a {} value cannot be bound as a parameter",
            other.kind_name()
        ))),
    }
}

/// Ordered parameter registry. Names are unique; the first value bound
/// under a name wins.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    params: Vec<Parameter>,
    /// Indices of parameters generated for literals, reusable by value.
    generated: Vec<usize>,
    value_counter: usize,
    date_counter: usize,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Returns `false` (and changes nothing) when the
    /// name is already taken.
    pub fn add(&mut self, param: Parameter) -> bool {
        if let Some(existing) = self.get(&param.name) {
            if existing != &param {
                tracing::warn!(
                    name = %param.name,
                    kept = %existing.value,
                    ignored = %param.value,
                    "parameter already bound with a different value"
                );
            }
            return false;
        }
        tracing::trace!(name = %param.name, kind = ?param.kind, "bound parameter");
        self.params.push(param);
        true
    }

    /// Bind a captured variable as `@param_<name>`.
    pub fn bind_captured(&mut self, var: &Var) -> QueryResult<String> {
        if !is_identifier(&var.name) {
            return Err(QueryError::InvalidValue(format!(
                "'{}' cannot be used as a parameter name",
                var.name
            )));
        }
        let (kind, value) = classify(&var.value)?;
        let name = format!("{}{}", PARAM_PREFIX, var.name);
        if self.is_generated(&name) {
            return Err(QueryError::usage(format!(
                "variable '{}' collides with the generated parameter {}; rename the variable",
                var.name, name
            )));
        }
        self.add(Parameter::new(name.clone(), value, kind));
        Ok(name)
    }

    /// Bind a text or char literal, reusing an earlier generated parameter
    /// holding the same value.
    pub fn bind_literal(&mut self, value: &Value) -> QueryResult<String> {
        let (kind, text) = classify(value)?;
        if let Some(name) = self.reuse(kind, &text) {
            return Ok(name);
        }
        let name = self.fresh_name(kind == ParamKind::DateTime);
        self.generated.push(self.params.len());
        self.add(Parameter::new(name.clone(), text, kind));
        Ok(name)
    }

    pub fn bind_date(&mut self, date: NaiveDate) -> QueryResult<String> {
        self.bind_literal(&Value::Date(date))
    }

    fn is_generated(&self, name: &str) -> bool {
        self.generated.iter().any(|&i| self.params[i].name == name)
    }

    fn reuse(&self, kind: ParamKind, text: &str) -> Option<String> {
        self.generated
            .iter()
            .map(|&i| &self.params[i])
            .find(|p| p.kind == kind && p.value == text)
            .map(|p| p.name.clone())
    }

    /// `@param_value_<n>` or `@param_date_<n>`, skipping names a captured
    /// variable already took.
    fn fresh_name(&mut self, date: bool) -> String {
        loop {
            let (stem, counter) = if date {
                ("date", &mut self.date_counter)
            } else {
                ("value", &mut self.value_counter)
            };
            *counter += 1;
            let name = format!("{}{}_{}", PARAM_PREFIX, stem, counter);
            if self.get(&name).is_none() {
                return name;
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_vec(self) -> Vec<Parameter> {
        self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_format() {
        let d = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(format_date(d), "01-Jan-2000");
    }

    #[test]
    fn test_first_name_wins() {
        let mut table = ParameterTable::new();
        assert!(table.add(Parameter::new("@param_x", "1", ParamKind::BigInt)));
        assert!(!table.add(Parameter::new("@param_x", "2", ParamKind::BigInt)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("@param_x").unwrap().value, "1");
    }

    #[test]
    fn test_captured_kinds() {
        let mut table = ParameterTable::new();
        assert_eq!(
            table.bind_captured(&Var::new("age", 22)).unwrap(),
            "@param_age"
        );
        table.bind_captured(&Var::new("grade", 'A')).unwrap();
        table.bind_captured(&Var::new("name", "Oxford")).unwrap();
        let kinds: Vec<_> = table.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![ParamKind::BigInt, ParamKind::NChar, ParamKind::NVarChar]
        );
    }

    #[test]
    fn test_captured_bool_not_implemented() {
        let mut table = ParameterTable::new();
        let err = table.bind_captured(&Var::new("flag", true)).unwrap_err();
        assert!(err.is_not_implemented());
    }

    #[test]
    fn test_bad_variable_name() {
        let mut table = ParameterTable::new();
        assert!(matches!(
            table.bind_captured(&Var::new("first name", "x")),
            Err(QueryError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_literals_numbered_and_reused() {
        let mut table = ParameterTable::new();
        let a = table.bind_literal(&Value::from("Steve")).unwrap();
        let b = table.bind_literal(&Value::from("Bob")).unwrap();
        let c = table.bind_literal(&Value::from("Steve")).unwrap();
        let d = table
            .bind_date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
            .unwrap();
        assert_eq!(a, "@param_value_1");
        assert_eq!(b, "@param_value_2");
        assert_eq!(c, a);
        assert_eq!(d, "@param_date_1");
        assert_eq!(table.get(&d).unwrap().value, "01-Jan-2000");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_generated_name_skips_captured() {
        let mut table = ParameterTable::new();
        table.bind_captured(&Var::new("value_1", "taken")).unwrap();
        let name = table.bind_literal(&Value::from("fresh")).unwrap();
        assert_eq!(name, "@param_value_2");
        assert_eq!(table.bind_literal(&Value::from("taken")).unwrap(), "@param_value_3");
    }

    #[test]
    fn test_captured_name_cannot_shadow_generated() {
        let mut table = ParameterTable::new();
        assert_eq!(table.bind_literal(&Value::from("Steve")).unwrap(), "@param_value_1");
        let err = table.bind_captured(&Var::new("value_1", "Bob")).unwrap_err();
        assert!(matches!(err, QueryError::Usage(_)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("@param_value_1").unwrap().value, "Steve");

        // the same name bound by two captures keeps the first value
        table.bind_captured(&Var::new("age", 12)).unwrap();
        assert_eq!(table.bind_captured(&Var::new("age", 13)).unwrap(), "@param_age");
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        assert_eq!(format_float(2.5).unwrap(), "2.5");
        for n in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(format_float(n), Err(QueryError::InvalidValue(_))));
            assert!(matches!(classify(&Value::Float(n)), Err(QueryError::InvalidValue(_))));
        }
        let mut table = ParameterTable::new();
        assert!(table.bind_captured(&Var::new("ratio", f64::NAN)).is_err());
        assert!(table.is_empty());
    }
}
