//! Ideal-customer-profile qualification.
//!
//! A row qualifies under one of three interchangeable configurations: a flag
//! column, a numeric threshold, or an AND-combined list of column rules.
//! [`IcpConfig::compile`] resolves column names once; the resulting
//! [`IcpEvaluator`] is the per-row primitive the KPI engine calls.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{
    data::{Value, parse_number},
    error::UnknownColumn,
    normalize::{NormalizedDataset, NormalizedRow},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Equals,
    Contains,
    In,
    Greater,
    Less,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl Literal {
    fn as_text(&self) -> String {
        match self {
            Literal::Boolean(b) => b.to_string(),
            Literal::Number(n) => crate::data::format_number(*n),
            Literal::Text(s) => s.clone(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(*n),
            Literal::Text(s) => parse_number(s),
            Literal::Boolean(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Many(Vec<Literal>),
    One(Literal),
}

impl RuleValue {
    fn literals(&self) -> &[Literal] {
        match self {
            RuleValue::Many(values) => values,
            RuleValue::One(value) => std::slice::from_ref(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcpRule {
    pub column: String,
    pub operator: RuleOperator,
    pub value: RuleValue,
}

/// Rule operators as written, matched case-insensitively.
const OPERATORS: [(&str, RuleOperator); 5] = [
    ("=", RuleOperator::Equals),
    (">", RuleOperator::Greater),
    ("<", RuleOperator::Less),
    (" contains ", RuleOperator::Contains),
    (" in ", RuleOperator::In),
];

impl IcpRule {
    /// Parses `column <op> value` where op is one of `=`, `>`, `<`,
    /// `contains`, or `in` (comma-separated list, optionally bracketed).
    ///
    /// The rule splits at the first operator after the column name, so values
    /// may contain operator words. A quoted column name may contain them too.
    pub fn parse(spec: &str) -> Result<Self> {
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Empty ICP rule"));
        }

        let search_from = quoted_prefix_len(trimmed);
        let lowered = trimmed.to_ascii_lowercase();
        let (idx, needle, operator) = OPERATORS
            .iter()
            .filter_map(|(needle, operator)| {
                lowered[search_from..]
                    .find(needle)
                    .map(|idx| (search_from + idx, *needle, *operator))
            })
            .min_by_key(|(idx, _, _)| *idx)
            .ok_or_else(|| anyhow!("Failed to parse ICP rule '{trimmed}'"))?;

        if let Some(compound) = compound_operator(trimmed, idx, needle) {
            return Err(anyhow!(
                "Operator '{compound}' is not supported in ICP rule '{trimmed}'; use =, >, <, contains or in"
            ));
        }

        let column = trimmed[..idx].trim();
        let right = trimmed[idx + needle.len()..].trim();
        let value = match operator {
            RuleOperator::In => RuleValue::Many(
                right
                    .trim_start_matches('[')
                    .trim_end_matches(']')
                    .split(',')
                    .map(|item| parse_literal(unquote(item.trim())))
                    .collect(),
            ),
            RuleOperator::Contains => RuleValue::One(Literal::Text(unquote(right).to_string())),
            _ => RuleValue::One(parse_literal(unquote(right))),
        };
        build_rule(column, operator, value)
    }

    fn matches(&self, cell: Option<&Value>) -> bool {
        let Some(cell) = cell else {
            return false;
        };
        let literals = self.value.literals();
        match self.operator {
            RuleOperator::Equals | RuleOperator::In => {
                literals.iter().any(|literal| values_equal(cell, literal))
            }
            RuleOperator::Contains => {
                let haystack = cell.as_display().to_lowercase();
                literals
                    .iter()
                    .any(|literal| haystack.contains(&literal.as_text().to_lowercase()))
            }
            RuleOperator::Greater | RuleOperator::Less => {
                let Some(actual) = cell_number(cell) else {
                    return false;
                };
                literals.iter().filter_map(Literal::as_number).any(|bound| {
                    if self.operator == RuleOperator::Greater {
                        actual > bound
                    } else {
                        actual < bound
                    }
                })
            }
        }
    }
}

fn build_rule(column: &str, operator: RuleOperator, value: RuleValue) -> Result<IcpRule> {
    if column.is_empty() {
        return Err(anyhow!("ICP rule is missing a column name"));
    }
    Ok(IcpRule {
        column: unquote(column).to_string(),
        operator,
        value,
    })
}

/// Length of a leading quoted column name, quotes included; 0 when unquoted.
fn quoted_prefix_len(spec: &str) -> usize {
    let Some(quote) = spec.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return 0;
    };
    spec[1..].find(quote).map_or(0, |end| end + 2)
}

/// `>=`, `<=`, `!=` and friends: a symbol operator glued to another symbol.
fn compound_operator(spec: &str, idx: usize, needle: &str) -> Option<String> {
    if needle.starts_with(' ') {
        return None;
    }
    let before = spec[..idx].chars().next_back();
    let after = spec[idx + needle.len()..].chars().next();
    match (before, after) {
        (Some('!'), _) => Some(format!("!{needle}")),
        (_, Some(next @ ('=' | '<' | '>'))) => Some(format!("{needle}{next}")),
        _ => None,
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn parse_literal(raw: &str) -> Literal {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Literal::Boolean(true),
        "false" => Literal::Boolean(false),
        _ => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Literal::Number)
            .unwrap_or_else(|| Literal::Text(raw.to_string())),
    }
}

fn cell_number(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => Some(*n),
        Value::Text(s) => parse_number(s),
        _ => None,
    }
}

fn values_equal(cell: &Value, literal: &Literal) -> bool {
    match (cell, literal) {
        (Value::Boolean(actual), Literal::Boolean(expected)) => actual == expected,
        (_, Literal::Number(expected)) => cell_number(cell).is_some_and(|n| n == *expected),
        _ => cell
            .as_display()
            .trim()
            .eq_ignore_ascii_case(literal.as_text().trim()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum IcpConfig {
    /// The column's truthiness is the qualification.
    Flag { column: String },
    /// Qualifies when the numeric column is at least `min`.
    Threshold { column: String, min: f64 },
    /// Every rule must hold.
    Rules { rules: Vec<IcpRule> },
}

impl IcpConfig {
    pub fn compile(&self, dataset: &NormalizedDataset) -> Result<IcpEvaluator, UnknownColumn> {
        let compiled = match self {
            IcpConfig::Flag { column } => CompiledIcp::Flag(dataset.require_field(column)?),
            IcpConfig::Threshold { column, min } => {
                CompiledIcp::Threshold(dataset.require_field(column)?, *min)
            }
            IcpConfig::Rules { rules } => CompiledIcp::Rules(
                rules
                    .iter()
                    .map(|rule| Ok((dataset.require_field(&rule.column)?, rule.clone())))
                    .collect::<Result<Vec<_>, UnknownColumn>>()?,
            ),
        };
        Ok(IcpEvaluator { compiled })
    }
}

#[derive(Debug, Clone)]
enum CompiledIcp {
    Flag(usize),
    Threshold(usize, f64),
    Rules(Vec<(usize, IcpRule)>),
}

#[derive(Debug, Clone)]
pub struct IcpEvaluator {
    compiled: CompiledIcp,
}

impl IcpEvaluator {
    pub fn qualifies(&self, row: &NormalizedRow) -> bool {
        match &self.compiled {
            CompiledIcp::Flag(idx) => row.get(*idx).is_some_and(Value::is_truthy),
            CompiledIcp::Threshold(idx, min) => {
                row.get(*idx).and_then(cell_number).is_some_and(|n| n >= *min)
            }
            CompiledIcp::Rules(rules) => rules.iter().all(|(idx, rule)| rule.matches(row.get(*idx))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rule_recognises_operators() {
        let rule = IcpRule::parse("Tier = A").unwrap();
        assert_eq!(rule.column, "Tier");
        assert_eq!(rule.operator, RuleOperator::Equals);
        assert_eq!(rule.value, RuleValue::One(Literal::Text("A".into())));

        let rule = IcpRule::parse("Employees > 50").unwrap();
        assert_eq!(rule.operator, RuleOperator::Greater);
        assert_eq!(rule.value, RuleValue::One(Literal::Number(50.0)));

        let rule = IcpRule::parse("Industry contains 'fashion'").unwrap();
        assert_eq!(rule.operator, RuleOperator::Contains);
        assert_eq!(rule.value, RuleValue::One(Literal::Text("fashion".into())));

        let rule = IcpRule::parse("State in [CA, NY]").unwrap();
        assert_eq!(rule.operator, RuleOperator::In);
        assert_eq!(
            rule.value,
            RuleValue::Many(vec![Literal::Text("CA".into()), Literal::Text("NY".into())])
        );

        assert!(IcpRule::parse("no operator here").is_err());
        assert!(IcpRule::parse("= 5").is_err());
    }

    #[test]
    fn parse_rule_splits_at_the_first_operator() {
        let rule = IcpRule::parse("Notes = stuck in traffic").unwrap();
        assert_eq!(rule.column, "Notes");
        assert_eq!(rule.operator, RuleOperator::Equals);
        assert_eq!(rule.value, RuleValue::One(Literal::Text("stuck in traffic".into())));

        let rule = IcpRule::parse("Pitch contains a = b").unwrap();
        assert_eq!(rule.column, "Pitch");
        assert_eq!(rule.operator, RuleOperator::Contains);
        assert_eq!(rule.value, RuleValue::One(Literal::Text("a = b".into())));

        let rule = IcpRule::parse("'Based in' = Austin").unwrap();
        assert_eq!(rule.column, "Based in");
        assert_eq!(rule.operator, RuleOperator::Equals);

        let rule = IcpRule::parse("Region IN West, South").unwrap();
        assert_eq!(rule.column, "Region");
        assert_eq!(rule.operator, RuleOperator::In);
    }

    #[test]
    fn parse_rule_rejects_compound_comparisons() {
        for (spec, operator) in [
            ("Score >= 80", ">="),
            ("Score <= 80", "<="),
            ("Tier != A", "!="),
            ("Tier == A", "=="),
        ] {
            let message = IcpRule::parse(spec).unwrap_err().to_string();
            assert!(
                message.contains(&format!("Operator '{operator}' is not supported")),
                "{spec}: {message}"
            );
        }
    }

    #[test]
    fn rule_matching_semantics() {
        let equals = IcpRule::parse("Tier = a").unwrap();
        assert!(equals.matches(Some(&Value::Text("A".into()))));
        assert!(!equals.matches(None));

        let greater = IcpRule::parse("Score > 70").unwrap();
        assert!(greater.matches(Some(&Value::Number(71.0))));
        assert!(!greater.matches(Some(&Value::Number(70.0))));
        assert!(!greater.matches(Some(&Value::Text("high".into()))));

        let less = IcpRule::parse("Score < 10").unwrap();
        assert!(less.matches(Some(&Value::Text("$9".into()))));

        let within = IcpRule::parse("Size in [1, 2]").unwrap();
        assert!(within.matches(Some(&Value::Number(2.0))));
        assert!(!within.matches(Some(&Value::Number(3.0))));

        let contains = IcpRule::parse("Name contains corp").unwrap();
        assert!(contains.matches(Some(&Value::Text("MegaCorp LLC".into()))));
    }

    #[test]
    fn config_deserializes_from_yaml() {
        let yaml = r#"
mode: rules
rules:
  - column: Tier
    operator: in
    value: [A, B]
  - column: Employees
    operator: greater
    value: 10
"#;
        let config: IcpConfig = serde_yaml::from_str(yaml).unwrap();
        let IcpConfig::Rules { rules } = config else {
            panic!("expected rules mode");
        };
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].value, RuleValue::One(Literal::Number(10.0)));
    }
}
