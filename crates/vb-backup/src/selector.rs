//! Label selectors and the Kubernetes label-query syntax
//!
//! `parse` follows `metav1.ParseToLabelSelector`: equality terms land in
//! `matchLabels`, everything else becomes a `matchExpressions` entry. Keys
//! and values are checked against the API server's label syntax so a bad
//! query fails here rather than at submission.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Label selector as carried in `spec.labelSelector`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Match labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    /// Match expressions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

/// A single set-based requirement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelectorRequirement {
    /// Label key
    pub key: String,
    /// Operator relating the key to the values
    pub operator: SelectorOperator,
    /// Values (empty for Exists / DoesNotExist)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Set-based selector operators
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SelectorOperator {
    /// Label value is one of `values`
    In,
    /// Label is absent or its value is not in `values`
    NotIn,
    /// Label is present
    Exists,
    /// Label is absent
    DoesNotExist,
}

impl LabelSelector {
    /// Selector with only match labels
    pub fn from_match_labels<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            match_labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            match_expressions: Vec::new(),
        }
    }

    /// True when the selector has no terms (selects everything)
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Parse a label query such as `app=web,tier in (a,b),!legacy`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut selector = Self::default();
        for term in split_terms(input)? {
            parse_term(input, term, &mut selector)?;
        }
        Ok(selector)
    }
}

impl FromStr for LabelSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Split on commas that are not inside a parenthesized value set
fn split_terms(input: &str) -> Result<Vec<&str>> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::invalid_selector(input, "unbalanced ')'"))?;
            }
            ',' if depth == 0 => {
                terms.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(Error::invalid_selector(input, "unterminated value set"));
    }
    terms.push(&input[start..]);

    let terms: Vec<&str> = terms.into_iter().map(str::trim).collect();
    if terms.len() == 1 && terms[0].is_empty() {
        return Ok(Vec::new());
    }
    if terms.iter().any(|t| t.is_empty()) {
        return Err(Error::invalid_selector(input, "empty requirement"));
    }
    Ok(terms)
}

fn parse_term(input: &str, term: &str, selector: &mut LabelSelector) -> Result<()> {
    if let Some(key) = term.strip_prefix('!') {
        let key = validate_key(input, key.trim())?;
        selector
            .match_expressions
            .push(requirement(key, SelectorOperator::DoesNotExist, Vec::new()));
        return Ok(());
    }

    if let Some((key, value)) = term.split_once("!=") {
        let key = validate_key(input, key.trim())?;
        let value = validate_value(input, value.trim())?;
        selector
            .match_expressions
            .push(requirement(key, SelectorOperator::NotIn, vec![value]));
        return Ok(());
    }

    if let Some((key, value)) = term.split_once('=') {
        let value = value.strip_prefix('=').unwrap_or(value);
        let key = validate_key(input, key.trim())?;
        let value = validate_value(input, value.trim())?;
        selector.match_labels.insert(key, value);
        return Ok(());
    }

    if term.contains('<') || term.contains('>') {
        return Err(Error::invalid_selector(
            input,
            "numeric comparisons are not supported in label selectors",
        ));
    }

    if let Some(open) = term.find('(') {
        let head: Vec<&str> = term[..open].split_whitespace().collect();
        let close = term
            .rfind(')')
            .filter(|close| *close == term.len() - 1)
            .ok_or_else(|| Error::invalid_selector(input, format!("malformed term {:?}", term)))?;
        let (key, operator) = match head.as_slice() {
            [key, "in"] => (*key, SelectorOperator::In),
            [key, "notin"] => (*key, SelectorOperator::NotIn),
            _ => {
                return Err(Error::invalid_selector(
                    input,
                    format!("expected 'in' or 'notin' in {:?}", term),
                ))
            }
        };
        let key = validate_key(input, key)?;
        let values = term[open + 1..close]
            .split(',')
            .map(|v| validate_value(input, v.trim()))
            .collect::<Result<Vec<_>>>()?;
        if values.iter().all(String::is_empty) {
            return Err(Error::invalid_selector(
                input,
                format!("empty value set for {:?}", key),
            ));
        }
        selector
            .match_expressions
            .push(requirement(key, operator, values));
        return Ok(());
    }

    if term.split_whitespace().count() != 1 {
        return Err(Error::invalid_selector(
            input,
            format!("malformed term {:?}", term),
        ));
    }
    let key = validate_key(input, term)?;
    selector
        .match_expressions
        .push(requirement(key, SelectorOperator::Exists, Vec::new()));
    Ok(())
}

fn requirement(
    key: String,
    operator: SelectorOperator,
    values: Vec<String>,
) -> LabelSelectorRequirement {
    LabelSelectorRequirement {
        key,
        operator,
        values,
    }
}

/// Longest label name or value
const MAX_LABEL_NAME_LEN: usize = 63;

const LABEL_NAME_RULE: &str =
    "at most 63 characters of [A-Za-z0-9-_.], starting and ending with an alphanumeric";
/// Longest DNS subdomain allowed as a key prefix
const MAX_KEY_PREFIX_LEN: usize = 253;

/// Keys are qualified names: an optional DNS subdomain prefix and `/`, then
/// a label name.
fn validate_key(input: &str, key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(Error::invalid_selector(input, "empty label key"));
    }
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix {
        if !is_dns_subdomain(prefix) {
            return Err(Error::invalid_selector(
                input,
                format!("invalid label key {:?}: prefix is not a DNS subdomain", key),
            ));
        }
    }
    if !is_label_name(name) {
        return Err(Error::invalid_selector(
            input,
            format!("invalid label key {:?}: {}", key, LABEL_NAME_RULE),
        ));
    }
    Ok(key.to_string())
}

/// Values are empty or follow the label-name rules.
fn validate_value(input: &str, value: &str) -> Result<String> {
    if !value.is_empty() && !is_label_name(value) {
        return Err(Error::invalid_selector(
            input,
            format!("invalid label value {:?}: {}", value, LABEL_NAME_RULE),
        ));
    }
    Ok(value.to_string())
}

fn is_label_name(s: &str) -> bool {
    s.len() <= MAX_LABEL_NAME_LEN
        && starts_and_ends_with(s, |c| c.is_ascii_alphanumeric())
        && s
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'_' | b'.'))
}

fn is_dns_subdomain(s: &str) -> bool {
    s.len() <= MAX_KEY_PREFIX_LEN
        && s.split('.').all(|part| {
            part.len() <= MAX_LABEL_NAME_LEN
                && starts_and_ends_with(part, is_lower_alphanumeric)
                && part.bytes().all(|c| is_lower_alphanumeric(c) || c == b'-')
        })
}

fn is_lower_alphanumeric(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn starts_and_ends_with(s: &str, pred: impl Fn(u8) -> bool) -> bool {
    match (s.bytes().next(), s.bytes().last()) {
        (Some(first), Some(last)) => pred(first) && pred(last),
        _ => false,
    }
}
