//! Template variables, permutation expansion, and placeholder substitution.
//!
//! Install scripts reference downloads through `${name}` placeholder tokens.
//! A [`Variable`] declares the alternative values one token may take; the
//! permutation engine expands a set of variables into every complete
//! assignment so each combination can be downloaded and named separately.

use crate::error::{Result, StoreError};
use regex::Regex;
use std::sync::LazyLock;

/// CLI variable grammar: `${name}=value1,value2,...`
static ASSIGNMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\{(.+?)\}=(.+)$").unwrap());

/// A named template variable with its ordered, non-empty alternatives.
///
/// Alternative order is significant: it fixes the enumeration order of
/// permutations and therefore the order files are downloaded and named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    name: String,
    alternatives: Vec<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, alternatives: Vec<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(StoreError::InvalidVariable(
                "variable name must not be empty".to_string(),
            ));
        }
        if alternatives.is_empty() || alternatives.iter().any(String::is_empty) {
            return Err(StoreError::InvalidVariable(format!(
                "variable '{name}' must declare at least one non-empty value"
            )));
        }
        Ok(Self { name, alternatives })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// The literal placeholder token, e.g. `${arch}`.
    pub fn token(&self) -> String {
        format!("${{{}}}", self.name)
    }

    pub fn is_single_valued(&self) -> bool {
        self.alternatives.len() == 1
    }
}

/// One concrete choice for one variable within a permutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: String,
}

/// Parse one command-line variable assignment like `${arch}=x86,x64`.
pub fn parse_assignment(expression: &str) -> Result<Variable> {
    let captures = ASSIGNMENT_RE.captures(expression).ok_or_else(|| {
        StoreError::InvalidVariable(format!(
            "expected ${{name}}=value1,value2 but got '{expression}'"
        ))
    })?;

    let name = captures[1].to_string();
    let alternatives: Vec<String> = captures[2].split(',').map(str::to_string).collect();
    Variable::new(name, alternatives)
}

/// Every complete assignment of values to `variables`, as a cartesian
/// product. The first variable varies slowest and alternatives keep their
/// declared order, so the result is deterministic for a given input order.
/// An empty input yields exactly one empty permutation.
pub fn permutations(variables: &[Variable]) -> Vec<Vec<Binding>> {
    match variables.split_first() {
        None => vec![Vec::new()],
        Some((first, rest)) => {
            let tails = permutations(rest);
            let mut result = Vec::with_capacity(first.alternatives.len() * tails.len());
            for value in &first.alternatives {
                for tail in &tails {
                    let mut permutation = Vec::with_capacity(tail.len() + 1);
                    permutation.push(Binding {
                        name: first.name.clone(),
                        value: value.clone(),
                    });
                    permutation.extend(tail.iter().cloned());
                    result.push(permutation);
                }
            }
            result
        }
    }
}

/// Replace every `${name}` occurrence in `text` with `value`.
pub fn resolve_variable(text: &str, name: &str, value: &str) -> String {
    text.replace(&format!("${{{name}}}"), value)
}

/// Apply one permutation's bindings to `text`, one variable at a time.
pub fn apply_bindings(text: &str, bindings: &[Binding]) -> String {
    bindings.iter().fold(text.to_string(), |text, binding| {
        resolve_variable(&text, &binding.name, &binding.value)
    })
}

/// Substitute every single-valued variable directly into `text` and return
/// the rewritten text together with the variables that still have multiple
/// alternatives. Runs once before permutation so the permutation space only
/// spans genuinely ambiguous variables.
pub fn collapse_single_valued(text: &str, variables: &[Variable]) -> (String, Vec<Variable>) {
    let mut text = text.to_string();
    let mut remaining = Vec::new();

    for variable in variables {
        if variable.is_single_valued() {
            text = resolve_variable(&text, &variable.name, &variable.alternatives[0]);
        } else {
            remaining.push(variable.clone());
        }
    }

    (text, remaining)
}

/// File name prefix built from placeholder tokens, e.g. `${arch}_${lang}_`.
///
/// Cached files carry this prefix so the rewritten script still selects the
/// right variant through Chocolatey's own variable substitution at install
/// time.
pub fn placeholder_prefix<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .fold(String::new(), |prefix, name| format!("{prefix}${{{name}}}_"))
}
