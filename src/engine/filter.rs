//! Package filter evaluation

use std::borrow::Cow;

use serde_json::Value;

use crate::policy::{FieldMatch, Filter};
use crate::types::{Package, value_text};

/// Does `package` pass `filter`?
///
/// A package missing the field never matches. A filter with no values, or an
/// `any_of` with no nested filters, matches nothing.
pub fn matches(package: &Package, filter: &Filter) -> bool {
    match filter {
        Filter::Substring(m) => field_matches(package, m, |text, value| text.contains(value)),
        Filter::Allowlist(m) => field_matches(package, m, |text, value| text == value),
        Filter::FieldIn(m) => field_in(package, m),
        Filter::AnyOf(any) => any.filters.iter().any(|nested| matches(package, nested)),
    }
}

/// `matches` for an optional filter; no filter passes everything
pub fn passes(package: &Package, filter: Option<&Filter>) -> bool {
    filter.is_none_or(|f| matches(package, f))
}

fn field_matches<F>(package: &Package, m: &FieldMatch, test: F) -> bool
where
    F: Fn(&str, &str) -> bool,
{
    let Some(text) = package.field_text(&m.field) else {
        return false;
    };
    let text = fold(&text, m.case_sensitive);
    m.values
        .iter()
        .any(|value| test(&text, &fold(value, m.case_sensitive)))
}

fn field_in(package: &Package, m: &FieldMatch) -> bool {
    match package.get(&m.field) {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(value_text)
            .any(|text| is_allowed(&text, m)),
        Some(other) => value_text(other).is_some_and(|text| is_allowed(&text, m)),
    }
}

fn is_allowed(text: &str, m: &FieldMatch) -> bool {
    let text = fold(text, m.case_sensitive);
    m.values
        .iter()
        .any(|value| text == fold(value, m.case_sensitive))
}

fn fold(text: &str, case_sensitive: bool) -> Cow<'_, str> {
    if case_sensitive {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.to_lowercase())
    }
}
