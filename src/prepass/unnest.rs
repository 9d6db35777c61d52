//! `SELECT unnest(ARRAY[…]) col` as a row source.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::TextRewrite;
use crate::error::TranslateResult;
use crate::text;

static UNNEST_ARRAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bSELECT\s+unnest\s*\(\s*ARRAY\s*\[(.*?)\]\s*\)\s+(?:AS\s+)?(\w+)").unwrap()
});

static ARRAY_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'[^']*'|"[^"]*"|\S+"#).unwrap());

/// Rewrites `SELECT unnest(ARRAY[a, b]) col` into
/// `SELECT col FROM (VALUES (a), (b)) AS t(col)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnnestArrayRewrite;

/// Array elements split on top-level commas. A body without one falls back
/// to whitespace separation, with quoted strings kept whole.
pub fn array_elements(content: &str) -> Vec<&str> {
    let parts = text::split_top_level(content, b',');
    let elements: Vec<&str> = if parts.len() > 1 {
        parts.into_iter().map(str::trim).collect()
    } else {
        ARRAY_ELEMENT
            .find_iter(content)
            .map(|m| m.as_str().trim())
            .collect()
    };
    elements
        .into_iter()
        .filter(|e| !e.is_empty() && *e != "()")
        .collect()
}

impl TextRewrite for UnnestArrayRewrite {
    fn name(&self) -> &'static str {
        "unnest-array"
    }

    fn rewrite(&self, sql: &str) -> TranslateResult<String> {
        let out = UNNEST_ARRAY.replace_all(sql, |caps: &Captures| {
            let col = &caps[2];
            let rows: Vec<String> = array_elements(&caps[1])
                .into_iter()
                .map(|e| format!("({e})"))
                .collect();
            format!("SELECT {col} FROM (VALUES {}) AS t({col})", rows.join(", "))
        });
        Ok(out.into_owned())
    }
}
