//! `FROM generate_series(…) [AS] alias[(col)]` as a table expression.

use std::sync::LazyLock;

use regex::Regex;

use super::TextRewrite;
use crate::error::TranslateResult;
use crate::series::{DEFAULT_ALIAS, DEFAULT_COLUMN, SeriesPlan};
use crate::text::{self, Region};

static FROM_SERIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFROM\s+generate_series\s*\(").unwrap());

static SERIES_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(AS\s+)?([A-Za-z_]\w*)(?:\s*\(\s*([A-Za-z_]\w*)\s*\))?").unwrap()
});

/// Words that may follow a table expression without being its alias.
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "join", "left", "right", "inner", "full", "cross", "natural", "on", "using", "group",
    "order", "limit", "offset", "fetch", "having", "window", "union", "intersect", "except",
    "lateral",
];

/// Replaces `FROM generate_series(start, end[, step])` with the planned
/// `GENERATOR` table expression.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerateSeriesRewrite;

struct Alias<'a> {
    name: &'a str,
    column: Option<&'a str>,
    len: usize,
}

fn alias_after(rest: &str) -> Option<Alias<'_>> {
    let caps = SERIES_ALIAS.captures(rest)?;
    let name = caps.get(2)?.as_str();
    let explicit = caps.get(1).is_some();
    if !explicit && CLAUSE_KEYWORDS.iter().any(|k| name.eq_ignore_ascii_case(k)) {
        return None;
    }
    Some(Alias {
        name,
        column: caps.get(3).map(|c| c.as_str()),
        len: caps.get(0).map_or(0, |m| m.end()),
    })
}

impl TextRewrite for GenerateSeriesRewrite {
    fn name(&self) -> &'static str {
        "generate-series"
    }

    fn applies(&self, sql: &str) -> bool {
        FROM_SERIES.is_match(sql)
    }

    fn rewrite(&self, sql: &str) -> TranslateResult<String> {
        let regions = text::regions(sql);
        let mut out = String::with_capacity(sql.len());
        let mut last = 0;

        for m in FROM_SERIES.find_iter(sql) {
            if m.start() < last || regions[m.start()] != Region::Code {
                continue;
            }
            let open = m.end() - 1;
            let Some(close) = text::matching_paren(sql, open) else {
                continue;
            };
            let args = text::split_top_level(&sql[open + 1..close], b',');
            let plan = match args.as_slice() {
                [start, end] => SeriesPlan::new(*start, *end, None)?,
                [start, end, step] => SeriesPlan::new(*start, *end, Some(step.trim()))?,
                _ => continue,
            };

            let rest = &sql[close + 1..];
            let (alias, column, consumed) = match alias_after(rest) {
                Some(a) => (a.name, a.column.unwrap_or(DEFAULT_COLUMN), a.len),
                None => (DEFAULT_ALIAS, DEFAULT_COLUMN, 0),
            };

            out.push_str(&sql[last..m.start()]);
            out.push_str("FROM ");
            out.push_str(&plan.to_table_expression(alias, column));
            last = close + 1 + consumed;
        }

        out.push_str(&sql[last..]);
        Ok(out)
    }
}
