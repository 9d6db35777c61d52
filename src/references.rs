//! Table-reference classification and rewriting.
//!
//! Every identifier that follows `FROM` or `JOIN` is one of: a CTE bound in
//! the same statement, a table produced by a sibling unit, a table in the
//! external source schema, or another model. Only the last two are rewritten.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::text::{self, Region};

/// Schema prefix for external tables, resolved per practice at build time.
pub const DEFAULT_EXTERNAL_SCHEMA: &str = "STG.P{{praktijk_agb}}";

pub const DEFAULT_EXTERNAL_TABLES: &[&str] = &[
    "allergie",
    "bepaling",
    "contact",
    "contraindicatie",
    "episode",
    "journaal",
    "journaalregel",
    "medewerker",
    "medicatie",
    "metadata",
    "origineel",
    "patient",
    "praktijk",
    "ruiter",
    "verrichting",
    "verwijzing",
    "override_patientenlijst",
    "functie",
    "medewerker_hisnaam",
];

/// Words that look like `name AS (` but never name a table.
const NOT_TABLE_NAMES: &[&str] = &["select", "insert", "update", "delete", "with", "case"];

/// Calls whose argument list uses `FROM` as a separator.
const FROM_CALLS: &[&str] = &["extract", "trim", "substring", "position", "overlay"];

static TABLE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(FROM|JOIN)\s+([A-Za-z_]\w*)\b").unwrap());

static CTE_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\w+)\s*(?:\([^)]+\))?\s+AS(?:\s+\w+)*\s*\(").unwrap()
});

static PRODUCED_TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\w+)\s+AS\s*\(").unwrap());

/// Tables living in the separately namespaced source schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTableCatalog {
    schema: String,
    tables: Vec<String>,
}

impl Default for ExternalTableCatalog {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXTERNAL_SCHEMA,
            DEFAULT_EXTERNAL_TABLES.iter().map(|t| t.to_string()),
        )
    }
}

impl ExternalTableCatalog {
    pub fn new(schema: impl Into<String>, tables: impl IntoIterator<Item = String>) -> Self {
        Self {
            schema: schema.into(),
            tables: tables.into_iter().collect(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// `<schema>.<name>`
    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{name}", self.schema)
    }
}

/// What a `FROM`/`JOIN` identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Cte,
    Sibling,
    External,
    Model,
}

/// Names that are already bound for one statement.
#[derive(Debug, Clone, Default)]
pub struct ReferenceScope {
    ctes: HashSet<String>,
    siblings: HashSet<String>,
}

impl ReferenceScope {
    /// Collect the CTE names of `sql` and add `siblings`.
    pub fn new<'a>(sql: &str, siblings: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            ctes: cte_names(sql),
            siblings: siblings.into_iter().map(|s| s.to_lowercase()).collect(),
        }
    }

    pub fn classify(&self, name: &str, catalog: &ExternalTableCatalog) -> ReferenceKind {
        let lower = name.to_lowercase();
        if self.ctes.contains(&lower) {
            ReferenceKind::Cte
        } else if self.siblings.contains(&lower) {
            ReferenceKind::Sibling
        } else if catalog.contains(name) {
            ReferenceKind::External
        } else {
            ReferenceKind::Model
        }
    }
}

/// `{{ ref('<name>') }}`
pub fn model_ref(name: &str) -> String {
    format!("{{{{ ref('{name}') }}}}")
}

/// Names bound by `name [(cols)] AS [MATERIALIZED] (` anywhere in `sql`,
/// lower-cased. Comments are ignored.
pub fn cte_names(sql: &str) -> HashSet<String> {
    let stripped = text::strip_comments(sql);
    CTE_BINDING
        .captures_iter(&stripped)
        .map(|caps| caps[1].to_lowercase())
        .filter(|name| !NOT_TABLE_NAMES.contains(&name.as_str()))
        .collect()
}

/// Tables a translation unit creates (`name AS (`), lower-cased.
pub fn produced_tables(sql: &str) -> BTreeSet<String> {
    PRODUCED_TABLE
        .captures_iter(sql)
        .map(|caps| caps[1].to_lowercase())
        .filter(|name| !NOT_TABLE_NAMES.contains(&name.as_str()))
        .collect()
}

/// Replace each rewritable `FROM`/`JOIN` identifier with `resolve(name)`;
/// `None` keeps it.
///
/// Skipped entirely: keywords in strings or comments, `JOIN LATERAL`,
/// `IS [NOT] DISTINCT FROM`, `FROM` inside `EXTRACT(...)` and similar calls,
/// the `TABLE` and `LATERAL` keywords, and identifiers followed by `.`, `(`
/// or `::`.
pub fn rewrite_table_references(
    sql: &str,
    mut resolve: impl FnMut(&str) -> Option<String>,
) -> String {
    let regions = text::regions(sql);
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;

    for caps in TABLE_KEYWORD.captures_iter(sql) {
        let (Some(keyword), Some(ident)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        if regions[keyword.start()] != Region::Code || regions[ident.start()] != Region::Code {
            continue;
        }
        if !is_table_position(sql, &regions, keyword.as_str(), keyword.start()) {
            continue;
        }

        let name = ident.as_str();
        if name.eq_ignore_ascii_case("table") || name.eq_ignore_ascii_case("lateral") {
            continue;
        }
        if is_qualified_or_called(&sql[ident.end()..]) {
            continue;
        }

        if let Some(replacement) = resolve(name) {
            out.push_str(&sql[last..ident.start()]);
            out.push_str(&replacement);
            last = ident.end();
        }
    }

    out.push_str(&sql[last..]);
    out
}

fn is_table_position(sql: &str, regions: &[Region], keyword: &str, at: usize) -> bool {
    if !keyword.eq_ignore_ascii_case("from") {
        return true;
    }
    if text::word_before(sql, at).eq_ignore_ascii_case("distinct") {
        return false;
    }
    !text::enclosing_call(sql, regions, at)
        .is_some_and(|call| FROM_CALLS.iter().any(|f| call.eq_ignore_ascii_case(f)))
}

fn is_qualified_or_called(rest: &str) -> bool {
    if rest.starts_with("::") {
        return true;
    }
    let rest = rest.trim_start();
    rest.starts_with('.') || rest.starts_with('(')
}

/// Rewrites `FROM`/`JOIN` targets against a catalog and a per-statement scope.
#[derive(Debug, Clone)]
pub struct TableReferenceRewriter<'a> {
    catalog: &'a ExternalTableCatalog,
}

impl<'a> TableReferenceRewriter<'a> {
    pub fn new(catalog: &'a ExternalTableCatalog) -> Self {
        Self { catalog }
    }

    pub fn rewrite(&self, sql: &str, siblings: &BTreeSet<String>) -> String {
        let scope = ReferenceScope::new(sql, siblings);
        let mut rewritten = 0usize;

        let out = rewrite_table_references(sql, |name| {
            let replacement = match scope.classify(name, self.catalog) {
                ReferenceKind::Cte | ReferenceKind::Sibling => return None,
                ReferenceKind::External => self.catalog.qualify(name),
                ReferenceKind::Model => model_ref(name),
            };
            rewritten += 1;
            Some(replacement)
        });

        debug!(rewritten, "rewrote table references");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewrite(sql: &str) -> String {
        let catalog = ExternalTableCatalog::default();
        TableReferenceRewriter::new(&catalog).rewrite(sql, &BTreeSet::new())
    }

    #[test]
    fn test_model_and_external_references() {
        assert_eq!(
            rewrite("SELECT * FROM orders o JOIN patient p ON o.pid = p.id"),
            "SELECT * FROM {{ ref('orders') }} o JOIN STG.P{{praktijk_agb}}.patient p ON o.pid = p.id"
        );
    }

    #[test]
    fn test_catalog_is_case_insensitive() {
        assert_eq!(
            rewrite("SELECT * FROM Patient"),
            "SELECT * FROM STG.P{{praktijk_agb}}.Patient"
        );
    }

    #[test]
    fn test_cte_names_are_kept() {
        let sql = "WITH orders AS (SELECT * FROM raw_orders) SELECT * FROM orders";
        assert_eq!(
            rewrite(sql),
            "WITH orders AS (SELECT * FROM {{ ref('raw_orders') }}) SELECT * FROM orders"
        );
    }

    #[test]
    fn test_materialized_cte_with_columns() {
        let names = cte_names("WITH base (a, b) AS MATERIALIZED (SELECT 1, 2) SELECT * FROM base");
        assert!(names.contains("base"));
    }

    #[test]
    fn test_siblings_are_kept() {
        let catalog = ExternalTableCatalog::default();
        let siblings = BTreeSet::from(["tmp_episodes".to_string()]);
        let out = TableReferenceRewriter::new(&catalog)
            .rewrite("SELECT * FROM TMP_EPISODES", &siblings);
        assert_eq!(out, "SELECT * FROM TMP_EPISODES");
    }

    #[test]
    fn test_non_table_positions_are_skipped() {
        let sql = "SELECT EXTRACT(YEAR FROM d), TRIM(both ' ' FROM n), a IS DISTINCT FROM b \
                   FROM s.tbl, f(1), TABLE(GENERATOR(ROWCOUNT => 3)) AS g \
                   LEFT JOIN LATERAL (SELECT 1) AS l ON TRUE WHERE x::text = 'from y'";
        assert_eq!(rewrite(sql), sql);
    }

    #[test]
    fn test_comments_and_strings_are_skipped() {
        let sql = "SELECT 'FROM a' -- FROM b\nFROM c /* JOIN d */";
        assert_eq!(
            rewrite(sql),
            "SELECT 'FROM a' -- FROM b\nFROM {{ ref('c') }} /* JOIN d */"
        );
    }

    #[test]
    fn test_template_targets_are_skipped() {
        let sql = "SELECT * FROM {{ ref('x') }} JOIN {{ block() }} ON TRUE";
        assert_eq!(rewrite(sql), sql);
    }

    #[test]
    fn test_produced_tables() {
        let tables = produced_tables("WITH a AS (SELECT 1), B AS (SELECT 2) SELECT CASE AS (1)");
        assert_eq!(
            tables.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
