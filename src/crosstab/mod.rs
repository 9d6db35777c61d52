//! Crosstab decomposition.
//!
//! A PostgreSQL `crosstab($$ <source query> $$, $$ <category query> $$)`
//! call is rewritten into a CTE over the source query plus a
//! `dbt_utils.pivot` call whose categories come from the category query's
//! table at build time.

pub mod blocks;
pub mod columns;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{TranslateError, TranslateResult};
use crate::references::{self, model_ref};
use crate::text;

pub use blocks::{DollarBlock, dollar_blocks};
pub use columns::SelectColumn;

/// Column that holds the pivot categories in the category model.
pub const CATEGORY_COLUMN: &str = "categorie";

/// Name of the CTE wrapping the source query.
pub const SOURCE_CTE: &str = "cte1";

/// Inert text emitted in place of a crosstab that could not be converted.
pub const CROSSTAB_PLACEHOLDER: &str =
    "{# WARNING: crosstab() block could not be converted, skipped for dbt compile #}";

static DISTINCT_ON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bDISTINCT\s+ON\s*\(").unwrap());

static CROSSTAB_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcrosstab\s*\(").unwrap());

/// True when `sql` calls `crosstab(` outside comments and string literals.
pub fn mentions_crosstab(sql: &str) -> bool {
    let code = text::strip_comments(sql);
    let regions = text::regions(&code);
    CROSSTAB_CALL
        .find_iter(&code)
        .any(|m| regions[m.start()] == text::Region::Code)
}

/// Decomposed crosstab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrosstabSpec {
    /// Category expression of the category query.
    pub pivot_column: String,
    /// Table the category query reads from.
    pub pivot_source_table: String,
    pub declared_output_columns: Vec<String>,
    pub cte_select_columns: Vec<SelectColumn>,
    pub input_column_names: Vec<String>,
    /// Input columns also declared as output, in input order.
    pub dimension_columns: Vec<String>,
    /// Input columns not declared as output: category, then value.
    pub pivot_axis_columns: Vec<String>,
    /// CTE list of a source query that starts with `WITH`.
    pub hoisted_ctes: Option<String>,
    /// Source query with table references already rewritten.
    pub source_query: String,
}

impl CrosstabSpec {
    /// Decompose the crosstab statement `sql`.
    pub fn parse(sql: &str) -> TranslateResult<Self> {
        let sql = text::strip_comments(sql);
        let blocks = dollar_blocks(&sql);
        match blocks.len() {
            2 => {}
            n if n < 2 => {
                return Err(TranslateError::malformed(format!(
                    "crosstab() needs a source and a category statement, found {n} dollar-quoted block(s)"
                )));
            }
            n => {
                return Err(TranslateError::unsupported(format!(
                    "crosstab() with {n} dollar-quoted blocks"
                )));
            }
        }
        let cte_statement = blocks[0].body.trim();
        let pivot_statement = blocks[1].body.trim();

        if text::contains_keyword(pivot_statement, "JOIN") {
            return Err(TranslateError::unsupported("JOIN in the category statement"));
        }
        if DISTINCT_ON.is_match(cte_statement) {
            return Err(TranslateError::unsupported("DISTINCT ON in the source statement"));
        }

        let (pivot_column, pivot_source_table) = pivot_target(pivot_statement)?;
        let declared_output_columns = columns::declared_columns(&sql[blocks[1].end..])?;

        let (hoisted_ctes, source_query) = split_hoisted_ctes(&rewrite_source_tables(cte_statement));
        let select_list = columns::select_list(&source_query)
            .ok_or_else(|| TranslateError::unsupported("source statement has no SELECT … FROM"))?;
        let cte_select_columns = columns::parse_select_list(select_list)?;
        let input_column_names: Vec<String> = cte_select_columns
            .iter()
            .map(|col| col.name().to_string())
            .collect();

        let declared: HashSet<String> = declared_output_columns
            .iter()
            .map(|c| columns::fold(c))
            .collect();
        let (dimension_columns, pivot_axis_columns): (Vec<String>, Vec<String>) = input_column_names
            .iter()
            .cloned()
            .partition(|name| declared.contains(&columns::fold(name)));

        if pivot_axis_columns.len() != 2 {
            return Err(TranslateError::unsupported(format!(
                "expected a category and a value column outside the declared output, found [{}]",
                pivot_axis_columns.join(", ")
            )));
        }

        debug!(
            pivot = %pivot_column,
            source = %pivot_source_table,
            dims = ?dimension_columns,
            axis = ?pivot_axis_columns,
            "decomposed crosstab"
        );

        Ok(Self {
            pivot_column,
            pivot_source_table,
            declared_output_columns,
            cte_select_columns,
            input_column_names,
            dimension_columns,
            pivot_axis_columns,
            hoisted_ctes,
            source_query,
        })
    }

    pub fn category_column(&self) -> &str {
        &self.pivot_axis_columns[0]
    }

    pub fn value_column(&self) -> &str {
        &self.pivot_axis_columns[1]
    }

    /// The `dbt_utils.pivot` call producing one column per category.
    pub fn pivot_call(&self) -> String {
        format!(
            "{{{{ dbt_utils.pivot('{}', dbt_utils.get_column_values(ref('{}'),'{CATEGORY_COLUMN}',default=[]), \
             agg='', then_value='{}', else_value=\"ARRAY_CONSTRUCT()\", quote_identifiers=False)}}}}",
            self.pivot_column,
            self.pivot_source_table,
            self.value_column()
        )
    }

    pub fn to_sql(&self) -> String {
        let mut sql = String::from("WITH ");
        if let Some(ctes) = &self.hoisted_ctes {
            sql.push_str(ctes);
            sql.push_str(",\n");
        }
        sql.push_str(&format!("{SOURCE_CTE} AS (\n{}\n)\n", self.source_query));

        if self.dimension_columns.is_empty() {
            sql.push_str(&format!("SELECT {}\nFROM {SOURCE_CTE}", self.pivot_call()));
        } else {
            let dims = self.dimension_columns.join(", ");
            sql.push_str(&format!(
                "SELECT {dims}\n, {}\nFROM {SOURCE_CTE}\nGROUP BY {dims}",
                self.pivot_call()
            ));
        }
        sql
    }
}

/// Decompose `sql` and render the replacement statement.
pub fn decompose(sql: &str) -> TranslateResult<String> {
    CrosstabSpec::parse(sql).map(|spec| spec.to_sql())
}

/// `(pivot column, source table)` of the category statement.
fn pivot_target(statement: &str) -> TranslateResult<(String, String)> {
    let select = text::find_keyword(statement, "SELECT", 0);
    let from = select.and_then(|at| text::find_keyword(statement, "FROM", at + "SELECT".len()));
    let (Some(select), Some(from)) = (select, from) else {
        return Err(TranslateError::unsupported("category statement has no SELECT … FROM"));
    };

    let pivot_column = columns::strip_distinct(&statement[select + "SELECT".len()..from]).to_string();
    if pivot_column.is_empty() {
        return Err(TranslateError::unsupported("category statement selects nothing"));
    }

    let table_start = from + "FROM".len();
    let table_end = text::find_keyword(statement, "ORDER", table_start).unwrap_or(statement.len());
    let source = statement[table_start..table_end]
        .trim()
        .trim_end_matches(';')
        .trim_end()
        .to_string();
    if source.is_empty() {
        return Err(TranslateError::unsupported("category statement has no source table"));
    }

    Ok((pivot_column, source))
}

/// Bare tables of the source statement become model references; names bound
/// by its own CTEs stay.
fn rewrite_source_tables(statement: &str) -> String {
    let ctes = references::cte_names(statement);
    references::rewrite_table_references(statement, |name| {
        (!ctes.contains(&name.to_lowercase())).then(|| model_ref(name))
    })
}

/// Split `WITH a AS (…), b AS (…) SELECT …` into the CTE list and the main
/// query.
fn split_hoisted_ctes(statement: &str) -> (Option<String>, String) {
    let with = text::find_keyword(statement, "WITH", 0);
    let main = with.and_then(|at| text::find_keyword(statement, "SELECT", at + "WITH".len()));
    match (with, main) {
        (Some(0), Some(main)) => {
            let ctes = statement["WITH".len()..main]
                .trim()
                .trim_end_matches(',')
                .trim_end()
                .to_string();
            (Some(ctes), statement[main..].trim().to_string())
        }
        _ => (None, statement.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCORES: &str = "SELECT * FROM crosstab(
  $$ SELECT p.id, p.Name, c.categorie, c.val
     FROM patient_scores c JOIN people p ON p.id = c.pid
     ORDER BY 1, 2 $$,
  $$ SELECT DISTINCT categorie FROM score_categories ORDER BY 1 $$
) AS ct(id integer, name text, \"a\" text, \"b\" text);";

    #[test]
    fn test_dimension_and_axis_columns() {
        let spec = CrosstabSpec::parse(SCORES).unwrap();
        assert_eq!(spec.input_column_names, vec!["id", "Name", "categorie", "val"]);
        assert_eq!(spec.dimension_columns, vec!["id", "Name"]);
        assert_eq!(spec.pivot_axis_columns, vec!["categorie", "val"]);
        assert_eq!(spec.pivot_column, "categorie");
        assert_eq!(spec.pivot_source_table, "score_categories");
        assert_eq!(spec.category_column(), "categorie");
        assert_eq!(spec.value_column(), "val");
    }

    #[test]
    fn test_render() {
        let sql = decompose(SCORES).unwrap();
        assert_eq!(
            sql,
            "WITH cte1 AS (\n\
             SELECT p.id, p.Name, c.categorie, c.val\n     \
             FROM {{ ref('patient_scores') }} c JOIN {{ ref('people') }} p ON p.id = c.pid\n     \
             ORDER BY 1, 2\n)\n\
             SELECT id, Name\n\
             , {{ dbt_utils.pivot('categorie', dbt_utils.get_column_values(ref('score_categories'),'categorie',default=[]), \
             agg='', then_value='val', else_value=\"ARRAY_CONSTRUCT()\", quote_identifiers=False)}}\n\
             FROM cte1\n\
             GROUP BY id, Name"
        );
    }

    #[test]
    fn test_join_in_category_statement() {
        let sql = "SELECT * FROM crosstab($$ SELECT id, cat, val FROM t $$, \
                   $$ SELECT c.cat FROM cats c JOIN x ON TRUE $$) AS ct(id int, a int)";
        assert!(matches!(
            CrosstabSpec::parse(sql),
            Err(TranslateError::UnsupportedCrosstabShape(_))
        ));
    }

    #[test]
    fn test_distinct_on_in_source_statement() {
        let sql = "SELECT * FROM crosstab($$ SELECT DISTINCT ON (id) id, cat, val FROM t $$, \
                   $$ SELECT cat FROM cats $$) AS ct(id int, a int)";
        assert!(matches!(
            CrosstabSpec::parse(sql),
            Err(TranslateError::UnsupportedCrosstabShape(_))
        ));
    }

    #[test]
    fn test_block_count() {
        let one = "SELECT * FROM crosstab($$ SELECT id, cat, val FROM t $$) AS ct(id int)";
        assert!(matches!(
            CrosstabSpec::parse(one),
            Err(TranslateError::MalformedColumnList(_))
        ));

        let three = "SELECT * FROM crosstab($$ SELECT 1 $$, $$ SELECT 2 $$, $$ SELECT 3 $$) AS ct(id int)";
        assert!(matches!(
            CrosstabSpec::parse(three),
            Err(TranslateError::UnsupportedCrosstabShape(_))
        ));
    }

    #[test]
    fn test_three_axis_columns_fail() {
        let sql = "SELECT * FROM crosstab($$ SELECT id, cat, val, extra FROM t $$, \
                   $$ SELECT cat FROM cats $$) AS ct(id int, a int)";
        let err = CrosstabSpec::parse(sql).unwrap_err();
        assert!(err.to_string().contains("cat, val, extra"));
    }

    #[test]
    fn test_missing_column_definitions() {
        let sql = "SELECT * FROM crosstab($$ SELECT id, cat, val FROM t $$, $$ SELECT cat FROM cats $$)";
        assert!(matches!(
            CrosstabSpec::parse(sql),
            Err(TranslateError::MalformedColumnList(_))
        ));
    }

    #[test]
    fn test_hoisted_ctes_and_no_dimensions() {
        let sql = "SELECT * FROM crosstab($q$
            WITH base AS (SELECT cat, val FROM raw) SELECT cat, val FROM base
        $q$, $q$ SELECT cat FROM cats ORDER BY 1; $q$) AS (a int, b int)";
        let spec = CrosstabSpec::parse(sql).unwrap();
        assert_eq!(spec.hoisted_ctes.as_deref(), Some("base AS (SELECT cat, val FROM {{ ref('raw') }})"));
        assert!(spec.dimension_columns.is_empty());
        assert_eq!(spec.pivot_source_table, "cats");

        let out = spec.to_sql();
        assert!(out.starts_with(
            "WITH base AS (SELECT cat, val FROM {{ ref('raw') }}),\ncte1 AS (\nSELECT cat, val FROM base\n)\nSELECT {{ dbt_utils.pivot('cat'"
        ));
        assert!(out.ends_with("FROM cte1"));
        assert!(!out.contains("GROUP BY"));
    }

    #[test]
    fn test_comments_are_ignored() {
        let sql = "-- pivot per category\nSELECT * FROM crosstab($$ SELECT id, cat, val FROM t -- FROM x\n $$, \
                   $$ SELECT cat FROM cats $$) AS ct(id int, a int)";
        let spec = CrosstabSpec::parse(sql).unwrap();
        assert_eq!(spec.source_query, "SELECT id, cat, val FROM {{ ref('t') }}");
    }

    #[test]
    fn test_mentions_crosstab() {
        assert!(mentions_crosstab("select * from CrossTab($$ $$)"));
        assert!(!mentions_crosstab("select 1"));
        assert!(!mentions_crosstab("-- replaces the old crosstab report\nSELECT id FROM orders"));
        assert!(!mentions_crosstab("SELECT crosstab_total FROM orders"));
        assert!(!mentions_crosstab("SELECT 'crosstab(' AS label"));
        assert!(mentions_crosstab("/* pivot */ SELECT * FROM crosstab\n($$ $$)"));
    }
}
