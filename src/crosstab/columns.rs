//! Column lists of a crosstab: the CTE's SELECT list and the declared
//! output columns.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{TranslateError, TranslateResult};
use crate::text;

static LEADING_DISTINCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^DISTINCT\s+").unwrap());

static COLUMN_DEFINITIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\)\s*AS\s+(?:[A-Za-z_]\w*\s*)?\(").unwrap());

/// One entry of a SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    pub expression: String,
    pub alias: Option<String>,
}

impl SelectColumn {
    /// Split `expr [AS alias]` at the last top-level `AS`.
    pub fn parse(item: &str) -> Self {
        let item = item.trim();
        match text::top_level_keywords(item, "AS").last() {
            Some(&at) => Self {
                expression: item[..at].trim().to_string(),
                alias: Some(item[at + 2..].trim().to_string()),
            },
            None => Self {
                expression: item.to_string(),
                alias: None,
            },
        }
    }

    /// Output name: the alias, else the first token with any qualifier removed.
    pub fn name(&self) -> &str {
        if let Some(alias) = &self.alias {
            return alias;
        }
        let first = self.expression.split_whitespace().next().unwrap_or_default();
        first.rsplit('.').next().unwrap_or(first)
    }
}

/// Case-folded form used to compare column names.
pub fn fold(name: &str) -> String {
    name.trim().trim_matches('"').to_lowercase()
}

/// Drop a leading `DISTINCT`.
pub fn strip_distinct(list: &str) -> &str {
    let list = list.trim();
    LEADING_DISTINCT
        .find(list)
        .map_or(list, |m| &list[m.end()..])
}

/// Text between the top-level `SELECT` and `FROM` of `statement`.
pub fn select_list(statement: &str) -> Option<&str> {
    let select = text::find_keyword(statement, "SELECT", 0)?;
    let from = text::find_keyword(statement, "FROM", select + "SELECT".len())?;
    Some(&statement[select + "SELECT".len()..from])
}

/// Entries of a SELECT list, split at depth zero.
pub fn parse_select_list(list: &str) -> TranslateResult<Vec<SelectColumn>> {
    text::split_top_level(strip_distinct(list), b',')
        .into_iter()
        .map(|item| {
            if item.trim().is_empty() {
                Err(TranslateError::malformed(format!(
                    "empty entry in select list '{}'",
                    list.trim()
                )))
            } else {
                Ok(SelectColumn::parse(item))
            }
        })
        .collect()
}

/// Names declared by `) AS [alias] ( col type, … )` in `tail`.
pub fn declared_columns(tail: &str) -> TranslateResult<Vec<String>> {
    let m = COLUMN_DEFINITIONS
        .find(tail)
        .ok_or_else(|| TranslateError::malformed("no column definition list after crosstab()"))?;
    let open = m.end() - 1;
    let close = text::matching_paren(tail, open)
        .ok_or_else(|| TranslateError::malformed("unterminated column definition list"))?;

    let mut names = Vec::new();
    for entry in text::split_top_level(&tail[open + 1..close], b',') {
        let name = entry
            .split_whitespace()
            .next()
            .ok_or_else(|| TranslateError::malformed("empty entry in column definition list"))?;
        names.push(name.to_string());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_column_names() {
        assert_eq!(SelectColumn::parse("p.id").name(), "id");
        assert_eq!(SelectColumn::parse("coalesce(a, b) AS total").name(), "total");
        assert_eq!(
            SelectColumn::parse("CAST(x AS text) as label").name(),
            "label"
        );
        assert_eq!(SelectColumn::parse("CAST(x AS text)").name(), "CAST(x");
    }

    #[test]
    fn test_parse_select_list() {
        let cols = parse_select_list(" DISTINCT id, name, ARRAY[a, b] AS vals ").unwrap();
        let names: Vec<&str> = cols.iter().map(SelectColumn::name).collect();
        assert_eq!(names, vec!["id", "name", "vals"]);
        assert!(parse_select_list("id, , name").is_err());
    }

    #[test]
    fn test_declared_columns() {
        let cols = declared_columns("\n) AS ct(id integer, \"Name\" text, score numeric(5, 2));").unwrap();
        assert_eq!(cols, vec!["id", "\"Name\"", "score"]);
        assert_eq!(fold(&cols[1]), "name");
    }

    #[test]
    fn test_declared_columns_missing() {
        let err = declared_columns(")").unwrap_err();
        assert!(matches!(err, TranslateError::MalformedColumnList(_)));
    }
}
