use sqlparser::ast::{
    BinaryOperator, CastKind, DataType, Expr, FunctionArg, FunctionArgExpr, FunctionArguments,
    Value,
};

use crate::error::TranslateResult;
use crate::series::{DEFAULT_ALIAS, DEFAULT_COLUMN, SeriesPlan};
use crate::transpiler::overrides::{NodeKind, OverrideTable};
use crate::transpiler::traits::SqlGenerator;

#[derive(Debug, Default, Clone, Copy)]
pub struct SnowflakeGenerator;

impl SqlGenerator for SnowflakeGenerator {
    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn overrides(&self) -> OverrideTable {
        OverrideTable::new()
            .with(NodeKind::Cast, interval_cast)
            .with(NodeKind::Interval, interval_literal)
            .with(NodeKind::Array, array_construct)
            .with(NodeKind::AnyOp, array_contains)
            .with(NodeKind::function("generate_series"), generate_series)
    }
}

fn string_literal(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Value(Value::SingleQuotedString(s)) => Some(s),
        _ => None,
    }
}

/// `'7 days'::interval` stays as written; a bare number counts days.
fn interval_cast(expr: &Expr) -> TranslateResult<Option<String>> {
    let Expr::Cast {
        kind: CastKind::Cast | CastKind::DoubleColon,
        expr: inner,
        data_type: DataType::Interval,
        format: None,
    } = expr
    else {
        return Ok(None);
    };
    let Some(literal) = string_literal(inner) else {
        return Ok(None);
    };

    let tokens: Vec<&str> = literal.split_whitespace().collect();
    Ok(match tokens.as_slice() {
        [] => None,
        [count] => Some(format!("INTERVAL '{count} days'")),
        _ => Some(format!("INTERVAL '{literal}'")),
    })
}

fn interval_literal(expr: &Expr) -> TranslateResult<Option<String>> {
    let Expr::Interval(interval) = expr else {
        return Ok(None);
    };
    let Some(value) = string_literal(&interval.value) else {
        return Ok(None);
    };
    if interval.last_field.is_some()
        || interval.leading_precision.is_some()
        || interval.fractional_seconds_precision.is_some()
    {
        return Ok(None);
    }

    Ok(Some(match &interval.leading_field {
        Some(unit) => format!("INTERVAL '{value}' {unit}"),
        None => format!("INTERVAL '{value}'"),
    }))
}

fn array_construct(expr: &Expr) -> TranslateResult<Option<String>> {
    let Expr::Array(array) = expr else {
        return Ok(None);
    };
    let elements: Vec<String> = array.elem.iter().map(ToString::to_string).collect();
    Ok(Some(format!("ARRAY_CONSTRUCT({})", elements.join(", "))))
}

/// `x = ANY(arr)` only; other operators and subqueries keep their shape.
fn array_contains(expr: &Expr) -> TranslateResult<Option<String>> {
    match expr {
        Expr::AnyOp {
            left,
            compare_op: BinaryOperator::Eq,
            right,
            ..
        } if !matches!(right.as_ref(), Expr::Subquery(_)) => Ok(Some(format!(
            "ARRAY_CONTAINS(TO_VARIANT({left}), {right})"
        ))),
        _ => Ok(None),
    }
}

fn generate_series(expr: &Expr) -> TranslateResult<Option<String>> {
    let Expr::Function(func) = expr else {
        return Ok(None);
    };
    let FunctionArguments::List(list) = &func.args else {
        return Ok(None);
    };
    if list.duplicate_treatment.is_some() || !list.clauses.is_empty() {
        return Ok(None);
    }

    let mut args = Vec::with_capacity(list.args.len());
    for arg in &list.args {
        match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => args.push(e.to_string()),
            _ => return Ok(None),
        }
    }

    let plan = match args.as_slice() {
        [start, end] => SeriesPlan::new(start.as_str(), end.as_str(), None)?,
        [start, end, step] => SeriesPlan::new(start.as_str(), end.as_str(), Some(step))?,
        _ => return Ok(None),
    };
    Ok(Some(plan.to_table_expression(DEFAULT_ALIAS, DEFAULT_COLUMN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranslateError;
    use crate::transpiler::Dialect;
    use crate::transpiler::capability::SqlParserCapability;
    use crate::transpiler::traits::SqlCapability;
    use pretty_assertions::assert_eq;

    fn snowflake(sql: &str) -> TranslateResult<String> {
        let cap = SqlParserCapability;
        let stmts = cap.parse(sql, Dialect::Postgres)?;
        cap.generate(stmts, Dialect::Snowflake, &SnowflakeGenerator.overrides())
    }

    #[test]
    fn test_interval_cast() {
        assert_eq!(
            snowflake("SELECT CAST('7 days' AS INTERVAL)").unwrap(),
            "SELECT INTERVAL '7 days'"
        );
        assert_eq!(
            snowflake("SELECT d + '3'::interval FROM t").unwrap(),
            "SELECT d + INTERVAL '3 days' FROM t"
        );
    }

    #[test]
    fn test_cast_to_other_types_is_untouched() {
        assert_eq!(
            snowflake("SELECT CAST('2024-01-01' AS DATE)").unwrap(),
            "SELECT CAST('2024-01-01' AS DATE)"
        );
    }

    #[test]
    fn test_interval_literal() {
        assert_eq!(
            snowflake("SELECT INTERVAL '1 day'").unwrap(),
            "SELECT INTERVAL '1 day'"
        );
        assert_eq!(
            snowflake("SELECT INTERVAL '2' MONTH").unwrap(),
            "SELECT INTERVAL '2' MONTH"
        );
    }

    #[test]
    fn test_array_literal() {
        assert_eq!(
            snowflake("SELECT ARRAY[1, 2, 3]").unwrap(),
            "SELECT ARRAY_CONSTRUCT(1, 2, 3)"
        );
    }

    #[test]
    fn test_equality_with_any() {
        assert_eq!(
            snowflake("SELECT * FROM t WHERE x = ANY(ARRAY['a', 'b'])").unwrap(),
            "SELECT * FROM t WHERE ARRAY_CONTAINS(TO_VARIANT(x), ARRAY_CONSTRUCT('a', 'b'))"
        );
        assert_eq!(
            snowflake("SELECT * FROM t WHERE x = ANY(y)").unwrap(),
            "SELECT * FROM t WHERE ARRAY_CONTAINS(TO_VARIANT(x), y)"
        );
    }

    #[test]
    fn test_other_comparisons_fall_back() {
        assert_eq!(
            snowflake("SELECT * FROM t WHERE x > ANY(y)").unwrap(),
            "SELECT * FROM t WHERE x > ANY(y)"
        );
        assert_eq!(
            snowflake("SELECT * FROM t WHERE x = y").unwrap(),
            "SELECT * FROM t WHERE x = y"
        );
        assert_eq!(
            snowflake("SELECT * FROM t WHERE x = ANY(SELECT id FROM u)").unwrap(),
            "SELECT * FROM t WHERE x = ANY(SELECT id FROM u)"
        );
    }

    #[test]
    fn test_generate_series_call() {
        let out = snowflake("SELECT GENERATE_SERIES(1, 10, 2)").unwrap();
        assert!(out.contains("TABLE(GENERATOR(ROWCOUNT => ((10) - (1)) / (2) + 1))"));
        assert!(out.contains("LATERAL (SELECT (1) + SEQ4() * (2) AS a) AS s"));
    }

    #[test]
    fn test_generate_series_with_interval_step() {
        let out = snowflake(
            "SELECT generate_series('2024-01-01'::date, '2024-12-31'::date, INTERVAL '1 month')",
        )
        .unwrap();
        assert!(out.contains("DATEDIFF(MONTH, '2024-01-01'::DATE, '2024-12-31'::DATE) / 1 + 1"));
        assert!(out.contains("DATEADD(MONTH, SEQ4() * 1, '2024-01-01'::DATE)"));
    }

    #[test]
    fn test_generate_series_other_arity_falls_back() {
        assert_eq!(
            snowflake("SELECT generate_series(1)").unwrap(),
            "SELECT generate_series(1)"
        );
    }

    #[test]
    fn test_generate_series_zero_step() {
        let err = snowflake("SELECT generate_series(1, 10, 0)").unwrap_err();
        assert!(matches!(err, TranslateError::UnsupportedSeries(_)));
    }
}
