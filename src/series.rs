//! Series generator planning.
//!
//! PostgreSQL `generate_series` has no Snowflake counterpart. Both the text
//! pre-pass (`FROM generate_series(...) AS s(a)`) and the function-call
//! override go through [`SeriesPlan`], so the date/numeric decision and the
//! row-count arithmetic live in exactly one place.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::{TranslateError, TranslateResult};

/// Alias of the generator table in the emitted expression.
pub const GENERATOR_ALIAS: &str = "g";
/// Alias of the lateral projection when the source names none.
pub const DEFAULT_ALIAS: &str = "s";
/// Column produced by the lateral projection when the source names none.
pub const DEFAULT_COLUMN: &str = "a";

static INTERVAL_STEPS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)^INTERVAL\s+'\s*(\d+)\s+([a-z]+)\s*'$",
        r"(?is)^INTERVAL\s+'\s*(\d+)\s*'\s+([a-z]+)$",
        r"(?is)^'\s*(\d+)\s+([a-z]+)\s*'\s*::\s*INTERVAL$",
        r"(?is)^CAST\s*\(\s*'\s*(\d+)\s+([a-z]+)\s*'\s+AS\s+INTERVAL\s*\)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Increment between two consecutive series values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesStep {
    /// `INTERVAL '<count> <unit>'`, stepping a date or timestamp.
    Interval { count: String, unit: String },
    /// Any other expression, stepping a number.
    Numeric(String),
}

impl SeriesStep {
    /// Classify an already-serialized step expression.
    pub fn parse(step: &str) -> Self {
        let step = step.trim();
        INTERVAL_STEPS
            .iter()
            .find_map(|re| re.captures(step))
            .map(|caps| SeriesStep::Interval {
                count: caps[1].to_string(),
                unit: caps[2].to_uppercase(),
            })
            .unwrap_or_else(|| SeriesStep::Numeric(step.to_string()))
    }

    fn is_zero(&self) -> bool {
        let literal = match self {
            SeriesStep::Interval { count, .. } => count.as_str(),
            SeriesStep::Numeric(expr) => expr.trim_matches(|c| c == '(' || c == ')' || c == ' '),
        };
        literal.parse::<f64>().is_ok_and(|n| n == 0.0)
    }
}

/// A `generate_series(start, end[, step])` call, ready to render as a
/// Snowflake `GENERATOR` table expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesPlan {
    pub start: String,
    pub end: String,
    pub step: SeriesStep,
}

impl SeriesPlan {
    /// Plan a series; a missing step defaults to the number `1`.
    ///
    /// A literal zero step is rejected because the row count would divide by
    /// zero. Reversed literal bounds are kept as-is and only logged.
    pub fn new(
        start: impl Into<String>,
        end: impl Into<String>,
        step: Option<&str>,
    ) -> TranslateResult<Self> {
        let plan = Self {
            start: start.into().trim().to_string(),
            end: end.into().trim().to_string(),
            step: SeriesStep::parse(step.unwrap_or("1")),
        };

        if plan.step.is_zero() {
            return Err(TranslateError::UnsupportedSeries(format!(
                "generate_series({}, {}) with a zero step never terminates",
                plan.start, plan.end
            )));
        }
        if plan.is_reversed() {
            warn!(
                start = %plan.start,
                end = %plan.end,
                "generate_series bounds are reversed; GENERATOR will receive a negative row count"
            );
        }
        Ok(plan)
    }

    pub fn is_date_series(&self) -> bool {
        matches!(self.step, SeriesStep::Interval { .. })
    }

    fn is_reversed(&self) -> bool {
        let SeriesStep::Numeric(step) = &self.step else {
            return false;
        };
        match (
            self.start.parse::<f64>(),
            self.end.parse::<f64>(),
            step.parse::<f64>(),
        ) {
            (Ok(start), Ok(end), Ok(step)) => (end - start) / step < 0.0,
            _ => false,
        }
    }

    /// Number of rows, counting the end bound inclusively.
    pub fn row_count(&self) -> String {
        match &self.step {
            SeriesStep::Interval { count, unit } => {
                format!("DATEDIFF({unit}, {}, {}) / {count} + 1", self.start, self.end)
            }
            SeriesStep::Numeric(step) => {
                format!("(({}) - ({})) / ({step}) + 1", self.end, self.start)
            }
        }
    }

    /// Value of the n-th row, with `SEQ4()` as the zero-based row number.
    pub fn projection(&self) -> String {
        match &self.step {
            SeriesStep::Interval { count, unit } => {
                format!("DATEADD({unit}, SEQ4() * {count}, {})", self.start)
            }
            SeriesStep::Numeric(step) => format!("({}) + SEQ4() * ({step})", self.start),
        }
    }

    /// Render as `TABLE(GENERATOR(...)) AS g, LATERAL (SELECT ... AS col) AS alias`.
    pub fn to_table_expression(&self, alias: &str, column: &str) -> String {
        format!(
            "TABLE(GENERATOR(ROWCOUNT => {})) AS {GENERATOR_ALIAS}, LATERAL (SELECT {} AS {column}) AS {alias}",
            self.row_count(),
            self.projection()
        )
    }
}
