//! Text rewrites applied before parsing.
//!
//! These passes handle constructs the source grammar cannot round-trip into
//! the target dialect. They work on raw text and know nothing about dialects.

pub mod generate_series;
pub mod unnest;

use tracing::debug;

use crate::crosstab;
use crate::error::TranslateResult;

pub use generate_series::GenerateSeriesRewrite;
pub use unnest::UnnestArrayRewrite;

/// A single text-to-text rewrite.
pub trait TextRewrite: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap check that lets the pipeline skip passes with nothing to do.
    fn applies(&self, _sql: &str) -> bool {
        true
    }

    fn rewrite(&self, sql: &str) -> TranslateResult<String>;
}

/// Replaces a whole `crosstab(...)` statement with its decomposition.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstabRewrite;

impl TextRewrite for CrosstabRewrite {
    fn name(&self) -> &'static str {
        "crosstab"
    }

    fn applies(&self, sql: &str) -> bool {
        crosstab::mentions_crosstab(sql)
    }

    fn rewrite(&self, sql: &str) -> TranslateResult<String> {
        crosstab::decompose(sql)
    }
}

/// Ordered list of text rewrites.
pub struct PrePass {
    passes: Vec<Box<dyn TextRewrite>>,
}

impl Default for PrePass {
    fn default() -> Self {
        Self::new()
    }
}

impl PrePass {
    /// Crosstab first, then unnest, then generate_series.
    pub fn new() -> Self {
        let mut pipeline = Self { passes: Vec::new() };
        pipeline.register(Box::new(CrosstabRewrite));
        pipeline.register(Box::new(UnnestArrayRewrite));
        pipeline.register(Box::new(GenerateSeriesRewrite));
        pipeline
    }

    /// Append a pass; passes run in registration order.
    pub fn register(&mut self, pass: Box<dyn TextRewrite>) {
        self.passes.push(pass);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every applicable pass. The first failing pass aborts the run.
    pub fn run(&self, sql: &str) -> TranslateResult<String> {
        let mut current = sql.to_string();
        for pass in &self.passes {
            if !pass.applies(&current) {
                continue;
            }
            let next = pass.rewrite(&current)?;
            if next != current {
                debug!(pass = pass.name(), "pre-pass rewrote statement");
            }
            current = next;
        }
        Ok(current)
    }
}
