//! Per-node-kind serialization overrides.
//!
//! A target dialect customizes output by registering handlers in an
//! [`OverrideTable`]. The table is applied bottom-up over the parsed AST, so a
//! handler always sees children that were already rewritten; a matching node
//! is replaced by a verbatim expression holding the handler's text.

use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;

use sqlparser::ast::{Expr, Ident, Statement, visit_expressions_mut};

use crate::error::TranslateResult;

/// Handler for one node kind. `Ok(None)` keeps the default serialization.
pub type OverrideFn = fn(&Expr) -> TranslateResult<Option<String>>;

/// Node kinds a dialect can intercept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// `CAST(x AS t)` and `x::t`
    Cast,
    /// `INTERVAL '…' [unit]`
    Interval,
    /// `ARRAY[…]` and `[…]`
    Array,
    /// `x <op> ANY(…)`
    AnyOp,
    /// Function call, keyed by lower-cased unqualified name.
    Function(String),
}

impl NodeKind {
    pub fn of(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Cast { .. } => Some(Self::Cast),
            Expr::Interval(_) => Some(Self::Interval),
            Expr::Array(_) => Some(Self::Array),
            Expr::AnyOp { .. } => Some(Self::AnyOp),
            Expr::Function(func) => func
                .name
                .0
                .last()
                .map(|ident| Self::Function(ident.value.to_lowercase())),
            _ => None,
        }
    }

    pub fn function(name: &str) -> Self {
        Self::Function(name.to_lowercase())
    }
}

/// Dispatch table from node kind to override handler.
#[derive(Clone, Default)]
pub struct OverrideTable {
    handlers: HashMap<NodeKind, OverrideFn>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same kind.
    pub fn register(&mut self, kind: NodeKind, handler: OverrideFn) {
        self.handlers.insert(kind, handler);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, kind: NodeKind, handler: OverrideFn) -> Self {
        self.register(kind, handler);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn handles(&self, kind: &NodeKind) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Run the handler registered for `expr`'s kind, if any.
    pub fn render(&self, expr: &Expr) -> TranslateResult<Option<String>> {
        let Some(handler) = NodeKind::of(expr).and_then(|kind| self.handlers.get(&kind)) else {
            return Ok(None);
        };
        handler(expr)
    }

    /// Rewrite every overridden expression in `statements`, children first.
    pub fn apply(&self, statements: &mut Vec<Statement>) -> TranslateResult<()> {
        if self.is_empty() {
            return Ok(());
        }

        let flow = visit_expressions_mut(statements, |expr| match self.render(expr) {
            Ok(Some(text)) => {
                *expr = verbatim(text);
                ControlFlow::Continue(())
            }
            Ok(None) => ControlFlow::Continue(()),
            Err(err) => ControlFlow::Break(err),
        });

        match flow {
            ControlFlow::Break(err) => Err(err),
            ControlFlow::Continue(()) => Ok(()),
        }
    }
}

impl fmt::Debug for OverrideTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// An expression that serializes as exactly `text`.
pub fn verbatim(text: impl Into<String>) -> Expr {
    Expr::Identifier(Ident::new(text))
}
