//! Template-span protection.
//!
//! `{{ … }}` expressions and `${name}` variables are not SQL. They are
//! swapped for plain identifiers before parsing and put back afterwards.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static TEMPLATE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{.*?\}\}|\$\{[A-Za-z_]\w*\}").unwrap());

static INCLUDE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{%-?\s*include\s+['"]([\w\-]+)\.\w+['"]\s*-?%\}"#).unwrap()
});

/// Turn `{% include 'name.ext' %}` into a `{{ name() }}` macro call.
pub fn expand_includes(sql: &str) -> String {
    INCLUDE_DIRECTIVE
        .replace_all(sql, "{{ ${1}() }}")
        .into_owned()
}

/// Spans removed by [`protect`], indexed by placeholder number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSpans {
    spans: Vec<String>,
}

impl TemplateSpans {
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Put every span back in place of its placeholder.
    pub fn restore(&self, sql: &str) -> String {
        self.spans
            .iter()
            .enumerate()
            .fold(sql.to_string(), |acc, (i, span)| acc.replace(&placeholder(i), span))
    }
}

pub fn placeholder(index: usize) -> String {
    format!("__template_{index}__")
}

/// Replace each template span in `sql` with a placeholder identifier.
pub fn protect(sql: &str) -> (String, TemplateSpans) {
    let mut spans = TemplateSpans::default();
    let protected = TEMPLATE_SPAN.replace_all(sql, |caps: &Captures| {
        spans.spans.push(caps[0].to_string());
        placeholder(spans.spans.len() - 1)
    });
    (protected.into_owned(), spans)
}
