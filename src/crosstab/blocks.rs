//! Dollar-quoted statement blocks (`$$ … $$`, `$tag$ … $tag$`).

use crate::text::is_word_byte;

/// One dollar-quoted block; `start..end` spans the delimiters too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DollarBlock<'a> {
    pub tag: &'a str,
    pub body: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Opening delimiter at `at`, if any. `$1` positional parameters are not
/// delimiters.
fn delimiter_at(sql: &str, at: usize) -> Option<&str> {
    let bytes = sql.as_bytes();
    if bytes.get(at) != Some(&b'$') {
        return None;
    }
    let mut end = at + 1;
    while end < bytes.len() && is_word_byte(bytes[end]) {
        end += 1;
    }
    if bytes.get(end) != Some(&b'$') || bytes.get(at + 1).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    Some(&sql[at..=end])
}

/// All terminated dollar-quoted blocks, in order of appearance.
pub fn dollar_blocks(sql: &str) -> Vec<DollarBlock<'_>> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < sql.len() {
        let Some(delim) = delimiter_at(sql, i) else {
            i += 1;
            continue;
        };
        let body_start = i + delim.len();
        let Some(close) = sql[body_start..].find(delim) else {
            break;
        };
        let body_end = body_start + close;
        blocks.push(DollarBlock {
            tag: &delim[1..delim.len() - 1],
            body: &sql[body_start..body_end],
            start: i,
            end: body_end + delim.len(),
        });
        i = body_end + delim.len();
    }

    blocks
}
