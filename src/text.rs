//! Depth- and quote-aware helpers for scanning raw SQL text.
//!
//! Every delimiter handled here is ASCII, so the byte offsets returned are
//! always valid `str` slice boundaries.

/// Lexical class of a single byte of SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Code,
    Quoted,
    Comment,
}

/// Classify every byte of `sql` as code, quoted literal/identifier, or comment.
///
/// Recognizes `'…'` and `"…"` (with doubled-quote escapes), `-- …` line
/// comments, `/* … */` block comments and `{# … #}` template comments.
pub fn regions(sql: &str) -> Vec<Region> {
    let bytes = sql.as_bytes();
    let mut out = vec![Region::Code; bytes.len()];
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"') => {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == quote {
                        if bytes.get(i + 1) == Some(&quote) {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
                let end = (i + 1).min(bytes.len());
                out[start..end].fill(Region::Quoted);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                out[start..i].fill(Region::Comment);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = block_end(sql, i, "*/");
                out[i..end].fill(Region::Comment);
                i = end;
            }
            b'{' if bytes.get(i + 1) == Some(&b'#') => {
                let end = block_end(sql, i, "#}");
                out[i..end].fill(Region::Comment);
                i = end;
            }
            _ => i += 1,
        }
    }

    out
}

fn block_end(sql: &str, start: usize, terminator: &str) -> usize {
    sql[start + 2..]
        .find(terminator)
        .map(|p| start + 2 + p + terminator.len())
        .unwrap_or(sql.len())
}

/// Remove all comments, keeping line breaks so line structure survives.
pub fn strip_comments(sql: &str) -> String {
    let regions = regions(sql);
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    let mut in_comment = false;

    for (i, region) in regions.iter().enumerate() {
        let comment = *region == Region::Comment;
        if comment && !in_comment {
            out.push_str(&sql[last..i]);
            in_comment = true;
        } else if !comment && in_comment {
            last = i;
            in_comment = false;
        }
    }
    if !in_comment {
        out.push_str(&sql[last..]);
    }
    out
}

/// True when `b` can be part of an unquoted identifier.
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_keyword_at(bytes: &[u8], at: usize, keyword: &[u8]) -> bool {
    let end = at + keyword.len();
    end <= bytes.len()
        && bytes[at..end].eq_ignore_ascii_case(keyword)
        && (at == 0 || !is_word_byte(bytes[at - 1]))
        && (end == bytes.len() || !is_word_byte(bytes[end]))
}

/// Offsets of every occurrence of `keyword` (case-insensitive, whole word)
/// that sits outside brackets, quotes and comments.
pub fn top_level_keywords(sql: &str, keyword: &str) -> Vec<usize> {
    let regions = regions(sql);
    let bytes = sql.as_bytes();
    let keyword = keyword.as_bytes();
    let mut depth = 0usize;
    let mut found = Vec::new();

    for i in 0..bytes.len() {
        if regions[i] != Region::Code {
            continue;
        }
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_keyword_at(bytes, i, keyword) => found.push(i),
            _ => {}
        }
    }
    found
}

/// First top-level occurrence of `keyword` at or after `from`.
pub fn find_keyword(sql: &str, keyword: &str, from: usize) -> Option<usize> {
    top_level_keywords(sql, keyword)
        .into_iter()
        .find(|&at| at >= from)
}

/// True when `keyword` occurs anywhere in code (any depth).
pub fn contains_keyword(sql: &str, keyword: &str) -> bool {
    let regions = regions(sql);
    let bytes = sql.as_bytes();
    (0..bytes.len())
        .any(|i| regions[i] == Region::Code && is_keyword_at(bytes, i, keyword.as_bytes()))
}

/// Split on `sep` wherever it occurs outside `()`/`[]`, quotes and comments.
pub fn split_top_level(sql: &str, sep: u8) -> Vec<&str> {
    let regions = regions(sql);
    let bytes = sql.as_bytes();
    let mut depth = 0usize;
    let mut parts = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len() {
        if regions[i] != Region::Code {
            continue;
        }
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b if b == sep && depth == 0 => {
                parts.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&sql[start..]);
    parts
}

/// Offset of the `)` closing the `(` at `open`.
pub fn matching_paren(sql: &str, open: usize) -> Option<usize> {
    let regions = regions(sql);
    let bytes = sql.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    for i in open..bytes.len() {
        if regions[i] != Region::Code {
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Name of the function whose argument list encloses `pos`, if any.
///
/// `regions` must come from [`regions`] over the same text.
pub fn enclosing_call<'a>(sql: &'a str, regions: &[Region], pos: usize) -> Option<&'a str> {
    let bytes = sql.as_bytes();
    let mut depth = 0usize;
    let mut i = pos;

    while i > 0 {
        i -= 1;
        if regions[i] != Region::Code {
            continue;
        }
        match bytes[i] {
            b')' => depth += 1,
            b'(' if depth > 0 => depth -= 1,
            b'(' => {
                let name_end = sql[..i].trim_end().len();
                let name_start = sql[..name_end]
                    .bytes()
                    .rposition(|b| !is_word_byte(b))
                    .map_or(0, |p| p + 1);
                return Some(&sql[name_start..name_end]);
            }
            _ => {}
        }
    }
    None
}

/// The identifier immediately preceding `pos`, skipping whitespace.
pub fn word_before(sql: &str, pos: usize) -> &str {
    let end = sql[..pos].trim_end().len();
    let start = sql[..end]
        .bytes()
        .rposition(|b| !is_word_byte(b))
        .map_or(0, |p| p + 1);
    &sql[start..end]
}
