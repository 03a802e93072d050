//! Nested selector composition.

/// The character replaced by the parent selector in a nested selector.
pub const PLACEHOLDER: char = '&';

/// Composes a nested selector `pattern` with its `parent` selector list.
///
/// Every unescaped placeholder in `pattern` is replaced by each compound
/// selector of `parent` in turn, and the results are joined as a selector
/// list. A pattern without any placeholder is returned unchanged.
///
/// ```
/// assert_eq!(ddcss::compose(".a, .b", "&:hover"), ".a:hover, .b:hover");
/// ```
pub fn compose(parent: &str, pattern: &str) -> String {
    if !has_placeholder(pattern) {
        return pattern.to_string();
    }

    let mut parts = split_list(parent);
    if parts.is_empty() {
        parts.push("");
    }

    parts
        .into_iter()
        .map(|part| replace_placeholder(pattern, part))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Returns true if `pattern` contains an unescaped placeholder.
fn has_placeholder(pattern: &str) -> bool {
    let mut iter = pattern.chars();
    while let Some(c) = iter.next() {
        if c == '\\' {
            iter.next();
        } else if c == PLACEHOLDER {
            return true;
        }
    }
    false
}

/// Replaces every unescaped placeholder in `pattern` with `selector`.
fn replace_placeholder(pattern: &str, selector: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + selector.len());
    let mut iter = pattern.chars();
    while let Some(c) = iter.next() {
        if c == '\\' {
            out.push(c);
            if let Some(next) = iter.next() {
                out.push(next);
            }
        } else if c == PLACEHOLDER {
            out += selector;
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits a selector list on its top-level commas.
///
/// Commas inside brackets, parentheses, or quoted strings do not split.
fn split_list(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut quote = None;
    let mut start = 0;
    let mut iter = selector.char_indices();

    while let Some((pos, c)) = iter.next() {
        match (quote, c) {
            (_, '\\') => {
                iter.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(selector[start..pos].trim_ascii());
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(selector[start..].trim_ascii());
    parts.retain(|part| !part.is_empty());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributes_over_list() {
        assert_eq!(compose(".a, .b", "&:hover"), ".a:hover, .b:hover");
        assert_eq!(compose(".x", "& > *"), ".x > *");
        assert_eq!(compose(".a,.b", "& &"), ".a .a, .b .b");
    }

    #[test]
    fn nested_commas_do_not_split() {
        assert_eq!(
            compose(":is(.a, .b), [data-x=\",\"]", "&.c"),
            ":is(.a, .b).c, [data-x=\",\"].c"
        );
    }

    #[test]
    fn escaped_placeholder_is_literal() {
        assert_eq!(compose(".a", "\\&&"), "\\&.a");
        assert_eq!(compose(".a, .b", "\\&"), "\\&");
    }

    #[test]
    fn no_placeholder() {
        assert_eq!(compose(".a, .b", "div > p"), "div > p");
    }

    #[test]
    fn empty_parent() {
        assert_eq!(compose("", "&:hover"), ":hover");
        assert_eq!(compose(" , ", "&"), "");
    }
}
