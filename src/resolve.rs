//! Token substitution in property values.
//!
//! A property value is split into identifier tokens, quoted strings, and
//! everything else. Identifier tokens and quoted strings are passed through a
//! chain of token resolvers, newest first; everything else is copied as-is.
//! A `$$name` token is resolved as `name`, falling back to `var(--name)`.
//! Tokens starting with `\` are never resolved.
//!
//! ```text
//! 1px solid $brandColor $$16dp
//! ^^^ ^^^^^ ^^^^^^^^^^^ ^^^^^^  resolved
//!    ^     ^           ^        copied
//! ```

use crate::{naming::name_to_var, value::TokenFn};
use core::fmt;
use std::rc::Rc;

/// A chain of token resolvers.
///
/// The chain always ends with the built-in resolver, so resolution always
/// produces text.
#[derive(Clone, Default)]
pub struct Resolver(Option<Rc<Link>>);

/// One resolver in a [`Resolver`] chain.
struct Link {
    /// The resolver tried first.
    head: TokenFn,
    /// The resolvers tried if `head` declines.
    next: Resolver,
}

impl Resolver {
    /// Returns a new chain which tries `head` before this chain.
    #[must_use]
    pub fn chain(&self, head: TokenFn) -> Self {
        Self(Some(Rc::new(Link {
            head,
            next: self.clone(),
        })))
    }

    /// Resolves `token` found in the value of `property`.
    pub fn resolve(&self, token: &str, property: &str) -> String {
        if token.starts_with('\\') {
            return token.to_string();
        }
        match token.strip_prefix("$$") {
            Some(name) if is_name(name) => self
                .user(name, property)
                .unwrap_or_else(|| name_to_var(name)),
            _ => self.user(token, property).unwrap_or_else(|| builtin(token)),
        }
    }

    /// Tries each user resolver in turn.
    fn user(&self, token: &str, property: &str) -> Option<String> {
        let mut cursor = self;
        while let Some(link) = &cursor.0 {
            if let Some(text) = link.head.call(token, property) {
                return Some(text);
            }
            cursor = &link.next;
        }
        None
    }

    /// The number of user resolvers in the chain.
    pub fn len(&self) -> usize {
        let mut len = 0;
        let mut cursor = self;
        while let Some(link) = &cursor.0 {
            len += 1;
            cursor = &link.next;
        }
        len
    }

    /// Returns true if the chain contains only the built-in resolver.
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resolver").field(&self.len()).finish()
    }
}

/// The built-in resolver.
///
/// `$name` becomes a reference to the custom property `--name`; anything else
/// is returned unchanged.
fn builtin(token: &str) -> String {
    match token.strip_prefix('$') {
        Some(name) if is_name(name) => name_to_var(name),
        _ => token.to_string(),
    }
}

/// Returns true if `name` is left after removing a token’s sigils.
#[inline]
fn is_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('$')
}

/// Returns true if `c` can be part of an identifier token.
#[inline]
fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '$' | '_' | '-' | '\\')
}

/// Substitutes every token in the value of `property` using `resolver`.
pub fn substitute(value: &str, property: &str, resolver: &Resolver) -> String {
    let mut out = String::with_capacity(value.len());
    let mut token_start = None;
    let mut iter = value.char_indices();

    while let Some((pos, c)) = iter.next() {
        if is_ident(c) {
            token_start.get_or_insert(pos);
            continue;
        }

        if let Some(start) = token_start.take() {
            out += &resolver.resolve(&value[start..pos], property);
        }

        if c == '"' || c == '\'' {
            let mut end = value.len();
            while let Some((pos, next)) = iter.next() {
                if next == '\\' {
                    iter.next();
                } else if next == c {
                    end = pos + c.len_utf8();
                    break;
                }
            }
            out += &resolver.resolve(&value[pos..end], property);
        } else {
            out.push(c);
        }
    }

    if let Some(start) = token_start {
        out += &resolver.resolve(&value[start..], property);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dp() -> TokenFn {
        TokenFn::new(|token, _| {
            let n = token.strip_suffix("dp")?.parse::<f64>().ok()?;
            Some(format!("{}rem", n / 16.0))
        })
    }

    #[test]
    fn builtin_rules() {
        let chain = Resolver::default();
        assert_eq!(chain.resolve("$brandColor", "color"), "var(--brand-color)");
        assert_eq!(chain.resolve("red", "color"), "red");
        assert_eq!(chain.resolve("$", "color"), "$");
        assert_eq!(chain.resolve("$$brandColor", "color"), "var(--brand-color)");
        assert_eq!(chain.resolve("$$", "color"), "$$");
        assert_eq!(chain.resolve("\\$x", "color"), "\\$x");
    }

    #[test]
    fn macro_variables_drop_sigils() {
        let chain = Resolver::default().chain(dp());
        assert_eq!(chain.resolve("$$16dp", "fontSize"), "1rem");
        assert_eq!(chain.resolve("$$brand", "color"), "var(--brand)");
        assert_eq!(
            substitute("$$16dp $$brand \\$$16dp", "margin", &chain),
            "1rem var(--brand) \\$$16dp"
        );
    }

    #[test]
    fn escaped_tokens_skip_resolvers() {
        let chain = Resolver::default().chain(TokenFn::new(|_, _| Some("resolved".into())));
        assert_eq!(chain.resolve("\\$x", "color"), "\\$x");
        assert_eq!(chain.resolve("\\$$x", "color"), "\\$$x");
        assert_eq!(chain.resolve("x", "color"), "resolved");
    }

    #[test]
    fn chain_falls_back() {
        let chain = Resolver::default().chain(dp());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.resolve("14dp", "fontSize"), "0.875rem");
        assert_eq!(chain.resolve("14px", "fontSize"), "14px");
        assert_eq!(chain.resolve("$gap", "margin"), "var(--gap)");
    }

    #[test]
    fn newest_first() {
        let outer = Resolver::default().chain(TokenFn::new(|t, _| (t == "a").then(|| "outer".into())));
        let inner = outer.chain(TokenFn::new(|t, _| (t == "a").then(|| "inner".into())));
        assert_eq!(inner.resolve("a", ""), "inner");
        assert_eq!(outer.resolve("a", ""), "outer");
    }

    #[test]
    fn property_is_passed() {
        let chain = Resolver::default()
            .chain(TokenFn::new(|t, prop| (t == "x").then(|| prop.to_string())));
        assert_eq!(substitute("x y", "zIndex", &chain), "zIndex y");
    }

    #[test]
    fn identity_without_sigils() {
        let chain = Resolver::default();
        for text in [
            "1px solid red",
            "calc(100% - 2px)",
            "url(\"a b.png\")",
            "'unterminated",
            "#fff !important",
            "rgba(0, 0, 0, .5)",
            "",
        ] {
            assert_eq!(substitute(text, "x", &chain), text);
        }
    }

    #[test]
    fn tokens() {
        let chain = Resolver::default().chain(dp());
        assert_eq!(
            substitute("calc($gap + 16dp) 8dp", "margin", &chain),
            "calc(var(--gap) + 1rem) 0.5rem"
        );
        assert_eq!(substitute("\\$gap", "margin", &chain), "\\$gap");
    }

    #[test]
    fn quoted_strings_are_one_token() {
        let chain = Resolver::default()
            .chain(TokenFn::new(|t, _| (t == "'$x'").then(|| "'quoted'".into())));
        assert_eq!(substitute("'$x' $x", "content", &chain), "'quoted' var(--x)");
        assert_eq!(
            substitute(r#""a \" $x" $y"#, "content", &Resolver::default()),
            r#""a \" $x" var(--y)"#
        );
    }
}
