//! Identifier-style to hyphenated-style name conversion.

use std::borrow::Cow;

/// Converts a camel-case identifier to a hyphenated CSS name.
///
/// Every ASCII uppercase letter becomes a hyphen followed by its lowercase
/// form, so a leading uppercase letter produces a leading hyphen, as needed
/// for vendor-prefixed properties (`WebkitUserSelect` becomes
/// `-webkit-user-select`).
pub fn camel_to_kebab(name: &str) -> Cow<'_, str> {
    if !name.bytes().any(|b| b.is_ascii_uppercase()) {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Converts a property key to a property name.
///
/// A single leading `$` marks a custom property.
pub fn key_to_property(key: &str) -> String {
    if let Some(name) = key.strip_prefix('$') {
        format!("--{}", camel_to_kebab(name))
    } else {
        camel_to_kebab(key).into_owned()
    }
}

/// Converts a custom property name to a `var()` reference.
pub fn name_to_var(name: &str) -> String {
    format!("var(--{})", camel_to_kebab(name))
}
