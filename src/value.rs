//! Style description values.
//!
//! A style description is a tree of [`StyleNode`]s. Each node is an ordered
//! mapping from keys to [`Value`]s, and the order of insertion is the order in
//! which declarations and nested rules are emitted.

use crate::{Error, Result, scope::ScopeMode};
use core::fmt;
use indexmap::IndexMap;
use std::{borrow::Cow, path::Path, rc::Rc};

/// The body of a macro, which expands one argument into a style description.
pub type MacroBody = dyn Fn(&Value) -> StyleNode;

/// The body of a token resolver, which maps `(token, property)` to
/// replacement text, or `None` if it does not handle the token.
pub type TokenBody = dyn Fn(&str, &str) -> Option<String>;

/// A callable macro definition.
#[derive(Clone)]
pub struct MacroFn {
    /// The expansion function.
    body: Rc<MacroBody>,
    /// Which scope the expansion is compiled in.
    mode: ScopeMode,
}

impl MacroFn {
    /// Creates a new macro with the given scope mode.
    pub fn new(mode: ScopeMode, body: impl Fn(&Value) -> StyleNode + 'static) -> Self {
        Self {
            body: Rc::new(body),
            mode,
        }
    }

    /// Expands the macro with the given argument.
    #[inline]
    pub fn call(&self, arg: &Value) -> StyleNode {
        (self.body)(arg)
    }

    /// The scope mode requested at definition time.
    #[inline]
    pub fn mode(&self) -> ScopeMode {
        self.mode
    }
}

impl fmt::Debug for MacroFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroFn")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// A callable token resolver.
#[derive(Clone)]
pub struct TokenFn(Rc<TokenBody>);

impl TokenFn {
    /// Creates a new token resolver.
    pub fn new(body: impl Fn(&str, &str) -> Option<String> + 'static) -> Self {
        Self(Rc::new(body))
    }

    /// Resolves `token` found in the value of `property`.
    #[inline]
    pub fn call(&self, token: &str, property: &str) -> Option<String> {
        (self.0)(token, property)
    }
}

impl fmt::Debug for TokenFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenFn")
    }
}

/// A value in a style description.
#[derive(Clone, Debug)]
pub enum Value {
    /// A string primitive.
    String(String),
    /// A number primitive.
    Number(f64),
    /// A nested style description.
    Node(StyleNode),
    /// A macro definition.
    Macro(MacroFn),
    /// A token resolver.
    Resolver(TokenFn),
}

impl Value {
    /// Creates a macro whose scope is chosen by the compiler’s
    /// [`GuardPolicy`](crate::GuardPolicy).
    pub fn macro_fn(body: impl Fn(&Value) -> StyleNode + 'static) -> Self {
        Self::Macro(MacroFn::new(ScopeMode::ByName, body))
    }

    /// Creates a macro which only sees the macros visible where it was
    /// defined.
    pub fn captured_macro(body: impl Fn(&Value) -> StyleNode + 'static) -> Self {
        Self::Macro(MacroFn::new(ScopeMode::Captured, body))
    }

    /// Creates a macro which sees the macros visible where it is invoked.
    pub fn shared_macro(body: impl Fn(&Value) -> StyleNode + 'static) -> Self {
        Self::Macro(MacroFn::new(ScopeMode::Shared, body))
    }

    /// Creates a token resolver.
    ///
    /// The body receives each token of a property value, with any leading
    /// `$$` removed, and the key of the owning property. Returning `None`
    /// passes the token on to the next resolver.
    pub fn resolver(body: impl Fn(&str, &str) -> Option<String> + 'static) -> Self {
        Self::Resolver(TokenFn::new(body))
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// Returns the numeric value of a number, or of a string which parses as
    /// one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim_ascii().parse().ok(),
            _ => None,
        }
    }

    /// Returns the nested node, if this is a node.
    pub fn as_node(&self) -> Option<&StyleNode> {
        if let Self::Node(node) = self {
            Some(node)
        } else {
            None
        }
    }

    /// Returns the text of a primitive value.
    pub fn to_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(s) => Some(Cow::Borrowed(s)),
            Self::Number(n) => Some(Cow::Owned(format_number(*n))),
            _ => None,
        }
    }

    /// Returns true if this value is a string or a number.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::String(_) | Self::Number(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Node(_) => f.write_str("[node]"),
            Self::Macro(_) => f.write_str("[macro]"),
            Self::Resolver(_) => f.write_str("[resolver]"),
        }
    }
}

/// Formats a number the way a script host would print it in a declaration.
fn format_number(n: f64) -> String {
    if n == 0.0 {
        "0".into()
    } else if n.is_infinite() {
        if n.is_sign_positive() {
            "Infinity".into()
        } else {
            "-Infinity".into()
        }
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => text,
        }
    } else {
        n.to_string()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<StyleNode> for Value {
    fn from(value: StyleNode) -> Self {
        Self::Node(value)
    }
}

impl From<MacroFn> for Value {
    fn from(value: MacroFn) -> Self {
        Self::Macro(value)
    }
}

impl From<TokenFn> for Value {
    fn from(value: TokenFn) -> Self {
        Self::Resolver(value)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        Ok(match value {
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Number(n) => {
                Self::Number(n.as_f64().ok_or(Error::UnsupportedValue("number"))?)
            }
            serde_json::Value::Bool(b) => Self::String(b.to_string()),
            serde_json::Value::Object(map) => Self::Node(StyleNode::try_from_json_map(map)?),
            serde_json::Value::Null => return Err(Error::UnsupportedValue("null")),
            serde_json::Value::Array(_) => return Err(Error::UnsupportedValue("array")),
        })
    }
}

/// An ordered mapping of style keys to values.
#[derive(Clone, Debug, Default)]
pub struct StyleNode(IndexMap<String, Value>);

impl StyleNode {
    /// Creates an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a key, returning the node for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a key. Replacing an existing key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Gets the value of a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the node has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the keys and values in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Parses a node from a JSON object string.
    pub fn from_json(text: &str) -> Result<Self> {
        match serde_json::from_str::<serde_json::Value>(text)? {
            serde_json::Value::Object(map) => Self::try_from_json_map(map),
            _ => Err(Error::UnsupportedValue("non-object root")),
        }
    }

    /// Parses a list of nodes from JSON text containing either one object or
    /// an array of objects.
    pub fn list_from_json(text: &str) -> Result<Vec<Self>> {
        match serde_json::from_str::<serde_json::Value>(text)? {
            serde_json::Value::Object(map) => Ok(vec![Self::try_from_json_map(map)?]),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::Object(map) => Self::try_from_json_map(map),
                    _ => Err(Error::UnsupportedValue("non-object list item")),
                })
                .collect(),
            _ => Err(Error::UnsupportedValue("non-object root")),
        }
    }

    /// Reads a node from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Reads a list of nodes from a JSON file, as
    /// [`list_from_json`](Self::list_from_json) does.
    pub fn list_from_path(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        Self::list_from_json(&std::fs::read_to_string(path)?)
    }

    /// Converts a JSON object, keeping its key order.
    fn try_from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        map.into_iter()
            .map(|(key, value)| Ok::<_, Error>((key, Value::try_from(value)?)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for StyleNode {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a StyleNode {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Builds a [`StyleNode`] from `key => value` pairs, in order.
///
/// ```
/// let node = ddcss::style! {
///     "fontSize" => "16px",
///     "&:hover" => ddcss::style! { "color" => "red" },
/// };
/// assert_eq!(node.len(), 2);
/// ```
#[macro_export]
macro_rules! style {
    () => { $crate::StyleNode::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut node = $crate::StyleNode::new();
        $(node.insert($key, $value);)+
        node
    }};
}
