//! The style object compiler.
//!
//! Each key of a [`StyleNode`] is classified by its syntax and the macros in
//! scope, in this order:
//!
//! | Key              | Meaning                                        |
//! |------------------|------------------------------------------------|
//! | `$$`             | token resolver, composed into the chain        |
//! | `$$name`         | macro definition                               |
//! | `name` in scope  | macro invocation with the value as argument    |
//! | `name`, `$name`  | property (or custom property) declaration      |
//! | `@rule`          | at-rule wrapping a nested block                |
//! | anything else    | nested selector, usually containing `&`        |

use crate::{
    Error, Result,
    naming::key_to_property,
    resolve::substitute,
    scope::{GuardPolicy, Macro, MacroTable},
    selector::compose,
    value::{StyleNode, Value},
};
use core::fmt::Write as _;
use regex::Regex;
use std::sync::LazyLock;

/// The sigil introducing macro definitions and token resolvers.
pub const MACRO_SIGIL: &str = "$$";

/// The deepest allowed nesting of blocks and macro expansions.
pub const MAX_DEPTH: usize = 256;

/// Keys which may be property declarations.
static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$?[A-Za-z0-9_-]+$").expect("valid property pattern"));

/// The result of compiling one node.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Fragment {
    /// Declarations for the current selector.
    pub class_body: String,
    /// Nested rules and at-rules.
    pub outside_css: String,
}

impl Fragment {
    /// Wraps the declarations in a rule for `selector`, followed by the nested
    /// rules. No rule is emitted if there are no declarations.
    pub fn wrap(self, selector: &str) -> String {
        if self.class_body.is_empty() {
            self.outside_css
        } else {
            format!("{selector}{{{}}}{}", self.class_body, self.outside_css)
        }
    }

    /// Appends the output of a macro expansion.
    fn append(&mut self, other: Fragment) {
        self.class_body += &other.class_body;
        self.outside_css += &other.outside_css;
    }
}

/// The kind of a key.
enum Key<'a> {
    /// `$$`.
    Resolver,
    /// `$$name`.
    Define(&'a str),
    /// A visible macro name.
    Invoke(Macro),
    /// A property declaration.
    Property,
    /// `@rule`.
    AtRule,
    /// A nested selector.
    Selector,
}

impl Key<'_> {
    /// Classifies `key` with the given `value` in the scope of `frame`.
    fn classify<'a>(frame: &MacroTable, key: &'a str, value: &Value) -> Key<'a> {
        if key == MACRO_SIGIL {
            Key::Resolver
        } else if let Some(name) = key.strip_prefix(MACRO_SIGIL) {
            Key::Define(name)
        } else if let Some(entry) = frame.lookup(key) {
            Key::Invoke(entry)
        } else if value.is_primitive() && PROPERTY.is_match(key) {
            Key::Property
        } else if key.starts_with('@') {
            Key::AtRule
        } else {
            Key::Selector
        }
    }
}

/// A style object compiler.
#[derive(Clone, Copy, Debug, Default)]
pub struct Compiler {
    /// The naming convention for choosing macro scopes.
    policy: GuardPolicy,
}

impl Compiler {
    /// Creates a compiler using the given macro naming convention.
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    /// Compiles `node` for `selector` into CSS text.
    ///
    /// Macros are looked up in `scope`. If `export` is given, macros and token
    /// resolvers defined at the top level of `node` are copied into it.
    pub fn stringify(
        &self,
        node: &StyleNode,
        selector: &str,
        scope: &MacroTable,
        export: Option<&MacroTable>,
    ) -> Result<String> {
        Ok(self.compile(node, selector, scope, export)?.wrap(selector))
    }

    /// Compiles `node` for `selector` into a [`Fragment`].
    pub fn compile(
        &self,
        node: &StyleNode,
        selector: &str,
        scope: &MacroTable,
        export: Option<&MacroTable>,
    ) -> Result<Fragment> {
        self.compile_at(node, selector, scope, export, 0)
    }

    /// Compiles `node` at the given nesting `depth`.
    fn compile_at(
        &self,
        node: &StyleNode,
        selector: &str,
        enclosing: &MacroTable,
        export: Option<&MacroTable>,
        depth: usize,
    ) -> Result<Fragment> {
        let frame = enclosing.child();
        let mut out = Fragment::default();

        for (key, value) in node {
            match Key::classify(&frame, key, value) {
                Key::Resolver => {
                    let Value::Resolver(resolver) = value else {
                        return Err(Error::NotCallable(key.clone()));
                    };
                    frame.chain_resolver(resolver.clone());
                }
                Key::Define(name) => {
                    let body = if let Value::Macro(body) = value {
                        Some(body.clone())
                    } else {
                        log::warn!("macro '{name}' is defined with a non-callable value");
                        None
                    };
                    let captured = body
                        .as_ref()
                        .is_none_or(|body| body.mode().is_captured(name, self.policy));
                    frame.define(name, body, captured);
                }
                Key::Invoke(entry) => {
                    let depth = descend(depth, key)?;
                    let body = entry
                        .body
                        .ok_or_else(|| Error::NotCallable(key.clone()))?;
                    let scope = entry.scope.unwrap_or_else(|| frame.clone());
                    log::trace!("expand {key} in {selector}");
                    let expansion = body.call(value);
                    out.append(self.compile_at(&expansion, selector, &scope, Some(&frame), depth)?);
                }
                Key::Property => {
                    let property = key_to_property(key);
                    match value {
                        Value::String(text) => {
                            let text = substitute(text, key, &frame.resolver());
                            write!(out.class_body, "{property}:{text};")?;
                        }
                        value => write!(out.class_body, "{property}:{value};")?,
                    }
                }
                Key::AtRule => match value {
                    Value::Node(block) => {
                        let depth = descend(depth, key)?;
                        let body = self
                            .compile_at(block, selector, &frame, None, depth)?
                            .wrap(selector);
                        if !body.is_empty() {
                            write!(out.outside_css, "{key}{{{body}}}")?;
                        }
                    }
                    value if value.is_primitive() => {
                        write!(out.outside_css, "{key} {value};")?;
                    }
                    _ => log::warn!("ignoring at-rule '{key}' with a callable value"),
                },
                Key::Selector => {
                    if let Value::Node(block) = value {
                        let depth = descend(depth, key)?;
                        let nested = compose(selector, key);
                        out.outside_css += &self
                            .compile_at(block, &nested, &frame, None, depth)?
                            .wrap(&nested);
                    } else {
                        log::warn!("ignoring selector '{key}' without a style block");
                    }
                }
            }
        }

        if let Some(export) = export {
            frame.merge_into(export);
        }

        Ok(out)
    }
}

/// Returns the next nesting depth, or an error if it is too deep.
fn descend(depth: usize, key: &str) -> Result<usize> {
    if depth >= MAX_DEPTH {
        Err(Error::Recursion(key.to_string()))
    } else {
        Ok(depth + 1)
    }
}
