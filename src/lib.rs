//! Compiles nested style objects into CSS, with lexically scoped macros and
//! token resolvers, and emits the result in deduplicated batches.
//!
//! ```
//! use ddcss::{Config, Css, Immediate, StyleSheet, Value, style};
//!
//! let sheet = StyleSheet::new();
//! let css = Css::new(
//!     [style! {
//!         "$$pad" => Value::macro_fn(|v| style! {
//!             "paddingTop" => v.clone(),
//!             "paddingBottom" => v.clone(),
//!         }),
//!     }],
//!     Config::new().tick(Immediate).sink(sheet.clone()),
//! )?;
//!
//! css.css(&style! { "pad" => "4px", "&:hover" => style! { "color" => "red" } }, Some(".x"))?;
//! assert_eq!(
//!     sheet.text(),
//!     ".x{padding-top:4px;padding-bottom:4px;}.x:hover{color:red;}"
//! );
//! # Ok::<(), ddcss::Error>(())
//! ```

#![warn(
    clippy::pedantic,
    clippy::missing_docs_in_private_items,
    missing_docs,
    rust_2018_idioms
)]

pub mod compile;
mod css;
pub mod emit;
pub mod filter;
pub mod naming;
pub mod resolve;
pub mod scope;
pub mod selector;
#[cfg(test)]
mod tests;
mod value;

pub use compile::{Compiler, Fragment};
pub use css::{Config, Css};
pub use emit::{Emitter, Immediate, Sink, StyleSheet, TaskQueue, Tick, sink_error, tick_error};
pub use filter::{Filter, SeenSet, fingerprint};
pub use resolve::Resolver;
pub use scope::{GuardPolicy, MacroTable, ScopeMode};
pub use selector::compose;
pub use value::{MacroFn, StyleNode, TokenFn, Value};

/// A style compilation or emission error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A write to a buffer failed.
    #[error("fmt error: {0}")]
    Fmt(#[from] core::fmt::Error),

    /// A style file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON style description could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A macro or token resolver key was bound to a value which is not a
    /// function.
    #[error("'{0}' is not callable")]
    NotCallable(String),

    /// Blocks or macro expansions were nested more than
    /// [`MAX_DEPTH`](compile::MAX_DEPTH) deep, usually because a macro
    /// expands to itself.
    #[error("nesting too deep at '{0}'")]
    Recursion(String),

    /// The output sink failed.
    #[error("sink error: {0}")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The host scheduler refused a flush.
    #[error("scheduler error: {0}")]
    Tick(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A JSON style description contained a value with no style meaning.
    #[error("unsupported {0} value")]
    UnsupportedValue(&'static str),
}

/// The result type for style compilation.
pub type Result<T, E = Error> = core::result::Result<T, E>;
