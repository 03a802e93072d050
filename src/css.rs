//! The compiler instance handle.

use crate::{
    Result,
    compile::Compiler,
    emit::{Emitter, Sink, StyleSheet, TaskQueue, Tick},
    filter::{Filter, SeenSet, fingerprint},
    scope::{GuardPolicy, MacroTable},
    value::StyleNode,
};
use core::fmt;
use std::{cell::RefCell, rc::Rc};

/// The selector used to compile anonymous rule sets before their fingerprint
/// is known.
const ANONYMOUS: &str = ".$&";

/// A factory for per-instance dedup filters.
type FilterFactory = Box<dyn Fn() -> Box<dyn Filter>>;

/// Configuration for a [`Css`] instance.
pub struct Config {
    /// The selector for global styles.
    root: String,
    /// The host scheduler, or `None` to use an instance-owned [`TaskQueue`].
    tick: Option<Rc<dyn Tick>>,
    /// The destination of flushed CSS.
    sink: Box<dyn Sink>,
    /// Creates the instance’s dedup filter.
    filter: FilterFactory,
    /// The naming convention for choosing macro scopes.
    guard: GuardPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: ":root".into(),
            tick: None,
            sink: Box::new(StyleSheet::new()),
            filter: Box::new(|| Box::new(SeenSet::new()) as Box<dyn Filter>),
            guard: GuardPolicy::default(),
        }
    }
}

impl Config {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selector for global styles.
    #[must_use]
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Sets the host scheduler.
    #[must_use]
    pub fn tick(mut self, tick: impl Tick + 'static) -> Self {
        self.tick = Some(Rc::new(tick));
        self
    }

    /// Sets the destination of flushed CSS.
    #[must_use]
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Sets the dedup filter factory.
    #[must_use]
    pub fn filter<F: Filter + 'static>(mut self, factory: impl Fn() -> F + 'static) -> Self {
        self.filter = Box::new(move || Box::new(factory()) as Box<dyn Filter>);
        self
    }

    /// Sets the naming convention for choosing macro scopes.
    #[must_use]
    pub fn guard(mut self, guard: GuardPolicy) -> Self {
        self.guard = guard;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("tick", &self.tick.is_some())
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

/// A style compiler instance with its own global macros, emission buffer, and
/// dedup filter.
pub struct Css {
    /// The selector for global styles.
    root: String,
    /// The object compiler.
    compiler: Compiler,
    /// Macros and token resolvers defined by global styles.
    macros: MacroTable,
    /// The emission buffer.
    emitter: Emitter,
    /// The dedup filter.
    filter: RefCell<Box<dyn Filter>>,
    /// The instance-owned scheduler, if none was configured.
    queue: Option<TaskQueue>,
}

impl Css {
    /// Creates an instance, compiling and submitting `globals` in order.
    ///
    /// Macros and token resolvers defined at the top level of each global
    /// node are visible to every later compilation on this instance.
    pub fn new(globals: impl IntoIterator<Item = StyleNode>, config: Config) -> Result<Self> {
        let (tick, queue) = match config.tick {
            Some(tick) => (tick, None),
            None => {
                let queue = TaskQueue::new();
                (Rc::new(queue.clone()) as Rc<dyn Tick>, Some(queue))
            }
        };

        let this = Self {
            root: config.root,
            compiler: Compiler::new(config.guard),
            macros: MacroTable::new(),
            emitter: Emitter::new(config.sink, tick),
            filter: RefCell::new((config.filter)()),
            queue,
        };

        for node in globals {
            let text = this
                .compiler
                .stringify(&node, &this.root, &this.macros, Some(&this.macros))?;
            this.emitter.submit(&text)?;
        }

        Ok(this)
    }

    /// Compiles `node` for `selector` without emitting anything.
    pub fn compile(&self, node: &StyleNode, selector: &str) -> Result<String> {
        self.compiler.stringify(node, selector, &self.macros, None)
    }

    /// Compiles `node` and schedules it for emission unless the dedup filter
    /// rejects it.
    ///
    /// If `class_name` is `None`, a class name is generated from the
    /// fingerprint of the compiled text. Returns the class name used.
    pub fn css(&self, node: &StyleNode, class_name: Option<&str>) -> Result<String> {
        if let Some(class_name) = class_name {
            let text = self.compile(node, class_name)?;
            if self.accept(&fingerprint(&text), node) {
                self.emitter.submit(&text)?;
            }
            return Ok(class_name.to_string());
        }

        let text = self.compile(node, ANONYMOUS)?;
        let hash = fingerprint(&text);
        if self.accept(&hash, node) {
            self.emitter
                .submit(&text.replace(ANONYMOUS, &format!(".{hash}")))?;
        }
        Ok(hash)
    }

    /// Asks the dedup filter whether to emit.
    fn accept(&self, hash: &str, node: &StyleNode) -> bool {
        let accepted = self.filter.borrow_mut().should_emit(hash, node);
        if !accepted {
            log::debug!("skipping duplicate {hash}");
        }
        accepted
    }

    /// Runs flushes scheduled on the instance-owned queue. Does nothing if a
    /// scheduler was configured. Returns the number of flushes run.
    pub fn run_pending(&self) -> Result<usize> {
        self.queue.as_ref().map_or(Ok(0), TaskQueue::run_pending)
    }

    /// The selector for global styles.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Macros and token resolvers defined by global styles.
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// The emission buffer.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }
}

impl fmt::Debug for Css {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Css")
            .field("root", &self.root)
            .field("macros", &self.macros)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Immediate, Value, style};

    fn immediate() -> (StyleSheet, Config) {
        let sheet = StyleSheet::new();
        let config = Config::new().tick(Immediate).sink(sheet.clone());
        (sheet, config)
    }

    #[test]
    fn empty_input() {
        let (sheet, config) = immediate();
        let css = Css::new([], config).unwrap();
        css.css(&StyleNode::new(), None).unwrap();
        assert!(sheet.is_empty());
    }

    #[test]
    fn explicit_class_name() {
        let (sheet, config) = immediate();
        let css = Css::new([], config).unwrap();
        let node = style! { "fontSize" => "16px", "&:hover" => style! { "color" => "red" } };
        assert_eq!(css.css(&node, Some(".x")).unwrap(), ".x");
        assert_eq!(sheet.text(), ".x{font-size:16px;}.x:hover{color:red;}");
    }

    #[test]
    fn anonymous_class_name() {
        let (sheet, config) = immediate();
        let css = Css::new([], config).unwrap();
        let node = style! { "fontSize" => "1rem", "&:hover" => style! { "color" => "red" } };
        let name = css.css(&node, None).unwrap();
        assert_eq!(name.len(), 7);
        assert_eq!(
            sheet.text(),
            format!(".{name}{{font-size:1rem;}}.{name}:hover{{color:red;}}")
        );
    }

    #[test]
    fn known_anonymous_class_name() {
        let (sheet, config) = immediate();
        let css = Css::new([], config).unwrap();
        let name = css.css(&style! { "fontSize" => "1rem" }, None).unwrap();
        assert_eq!(name, "_bxyv4r");
        assert_eq!(sheet.text(), "._bxyv4r{font-size:1rem;}");
    }

    #[test]
    fn shared_filter_suppresses_duplicates() {
        let (sheet, config) = immediate();
        let css = Css::new([], config).unwrap();
        let node = style! { "fontSize" => "1rem" };
        let a = css.css(&node, None).unwrap();
        let b = css.css(&node, None).unwrap();
        assert_eq!(a, b);
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn fresh_filters_emit_identical_text() {
        let node = style! { "fontSize" => "1rem" };
        let (a, config) = immediate();
        Css::new([], config).unwrap().css(&node, Some(".x")).unwrap();
        let (b, config) = immediate();
        Css::new([], config).unwrap().css(&node, Some(".x")).unwrap();
        assert_eq!(a.text(), b.text());
        assert_eq!(a.text(), ".x{font-size:1rem;}");
    }

    #[test]
    fn compile_has_no_side_effects() {
        let (sheet, config) = immediate();
        let css = Css::new([], config).unwrap();
        let node = style! { "color" => "red" };
        assert_eq!(css.compile(&node, ".x").unwrap(), ".x{color:red;}");
        assert_eq!(css.compile(&node, ".x").unwrap(), ".x{color:red;}");
        assert!(sheet.is_empty());
        css.css(&node, Some(".x")).unwrap();
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn global_macros() {
        let (sheet, config) = immediate();
        let globals = [
            style! {
                "$$pad" => Value::macro_fn(|v| style! {
                    "paddingTop" => v.clone(),
                    "paddingBottom" => v.clone(),
                }),
            },
            style! { "$gap" => "4px" },
        ];
        let css = Css::new(globals, config).unwrap();
        assert_eq!(sheet.text(), ":root{--gap:4px;}");
        assert_eq!(
            css.compile(&style! { "pad" => "$gap" }, ".x").unwrap(),
            ".x{padding-top:var(--gap);padding-bottom:var(--gap);}"
        );
        assert!(css.macros().contains("pad"));
    }

    #[test]
    fn default_queue_batches() {
        let sheet = StyleSheet::new();
        let css = Css::new(
            [style! { "color" => "black" }],
            Config::new().root("html").sink(sheet.clone()),
        )
        .unwrap();
        css.css(&style! { "color" => "red" }, Some(".a")).unwrap();
        css.css(&style! { "color" => "blue" }, Some(".b")).unwrap();
        assert!(sheet.is_empty());
        assert_eq!(css.run_pending().unwrap(), 1);
        assert_eq!(
            sheet.elements(),
            ["html{color:black;}.a{color:red;}.b{color:blue;}"]
        );
        assert_eq!(css.run_pending().unwrap(), 0);
    }

    #[test]
    fn custom_filter_sees_node() {
        let (sheet, config) = immediate();
        let config = config.filter(|| |_: &str, node: &StyleNode| node.get("skip").is_none());
        let css = Css::new([], config).unwrap();
        css.css(&style! { "skip" => 1 }, Some(".a")).unwrap();
        css.css(&style! { "keep" => 1 }, Some(".b")).unwrap();
        css.css(&style! { "keep" => 1 }, Some(".b")).unwrap();
        assert_eq!(sheet.elements(), [".b{keep:1;}", ".b{keep:1;}"]);
    }

    #[test]
    fn custom_guard_policy() {
        let (_, config) = immediate();
        let css = Css::new(
            [style! {
                "$$wrap" => Value::macro_fn(|_| style! { "inner" => 1 }),
                "$$inner" => Value::macro_fn(|_| style! { "color" => "red" }),
            }],
            config.guard(GuardPolicy::Never),
        )
        .unwrap();
        assert_eq!(
            css.compile(&style! { "wrap" => 1 }, ".x").unwrap(),
            ".x{color:red;}"
        );
    }
}
