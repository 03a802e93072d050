//! Lexically scoped macro tables.
//!
//! Each compiled [`StyleNode`](crate::StyleNode) gets a fresh frame whose
//! parent is the frame of the enclosing node. Macro lookups walk outward
//! through the parents, so nearer definitions shadow farther ones without
//! changing them.

use crate::{
    resolve::Resolver,
    value::{MacroFn, TokenFn},
};
use core::fmt;
use std::{cell::RefCell, collections::HashMap, rc::Rc};

/// Which scope a macro expansion is compiled in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScopeMode {
    /// The expansion sees a snapshot of the macros visible where the macro
    /// was defined, not including the macro itself.
    Captured,
    /// The expansion sees the macros visible where the macro is invoked,
    /// including siblings defined after it.
    Shared,
    /// The [`GuardPolicy`] decides from the macro name.
    #[default]
    ByName,
}

impl ScopeMode {
    /// Returns true if the macro `name` should capture its definition scope.
    pub fn is_captured(self, name: &str, policy: GuardPolicy) -> bool {
        match self {
            Self::Captured => true,
            Self::Shared => false,
            Self::ByName => policy.is_captured(name),
        }
    }
}

/// The naming convention used to choose a scope for [`ScopeMode::ByName`]
/// macros.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum GuardPolicy {
    /// Every macro captures its definition scope.
    Always,
    /// No macro captures its definition scope.
    Never,
    /// Macros whose names do not start with an ASCII uppercase letter capture
    /// their definition scope.
    #[default]
    LowercaseCaptured,
    /// Macros whose names start with an ASCII uppercase letter capture their
    /// definition scope.
    UppercaseCaptured,
}

impl GuardPolicy {
    /// Returns true if the macro `name` should capture its definition scope.
    pub fn is_captured(self, name: &str) -> bool {
        let upper = name.starts_with(|c: char| c.is_ascii_uppercase());
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::LowercaseCaptured => !upper,
            Self::UppercaseCaptured => upper,
        }
    }
}

/// A macro table entry.
#[derive(Clone, Debug)]
pub(crate) struct Macro {
    /// The expansion function, or `None` if the definition was not callable.
    pub body: Option<MacroFn>,
    /// The captured scope, or `None` to use the scope at the invocation site.
    pub scope: Option<MacroTable>,
}

/// One frame of a macro table.
#[derive(Default)]
struct Frame {
    /// The enclosing frame.
    parent: Option<MacroTable>,
    /// Macros defined in this frame.
    macros: RefCell<HashMap<String, Macro>>,
    /// The token resolver chain, if one was composed in this frame.
    resolver: RefCell<Option<Resolver>>,
}

/// A reference to a frame in a chain of macro tables.
#[derive(Clone, Default)]
pub struct MacroTable(Rc<Frame>);

impl MacroTable {
    /// Creates an empty root table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty frame whose parent is this frame.
    #[must_use]
    pub(crate) fn child(&self) -> Self {
        Self(Rc::new(Frame {
            parent: Some(self.clone()),
            ..Frame::default()
        }))
    }

    /// Defines a macro in this frame.
    pub(crate) fn define(&self, name: &str, body: Option<MacroFn>, captured: bool) {
        let scope = captured.then(|| self.snapshot());
        log::trace!("define {name} (captured: {captured})");
        self.0
            .macros
            .borrow_mut()
            .insert(name.to_string(), Macro { body, scope });
    }

    /// Finds the nearest definition of the macro `name`.
    pub(crate) fn lookup(&self, name: &str) -> Option<Macro> {
        let mut frame = self;
        loop {
            if let Some(entry) = frame.0.macros.borrow().get(name) {
                return Some(entry.clone());
            }
            frame = frame.0.parent.as_ref()?;
        }
    }

    /// Returns true if the macro `name` is visible from this frame.
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Returns true if the macro `name` is visible from this frame and is
    /// callable.
    pub fn is_callable(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|entry| entry.body.is_some())
    }

    /// Composes `head` in front of the token resolver chain visible from this
    /// frame.
    pub(crate) fn chain_resolver(&self, head: TokenFn) {
        let chained = self.resolver().chain(head);
        *self.0.resolver.borrow_mut() = Some(chained);
    }

    /// Returns the token resolver chain visible from this frame.
    pub fn resolver(&self) -> Resolver {
        let mut frame = self;
        loop {
            if let Some(resolver) = &*frame.0.resolver.borrow() {
                return resolver.clone();
            }
            match &frame.0.parent {
                Some(parent) => frame = parent,
                None => return Resolver::default(),
            }
        }
    }

    /// Copies the macros and token resolver defined in this frame into
    /// `target`.
    pub(crate) fn merge_into(&self, target: &MacroTable) {
        if Rc::ptr_eq(&self.0, &target.0) {
            return;
        }

        let macros = self.0.macros.borrow();
        target.0.macros.borrow_mut().extend(
            macros
                .iter()
                .map(|(name, entry)| (name.clone(), entry.clone())),
        );
        if let Some(resolver) = &*self.0.resolver.borrow() {
            *target.0.resolver.borrow_mut() = Some(resolver.clone());
        }
    }

    /// Flattens every macro visible from this frame into a new root frame.
    fn snapshot(&self) -> Self {
        let mut chain = Vec::new();
        let mut frame = Some(self);
        while let Some(current) = frame {
            chain.push(current);
            frame = current.0.parent.as_ref();
        }

        let mut macros = HashMap::new();
        for frame in chain.into_iter().rev() {
            macros.extend(
                frame
                    .0
                    .macros
                    .borrow()
                    .iter()
                    .map(|(name, entry)| (name.clone(), entry.clone())),
            );
        }

        Self(Rc::new(Frame {
            parent: None,
            macros: RefCell::new(macros),
            resolver: RefCell::new(Some(self.resolver())),
        }))
    }

    /// The names of the macros defined in this frame, sorted.
    pub fn own_names(&self) -> Vec<String> {
        let mut names = self.0.macros.borrow().keys().cloned().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for MacroTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroTable")
            .field("macros", &self.own_names())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}
