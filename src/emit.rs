//! Batched emission of compiled CSS.
//!
//! Compiled text is appended to a buffer. The first submission after the
//! buffer was drained schedules one flush with the host’s [`Tick`]; every
//! submission made before that flush runs is delivered in the same batch.
//!
//! ```text
//!          Submit               Tick              Flushed
//!   Idle ─────────▶ Pending ─────────▶ Flushing ─────────▶ Idle
//!                                        │  Submit
//!                                        └──▶ (reschedule after Flushed)
//! ```
//!
//! A failed flush or a refused schedule returns to `Idle` with the text kept
//! in the buffer. Nothing is retried until the next submission.

use crate::{Error, Result};
use core::{fmt, mem};
use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::{Rc, Weak},
};

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce() -> Result<()>>;

/// A host scheduler, which runs tasks after the current synchronous work.
pub trait Tick {
    /// Arranges for `task` to run later.
    fn schedule(&self, task: Task) -> Result<()>;
}

impl<F> Tick for F
where
    F: Fn(Task) -> Result<()>,
{
    #[inline]
    fn schedule(&self, task: Task) -> Result<()> {
        self(task)
    }
}

/// A scheduler which runs every task immediately.
#[derive(Clone, Copy, Debug, Default)]
pub struct Immediate;

impl Tick for Immediate {
    #[inline]
    fn schedule(&self, task: Task) -> Result<()> {
        task()
    }
}

/// A first-in first-out queue of deferred tasks, drained by the host.
#[derive(Clone, Default)]
pub struct TaskQueue(Rc<RefCell<VecDeque<Task>>>);

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of queued tasks.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns true if no tasks are queued.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Runs queued tasks until the queue is empty, including tasks queued by
    /// other tasks. Returns the number of tasks run.
    ///
    /// If a task fails, the remaining tasks stay queued.
    pub fn run_pending(&self) -> Result<usize> {
        let mut count = 0;
        loop {
            let task = self.0.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            task()?;
            count += 1;
        }
        Ok(count)
    }
}

impl Tick for TaskQueue {
    fn schedule(&self, task: Task) -> Result<()> {
        self.0.borrow_mut().push_back(task);
        Ok(())
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskQueue").field(&self.len()).finish()
    }
}

/// The destination of flushed CSS.
pub trait Sink {
    /// Consumes `text`, returning any part of it which was not consumed and
    /// should be delivered again with the next batch.
    fn flush(&mut self, text: &str) -> Result<Option<String>>;
}

impl<F> Sink for F
where
    F: FnMut(&str) -> Option<String>,
{
    #[inline]
    fn flush(&mut self, text: &str) -> Result<Option<String>> {
        Ok(self(text))
    }
}

/// A sink which inserts each batch as one style element of a shared
/// stylesheet.
#[derive(Clone, Debug, Default)]
pub struct StyleSheet(Rc<RefCell<Vec<String>>>);

impl StyleSheet {
    /// Creates an empty stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The text of each inserted element, in insertion order.
    pub fn elements(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    /// The number of inserted elements.
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Returns true if nothing was inserted.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// The concatenated text of every element.
    pub fn text(&self) -> String {
        self.0.borrow().concat()
    }
}

impl Sink for StyleSheet {
    fn flush(&mut self, text: &str) -> Result<Option<String>> {
        self.0.borrow_mut().push(text.to_string());
        Ok(None)
    }
}

/// The phase of a [`Scheduler`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Phase {
    /// Nothing is scheduled.
    #[default]
    Idle,
    /// A flush is scheduled and has not run yet.
    Pending,
    /// The sink is consuming a batch.
    Flushing,
}

/// An input to [`Scheduler::transition`].
#[derive(Debug)]
pub enum Event<'a> {
    /// Text was submitted.
    Submit(&'a str),
    /// The scheduled flush is running.
    Tick,
    /// The sink consumed a batch, returning an optional remainder.
    Flushed(Option<String>),
    /// The sink failed to consume the given batch.
    Failed(String),
    /// The host refused to schedule a flush.
    Unscheduled,
}

/// An output of [`Scheduler::transition`].
#[derive(Debug, Eq, PartialEq)]
pub enum Action {
    /// Schedule a flush with the host.
    Schedule,
    /// Deliver the text to the sink.
    Flush(String),
}

/// The emission buffer and its flush state.
#[derive(Debug, Default)]
pub struct Scheduler {
    /// Text waiting for a flush.
    buffer: String,
    /// The current phase.
    phase: Phase,
    /// Whether text arrived while the sink was consuming a batch.
    dirty: bool,
}

impl Scheduler {
    /// Applies `event`, returning what the caller must do next.
    pub fn transition(&mut self, event: Event<'_>) -> Option<Action> {
        log::trace!("{:?} + {event:?}", self.phase);
        match event {
            Event::Submit(text) => {
                self.buffer += text;
                match self.phase {
                    Phase::Idle if !self.buffer.is_empty() => {
                        self.phase = Phase::Pending;
                        Some(Action::Schedule)
                    }
                    Phase::Flushing if !text.is_empty() => {
                        self.dirty = true;
                        None
                    }
                    _ => None,
                }
            }
            Event::Tick => {
                if self.phase != Phase::Pending {
                    return None;
                }
                if self.buffer.is_empty() {
                    self.phase = Phase::Idle;
                    return None;
                }
                self.phase = Phase::Flushing;
                self.dirty = false;
                Some(Action::Flush(mem::take(&mut self.buffer)))
            }
            Event::Flushed(remainder) => {
                if let Some(mut remainder) = remainder {
                    remainder += &self.buffer;
                    self.buffer = remainder;
                }
                if mem::take(&mut self.dirty) {
                    self.phase = Phase::Pending;
                    Some(Action::Schedule)
                } else {
                    self.phase = Phase::Idle;
                    None
                }
            }
            Event::Failed(mut batch) => {
                batch += &self.buffer;
                self.buffer = batch;
                self.phase = Phase::Idle;
                self.dirty = false;
                None
            }
            Event::Unscheduled => {
                if self.phase == Phase::Pending {
                    log::warn!("flush of {} bytes could not be scheduled", self.buffer.len());
                    self.phase = Phase::Idle;
                }
                None
            }
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The text waiting for a flush.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }
}

/// State shared between an [`Emitter`] and its scheduled flushes.
struct Shared {
    /// The buffer and its flush state.
    state: RefCell<Scheduler>,
    /// The destination of flushed text.
    sink: RefCell<Box<dyn Sink>>,
    /// The host scheduler.
    tick: Rc<dyn Tick>,
}

/// A handle for submitting CSS for batched emission.
#[derive(Clone)]
pub struct Emitter(Rc<Shared>);

impl Emitter {
    /// Creates an emitter which delivers to `sink` on each `tick`.
    pub fn new(sink: Box<dyn Sink>, tick: Rc<dyn Tick>) -> Self {
        Self(Rc::new(Shared {
            state: RefCell::new(Scheduler::default()),
            sink: RefCell::new(sink),
            tick,
        }))
    }

    /// Appends `text` to the buffer, scheduling a flush if none is pending.
    pub fn submit(&self, text: &str) -> Result<()> {
        let action = self.0.state.borrow_mut().transition(Event::Submit(text));
        self.perform(action)
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.0.state.borrow().phase()
    }

    /// The text waiting for a flush.
    pub fn buffered(&self) -> String {
        self.0.state.borrow().buffered().to_string()
    }

    /// Carries out an action requested by the scheduler.
    fn perform(&self, action: Option<Action>) -> Result<()> {
        match action {
            Some(Action::Schedule) => {
                let weak = Rc::downgrade(&self.0);
                let result = self.0.tick.schedule(Box::new(move || Self::on_tick(&weak)));
                if result.is_err() {
                    self.0.state.borrow_mut().transition(Event::Unscheduled);
                }
                result
            }
            Some(Action::Flush(text)) => self.deliver(text),
            None => Ok(()),
        }
    }

    /// Runs a scheduled flush, unless the emitter is gone.
    fn on_tick(weak: &Weak<Shared>) -> Result<()> {
        let Some(shared) = weak.upgrade() else {
            return Ok(());
        };
        let this = Self(shared);
        let action = this.0.state.borrow_mut().transition(Event::Tick);
        this.perform(action)
    }

    /// Hands a batch to the sink.
    fn deliver(&self, text: String) -> Result<()> {
        log::debug!("flushing {} bytes", text.len());
        let result = self.0.sink.borrow_mut().flush(&text);
        match result {
            Ok(remainder) => {
                let action = self.0.state.borrow_mut().transition(Event::Flushed(remainder));
                self.perform(action)
            }
            Err(err) => {
                log::warn!("flush failed: {err}");
                self.0.state.borrow_mut().transition(Event::Failed(text));
                Err(err)
            }
        }
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("state", &self.0.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Wraps any error as a sink error.
pub fn sink_error(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
    Error::Sink(err.into())
}

/// Wraps any error as a scheduler error.
pub fn tick_error(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
    Error::Tick(err.into())
}
