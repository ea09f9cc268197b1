use super::context::enter_context;
use super::event::Event;
use super::poller::Poller;
use super::poller::common::Interest;
use super::timer::{TimerCallback, TimerEntry};
use crate::utils::Slab;

use std::collections::BinaryHeap;
use std::io;
use std::mem;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Source of unique reactor identifiers.
static NEXT_REACTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Callback run each time an armed registration becomes ready.
pub(crate) type IoCallback = Box<dyn FnMut(&mut Reactor, Token) + Send>;

/// Identifies a file descriptor registration inside a [`Reactor`].
///
/// Slots are reused after a registration is removed; the generation
/// tells a new registration apart from the one that held the slot before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Token {
    /// Packs the token into the poller's per-descriptor user data.
    pub(crate) fn key(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub(crate) fn from_key(key: u64) -> Self {
        Self {
            index: key as u32,
            generation: (key >> 32) as u32,
        }
    }

    fn slot(self) -> usize {
        self.index as usize
    }
}

/// A file descriptor registered with the reactor.
struct Registration {
    fd: RawFd,
    generation: u32,
    interest: Interest,

    /// Taken out while the callback runs, so the callback can borrow the reactor.
    callback: Option<IoCallback>,

    /// Whether the descriptor has been added to the poller yet.
    added: bool,

    /// Whether a readiness report is outstanding.
    armed: bool,
}

/// The reactor.
///
/// A single-threaded, callback-oriented event loop. The reactor:
/// - polls OS I/O readiness for registered file descriptors,
/// - runs timers in deadline order,
/// - runs every callback on the thread that called [`run`](Self::run).
///
/// Registrations are one-shot: after a registration's callback has been
/// run it stays quiet until it is [`arm`](Self::arm)ed again. This is
/// what lets a command base stop consuming commands while one of them is
/// pending.
///
/// The reactor is `Send`, so it can be built and populated on one
/// thread and then moved to the thread that drives it.
pub struct Reactor {
    /// Unique identifier, used to detect calls made from the loop's own thread.
    id: u64,

    /// Platform-specific poller.
    poller: Poller,

    /// Buffer used to collect I/O events from the poller.
    events: Vec<Event>,

    /// Min-heap of pending timers ordered by deadline.
    timers: BinaryHeap<TimerEntry>,

    /// Sequence counter for FIFO ordering of equal deadlines.
    timer_sequence: u64,

    /// Slab storing registrations indexed by poller tokens.
    io: Slab<Registration>,

    /// Generation handed to the next registration.
    next_generation: u32,

    /// Number of registrations currently armed.
    armed: usize,

    /// Set by [`stop`](Self::stop); checked after every callback.
    stopped: bool,
}

impl Reactor {
    /// Creates a reactor with default settings.
    pub fn new() -> io::Result<Self> {
        Self::builder().build()
    }

    /// Returns a builder to configure a reactor.
    pub fn builder() -> super::ReactorBuilder {
        super::ReactorBuilder::new()
    }

    pub(crate) fn with_capacity(event_capacity: usize) -> io::Result<Self> {
        Ok(Self {
            id: NEXT_REACTOR_ID.fetch_add(1, Ordering::Relaxed),
            poller: Poller::new(event_capacity)?,
            events: Vec::with_capacity(event_capacity),
            timers: BinaryHeap::new(),
            timer_sequence: 0,
            io: Slab::new(event_capacity),
            next_generation: 0,
            armed: 0,
            stopped: false,
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Registers a file descriptor.
    ///
    /// The registration starts disarmed; call [`arm`](Self::arm) to wait
    /// for readiness. The callback receives the reactor and the token of
    /// its own registration.
    ///
    /// The reactor does not take ownership of `fd`: the caller must keep
    /// it open until the registration is removed.
    pub fn register<F>(&mut self, fd: RawFd, interest: Interest, callback: F) -> Token
    where
        F: FnMut(&mut Reactor, Token) + Send + 'static,
    {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let index = self.io.insert(Registration {
            fd,
            generation,
            interest,
            callback: Some(Box::new(callback)),
            added: false,
            armed: false,
        });

        let token = Token {
            index: index as u32,
            generation,
        };

        trace!(target: "reactor", ?token, fd, "registered descriptor");
        token
    }

    /// Arms a registration for one readiness report.
    ///
    /// Arming an already armed registration does nothing.
    pub fn arm(&mut self, token: Token) -> io::Result<()> {
        let Some(registration) = lookup(&mut self.io, token) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "unknown reactor registration",
            ));
        };

        if registration.armed {
            return Ok(());
        }

        if registration.added {
            self.poller
                .modify(registration.fd, token.key(), registration.interest)?;
        } else {
            self.poller
                .add(registration.fd, token.key(), registration.interest)?;
            registration.added = true;
        }

        registration.armed = true;
        self.armed += 1;

        Ok(())
    }

    /// Returns `true` if `token` names a live registration.
    pub fn is_registered(&self, token: Token) -> bool {
        self.io
            .get(token.slot())
            .is_some_and(|registration| registration.generation == token.generation)
    }

    /// Removes a registration.
    ///
    /// May be called from inside the registration's own callback; the
    /// callback is dropped once it returns.
    pub fn deregister(&mut self, token: Token) {
        if !self.is_registered(token) {
            return;
        }

        let Some(registration) = self.io.remove(token.slot()) else {
            return;
        };

        if registration.armed {
            self.armed -= 1;
        }

        if registration.added {
            // The descriptor may already be closed by its owner.
            let _ = self.poller.delete(registration.fd);
        }

        trace!(target: "reactor", ?token, "deregistered descriptor");
    }

    /// Runs `callback` on the reactor thread once `delay` has elapsed.
    pub fn add_timer<F>(&mut self, delay: Duration, callback: F)
    where
        F: FnOnce(&mut Reactor) + Send + 'static,
    {
        self.push_timer(Instant::now() + delay, Box::new(callback));
    }

    /// Runs `callback` on the next loop iteration.
    pub fn defer<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut Reactor) + Send + 'static,
    {
        self.add_timer(Duration::ZERO, callback);
    }

    fn push_timer(&mut self, deadline: Instant, callback: TimerCallback) {
        let sequence = self.timer_sequence;
        self.timer_sequence += 1;

        self.timers.push(TimerEntry {
            deadline,
            sequence,
            callback,
        });
    }

    /// Breaks out of [`run`](Self::run) once the current callback returns.
    ///
    /// Events already collected for the current iteration are not run.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Returns `true` once [`stop`](Self::stop) has been called during the current run.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Main reactor event loop.
    ///
    /// Runs until [`stop`](Self::stop) is called, or until there is
    /// nothing left to wait for (no armed registration and no timer).
    ///
    /// Each iteration:
    /// 1. Fires expired timers
    /// 2. Polls the OS for readiness (bounded by the next timer)
    /// 3. Runs the callbacks of ready registrations
    pub fn run(&mut self) -> io::Result<()> {
        self.stopped = false;

        let id = self.id;
        enter_context(id, || self.run_loop())
    }

    fn run_loop(&mut self) -> io::Result<()> {
        loop {
            self.fire_timers();

            if self.stopped {
                debug!(target: "reactor", "reactor stopped");
                return Ok(());
            }

            if self.armed == 0 && self.timers.is_empty() {
                debug!(target: "reactor", "no events left, leaving loop");
                return Ok(());
            }

            let timeout = self
                .timers
                .peek()
                .map(|t| t.deadline.saturating_duration_since(Instant::now()));

            let mut events = mem::take(&mut self.events);
            let polled = self.poller.poll(&mut events, timeout);

            if let Err(err) = polled {
                self.events = events;
                return Err(err);
            }

            for event in &events {
                if self.stopped {
                    break;
                }
                self.handle_event(event);
            }

            self.events = events;
        }
    }

    /// Fires every timer whose deadline has passed.
    fn fire_timers(&mut self) {
        let now = Instant::now();

        while let Some(timer) = self.timers.peek() {
            if timer.deadline > now || self.stopped {
                break;
            }

            if let Some(timer) = self.timers.pop() {
                (timer.callback)(self);
            }
        }
    }

    /// Runs the callback for a single readiness event.
    fn handle_event(&mut self, event: &Event) {
        let token = Token::from_key(event.key);

        // Stale report: the slot was freed or reused earlier in this batch,
        // or the registration was re-armed meanwhile.
        let Some(registration) = lookup(&mut self.io, token) else {
            return;
        };

        if !registration.armed || !(event.readable || event.writable) {
            return;
        }

        registration.armed = false;
        self.armed -= 1;

        let Some(mut callback) = registration.callback.take() else {
            return;
        };

        callback(self, token);

        // Put the callback back unless it deregistered itself.
        if let Some(registration) = lookup(&mut self.io, token) {
            if registration.callback.is_none() {
                registration.callback = Some(callback);
            }
        }
    }
}

/// Finds the live registration `token` names, if any.
fn lookup(io: &mut Slab<Registration>, token: Token) -> Option<&mut Registration> {
    io.get_mut(token.slot())
        .filter(|registration| registration.generation == token.generation)
}
