//! Timer queue and the `setTimeout` family bound to one run.
//!
//! Timers never touch the host's real clock from inside JavaScript: due times
//! are computed from the event loop's logical time, which the engine advances
//! before every step. Firing order is `(due, scheduling order)`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use boa_engine::object::builtins::JsFunction;
use boa_engine::{Context, JsNativeError, JsObject, JsResult, JsValue, NativeFunction};
use boa_gc::{Finalize, Trace};
use tokio::time::Instant;

use super::active::ActiveRun;
use crate::transcript::RunToken;

pub type TimerId = u32;

/// Smallest repeat period for `setInterval`; keeps a zero-delay interval
/// from spinning at a single instant.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Logical time of the event loop, shared with native bindings.
#[derive(Debug, Clone)]
pub struct LoopClock(Rc<Cell<Instant>>);

impl LoopClock {
    pub fn new(now: Instant) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn now(&self) -> Instant {
        self.0.get()
    }

    /// Set the clock, also backwards; used when a run starts.
    pub fn reset(&self, now: Instant) {
        self.0.set(now);
    }

    /// Move the clock forward; it never goes backwards.
    pub fn advance_to(&self, now: Instant) {
        if now > self.0.get() {
            self.0.set(now);
        }
    }
}

#[derive(Debug)]
struct TimerSlot<T> {
    key: (Instant, u64),
    repeat: Option<Duration>,
    task: T,
}

/// Pending timers ordered by due time, ties broken by scheduling order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    order: BTreeMap<(Instant, u64), TimerId>,
    slots: HashMap<TimerId, TimerSlot<T>>,
    next_id: TimerId,
    next_seq: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            order: BTreeMap::new(),
            slots: HashMap::new(),
            next_id: 1,
            next_seq: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, repeat: bool, task: T) -> TimerId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let repeat = repeat.then(|| delay.max(MIN_INTERVAL));
        self.insert(id, now + delay, repeat, task);
        id
    }

    fn insert(&mut self, id: TimerId, due: Instant, repeat: Option<Duration>, task: T) {
        let key = (due, self.next_seq);
        self.next_seq += 1;
        self.order.insert(key, id);
        self.slots.insert(id, TimerSlot { key, repeat, task });
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.slots.remove(&id) {
            Some(slot) => {
                self.order.remove(&slot.key);
                true
            }
            None => false,
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.order.keys().next().map(|(due, _)| *due)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every pending timer, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.order.clear();
        self.slots.clear();
        count
    }
}

impl<T: Clone> TimerQueue<T> {
    /// Take the earliest timer due at or before `now`.
    ///
    /// Intervals are rescheduled before their task is handed out, so a
    /// `clearInterval` issued from inside the callback cancels the next tick.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, Instant, T)> {
        let (&(due, seq), &id) = self.order.iter().next()?;
        if due > now {
            return None;
        }
        self.order.remove(&(due, seq));
        let slot = self.slots.remove(&id)?;
        if let Some(period) = slot.repeat {
            self.insert(id, due + period, Some(period), slot.task.clone());
        }
        Some((id, due, slot.task))
    }
}

/// A scheduled JavaScript callback.
#[derive(Debug, Clone)]
pub struct TimerTask {
    pub callback: JsFunction,
    pub args: Vec<JsValue>,
}

/// Timer state of one run.
#[derive(Debug)]
pub struct RunTimers {
    token: RunToken,
    clock: LoopClock,
    queue: RefCell<TimerQueue<TimerTask>>,
    closed: Cell<bool>,
}

impl RunTimers {
    pub fn new(token: RunToken, clock: LoopClock) -> Rc<Self> {
        Rc::new(Self {
            token,
            clock,
            queue: RefCell::new(TimerQueue::new()),
            closed: Cell::new(false),
        })
    }

    pub fn token(&self) -> RunToken {
        self.token
    }

    pub fn clock(&self) -> &LoopClock {
        &self.clock
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.queue.borrow().next_due()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn pop_due(&self, now: Instant) -> Option<(TimerId, Instant, TimerTask)> {
        self.queue.borrow_mut().pop_due(now)
    }

    /// Discard pending timers and refuse new ones; returns the discarded count.
    pub fn close(&self) -> usize {
        self.closed.set(true);
        self.queue.borrow_mut().clear()
    }

    fn schedule(&self, delay: Duration, repeat: bool, task: TimerTask) -> TimerId {
        if self.closed.get() {
            tracing::trace!(run = %self.token, "Ignoring timer scheduled by finished run");
            return 0;
        }
        let now = self.clock.now();
        self.queue.borrow_mut().schedule(now, delay, repeat, task)
    }

    fn cancel(&self, id: TimerId) {
        self.queue.borrow_mut().cancel(id);
    }
}

#[derive(Clone)]
enum TimerTarget {
    /// Bound to one run, as handed to the snippet body.
    Run(Rc<RunTimers>),
    /// Whichever run is executing, as installed on `globalThis`.
    Active(ActiveRun),
}

#[derive(Clone, Trace, Finalize)]
struct TimerCaptures {
    #[unsafe_ignore_trace]
    target: TimerTarget,
}

impl TimerCaptures {
    fn timers(&self) -> Option<Rc<RunTimers>> {
        match &self.target {
            TimerTarget::Run(timers) => Some(Rc::clone(timers)),
            TimerTarget::Active(active) => active.timers(),
        }
    }
}

/// `setTimeout`, `setInterval`, `clearTimeout`, `clearInterval`.
pub struct TimerFunctions {
    pub set_timeout: JsFunction,
    pub set_interval: JsFunction,
    pub clear_timeout: JsFunction,
    pub clear_interval: JsFunction,
}

impl TimerFunctions {
    /// Functions that always schedule on `timers`.
    pub fn bind(timers: &Rc<RunTimers>, context: &mut Context) -> Self {
        Self::build(TimerTarget::Run(Rc::clone(timers)), context)
    }

    /// Functions that schedule on the run currently executing, if any.
    pub fn bind_active(active: &ActiveRun, context: &mut Context) -> Self {
        Self::build(TimerTarget::Active(active.clone()), context)
    }

    fn build(target: TimerTarget, context: &mut Context) -> Self {
        let captures = TimerCaptures { target };
        let make = |f: fn(&JsValue, &[JsValue], &TimerCaptures, &mut Context) -> JsResult<JsValue>,
                    context: &mut Context| {
            NativeFunction::from_copy_closure_with_captures(f, captures.clone())
                .to_js_function(context.realm())
        };
        Self {
            set_timeout: make(set_timeout, context),
            set_interval: make(set_interval, context),
            clear_timeout: make(clear_timer, context),
            clear_interval: make(clear_timer, context),
        }
    }

    /// Values in wrapper parameter order.
    pub fn as_args(&self) -> [JsValue; 4] {
        [
            self.set_timeout.clone().into(),
            self.set_interval.clone().into(),
            self.clear_timeout.clone().into(),
            self.clear_interval.clone().into(),
        ]
    }

    /// `(global name, function)` pairs.
    pub fn named(&self) -> [(&'static str, JsFunction); 4] {
        [
            ("setTimeout", self.set_timeout.clone()),
            ("setInterval", self.set_interval.clone()),
            ("clearTimeout", self.clear_timeout.clone()),
            ("clearInterval", self.clear_interval.clone()),
        ]
    }
}

fn set_timeout(
    _this: &JsValue,
    args: &[JsValue],
    captures: &TimerCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    schedule(args, captures, false, context)
}

fn set_interval(
    _this: &JsValue,
    args: &[JsValue],
    captures: &TimerCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    schedule(args, captures, true, context)
}

fn schedule(
    args: &[JsValue],
    captures: &TimerCaptures,
    repeat: bool,
    context: &mut Context,
) -> JsResult<JsValue> {
    let callback = args
        .first()
        .and_then(|value| value.as_callable())
        .and_then(|object| JsFunction::from_object(JsObject::clone(&object)))
        .ok_or_else(|| {
            JsNativeError::typ().with_message("The \"callback\" argument must be of type function")
        })?;

    let delay_ms = match args.get(1) {
        Some(value) if !value.is_undefined() => value.to_number(context)?,
        _ => 0.0,
    };
    let task = TimerTask {
        callback,
        args: args.iter().skip(2).cloned().collect(),
    };
    let Some(timers) = captures.timers() else {
        tracing::trace!("Ignoring timer scheduled outside a run");
        return Ok(JsValue::from(0));
    };
    let id = timers.schedule(clamp_delay(delay_ms), repeat, task);
    Ok(JsValue::from(f64::from(id)))
}

fn clear_timer(
    _this: &JsValue,
    args: &[JsValue],
    captures: &TimerCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    if let Some(value) = args.first() {
        if !value.is_undefined() && !value.is_null() {
            let id = value.to_number(context)?;
            if id.is_finite() && id >= 1.0 && id <= f64::from(TimerId::MAX) {
                if let Some(timers) = captures.timers() {
                    timers.cancel(id as TimerId);
                }
            }
        }
    }
    Ok(JsValue::undefined())
}

/// Browsers treat negative, NaN and overflowing delays as zero.
fn clamp_delay(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 || ms > f64::from(i32::MAX) {
        Duration::ZERO
    } else {
        Duration::from_micros((ms * 1000.0) as u64)
    }
}
