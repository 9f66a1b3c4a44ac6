//! Console interception.
//!
//! A [`ConsoleInterceptor`] is the console of one run. It is handed to the
//! snippet as a parameter and also swapped over `globalThis.console` for the
//! duration of each step through an [`InterceptGuard`], which puts the page's
//! console back when the step ends, however it ends.

pub mod host;
pub mod methods;

use std::cell::{Cell, RefCell};
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

use boa_engine::object::builtins::JsArray;
use boa_engine::property::PropertyDescriptor;
use boa_engine::{js_string, Context, JsObject, JsResult, JsString, JsValue, NativeFunction};
use boa_gc::{Finalize, Trace};
use tokio::time::Instant;

pub use methods::{ConsoleMethod, ConsoleState, CONSOLE_METHODS};

use crate::config::RenderConfig;
use crate::engine::inspect::{Inspector, Thrown};
use crate::engine::page::PageHelpers;
use crate::engine::timers::LoopClock;
use crate::error::PlaygroundError;
use crate::transcript::{OutputKind, PendingRecord, RecorderHandle, RenderedValue, RunToken};
use crate::util::logging::DIAGNOSTICS_TARGET;

struct RunConsole {
    recorder: RecorderHandle,
    token: RunToken,
    helpers: Rc<PageHelpers>,
    render: RenderConfig,
    clock: LoopClock,
    started: Cell<Instant>,
    state: RefCell<ConsoleState>,
    object: RefCell<Option<JsObject>>,
    sealed: Cell<bool>,
    faulted: Cell<bool>,
}

impl RunConsole {
    fn elapsed_ms(&self) -> u64 {
        self.clock
            .now()
            .saturating_duration_since(self.started.get())
            .as_millis() as u64
    }

    fn accepts(&self) -> bool {
        !self.sealed.get() && self.recorder.is_current(self.token)
    }

    fn call(&self, name: &str, args: &[JsValue], context: &mut Context) {
        if !self.accepts() {
            tracing::trace!(
                target: DIAGNOSTICS_TARGET,
                run = %self.token,
                method = name,
                "Ignoring console call from inactive run"
            );
            return;
        }

        let method = ConsoleMethod::from_name(name);
        // Rendering can re-enter the console through user proxies, so state
        // is only borrowed once every argument is rendered.
        let rendered = Inspector::new(&self.helpers, &self.render).inspect_all(args, context);
        let records = self.state.borrow_mut().apply(
            &method,
            rendered,
            self.clock.now(),
            &self.render,
        );

        let elapsed = self.elapsed_ms();
        for record in records {
            self.recorder.append(self.token, record.at(elapsed));
        }
    }
}

#[derive(Clone, Trace, Finalize)]
struct CaptureTarget {
    #[unsafe_ignore_trace]
    console: Weak<RunConsole>,
}

fn capture(
    _this: &JsValue,
    args: &[JsValue],
    target: &CaptureTarget,
    context: &mut Context,
) -> JsResult<JsValue> {
    let Some(console) = target.console.upgrade() else {
        return Ok(JsValue::undefined());
    };
    let Some(name) = args.first() else {
        return Ok(JsValue::undefined());
    };
    let name = name.to_string(context)?.to_std_string_escaped();
    console.call(&name, &args[1..], context);
    Ok(JsValue::undefined())
}

/// The console of one run, bound to a recorder and a run token.
///
/// Cloning shares the same console.
#[derive(Clone)]
pub struct ConsoleInterceptor {
    inner: Rc<RunConsole>,
}

impl std::fmt::Debug for ConsoleInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleInterceptor")
            .field("token", &self.inner.token)
            .field("sealed", &self.inner.sealed.get())
            .field("faulted", &self.inner.faulted.get())
            .finish()
    }
}

impl ConsoleInterceptor {
    pub fn new(
        recorder: RecorderHandle,
        token: RunToken,
        helpers: Rc<PageHelpers>,
        render: RenderConfig,
    ) -> Self {
        let now = Instant::now();
        Self {
            inner: Rc::new(RunConsole {
                recorder,
                token,
                helpers,
                render,
                clock: LoopClock::new(now),
                started: Cell::new(now),
                state: RefCell::new(ConsoleState::new()),
                object: RefCell::new(None),
                sealed: Cell::new(false),
                faulted: Cell::new(false),
            }),
        }
    }

    pub fn token(&self) -> RunToken {
        self.inner.token
    }

    pub fn clock(&self) -> &LoopClock {
        &self.inner.clock
    }

    /// Start the run's logical clock at `now`.
    pub fn rebase(&self, now: Instant) {
        self.inner.clock.reset(now);
        self.inner.started.set(now);
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.inner.elapsed_ms()
    }

    /// Stop recording; later calls are ignored even if the run is current.
    pub fn seal(&self) {
        self.inner.sealed.set(true);
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.sealed.get()
    }

    /// Whether a guard failed to restore the page console on drop.
    pub fn is_faulted(&self) -> bool {
        self.inner.faulted.get()
    }

    /// Record an uncaught error at group depth zero.
    pub fn record_uncaught(&self, text: String, value: Option<RenderedValue>) -> Option<u64> {
        if !self.inner.accepts() {
            return None;
        }
        let record = PendingRecord::new(OutputKind::Uncaught, text)
            .with_args(value.into_iter().collect())
            .at(self.elapsed_ms());
        self.inner.recorder.append(self.inner.token, record)
    }

    /// Describe a thrown value with this console's rendering settings.
    pub fn inspect_thrown(&self, value: &JsValue, context: &mut Context) -> Thrown {
        Inspector::new(&self.inner.helpers, &self.inner.render).thrown_value(value, context)
    }

    /// Record a playground notice.
    pub fn record_diagnostic(&self, text: impl Into<String>) -> Option<u64> {
        if !self.inner.accepts() {
            return None;
        }
        let record = PendingRecord::new(OutputKind::Diagnostic, text).at(self.elapsed_ms());
        self.inner.recorder.append(self.inner.token, record)
    }

    /// The JavaScript console object, created on first use.
    pub fn console_object(&self, context: &mut Context) -> Result<JsObject, PlaygroundError> {
        if let Some(object) = self.inner.object.borrow().as_ref() {
            return Ok(object.clone());
        }

        let capture = NativeFunction::from_copy_closure_with_captures(
            capture,
            CaptureTarget {
                console: Rc::downgrade(&self.inner),
            },
        )
        .to_js_function(context.realm());
        let names = JsArray::from_iter(
            CONSOLE_METHODS
                .iter()
                .map(|name| JsValue::from(JsString::from(*name))),
            context,
        );

        let helpers = Rc::clone(&self.inner.helpers);
        let object = helpers
            .call(
                &helpers.make_console,
                &[capture.into(), names.into()],
                context,
            )
            .ok()
            .and_then(|value| value.as_object().map(|object| JsObject::clone(&object)))
            .ok_or_else(|| {
                PlaygroundError::InterceptorFault("could not build run console".to_string())
            })?;

        *self.inner.object.borrow_mut() = Some(object.clone());
        Ok(object)
    }

    /// Swap the run console over `globalThis.console`.
    ///
    /// The returned guard dereferences to the context; run the snippet's step
    /// through it and call [`InterceptGuard::restore`] afterwards.
    pub fn install<'c>(
        &self,
        context: &'c mut Context,
    ) -> Result<InterceptGuard<'c>, PlaygroundError> {
        let console = self.console_object(context)?;
        let global = context.global_object();
        let original = global
            .get(js_string!("console"), context)
            .map_err(|e| PlaygroundError::InterceptorFault(format!("read console: {e}")))?;

        let installed = global
            .set(js_string!("console"), console, false, context)
            .map_err(|e| PlaygroundError::InterceptorFault(format!("install console: {e}")))?;
        if !installed {
            return Err(PlaygroundError::InterceptorFault(
                "global console is not writable".to_string(),
            ));
        }

        Ok(InterceptGuard {
            context,
            original,
            console: Rc::clone(&self.inner),
            active: true,
        })
    }
}

/// Keeps the run console installed until restored or dropped.
pub struct InterceptGuard<'c> {
    context: &'c mut Context,
    original: JsValue,
    console: Rc<RunConsole>,
    active: bool,
}

impl InterceptGuard<'_> {
    /// Put the original console back.
    ///
    /// Idempotent: after the first call Drop no longer restores.
    pub fn restore(&mut self) -> Result<(), PlaygroundError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.put_back()
    }

    fn put_back(&mut self) -> Result<(), PlaygroundError> {
        let global = self.context.global_object();
        let assigned = global
            .set(js_string!("console"), self.original.clone(), false, self.context)
            .unwrap_or(false);
        if assigned && self.original_in_place() {
            return Ok(());
        }

        // The snippet redefined the binding; force it back.
        let descriptor = PropertyDescriptor::builder()
            .value(self.original.clone())
            .writable(true)
            .enumerable(false)
            .configurable(true)
            .build();
        let forced = global.define_property_or_throw(js_string!("console"), descriptor, self.context);
        match forced {
            Ok(_) if self.original_in_place() => {
                tracing::debug!(run = %self.console.token, "Forced console restoration");
                Ok(())
            }
            Ok(_) => {
                self.console.faulted.set(true);
                Err(PlaygroundError::InterceptorFault(
                    "console binding did not take the restored value".to_string(),
                ))
            }
            Err(e) => {
                self.console.faulted.set(true);
                Err(PlaygroundError::InterceptorFault(format!(
                    "console could not be restored: {e}"
                )))
            }
        }
    }

    fn original_in_place(&mut self) -> bool {
        let global = self.context.global_object();
        let Ok(current) = global.get(js_string!("console"), self.context) else {
            return false;
        };
        match (
            current.as_object().map(|o| JsObject::clone(&o)),
            self.original.as_object().map(|o| JsObject::clone(&o)),
        ) {
            (Some(current), Some(original)) => JsObject::equals(&current, &original),
            (None, None) => current.is_undefined() && self.original.is_undefined(),
            _ => false,
        }
    }
}

impl Deref for InterceptGuard<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &*self.context
    }
}

impl DerefMut for InterceptGuard<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut *self.context
    }
}

impl Drop for InterceptGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            // Best effort: nothing can be propagated from Drop
            if let Err(e) = self.put_back() {
                self.console.faulted.set(true);
                tracing::warn!(
                    target: DIAGNOSTICS_TARGET,
                    run = %self.console.token,
                    error = %e,
                    "Console restore failed in Drop"
                );
            }
        }
    }
}
