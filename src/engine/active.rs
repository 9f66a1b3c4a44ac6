//! The run whose code is currently executing on a page.
//!
//! Page-level globals (`globalThis.setTimeout`, `queueMicrotask` error
//! reporting) dispatch through this slot. The engine fills it for the length
//! of one step and empties it afterwards.

use std::cell::RefCell;
use std::rc::Rc;

use boa_engine::{Context, JsResult, JsValue, NativeFunction};
use boa_gc::{Finalize, Trace};

use super::outcome::{ErrorInfo, ErrorPhase};
use super::timers::RunTimers;
use crate::console::ConsoleInterceptor;
use crate::error::ErrorKind;
use crate::util::logging::DEVCONSOLE_TARGET;

/// What a step exposes to the page's globals.
#[derive(Debug, Clone)]
pub struct RunBinding {
    pub timers: Rc<RunTimers>,
    pub console: ConsoleInterceptor,
    /// Errors thrown by queued callbacks, collected for the engine
    pub errors: Rc<RefCell<Vec<ErrorInfo>>>,
}

#[derive(Debug, Clone, Default)]
pub struct ActiveRun(Rc<RefCell<Option<RunBinding>>>);

impl ActiveRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self, binding: RunBinding) {
        *self.0.borrow_mut() = Some(binding);
    }

    pub fn leave(&self) {
        self.0.borrow_mut().take();
    }

    pub fn is_active(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn timers(&self) -> Option<Rc<RunTimers>> {
        self.0.borrow().as_ref().map(|binding| Rc::clone(&binding.timers))
    }

    fn binding(&self) -> Option<RunBinding> {
        self.0.borrow().clone()
    }

    /// Report an error thrown straight out of a queued callback.
    ///
    /// Outside a run it goes to the developer console.
    pub fn report(&self, error: &JsValue, context: &mut Context) {
        let Some(binding) = self.binding() else {
            let text = error
                .to_string(context)
                .map(|s| s.to_std_string_escaped())
                .unwrap_or_else(|_| "<error>".to_string());
            tracing::error!(target: DEVCONSOLE_TARGET, "Uncaught {text}");
            return;
        };

        let thrown = binding.console.inspect_thrown(error, context);
        let info = ErrorInfo::from_thrown(
            &thrown,
            ErrorKind::AsynchronousRuntimeError,
            ErrorPhase::Microtask,
        );
        binding
            .console
            .record_uncaught(info.uncaught_callback_text(), thrown.value);
        tracing::debug!(run = %binding.timers.token(), error = %info.headline(), "Queued callback threw");
        binding.errors.borrow_mut().push(info);
    }

    /// Native `reportError(error)` handed to the page prelude.
    pub fn report_function(&self, context: &mut Context) -> JsValue {
        NativeFunction::from_copy_closure_with_captures(
            report_error,
            ActiveCaptures {
                active: self.clone(),
            },
        )
        .to_js_function(context.realm())
        .into()
    }
}

#[derive(Clone, Trace, Finalize)]
pub(crate) struct ActiveCaptures {
    #[unsafe_ignore_trace]
    pub(crate) active: ActiveRun,
}

fn report_error(
    _this: &JsValue,
    args: &[JsValue],
    captures: &ActiveCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    let error = args.first().cloned().unwrap_or_else(JsValue::undefined);
    captures.active.report(&error, context);
    Ok(JsValue::undefined())
}
