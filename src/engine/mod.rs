//! Snippet execution: compile, run the synchronous body, then drive
//! microtasks and timers until the run settles.

pub mod active;
pub mod inspect;
pub mod outcome;
pub mod page;
pub mod rejections;
pub mod timers;

use std::cell::RefCell;
use std::rc::Rc;

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::{JsFunction, JsPromise};
use boa_engine::{JsError, JsObject, JsValue};
use tokio::time::Instant;

pub use active::{ActiveRun, RunBinding};
pub use inspect::{Inspector, Thrown};
pub use outcome::{ErrorInfo, ErrorPhase, RunOutcome};
pub use page::Page;
pub use rejections::RejectionTracker;
pub use timers::{LoopClock, TimerQueue};

use crate::config::PlaygroundConfig;
use crate::console::ConsoleInterceptor;
use crate::error::{ErrorKind, PlaygroundError};
use crate::transcript::{RecorderHandle, RunToken};
use crate::util::logging::DIAGNOSTICS_TARGET;
use timers::{RunTimers, TimerFunctions, TimerTask};

/// One run in progress (or finished) on an [`ExecutionEngine`].
#[derive(Debug)]
pub struct Execution {
    console: ConsoleInterceptor,
    timers: Rc<RunTimers>,
    deadline: Instant,
    first_async_error: Option<ErrorInfo>,
    /// Errors thrown by `queueMicrotask` callbacks, already recorded
    queued_errors: Rc<RefCell<Vec<ErrorInfo>>>,
    outcome: Option<RunOutcome>,
}

impl Execution {
    pub fn token(&self) -> RunToken {
        self.console.token()
    }

    pub fn console(&self) -> &ConsoleInterceptor {
        &self.console
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Logical time of the run's event loop.
    pub fn loop_time(&self) -> Instant {
        self.timers.clock().now()
    }
}

enum Step {
    Body {
        function: JsFunction,
        args: Vec<JsValue>,
    },
    Timer(TimerTask),
}

impl Step {
    fn phase(&self) -> ErrorPhase {
        match self {
            Step::Body { .. } => ErrorPhase::Synchronous,
            Step::Timer(_) => ErrorPhase::Macrotask,
        }
    }
}

/// Runs snippets on one page.
pub struct ExecutionEngine {
    config: PlaygroundConfig,
    page: Page,
}

impl ExecutionEngine {
    pub fn new(config: PlaygroundConfig) -> Result<Self, PlaygroundError> {
        let page = Page::new(&config)?;
        Ok(Self { config, page })
    }

    pub fn config(&self) -> &PlaygroundConfig {
        &self.config
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    /// Replace the configuration. Runtime limits take effect when the page
    /// is next rebuilt.
    pub fn set_config(&mut self, config: PlaygroundConfig) {
        self.config = config;
    }

    /// Create the console for run `token`, rebuilding the page first if a
    /// previous fault left it unusable.
    pub fn bind_console(
        &mut self,
        recorder: RecorderHandle,
        token: RunToken,
    ) -> Result<ConsoleInterceptor, PlaygroundError> {
        if self.page.is_poisoned() {
            tracing::info!(run = %token, "Rebuilding playground page after interceptor fault");
            self.page = Page::new(&self.config)?;
        }
        Ok(ConsoleInterceptor::new(
            recorder,
            token,
            Rc::clone(self.page.helpers()),
            self.config.render,
        ))
    }

    /// Compile the snippet and run its synchronous body plus the microtasks
    /// it queues.
    pub fn begin(&mut self, source: &str, console: ConsoleInterceptor, now: Instant) -> Execution {
        console.rebase(now);
        let timers = RunTimers::new(console.token(), console.clock().clone());
        let mut execution = Execution {
            console,
            timers,
            deadline: now + self.config.run_timeout,
            first_async_error: None,
            queued_errors: Rc::default(),
            outcome: None,
        };

        self.page.sweep_globals();
        self.page.tracker().clear();

        let function = match self.page.compile(source) {
            Ok(function) => function,
            Err(e) => {
                let info = self.error_info(&e, ErrorKind::CompileError, ErrorPhase::Synchronous);
                execution.console.record_uncaught(info.uncaught_text(), None);
                tracing::debug!(run = %execution.token(), error = %info.headline(), "Snippet failed to compile");
                self.finish(&mut execution, RunOutcome::CompileError { error: info });
                return execution;
            }
        };

        let bindings = TimerFunctions::bind(&execution.timers, self.page.context_mut());
        let console_object = match execution.console.console_object(self.page.context_mut()) {
            Ok(object) => object,
            Err(e) => {
                let outcome = self.fault(&mut execution, e, ErrorPhase::Synchronous);
                self.finish(&mut execution, outcome);
                return execution;
            }
        };
        let [set_timeout, set_interval, clear_timeout, clear_interval] = bindings.as_args();
        let args = vec![
            console_object.into(),
            set_timeout,
            set_interval,
            clear_timeout,
            clear_interval,
            self.page.helpers().queue_microtask.clone().into(),
        ];

        tracing::debug!(run = %execution.token(), "Running snippet body");
        if let Some(outcome) = self.run_step(&mut execution, Step::Body { function, args }) {
            self.finish(&mut execution, outcome);
            return execution;
        }
        self.settle(&mut execution);
        execution
    }

    /// Fire every timer due at `now`, then decide whether the run settled.
    pub fn advance(&mut self, execution: &mut Execution, now: Instant) {
        if execution.is_finished() {
            return;
        }
        if execution.console.is_faulted() {
            let error = PlaygroundError::InterceptorFault("console restore failed".to_string());
            let outcome = self.fault(execution, error, ErrorPhase::Macrotask);
            self.finish(execution, outcome);
            return;
        }

        let horizon = now.min(execution.deadline);
        loop {
            match execution.timers.next_due() {
                Some(due) if due <= horizon && due < execution.deadline => {}
                _ => break,
            }
            let Some((id, due, task)) = execution.timers.pop_due(horizon) else {
                break;
            };
            // Callbacks observe the time they were due, not when we woke up.
            execution.timers.clock().advance_to(due);
            tracing::trace!(run = %execution.token(), timer = id, "Firing timer");
            if let Some(outcome) = self.run_step(execution, Step::Timer(task)) {
                self.finish(execution, outcome);
                return;
            }
        }
        execution.timers.clock().advance_to(horizon);
        self.settle(execution);
    }

    /// When the run next needs [`ExecutionEngine::advance`].
    pub fn next_wakeup(&self, execution: &Execution) -> Option<Instant> {
        if execution.is_finished() {
            return None;
        }
        Some(match execution.timers.next_due() {
            Some(due) => due.min(execution.deadline),
            None => execution.deadline,
        })
    }

    /// Abandon a run that is being superseded.
    ///
    /// Its timers are discarded and microtasks it left behind are drained
    /// under its own console, which no longer records anything.
    pub fn cancel(&mut self, mut execution: Execution) {
        let discarded = execution.timers.close();
        execution.console.seal();
        if discarded > 0 {
            tracing::debug!(run = %execution.token(), discarded, "Discarded timers of superseded run");
        }

        let active = self.page.active_run().clone();
        active.enter(execution.binding());
        let mut failed = false;
        match execution.console.install(self.page.context_mut()) {
            Ok(mut guard) => {
                if let Err(e) = guard.run_jobs() {
                    tracing::debug!(error = %e, "Superseded run's microtasks failed");
                }
                if let Err(e) = guard.restore() {
                    tracing::warn!(target: DIAGNOSTICS_TARGET, run = %execution.token(), error = %e, "Console fault while cancelling run");
                    failed = true;
                }
            }
            Err(e) => {
                tracing::warn!(target: DIAGNOSTICS_TARGET, run = %execution.token(), error = %e, "Console fault while cancelling run");
                failed = true;
            }
        }
        active.leave();
        if failed {
            self.page.poison();
        }
        self.page.tracker().clear();
        if execution.outcome.is_none() {
            execution.outcome = Some(RunOutcome::Completed {
                dropped_timers: discarded,
            });
        }
    }

    /// Drive one run to completion on the tokio clock.
    pub async fn run(&mut self, source: &str, console: ConsoleInterceptor) -> RunOutcome {
        let mut execution = self.begin(source, console, Instant::now());
        loop {
            if let Some(outcome) = execution.outcome() {
                return outcome.clone();
            }
            if let Some(at) = self.next_wakeup(&execution) {
                tokio::time::sleep_until(at).await;
            }
            self.advance(&mut execution, Instant::now());
        }
    }

    fn run_step(&mut self, execution: &mut Execution, step: Step) -> Option<RunOutcome> {
        let phase = step.phase();
        let helpers = Rc::clone(self.page.helpers());
        let tracker = Rc::clone(self.page.tracker());
        let render = self.config.render;

        let active = self.page.active_run().clone();
        active.enter(execution.binding());

        let mut failure = None;
        let outcome = 'step: {
            let mut guard = match execution.console.install(self.page.context_mut()) {
                Ok(guard) => guard,
                Err(e) => {
                    failure = Some(e);
                    break 'step None;
                }
            };

            let mut terminal = None;
            match step {
                Step::Body { function, args } => {
                    match function.call(&JsValue::undefined(), &args, &mut guard) {
                        Err(e) => {
                            let thrown = Inspector::new(&helpers, &render).thrown_error(&e, &mut guard);
                            terminal = Some(thrown);
                        }
                        Ok(value) => {
                            let promise = value.as_object().map(|object| JsObject::clone(&object));
                            if let Some(promise) = promise {
                                if let Ok(state) = JsPromise::from_object(promise.clone()).map(|p| p.state()) {
                                    if let PromiseState::Rejected(reason) = state {
                                        tracker.forget(&promise);
                                        let thrown = Inspector::new(&helpers, &render)
                                            .thrown_value(&reason, &mut guard);
                                        terminal = Some(thrown);
                                    }
                                }
                            }
                        }
                    }
                }
                Step::Timer(task) => {
                    if let Err(e) = task.callback.call(&JsValue::undefined(), &task.args, &mut guard) {
                        let thrown = Inspector::new(&helpers, &render).thrown_error(&e, &mut guard);
                        execution.report_async(thrown, ErrorPhase::Macrotask);
                    }
                }
            }

            let outcome = match terminal {
                Some(thrown) => {
                    let info = ErrorInfo::from_thrown(&thrown, ErrorKind::SynchronousRuntimeError, phase);
                    execution.console.record_uncaught(info.uncaught_text(), thrown.value);
                    execution.console.seal();
                    // Leftover microtasks still run, but record nothing.
                    if let Err(e) = guard.run_jobs() {
                        tracing::debug!(error = %e, "Microtasks after synchronous error failed");
                    }
                    execution.queued_errors.borrow_mut().clear();
                    tracker.clear();
                    Some(RunOutcome::RuntimeError { error: info })
                }
                None => {
                    if let Err(e) = guard.run_jobs() {
                        let thrown = Inspector::new(&helpers, &render).thrown_error(&e, &mut guard);
                        execution.report_async(thrown, ErrorPhase::Microtask);
                    }
                    execution.absorb_queued_errors();
                    for promise in tracker.take() {
                        let reason = match JsPromise::from_object(promise).map(|p| p.state()) {
                            Ok(PromiseState::Rejected(reason)) => reason,
                            _ => continue,
                        };
                        let thrown = Inspector::new(&helpers, &render).thrown_value(&reason, &mut guard);
                        execution.report_async(thrown, ErrorPhase::Microtask);
                    }
                    None
                }
            };

            if let Err(e) = guard.restore() {
                failure = Some(e);
            }
            outcome
        };
        active.leave();

        if let Some(e) = failure {
            return Some(self.fault(execution, e, phase));
        }
        outcome
    }

    /// Complete, drop or time out the run once nothing is immediately due.
    fn settle(&mut self, execution: &mut Execution) {
        if execution.is_finished() {
            return;
        }
        let now = execution.loop_time();
        let next_due = execution.timers.next_due();

        let completed = match next_due {
            None => Some(0),
            Some(due) if due.saturating_duration_since(now) > self.config.wait_window => {
                let dropped = execution.timers.close();
                tracing::debug!(run = %execution.token(), dropped, "Dropping timers beyond the wait window");
                Some(dropped)
            }
            Some(_) => None,
        };

        if let Some(dropped_timers) = completed {
            let outcome = match execution.first_async_error.clone() {
                Some(error) => RunOutcome::RuntimeError { error },
                None => RunOutcome::Completed { dropped_timers },
            };
            self.finish(execution, outcome);
            return;
        }

        if now >= execution.deadline {
            let pending_timers = execution.timers.close();
            let error = ErrorInfo::timeout(self.config.run_timeout);
            self.finish(
                execution,
                RunOutcome::Timeout {
                    error,
                    pending_timers,
                },
            );
        }
    }

    fn finish(&mut self, execution: &mut Execution, outcome: RunOutcome) {
        execution.timers.close();
        execution.console.seal();
        tracing::debug!(
            run = %execution.token(),
            outcome = ?outcome,
            "Run finished"
        );
        execution.outcome = Some(outcome);
    }

    fn fault(
        &mut self,
        execution: &mut Execution,
        error: PlaygroundError,
        phase: ErrorPhase,
    ) -> RunOutcome {
        tracing::warn!(
            target: DIAGNOSTICS_TARGET,
            run = %execution.token(),
            error = %error,
            "Console interceptor fault"
        );
        execution
            .console
            .record_diagnostic("Console capture failed; the playground will be reset before the next run");
        self.page.poison();
        RunOutcome::InterceptorFault {
            error: ErrorInfo::internal(phase),
        }
    }

    fn error_info(&mut self, error: &JsError, kind: ErrorKind, phase: ErrorPhase) -> ErrorInfo {
        let helpers = Rc::clone(self.page.helpers());
        let render = self.config.render;
        let thrown = Inspector::new(&helpers, &render).thrown_error(error, self.page.context_mut());
        ErrorInfo::from_thrown(&thrown, kind, phase)
    }
}

impl Execution {
    fn binding(&self) -> RunBinding {
        RunBinding {
            timers: Rc::clone(&self.timers),
            console: self.console.clone(),
            errors: Rc::clone(&self.queued_errors),
        }
    }

    /// Take errors reported by queued callbacks; they are already recorded.
    fn absorb_queued_errors(&mut self) {
        let queued = std::mem::take(&mut *self.queued_errors.borrow_mut());
        if self.first_async_error.is_none() {
            self.first_async_error = queued.into_iter().next();
        }
    }

    /// Append an `uncaught` record and remember the first async error.
    fn report_async(&mut self, thrown: Thrown, phase: ErrorPhase) {
        let info = ErrorInfo::from_thrown(&thrown, ErrorKind::AsynchronousRuntimeError, phase);
        self.console.record_uncaught(info.uncaught_text(), thrown.value);
        tracing::debug!(run = %self.token(), error = %info.headline(), ?phase, "Uncaught asynchronous error");
        if self.first_async_error.is_none() {
            self.first_async_error = Some(info);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::transcript::OutputKind;

    struct Harness {
        engine: ExecutionEngine,
        recorder: RecorderHandle,
        token: RunToken,
    }

    impl Harness {
        fn new(config: PlaygroundConfig) -> Self {
            Self {
                engine: ExecutionEngine::new(config).unwrap(),
                recorder: RecorderHandle::new(config.max_records),
                token: RunToken::new(0),
            }
        }

        fn begin(&mut self, source: &str, now: Instant) -> Execution {
            self.token = self.token.next();
            self.recorder.reset(self.token);
            let console = self
                .engine
                .bind_console(self.recorder.clone(), self.token)
                .unwrap();
            self.engine.begin(source, console, now)
        }

        fn texts(&self) -> Vec<String> {
            self.recorder.snapshot().into_iter().map(|r| r.text).collect()
        }
    }

    fn harness() -> Harness {
        Harness::new(PlaygroundConfig::default())
    }

    #[test]
    fn test_synchronous_body_completes() {
        let mut h = harness();
        let execution = h.begin("console.log('a'); console.info('b')", Instant::now());
        assert_eq!(
            execution.outcome(),
            Some(&RunOutcome::Completed { dropped_timers: 0 })
        );
        assert_eq!(h.texts(), vec!["a", "b"]);
    }

    #[test]
    fn test_zero_delay_timer_runs_after_body() {
        let mut h = harness();
        let start = Instant::now();
        let mut execution = h.begin(
            "console.log('A'); setTimeout(() => console.log('B'), 0); console.log('C')",
            start,
        );
        assert!(!execution.is_finished());
        assert_eq!(h.engine.next_wakeup(&execution), Some(start));

        h.engine.advance(&mut execution, start);
        assert!(execution.outcome().is_some_and(RunOutcome::is_success));
        assert_eq!(h.texts(), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_microtasks_before_timers() {
        let mut h = harness();
        let start = Instant::now();
        let mut execution = h.begin(
            "setTimeout(() => console.log('timer'), 0);
             Promise.resolve().then(() => console.log('micro'));
             queueMicrotask(() => console.log('queued'));
             console.log('sync')",
            start,
        );
        h.engine.advance(&mut execution, start);
        assert_eq!(h.texts(), vec!["sync", "micro", "queued", "timer"]);
    }

    #[test]
    fn test_await_continues_in_same_step() {
        let mut h = harness();
        h.begin(
            "console.log(1); await null; console.log(2); await Promise.resolve(); console.log(3)",
            Instant::now(),
        );
        assert_eq!(h.texts(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_synchronous_throw_is_terminal() {
        let mut h = harness();
        let execution = h.begin(
            "console.log('before'); setTimeout(() => console.log('never'), 0); throw new TypeError('bad')",
            Instant::now(),
        );
        let Some(RunOutcome::RuntimeError { error }) = execution.outcome() else {
            panic!("expected runtime error, got {:?}", execution.outcome());
        };
        assert_eq!(error.kind, ErrorKind::SynchronousRuntimeError);
        assert_eq!(error.name.as_deref(), Some("TypeError"));
        assert_eq!(error.message, "bad");
        assert_eq!(execution.pending_timers(), 0);

        let records = h.recorder.snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "before");
        assert_eq!(records[1].kind, OutputKind::Uncaught);
        assert_eq!(records[1].text, "Uncaught TypeError: bad");
    }

    #[test]
    fn test_compile_error_runs_nothing() {
        let mut h = harness();
        let execution = h.begin("console.log('x'); )(", Instant::now());
        let Some(RunOutcome::CompileError { error }) = execution.outcome() else {
            panic!("expected compile error, got {:?}", execution.outcome());
        };
        assert_eq!(error.kind, ErrorKind::CompileError);
        let records = h.recorder.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, OutputKind::Uncaught);
    }

    #[test]
    fn test_timer_error_keeps_draining() {
        let mut h = harness();
        let start = Instant::now();
        let mut execution = h.begin(
            "setTimeout(() => { throw new Error('first') }, 10);
             setTimeout(() => console.log('second'), 20)",
            start,
        );
        h.engine.advance(&mut execution, start + Duration::from_millis(10));
        assert!(!execution.is_finished());
        h.engine.advance(&mut execution, start + Duration::from_millis(20));

        let Some(RunOutcome::RuntimeError { error }) = execution.outcome() else {
            panic!("expected runtime error, got {:?}", execution.outcome());
        };
        assert_eq!(error.kind, ErrorKind::AsynchronousRuntimeError);
        assert_eq!(error.phase, ErrorPhase::Macrotask);
        assert_eq!(h.texts(), vec!["Uncaught Error: first", "second"]);
    }

    #[test]
    fn test_unhandled_rejection_is_reported_once() {
        let mut h = harness();
        let execution = h.begin(
            "Promise.reject(new RangeError('nope')); console.log('after')",
            Instant::now(),
        );
        let Some(RunOutcome::RuntimeError { error }) = execution.outcome() else {
            panic!("expected runtime error, got {:?}", execution.outcome());
        };
        assert_eq!(error.phase, ErrorPhase::Microtask);
        assert_eq!(
            h.texts(),
            vec!["after", "Uncaught (in promise) RangeError: nope"]
        );
    }

    #[test]
    fn test_handled_rejection_is_not_reported() {
        let mut h = harness();
        let execution = h.begin(
            "Promise.reject(new Error('x')).catch(e => console.log('caught', e.message))",
            Instant::now(),
        );
        assert!(execution.outcome().is_some_and(RunOutcome::is_success));
        assert_eq!(h.texts(), vec!["caught x"]);
    }

    #[test]
    fn test_timer_beyond_wait_window_is_dropped() {
        let mut h = harness();
        let execution = h.begin(
            "console.log('now'); setTimeout(() => console.log('later'), 60000)",
            Instant::now(),
        );
        assert_eq!(
            execution.outcome(),
            Some(&RunOutcome::Completed { dropped_timers: 1 })
        );
        assert_eq!(h.texts(), vec!["now"]);
    }

    #[test]
    fn test_interval_times_out_at_budget() {
        let config = PlaygroundConfig::default().with_run_timeout(Duration::from_millis(350));
        let mut h = Harness::new(config);
        let start = Instant::now();
        let mut execution = h.begin("setInterval(() => console.log('tick'), 100)", start);

        let mut now = start;
        while let Some(at) = h.engine.next_wakeup(&execution) {
            now = at;
            h.engine.advance(&mut execution, now);
        }
        assert_eq!(now, start + Duration::from_millis(350));
        let Some(RunOutcome::Timeout { error, pending_timers }) = execution.outcome() else {
            panic!("expected timeout, got {:?}", execution.outcome());
        };
        assert_eq!(error.kind, ErrorKind::TimeoutExceeded);
        assert_eq!(*pending_timers, 1);
        assert_eq!(h.texts(), vec!["tick", "tick", "tick"]);
    }

    #[test]
    fn test_elapsed_time_is_logical() {
        let mut h = harness();
        let start = Instant::now();
        let mut execution = h.begin("setTimeout(() => console.log('t'), 250)", start);
        // Waking late still stamps the record with its due time.
        h.engine.advance(&mut execution, start + Duration::from_millis(400));
        let records = h.recorder.snapshot();
        assert_eq!(records[0].elapsed_ms, 250);
    }

    #[test]
    fn test_cancel_discards_timers_and_restores_console() {
        let mut h = harness();
        let start = Instant::now();
        let execution = h.begin(
            "setTimeout(() => console.log('stale'), 5); Promise.resolve().then(() => console.log('micro'))",
            start,
        );
        assert_eq!(h.texts(), vec!["micro"]);
        h.engine.cancel(execution);
        assert!(h.engine.page_mut().host_console_installed());

        let mut next = h.begin("console.log('fresh')", start + Duration::from_millis(10));
        h.engine.advance(&mut next, start + Duration::from_millis(20));
        assert_eq!(h.texts(), vec!["fresh"]);
    }

    #[test]
    fn test_fault_poisons_and_rebuilds_page() {
        let mut h = harness();
        let execution = h.begin(
            "Object.defineProperty(globalThis, 'console', { value: {}, writable: false, configurable: false })",
            Instant::now(),
        );
        let Some(RunOutcome::InterceptorFault { error }) = execution.outcome() else {
            panic!("expected interceptor fault, got {:?}", execution.outcome());
        };
        assert_eq!(error.kind, ErrorKind::InterceptorFault);
        assert!(h.engine.page().is_poisoned());
        let records = h.recorder.snapshot();
        assert_eq!(records.last().map(|r| r.kind.clone()), Some(OutputKind::Diagnostic));

        let execution = h.begin("console.log('ok')", Instant::now());
        assert!(execution.outcome().is_some_and(RunOutcome::is_success));
        assert!(!h.engine.page().is_poisoned());
        assert!(h.engine.page_mut().host_console_installed());
        assert_eq!(h.texts(), vec!["ok"]);
    }

    #[test]
    fn test_runaway_loop_is_stopped() {
        let config = PlaygroundConfig::default().with_loop_iteration_limit(1000);
        let mut h = Harness::new(config);
        let execution = h.begin("console.log('start'); while (true) {}", Instant::now());
        assert!(matches!(
            execution.outcome(),
            Some(RunOutcome::RuntimeError { .. })
        ));
        assert_eq!(h.texts().first().map(String::as_str), Some("start"));
        assert!(h.engine.page_mut().host_console_installed());
    }

    #[test]
    fn test_top_level_declarations_may_shadow_bindings() {
        let mut h = harness();
        let execution = h.begin(
            "const setTimeout = (f) => f(); setTimeout(() => console.log('shadow'))",
            Instant::now(),
        );
        assert!(execution.outcome().is_some_and(RunOutcome::is_success));
        assert_eq!(h.texts(), vec!["shadow"]);

        let execution = h.begin("let console = 1; class queueMicrotask {}", Instant::now());
        assert_eq!(
            execution.outcome(),
            Some(&RunOutcome::Completed { dropped_timers: 0 })
        );
    }

    #[test]
    fn test_global_timers_schedule_on_the_current_run() {
        let mut h = harness();
        let start = Instant::now();
        let mut execution = h.begin(
            "globalThis.setTimeout(() => console.log('g'), 0); \
             new Function(\"setTimeout(() => console.log('fn'), 1)\")(); \
             const id = globalThis.setTimeout(() => console.log('never'), 2); \
             globalThis.clearTimeout(id)",
            start,
        );
        assert_eq!(execution.pending_timers(), 2);
        assert!(!h.engine.page().active_run().is_active());

        h.engine.advance(&mut execution, start + Duration::from_millis(5));
        assert!(execution.outcome().is_some_and(RunOutcome::is_success));
        assert_eq!(h.texts(), vec!["g", "fn"]);
    }

    #[test]
    fn test_queued_callback_error_is_uncaught_not_rejection() {
        let mut h = harness();
        let execution = h.begin(
            "queueMicrotask(() => { throw new Error('qm') }); queueMicrotask(() => console.log('after'))",
            Instant::now(),
        );
        assert_eq!(h.texts(), vec!["Uncaught Error: qm", "after"]);
        let Some(RunOutcome::RuntimeError { error }) = execution.outcome() else {
            panic!("expected runtime error, got {:?}", execution.outcome());
        };
        assert_eq!(error.phase, ErrorPhase::Microtask);
        assert_eq!(error.kind, ErrorKind::AsynchronousRuntimeError);
        assert_eq!(error.message, "qm");
    }

    #[test]
    fn test_global_queue_microtask_reports_through_the_run() {
        let mut h = harness();
        let execution = h.begin(
            "globalThis.queueMicrotask(() => { throw new TypeError('bad') })",
            Instant::now(),
        );
        assert_eq!(h.texts(), vec!["Uncaught TypeError: bad"]);
        assert!(matches!(
            execution.outcome(),
            Some(RunOutcome::RuntimeError { .. })
        ));
    }

    #[test]
    fn test_cancel_leaves_no_active_run() {
        let mut h = harness();
        let start = Instant::now();
        let execution = h.begin(
            "setInterval(() => console.log('tick'), 5); queueMicrotask(() => globalThis.setTimeout(() => {}, 1))",
            start,
        );
        h.engine.cancel(execution);
        assert!(!h.engine.page().active_run().is_active());
        assert!(!h.engine.page().is_poisoned());
        assert!(h.engine.page_mut().host_console_installed());
    }

    #[test]
    fn test_fault_leaves_no_active_run() {
        let mut h = harness();
        let execution = h.begin(
            "Object.defineProperty(globalThis, 'console', { value: {}, writable: false, configurable: false })",
            Instant::now(),
        );
        assert!(matches!(
            execution.outcome(),
            Some(RunOutcome::InterceptorFault { .. })
        ));
        assert!(!h.engine.page().active_run().is_active());
    }
}
