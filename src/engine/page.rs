//! The widget's engine context: global object, host console and helpers.

use std::rc::Rc;

use boa_engine::context::ContextBuilder;
use boa_engine::object::builtins::{JsArray, JsFunction};
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsObject, JsResult, JsString, JsValue, Source};

use super::active::ActiveRun;
use super::rejections::RejectionTracker;
use super::timers::TimerFunctions;
use crate::config::PlaygroundConfig;
use crate::console::host::build_host_console;
use crate::error::PlaygroundError;

/// Parameters the snippet body receives in place of the page's globals.
pub const WRAPPER_PARAMS: &str =
    "console, setTimeout, setInterval, clearTimeout, clearInterval, queueMicrotask";

/// Introspection helpers evaluated once per page. They never touch the
/// global object, so the snippet cannot see or replace them.
const PRELUDE: &str = r#"(function (reportError) {
  const objectToString = Object.prototype.toString;
  const describe = Object.getOwnPropertyDescriptor;
  const mapSize = describe(Map.prototype, 'size').get;
  const setSize = describe(Set.prototype, 'size').get;
  const mapEntries = Map.prototype.entries;
  const setValues = Set.prototype.values;
  const dateTime = Date.prototype.getTime;
  const dateIso = Date.prototype.toISOString;
  const regexpText = RegExp.prototype.toString;
  const symbolText = Symbol.prototype.toString;
  const enqueue = Promise.resolve(undefined);

  return {
    tag(value) {
      return objectToString.call(value).slice(8, -1);
    },
    functionName(fn) {
      try {
        const name = describe(fn, 'name');
        return name && typeof name.value === 'string' ? name.value : '';
      } catch (_) {
        return '';
      }
    },
    isClass(fn) {
      try {
        const proto = describe(fn, 'prototype');
        return !!proto && proto.writable === false && typeof fn === 'function';
      } catch (_) {
        return false;
      }
    },
    ctorName(object) {
      const proto = Object.getPrototypeOf(object);
      if (proto === null) {
        return '[Object: null prototype]';
      }
      const ctor = describe(proto, 'constructor');
      return ctor && typeof ctor.value === 'function' ? String(ctor.value.name) : '';
    },
    ownEntries(object, max) {
      const keys = Object.keys(object);
      const out = [keys.length];
      for (const key of keys) {
        if (out.length > max * 3) {
          break;
        }
        const d = describe(object, key);
        if (!d) {
          continue;
        }
        if ('value' in d) {
          out.push(key, d.value, 0);
        } else {
          out.push(key, undefined, (d.get ? 1 : 0) + (d.set ? 2 : 0));
        }
      }
      return out;
    },
    mapEntries(map, max) {
      const out = [mapSize.call(map)];
      for (const [key, value] of mapEntries.call(map)) {
        if (out.length > max * 2) {
          break;
        }
        out.push(key, value);
      }
      return out;
    },
    setValues(set, max) {
      const out = [setSize.call(set)];
      for (const value of setValues.call(set)) {
        if (out.length > max) {
          break;
        }
        out.push(value);
      }
      return out;
    },
    dateIso(date) {
      return Number.isNaN(dateTime.call(date)) ? 'Invalid Date' : dateIso.call(date);
    },
    regexpText(re) {
      return regexpText.call(re);
    },
    symbolText(symbol) {
      return symbolText.call(symbol);
    },
    errorParts(error) {
      let name = 'Error';
      let message = '';
      let stack;
      try { name = String(error.name); } catch (_) {}
      try { message = error.message === undefined ? '' : String(error.message); } catch (_) {}
      try { stack = typeof error.stack === 'string' ? error.stack : undefined; } catch (_) {}
      if (name === 'Error') {
        try {
          const ctor = Object.getPrototypeOf(error).constructor;
          if (typeof ctor === 'function' && ctor.name && ctor.name !== 'Error') {
            name = ctor.name;
          }
        } catch (_) {}
      }
      return [name, message, stack];
    },
    makeConsole(capture, names) {
      const target = {};
      for (const name of names) {
        target[name] = { [name](...args) { capture(name, ...args); } }[name];
      }
      return new Proxy(target, {
        get(object, key, receiver) {
          if (typeof key === 'string' && key !== 'then' && !Reflect.has(object, key)) {
            return { [key](...args) { capture(key, ...args); } }[key];
          }
          return Reflect.get(object, key, receiver);
        },
      });
    },
    queueMicrotask(callback) {
      if (typeof callback !== 'function') {
        throw new TypeError('The "callback" argument must be of type function');
      }
      enqueue.then(() => {
        try {
          callback();
        } catch (error) {
          reportError(error);
        }
      });
    },
    globalKeys() {
      return Reflect.ownKeys(globalThis).filter((key) => typeof key === 'string');
    },
    sweepGlobals(baseline) {
      const keep = new Set(baseline);
      let removed = 0;
      for (const key of Reflect.ownKeys(globalThis)) {
        if (typeof key === 'string' && !keep.has(key) && Reflect.deleteProperty(globalThis, key)) {
          removed += 1;
        }
      }
      return removed;
    },
  };
})"#;

/// Native handles to the prelude functions.
#[derive(Debug)]
pub struct PageHelpers {
    pub tag: JsFunction,
    pub function_name: JsFunction,
    pub is_class: JsFunction,
    pub ctor_name: JsFunction,
    pub own_entries: JsFunction,
    pub map_entries: JsFunction,
    pub set_values: JsFunction,
    pub date_iso: JsFunction,
    pub regexp_text: JsFunction,
    pub symbol_text: JsFunction,
    pub error_parts: JsFunction,
    pub make_console: JsFunction,
    pub queue_microtask: JsFunction,
    global_keys: JsFunction,
    sweep_globals: JsFunction,
}

impl PageHelpers {
    fn load(active: &ActiveRun, context: &mut Context) -> Result<Self, PlaygroundError> {
        let prelude = context
            .eval(Source::from_bytes(PRELUDE))
            .ok()
            .and_then(|value| value.as_object().map(|object| JsObject::clone(&object)))
            .and_then(JsFunction::from_object)
            .ok_or_else(|| PlaygroundError::EngineInit("prelude did not evaluate".into()))?;
        let report = active.report_function(context);
        let object = prelude
            .call(&JsValue::undefined(), &[report], context)
            .map_err(|e| PlaygroundError::EngineInit(format!("prelude failed: {e}")))?
            .as_object()
            .map(|object| JsObject::clone(&object))
            .ok_or_else(|| PlaygroundError::EngineInit("prelude returned no helpers".into()))?;

        let mut get = |name: &str| -> Result<JsFunction, PlaygroundError> {
            object
                .get(JsString::from(name), context)
                .ok()
                .and_then(|value| value.as_object().map(|object| JsObject::clone(&object)))
                .and_then(JsFunction::from_object)
                .ok_or_else(|| PlaygroundError::EngineInit(format!("missing helper `{name}`")))
        };

        Ok(Self {
            tag: get("tag")?,
            function_name: get("functionName")?,
            is_class: get("isClass")?,
            ctor_name: get("ctorName")?,
            own_entries: get("ownEntries")?,
            map_entries: get("mapEntries")?,
            set_values: get("setValues")?,
            date_iso: get("dateIso")?,
            regexp_text: get("regexpText")?,
            symbol_text: get("symbolText")?,
            error_parts: get("errorParts")?,
            make_console: get("makeConsole")?,
            queue_microtask: get("queueMicrotask")?,
            global_keys: get("globalKeys")?,
            sweep_globals: get("sweepGlobals")?,
        })
    }

    /// Call a helper with `undefined` as the receiver.
    pub fn call(
        &self,
        helper: &JsFunction,
        args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<JsValue> {
        helper.call(&JsValue::undefined(), args, context)
    }

    /// Call a helper that returns a string.
    pub fn call_string(
        &self,
        helper: &JsFunction,
        args: &[JsValue],
        context: &mut Context,
    ) -> JsResult<String> {
        let value = self.call(helper, args, context)?;
        Ok(value.to_string(context)?.to_std_string_escaped())
    }
}

/// Read every element of an array returned by a helper.
pub fn array_values(value: &JsValue, context: &mut Context) -> JsResult<Vec<JsValue>> {
    let Some(object) = value.as_object().map(|object| JsObject::clone(&object)) else {
        return Ok(Vec::new());
    };
    let array = JsArray::from_object(object)?;
    let length = u32::try_from(array.length(context)?).unwrap_or(u32::MAX);
    let mut values = Vec::with_capacity(length as usize);
    for index in 0..length {
        values.push(array.get(index, context)?);
    }
    Ok(values)
}

/// One widget's engine context.
///
/// The page outlives runs. Each run's bindings are passed to the snippet as
/// parameters, so the only global state a run touches is the `console`
/// property (swapped per step) and whatever globals the snippet creates
/// itself (removed by [`Page::sweep_globals`]).
pub struct Page {
    context: Context,
    helpers: Rc<PageHelpers>,
    active: ActiveRun,
    tracker: Rc<RejectionTracker>,
    host_console: JsObject,
    baseline: JsValue,
    poisoned: bool,
}

impl Page {
    pub fn new(config: &PlaygroundConfig) -> Result<Self, PlaygroundError> {
        let tracker = Rc::new(RejectionTracker::new());
        let mut context = ContextBuilder::default()
            .host_hooks(Rc::clone(&tracker))
            .build()
            .map_err(|e| PlaygroundError::EngineInit(e.to_string()))?;

        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(config.loop_iteration_limit);
        context
            .runtime_limits_mut()
            .set_recursion_limit(config.recursion_limit);

        let active = ActiveRun::new();
        let helpers = Rc::new(PageHelpers::load(&active, &mut context)?);

        let host_console = build_host_console(Rc::clone(&helpers), config.render, &mut context);
        context
            .register_global_property(
                js_string!("console"),
                host_console.clone(),
                Attribute::WRITABLE | Attribute::CONFIGURABLE,
            )
            .map_err(|e| PlaygroundError::EngineInit(format!("console: {e}")))?;

        // Script-visible timer globals follow whichever run is executing.
        let timers = TimerFunctions::bind_active(&active, &mut context);
        let globals = timers
            .named()
            .into_iter()
            .chain([("queueMicrotask", helpers.queue_microtask.clone())]);
        for (name, function) in globals {
            context
                .register_global_property(
                    JsString::from(name),
                    function,
                    Attribute::WRITABLE | Attribute::CONFIGURABLE,
                )
                .map_err(|e| PlaygroundError::EngineInit(format!("{name}: {e}")))?;
        }

        let baseline = helpers
            .call(&helpers.global_keys, &[], &mut context)
            .map_err(|e| PlaygroundError::EngineInit(format!("global snapshot: {e}")))?;

        tracing::debug!("Built playground page");
        Ok(Self {
            context,
            helpers,
            active,
            tracker,
            host_console,
            baseline,
            poisoned: false,
        })
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn helpers(&self) -> &Rc<PageHelpers> {
        &self.helpers
    }

    /// Slot the page's global timers and error reporting dispatch through.
    pub fn active_run(&self) -> &ActiveRun {
        &self.active
    }

    pub fn tracker(&self) -> &Rc<RejectionTracker> {
        &self.tracker
    }

    /// The developer console installed when the page was built.
    pub fn host_console(&self) -> &JsObject {
        &self.host_console
    }

    /// Whatever `globalThis.console` currently is.
    pub fn global_console(&mut self) -> JsResult<JsValue> {
        let global = self.context.global_object();
        global.get(js_string!("console"), &mut self.context)
    }

    /// Whether the developer console is the one currently installed.
    pub fn host_console_installed(&mut self) -> bool {
        match self.global_console() {
            Ok(value) => value
                .as_object()
                .is_some_and(|object| JsObject::equals(&object, &self.host_console)),
            Err(_) => false,
        }
    }

    /// Compile `source` as the body of an async arrow inside the wrapper
    /// function, which returns the arrow's promise.
    ///
    /// The arrow has its own lexical scope, so top-level `let`/`const`/`class`
    /// may shadow the wrapper's parameters. Nothing from the snippet executes
    /// here. The header shares the first line with the snippet so reported
    /// line numbers match the editor.
    pub fn compile(&mut self, source: &str) -> JsResult<JsFunction> {
        let wrapped =
            format!("(function ({WRAPPER_PARAMS}) {{ return (async () => {{{source}\n}})(); }})");
        let value = self.context.eval(Source::from_bytes(wrapped.as_bytes()))?;
        value
            .as_object()
            .map(|object| JsObject::clone(&object))
            .and_then(JsFunction::from_object)
            .ok_or_else(|| {
                boa_engine::JsNativeError::typ()
                    .with_message("snippet wrapper did not produce a function")
                    .into()
            })
    }

    /// Delete globals created since the page was built; returns the count.
    pub fn sweep_globals(&mut self) -> usize {
        let helpers = Rc::clone(&self.helpers);
        match helpers.call(
            &helpers.sweep_globals,
            &[self.baseline.clone()],
            &mut self.context,
        ) {
            Ok(removed) => {
                let removed = removed.as_number().unwrap_or(0.0) as usize;
                if removed > 0 {
                    tracing::debug!(removed, "Swept globals left by previous run");
                }
                removed
            }
            Err(e) => {
                tracing::debug!(error = %e, "Global sweep failed");
                0
            }
        }
    }

    /// Mark the page unusable; it is rebuilt before the next run.
    pub fn poison(&mut self) {
        self.poisoned = true;
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}
