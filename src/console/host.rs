//! The page's own console, which logs to the developer console target.

use std::rc::Rc;

use boa_engine::object::ObjectInitializer;
use boa_engine::{Context, JsObject, JsResult, JsString, JsValue, NativeFunction};
use boa_gc::{Finalize, Trace};

use super::methods::CONSOLE_METHODS;
use crate::config::RenderConfig;
use crate::engine::inspect::Inspector;
use crate::engine::page::PageHelpers;
use crate::transcript::format_console_args;
use crate::util::logging::DEVCONSOLE_TARGET;

#[derive(Clone, Trace, Finalize)]
struct HostCaptures {
    #[unsafe_ignore_trace]
    method: &'static str,
    #[unsafe_ignore_trace]
    helpers: Rc<PageHelpers>,
    #[unsafe_ignore_trace]
    render: RenderConfig,
}

/// Build the console object a page exposes when no run is active.
///
/// Output goes to `tracing` under [`DEVCONSOLE_TARGET`], never into a
/// transcript.
pub fn build_host_console(
    helpers: Rc<PageHelpers>,
    render: RenderConfig,
    context: &mut Context,
) -> JsObject {
    let functions: Vec<(&'static str, NativeFunction)> = CONSOLE_METHODS
        .iter()
        .map(|&method| {
            let captures = HostCaptures {
                method,
                helpers: Rc::clone(&helpers),
                render,
            };
            (
                method,
                NativeFunction::from_copy_closure_with_captures(host_call, captures),
            )
        })
        .collect();

    let mut console = ObjectInitializer::new(context);
    for (method, function) in functions {
        console.function(function, JsString::from(method), 0);
    }
    console.build()
}

fn host_call(
    _this: &JsValue,
    args: &[JsValue],
    captures: &HostCaptures,
    context: &mut Context,
) -> JsResult<JsValue> {
    let mut inspector = Inspector::new(&captures.helpers, &captures.render);
    let rendered = inspector.inspect_all(args, context);
    let text = format_console_args(&rendered, &captures.render);

    match captures.method {
        "error" | "assert" => {
            tracing::error!(target: DEVCONSOLE_TARGET, method = captures.method, "{text}")
        }
        "warn" => tracing::warn!(target: DEVCONSOLE_TARGET, method = captures.method, "{text}"),
        "debug" | "trace" => {
            tracing::debug!(target: DEVCONSOLE_TARGET, method = captures.method, "{text}")
        }
        _ => tracing::info!(target: DEVCONSOLE_TARGET, method = captures.method, "{text}"),
    }
    Ok(JsValue::undefined())
}
