//! Conversion of live JavaScript values into [`RenderedValue`] trees.

use boa_engine::builtins::promise::PromiseState;
use boa_engine::object::builtins::JsPromise;
use boa_engine::{Context, JsError, JsObject, JsResult, JsValue};

use super::page::{array_values, PageHelpers};
use crate::config::RenderConfig;
use crate::transcript::format::format_top_level;
use crate::transcript::value::js_number_text;
use crate::transcript::{PromiseSummary, RenderedValue};

/// Name, message and stack extracted from a thrown value.
#[derive(Debug, Clone, PartialEq)]
pub struct Thrown {
    pub name: Option<String>,
    pub message: String,
    pub stack: Option<String>,
    pub value: Option<RenderedValue>,
}

/// Walks a value graph with depth, breadth and cycle limits.
///
/// Inspection never throws into the snippet: a getter or proxy trap that
/// fails turns the affected node into [`RenderedValue::Opaque`].
pub struct Inspector<'a> {
    helpers: &'a PageHelpers,
    config: &'a RenderConfig,
    ancestors: Vec<JsObject>,
}

impl<'a> Inspector<'a> {
    pub fn new(helpers: &'a PageHelpers, config: &'a RenderConfig) -> Self {
        Self {
            helpers,
            config,
            ancestors: Vec::new(),
        }
    }

    pub fn inspect(&mut self, value: &JsValue, context: &mut Context) -> RenderedValue {
        self.ancestors.clear();
        self.render(value, 0, context)
    }

    pub fn inspect_all(&mut self, values: &[JsValue], context: &mut Context) -> Vec<RenderedValue> {
        values
            .iter()
            .map(|value| self.inspect(value, context))
            .collect()
    }

    /// Describe an error that escaped the snippet.
    pub fn thrown_error(&mut self, error: &JsError, context: &mut Context) -> Thrown {
        if let Some(value) = error.as_opaque().map(|value| value.clone()) {
            return self.thrown_value(&value, context);
        }
        // Engine-raised errors (syntax errors, runtime limits) print as
        // `Name: message`.
        let text = error.to_string();
        match text.split_once(": ") {
            Some((name, message)) if !name.contains(' ') => Thrown {
                name: Some(name.to_string()),
                message: message.to_string(),
                stack: None,
                value: None,
            },
            _ => Thrown {
                name: Some(text.clone()).filter(|t| !t.contains(' ')),
                message: if text.contains(' ') { text } else { String::new() },
                stack: None,
                value: None,
            },
        }
    }

    /// Describe a thrown value or rejection reason.
    pub fn thrown_value(&mut self, value: &JsValue, context: &mut Context) -> Thrown {
        let rendered = self.inspect(value, context);
        match &rendered {
            RenderedValue::Error {
                name,
                message,
                stack,
            } => Thrown {
                name: Some(name.clone()),
                message: message.clone(),
                stack: stack.clone(),
                value: Some(rendered.clone()),
            },
            other => Thrown {
                name: None,
                message: format_top_level(other, self.config),
                stack: None,
                value: Some(rendered.clone()),
            },
        }
    }

    fn render(&mut self, value: &JsValue, depth: usize, context: &mut Context) -> RenderedValue {
        match self.try_render(value, depth, context) {
            Ok(rendered) => rendered,
            Err(e) => RenderedValue::Opaque {
                reason: format!("Uninspectable: {e}"),
            },
        }
    }

    fn try_render(
        &mut self,
        value: &JsValue,
        depth: usize,
        context: &mut Context,
    ) -> JsResult<RenderedValue> {
        if value.is_undefined() {
            return Ok(RenderedValue::Undefined);
        }
        if value.is_null() {
            return Ok(RenderedValue::Null);
        }
        if let Some(value) = value.as_boolean() {
            return Ok(RenderedValue::Boolean { value });
        }
        if let Some(number) = value.as_number() {
            let text = if number.is_finite() && number.fract() != 0.0 {
                value.to_string(context)?.to_std_string_escaped()
            } else {
                js_number_text(number)
            };
            return Ok(RenderedValue::Number { value: text });
        }
        if value.is_bigint() {
            return Ok(RenderedValue::BigInt {
                value: value.to_string(context)?.to_std_string_escaped(),
            });
        }
        if value.is_string() {
            let text = value.to_string(context)?.to_std_string_escaped();
            return Ok(self.string(text));
        }
        if value.is_symbol() {
            let description =
                self.helpers
                    .call_string(&self.helpers.symbol_text, &[value.clone()], context)?;
            return Ok(RenderedValue::Symbol { description });
        }

        let Some(object) = value.as_object().map(|object| JsObject::clone(&object)) else {
            return Ok(RenderedValue::Opaque {
                reason: "unknown value".to_string(),
            });
        };

        if object.is_callable() {
            let name =
                self.helpers
                    .call_string(&self.helpers.function_name, &[value.clone()], context)?;
            let is_class = self
                .helpers
                .call(&self.helpers.is_class, &[value.clone()], context)?
                .to_boolean();
            return Ok(RenderedValue::Function { name, is_class });
        }

        if self
            .ancestors
            .iter()
            .any(|ancestor| JsObject::equals(ancestor, &object))
        {
            return Ok(RenderedValue::Circular);
        }

        let tag = self
            .helpers
            .call_string(&self.helpers.tag, &[value.clone()], context)?;

        match tag.as_str() {
            "Error" => return self.error(value, context),
            "Date" => {
                let iso = self
                    .helpers
                    .call_string(&self.helpers.date_iso, &[value.clone()], context)?;
                return Ok(RenderedValue::Date { iso });
            }
            "RegExp" => {
                let source =
                    self.helpers
                        .call_string(&self.helpers.regexp_text, &[value.clone()], context)?;
                return Ok(RenderedValue::RegExp { source });
            }
            _ => {}
        }

        if depth > self.config.max_depth {
            let label = match tag.as_str() {
                "Array" | "Map" | "Set" | "Promise" => tag,
                _ => {
                    let ctor = self.constructor_name(value, context)?;
                    ctor.unwrap_or_else(|| "Object".to_string())
                }
            };
            return Ok(RenderedValue::Collapsed { label });
        }

        self.ancestors.push(object.clone());
        let rendered = match tag.as_str() {
            "Array" => self.array(&object, depth, context),
            "Map" => self.map(value, depth, context),
            "Set" => self.set(value, depth, context),
            "Promise" => self.promise(&object, depth, context),
            _ => self.object(value, depth, context),
        };
        self.ancestors.pop();
        rendered
    }

    fn string(&self, text: String) -> RenderedValue {
        let total = text.chars().count();
        if total <= self.config.max_string_length {
            return RenderedValue::string(text);
        }
        RenderedValue::String {
            value: text.chars().take(self.config.max_string_length).collect(),
            truncated: total - self.config.max_string_length,
        }
    }

    fn error(&mut self, value: &JsValue, context: &mut Context) -> JsResult<RenderedValue> {
        let parts = self
            .helpers
            .call(&self.helpers.error_parts, &[value.clone()], context)?;
        let parts = array_values(&parts, context)?;
        let text = |index: usize, context: &mut Context| -> JsResult<Option<String>> {
            match parts.get(index) {
                Some(part) if !part.is_undefined() => {
                    Ok(Some(part.to_string(context)?.to_std_string_escaped()))
                }
                _ => Ok(None),
            }
        };
        Ok(RenderedValue::Error {
            name: text(0, context)?.unwrap_or_else(|| "Error".to_string()),
            message: text(1, context)?.unwrap_or_default(),
            stack: text(2, context)?,
        })
    }

    fn constructor_name(&self, value: &JsValue, context: &mut Context) -> JsResult<Option<String>> {
        let name = self
            .helpers
            .call_string(&self.helpers.ctor_name, &[value.clone()], context)?;
        Ok(match name.as_str() {
            "" | "Object" => None,
            _ => Some(name),
        })
    }

    fn limit(&self) -> JsValue {
        JsValue::from(self.config.max_items as f64)
    }

    fn array(
        &mut self,
        object: &JsObject,
        depth: usize,
        context: &mut Context,
    ) -> JsResult<RenderedValue> {
        let length = object
            .get(boa_engine::js_string!("length"), context)?
            .to_length(context)?;
        let shown = length.min(self.config.max_items as u64) as u32;
        let mut items = Vec::with_capacity(shown as usize);
        for index in 0..shown {
            let item = object.get(index, context)?;
            items.push(self.render(&item, depth + 1, context));
        }
        Ok(RenderedValue::Array {
            items,
            omitted: (length - u64::from(shown)) as usize,
        })
    }

    fn map(&mut self, value: &JsValue, depth: usize, context: &mut Context) -> JsResult<RenderedValue> {
        let limit = self.limit();
        let raw = self
            .helpers
            .call(&self.helpers.map_entries, &[value.clone(), limit], context)?;
        let raw = array_values(&raw, context)?;
        let size = raw.first().and_then(JsValue::as_number).unwrap_or(0.0) as usize;
        let mut entries = Vec::new();
        for pair in raw[1.min(raw.len())..].chunks(2) {
            if let [key, value] = pair {
                let key = self.render(key, depth + 1, context);
                let value = self.render(value, depth + 1, context);
                entries.push((key, value));
            }
        }
        Ok(RenderedValue::Map { entries, size })
    }

    fn set(&mut self, value: &JsValue, depth: usize, context: &mut Context) -> JsResult<RenderedValue> {
        let limit = self.limit();
        let raw = self
            .helpers
            .call(&self.helpers.set_values, &[value.clone(), limit], context)?;
        let raw = array_values(&raw, context)?;
        let size = raw.first().and_then(JsValue::as_number).unwrap_or(0.0) as usize;
        let items = raw
            .iter()
            .skip(1)
            .map(|item| self.render(item, depth + 1, context))
            .collect();
        Ok(RenderedValue::Set { items, size })
    }

    fn promise(
        &mut self,
        object: &JsObject,
        depth: usize,
        context: &mut Context,
    ) -> JsResult<RenderedValue> {
        let promise = JsPromise::from_object(object.clone())?;
        let state = match promise.state() {
            PromiseState::Pending => PromiseSummary::Pending,
            PromiseState::Fulfilled(value) => PromiseSummary::Fulfilled {
                value: Box::new(self.render(&value, depth + 1, context)),
            },
            PromiseState::Rejected(reason) => PromiseSummary::Rejected {
                reason: Box::new(self.render(&reason, depth + 1, context)),
            },
        };
        Ok(RenderedValue::Promise { state })
    }

    fn object(&mut self, value: &JsValue, depth: usize, context: &mut Context) -> JsResult<RenderedValue> {
        let class_name = self.constructor_name(value, context)?;
        let limit = self.limit();
        let raw = self
            .helpers
            .call(&self.helpers.own_entries, &[value.clone(), limit], context)?;
        let raw = array_values(&raw, context)?;
        let total = raw.first().and_then(JsValue::as_number).unwrap_or(0.0) as usize;

        let mut entries = Vec::new();
        for triple in raw[1.min(raw.len())..].chunks(3) {
            let [key, value, accessor] = triple else {
                continue;
            };
            let key = key.to_string(context)?.to_std_string_escaped();
            let rendered = match accessor.as_number().unwrap_or(0.0) as u8 {
                1 => RenderedValue::Collapsed {
                    label: "Getter".to_string(),
                },
                2 => RenderedValue::Collapsed {
                    label: "Setter".to_string(),
                },
                3 => RenderedValue::Collapsed {
                    label: "Getter/Setter".to_string(),
                },
                _ => self.render(value, depth + 1, context),
            };
            entries.push((key, rendered));
        }

        Ok(RenderedValue::Object {
            class_name,
            omitted: total.saturating_sub(entries.len()),
            entries,
        })
    }
}
