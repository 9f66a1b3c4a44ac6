//! Text rendering of [`RenderedValue`] trees.
//!
//! Output follows the conventions of Node's `util.inspect`: nested strings are
//! quoted, structures print inline (`{ a: 1, b: [ 1, 2 ] }`) until they grow
//! past the break length, then continue on indented lines.

use super::value::{js_number_text, PromiseSummary, RenderedValue};
use crate::config::RenderConfig;

const INDENT: usize = 2;

/// Render a full console line: format specifiers in the first argument are
/// applied, remaining arguments are joined with spaces.
pub fn format_console_args(args: &[RenderedValue], config: &RenderConfig) -> String {
    let Some(first) = args.first() else {
        return String::new();
    };

    let (mut out, rest) = match first {
        RenderedValue::String { value, .. } if value.contains('%') => {
            apply_format_specifiers(value, &args[1..], config)
        }
        _ => (String::new(), args),
    };

    for arg in rest {
        if !out.is_empty() || !std::ptr::eq(arg, first) {
            out.push(' ');
        }
        out.push_str(&format_top_level(arg, config));
    }
    out
}

/// Format a value as a top-level console argument (strings unquoted).
pub fn format_top_level(value: &RenderedValue, config: &RenderConfig) -> String {
    match value {
        RenderedValue::String { value, truncated } => with_truncation(value, *truncated),
        RenderedValue::Error { name, message, stack } => match stack {
            Some(stack) if !stack.is_empty() => stack.clone(),
            _ => error_headline(name, message),
        },
        other => format_nested(other, 0, config),
    }
}

/// Format a value as it appears inside a structure.
pub fn format_nested(value: &RenderedValue, indent: usize, config: &RenderConfig) -> String {
    match value {
        RenderedValue::Undefined => "undefined".to_string(),
        RenderedValue::Null => "null".to_string(),
        RenderedValue::Boolean { value } => value.to_string(),
        RenderedValue::Number { value } => value.clone(),
        RenderedValue::BigInt { value } => format!("{value}n"),
        RenderedValue::String { value, truncated } => {
            with_truncation(&quote_string(value), *truncated)
        }
        RenderedValue::Symbol { description } => description.clone(),
        RenderedValue::Function { name, is_class } => {
            let name = if name.is_empty() {
                "(anonymous)"
            } else {
                name.as_str()
            };
            if *is_class {
                format!("[class {name}]")
            } else if name == "(anonymous)" {
                "[Function (anonymous)]".to_string()
            } else {
                format!("[Function: {name}]")
            }
        }
        RenderedValue::Error { name, message, .. } => {
            format!("[{}]", error_headline(name, message))
        }
        RenderedValue::Date { iso } => iso.clone(),
        RenderedValue::RegExp { source } => source.clone(),
        RenderedValue::Circular => "[Circular]".to_string(),
        RenderedValue::Collapsed { label } => format!("[{label}]"),
        RenderedValue::Opaque { reason } => format!("[{reason}]"),
        RenderedValue::Array { items, omitted } => {
            let mut parts: Vec<String> = items
                .iter()
                .map(|item| format_nested(item, indent + INDENT, config))
                .collect();
            push_omitted(&mut parts, *omitted);
            wrap("[", "]", "[]", parts, indent, config)
        }
        RenderedValue::Object {
            class_name,
            entries,
            omitted,
        } => {
            let mut parts: Vec<String> = entries
                .iter()
                .map(|(key, value)| {
                    format!(
                        "{}: {}",
                        format_key(key),
                        format_nested(value, indent + INDENT, config)
                    )
                })
                .collect();
            push_omitted(&mut parts, *omitted);
            match class_name {
                Some(class) => {
                    let open = format!("{class} {{");
                    let empty = format!("{class} {{}}");
                    wrap(&open, "}", &empty, parts, indent, config)
                }
                None => wrap("{", "}", "{}", parts, indent, config),
            }
        }
        RenderedValue::Map { entries, size } => {
            let mut parts: Vec<String> = entries
                .iter()
                .map(|(key, value)| {
                    format!(
                        "{} => {}",
                        format_nested(key, indent + INDENT, config),
                        format_nested(value, indent + INDENT, config)
                    )
                })
                .collect();
            push_omitted(&mut parts, size.saturating_sub(entries.len()));
            let open = format!("Map({size}) {{");
            let empty = format!("Map({size}) {{}}");
            wrap(&open, "}", &empty, parts, indent, config)
        }
        RenderedValue::Set { items, size } => {
            let mut parts: Vec<String> = items
                .iter()
                .map(|item| format_nested(item, indent + INDENT, config))
                .collect();
            push_omitted(&mut parts, size.saturating_sub(items.len()));
            let open = format!("Set({size}) {{");
            let empty = format!("Set({size}) {{}}");
            wrap(&open, "}", &empty, parts, indent, config)
        }
        RenderedValue::Promise { state } => {
            let inner = match state {
                PromiseSummary::Pending => "<pending>".to_string(),
                PromiseSummary::Fulfilled { value } => {
                    format_nested(value, indent + INDENT, config)
                }
                PromiseSummary::Rejected { reason } => {
                    format!("<rejected> {}", format_nested(reason, indent + INDENT, config))
                }
            };
            wrap("Promise {", "}", "Promise {}", vec![inner], indent, config)
        }
    }
}

/// Apply `%s %d %i %f %o %O %j %c %%` to a format string.
///
/// Returns the expanded text and the arguments that were not consumed.
pub fn apply_format_specifiers<'a>(
    template: &str,
    args: &'a [RenderedValue],
    config: &RenderConfig,
) -> (String, &'a [RenderedValue]) {
    let mut out = String::with_capacity(template.len());
    let mut next = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(&spec) = chars.peek() else {
            out.push('%');
            break;
        };
        if spec == '%' {
            chars.next();
            out.push('%');
            continue;
        }
        if !matches!(spec, 's' | 'd' | 'i' | 'f' | 'o' | 'O' | 'j' | 'c') || next >= args.len() {
            out.push('%');
            continue;
        }

        chars.next();
        let arg = &args[next];
        next += 1;
        match spec {
            's' => out.push_str(&match arg {
                RenderedValue::String { value, .. } => value.clone(),
                other => format_nested(other, 0, config),
            }),
            'd' => out.push_str(&match arg {
                RenderedValue::BigInt { value } => format!("{value}n"),
                other => js_number_text(other.as_number().unwrap_or(f64::NAN)),
            }),
            'i' => out.push_str(&match arg {
                RenderedValue::BigInt { value } => format!("{value}n"),
                other => js_number_text(other.as_number().unwrap_or(f64::NAN).trunc()),
            }),
            'f' => out.push_str(&js_number_text(arg.as_number().unwrap_or(f64::NAN))),
            'c' => {}
            _ => out.push_str(&format_nested(arg, 0, config)),
        }
    }

    (out, &args[next..])
}

/// `Name: message`, or just the name when the message is empty.
pub fn error_headline(name: &str, message: &str) -> String {
    match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{name}: {message}"),
    }
}

/// Quote a string, preferring single quotes like Node does.
pub fn quote_string(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn format_key(key: &str) -> String {
    let mut chars = key.chars();
    let is_identifier = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if is_identifier || (!key.is_empty() && key.chars().all(|c| c.is_ascii_digit())) {
        key.to_string()
    } else {
        quote_string(key)
    }
}

fn with_truncation(text: &str, truncated: usize) -> String {
    if truncated == 0 {
        text.to_string()
    } else {
        format!("{text}... {truncated} more characters")
    }
}

fn push_omitted(parts: &mut Vec<String>, omitted: usize) {
    match omitted {
        0 => {}
        1 => parts.push("... 1 more item".to_string()),
        n => parts.push(format!("... {n} more items")),
    }
}

fn wrap(
    open: &str,
    close: &str,
    empty: &str,
    parts: Vec<String>,
    indent: usize,
    config: &RenderConfig,
) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }

    let inline = format!("{open} {} {close}", parts.join(", "));
    if !inline.contains('\n') && indent + inline.chars().count() <= config.break_length {
        return inline;
    }

    let pad = " ".repeat(indent + INDENT);
    let body = parts
        .iter()
        .map(|part| format!("{pad}{part}"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("{open}\n{body}\n{}{close}", " ".repeat(indent))
}
