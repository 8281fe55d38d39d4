//! The curated helper surface registered into every sandbox run.
//!
//! Each helper is a named capability with a fixed signature. Helpers
//! swallow their own errors and produce defaults (`()`, empty arrays,
//! `false`, the original input) so the surface never throws across the
//! sandbox boundary; typed failures belong to the outer RPC layer. Plain
//! string/array/map builtins (len, trim, split, map, filter, reduce, sort,
//! keys, values) come from the engine's standard packages.

use rhai::{Array, Dynamic, Engine, FnPtr, Map, NativeCallContext};
use rlm_search::{find_all, regex_search, FindAllOptions, RegexSearchOptions};
use rlm_session::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Match cap for the sandbox regex helpers.
const SANDBOX_MATCH_CAP: usize = 1_000;
/// Regex budget inside the sandbox; the whole run has its own deadline.
const SANDBOX_REGEX_BUDGET_MS: u64 = 1_000;
/// Ceiling for `range(n)`.
const RANGE_CAP: usize = 100_000;

pub(crate) fn register_all(engine: &mut Engine, registry: &Arc<SessionRegistry>, session_id: &str) {
    register_context_access(engine, registry, session_id);
    register_state(engine, registry, session_id);
    register_regex(engine);
    register_collections(engine);
    register_json(engine);
    register_math(engine);
}

fn json_to_dynamic(value: &serde_json::Value) -> Dynamic {
    rhai::serde::to_dynamic(value).unwrap_or(Dynamic::UNIT)
}

fn dynamic_to_json(value: &Dynamic) -> Option<serde_json::Value> {
    rhai::serde::from_dynamic(value).ok()
}

// -- context access (read-only) ------------------------------------------

fn register_context_access(
    engine: &mut Engine,
    registry: &Arc<SessionRegistry>,
    session_id: &str,
) {
    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("getContext", move |id: &str| -> Dynamic {
        match reg.session(&sid) {
            Ok(handle) => handle
                .read()
                .context(id)
                .map(|c| Dynamic::from(c.content.to_string()))
                .unwrap_or(Dynamic::UNIT),
            Err(_) => Dynamic::UNIT,
        }
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("getContextMetadata", move |id: &str| -> Dynamic {
        let Ok(handle) = reg.session(&sid) else {
            return Dynamic::UNIT;
        };
        let session = handle.read();
        let Some(context) = session.context(id) else {
            return Dynamic::UNIT;
        };
        let mut map = Map::new();
        map.insert("length".into(), Dynamic::from(context.metadata.length as i64));
        map.insert(
            "lineCount".into(),
            Dynamic::from(context.metadata.line_count as i64),
        );
        map.insert(
            "wordCount".into(),
            Dynamic::from(context.metadata.word_count as i64),
        );
        map.insert(
            "structure".into(),
            Dynamic::from(context.metadata.structure.as_str().to_string()),
        );
        Dynamic::from(map)
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("listContexts", move || -> Array {
        match reg.session(&sid) {
            Ok(handle) => handle
                .read()
                .context_ids()
                .into_iter()
                .map(|id| Dynamic::from(id.to_string()))
                .collect(),
            Err(_) => Array::new(),
        }
    });
}

// -- session state --------------------------------------------------------

fn register_state(engine: &mut Engine, registry: &Arc<SessionRegistry>, session_id: &str) {
    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("setVar", move |name: &str, value: Dynamic| {
        let Some(json) = dynamic_to_json(&value) else {
            return;
        };
        // Invalid names and quota failures are silently ignored.
        if let Err(err) = reg.set_variable(Some(&sid), name, json) {
            log::debug!("sandbox setVar('{name}') rejected: {err}");
        }
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("getVar", move |name: &str| -> Dynamic {
        match reg.get_variable(Some(&sid), name) {
            Ok(Some(value)) => json_to_dynamic(&value),
            _ => Dynamic::UNIT,
        }
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("listVars", move || -> Array {
        match reg.session(&sid) {
            Ok(handle) => handle
                .read()
                .variable_names()
                .into_iter()
                .map(|name| Dynamic::from(name.to_string()))
                .collect(),
            Err(_) => Array::new(),
        }
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("deleteVar", move |name: &str| -> bool {
        match reg.session(&sid) {
            Ok(handle) => handle.write().remove_variable(name).is_some(),
            Err(_) => false,
        }
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("setAnswer", move |content: &str, ready: bool| {
        if let Ok(handle) = reg.session(&sid) {
            let mut session = handle.write();
            session.answer.content = content.to_string();
            session.answer.ready = ready;
        }
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("appendAnswer", move |content: &str| {
        if let Ok(handle) = reg.session(&sid) {
            handle.write().answer.content.push_str(content);
        }
    });

    let reg = registry.clone();
    let sid = session_id.to_string();
    engine.register_fn("getAnswer", move || -> Dynamic {
        let Ok(handle) = reg.session(&sid) else {
            return Dynamic::UNIT;
        };
        let session = handle.read();
        let mut map = Map::new();
        map.insert(
            "content".into(),
            Dynamic::from(session.answer.content.clone()),
        );
        map.insert("ready".into(), Dynamic::from(session.answer.ready));
        Dynamic::from(map)
    });
}

// -- regex ----------------------------------------------------------------

fn sandbox_search_options() -> RegexSearchOptions {
    RegexSearchOptions {
        max_matches: SANDBOX_MATCH_CAP,
        budget: Duration::from_millis(SANDBOX_REGEX_BUDGET_MS),
        compact: true,
        ..Default::default()
    }
}

fn match_to_map(offset: usize, line: usize, text: &str) -> Dynamic {
    let mut map = Map::new();
    map.insert("offset".into(), Dynamic::from(offset as i64));
    map.insert("line".into(), Dynamic::from(line as i64));
    map.insert("match".into(), Dynamic::from(text.to_string()));
    Dynamic::from(map)
}

fn register_regex(engine: &mut Engine) {
    engine.register_fn("search", |text: &str, pattern: &str| -> Dynamic {
        match regex_search(text, pattern, &sandbox_search_options()) {
            Ok(outcome) => outcome
                .matches
                .first()
                .map(|m| match_to_map(m.offset, m.line, &m.text))
                .unwrap_or(Dynamic::UNIT),
            Err(_) => Dynamic::UNIT,
        }
    });

    engine.register_fn("findAll", |text: &str, pattern: &str| -> Array {
        match regex_search(text, pattern, &sandbox_search_options()) {
            Ok(outcome) => outcome
                .matches
                .iter()
                .map(|m| match_to_map(m.offset, m.line, &m.text))
                .collect(),
            Err(_) => Array::new(),
        }
    });

    engine.register_fn("findAllLiteral", |text: &str, needle: &str| -> Array {
        let outcome = find_all(
            text,
            needle,
            &FindAllOptions {
                max_matches: SANDBOX_MATCH_CAP,
                ..Default::default()
            },
        );
        outcome
            .matches
            .iter()
            .map(|m| {
                let mut map = Map::new();
                map.insert("offset".into(), Dynamic::from(m.offset as i64));
                map.insert("line".into(), Dynamic::from(m.line as i64));
                Dynamic::from(map)
            })
            .collect()
    });

    engine.register_fn(
        "replace",
        |text: &str, pattern: &str, replacement: &str| -> String {
            match rlm_search::compile_safe(pattern, false) {
                Ok((regex, _)) => regex.replace_all(text, replacement).into_owned(),
                Err(_) => text.to_string(),
            }
        },
    );

    engine.register_fn("test", |text: &str, pattern: &str| -> bool {
        match rlm_search::compile_safe(pattern, false) {
            Ok((regex, _)) => regex.is_match(text),
            Err(_) => false,
        }
    });
}

// -- collections ----------------------------------------------------------

fn dedup_key(value: &Dynamic) -> String {
    dynamic_to_json(value)
        .map(|v| v.to_string())
        .unwrap_or_else(|| value.to_string())
}

fn register_collections(engine: &mut Engine) {
    engine.register_fn("range", |n: i64| -> Array {
        let n = n.clamp(0, RANGE_CAP as i64);
        (0..n).map(Dynamic::from).collect()
    });

    engine.register_fn("unique", |array: Array| -> Array {
        let mut seen = std::collections::HashSet::new();
        let mut out = Array::new();
        for item in array {
            if seen.insert(dedup_key(&item)) {
                out.push(item);
            }
        }
        out
    });

    engine.register_fn("flatten", |array: Array| -> Array {
        let mut out = Array::new();
        for item in array {
            if item.is_array() {
                out.extend(item.cast::<Array>());
            } else {
                out.push(item);
            }
        }
        out
    });

    engine.register_fn("chunk", |array: Array, size: i64| -> Array {
        if size <= 0 {
            return Array::new();
        }
        array
            .chunks(size as usize)
            .map(|part| Dynamic::from(part.to_vec()))
            .collect()
    });

    engine.register_fn("take", |array: Array, n: i64| -> Array {
        array.into_iter().take(n.max(0) as usize).collect()
    });

    engine.register_fn("skip", |array: Array, n: i64| -> Array {
        array.into_iter().skip(n.max(0) as usize).collect()
    });

    engine.register_fn(
        "groupBy",
        |context: NativeCallContext, array: Array, selector: FnPtr| -> Map {
            let mut groups = Map::new();
            for item in array {
                let key = selector
                    .call_within_context::<Dynamic>(&context, (item.clone(),))
                    .map(|k| k.to_string())
                    .unwrap_or_default();
                let slot = groups
                    .entry(key.into())
                    .or_insert_with(|| Dynamic::from(Array::new()));
                if let Some(mut bucket) = slot.write_lock::<Array>() {
                    bucket.push(item);
                }
            }
            groups
        },
    );

    engine.register_fn("entries", |map: Map| -> Array {
        map.into_iter()
            .map(|(key, value)| {
                Dynamic::from(vec![Dynamic::from(key.to_string()), value])
            })
            .collect()
    });

    engine.register_fn("includes", |text: &str, needle: &str| -> bool {
        text.contains(needle)
    });

    engine.register_fn("slice", |text: &str, start: i64, end: i64| -> String {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len() as i64;
        let norm = |i: i64| -> usize {
            if i < 0 {
                (len + i).clamp(0, len) as usize
            } else {
                i.clamp(0, len) as usize
            }
        };
        let (start, end) = (norm(start), norm(end));
        if start >= end {
            return String::new();
        }
        chars[start..end].iter().collect()
    });

    engine.register_fn("padStart", |text: &str, width: i64, pad: &str| -> String {
        pad_string(text, width, pad, true)
    });

    engine.register_fn("padEnd", |text: &str, width: i64, pad: &str| -> String {
        pad_string(text, width, pad, false)
    });
}

fn pad_string(text: &str, width: i64, pad: &str, at_start: bool) -> String {
    let width = width.max(0) as usize;
    let current = text.chars().count();
    if current >= width || pad.is_empty() {
        return text.to_string();
    }
    let filler: String = pad.chars().cycle().take(width - current).collect();
    if at_start {
        format!("{filler}{text}")
    } else {
        format!("{text}{filler}")
    }
}

// -- json -----------------------------------------------------------------

fn register_json(engine: &mut Engine) {
    engine.register_fn("parseJson", |text: &str| -> Dynamic {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => json_to_dynamic(&value),
            Err(_) => Dynamic::UNIT,
        }
    });

    engine.register_fn("stringifyJson", |value: Dynamic| -> Dynamic {
        match dynamic_to_json(&value).and_then(|v| serde_json::to_string(&v).ok()) {
            Some(text) => Dynamic::from(text),
            None => Dynamic::UNIT,
        }
    });
}

// -- math -----------------------------------------------------------------

fn numeric(value: &Dynamic) -> Option<f64> {
    if let Ok(i) = value.as_int() {
        return Some(i as f64);
    }
    value.as_float().ok()
}

fn register_math(engine: &mut Engine) {
    engine.register_fn("sum", |array: Array| -> f64 {
        array.iter().filter_map(numeric).sum()
    });

    engine.register_fn("avg", |array: Array| -> f64 {
        let values: Vec<f64> = array.iter().filter_map(numeric).collect();
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    });
}
