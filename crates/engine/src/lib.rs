//! Sandboxed expression engine for the RLM server.
//!
//! Snippets run in a fresh, capability-curated script engine per
//! evaluation: no filesystem, network, process, or module surface; a hard
//! wall-clock deadline enforced through the engine's progress hook; print
//! output captured into a bounded buffer. Failures are materialized as
//! execution records on the session history, never raised to the caller.

mod helpers;
mod output;

use output::OutputBuffer;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult};
use rlm_session::{ExecutionRecord, SessionRegistry};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_EXEC_BUDGET_MS: u64 = 30_000;
pub const DEFAULT_OUTPUT_CAP: usize = 50_000;

#[derive(Debug, Clone)]
pub struct EngineLimits {
    /// Hard wall-clock budget per evaluation.
    pub budget: Duration,
    /// Output cap in chars; excess is replaced with a truncation marker.
    pub output_cap: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            budget: Duration::from_millis(DEFAULT_EXEC_BUDGET_MS),
            output_cap: DEFAULT_OUTPUT_CAP,
        }
    }
}

/// Result of one evaluation: the history record plus the script's final
/// value when it produced one.
#[derive(Debug, Clone)]
pub struct ExecuteOutcome {
    pub record: ExecutionRecord,
    pub result: Option<serde_json::Value>,
}

pub struct ExpressionEngine {
    registry: Arc<SessionRegistry>,
    limits: EngineLimits,
}

impl ExpressionEngine {
    pub fn new(registry: Arc<SessionRegistry>, limits: EngineLimits) -> Self {
        Self { registry, limits }
    }

    /// Evaluate `code` against `session_id`'s state. Blocking; callers on an
    /// async runtime run this on a worker thread. The record is appended to
    /// the session's bounded history before returning.
    pub fn execute(&self, session_id: &str, code: &str) -> ExecuteOutcome {
        let started = Instant::now();
        let outcome = if code.trim().is_empty() {
            ExecuteOutcome {
                record: ExecutionRecord::failure(
                    String::new(),
                    "empty code".to_string(),
                    0,
                ),
                result: None,
            }
        } else {
            self.run(session_id, code, started)
        };

        if let Ok(handle) = self.registry.session(session_id) {
            handle
                .write()
                .push_history(outcome.record.clone(), self.registry.limits().max_history);
        }
        outcome
    }

    fn run(&self, session_id: &str, code: &str, started: Instant) -> ExecuteOutcome {
        let buffer = OutputBuffer::new(self.limits.output_cap);
        let budget = self.limits.budget;

        let mut engine = Engine::new();
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_string_size(1_000_000);
        engine.set_max_array_size(100_000);
        engine.set_max_map_size(100_000);

        let deadline = started + budget;
        engine.on_progress(move |_| {
            if Instant::now() >= deadline {
                Some("deadline".into())
            } else {
                None
            }
        });
        {
            let sink = buffer.clone();
            engine.on_print(move |message| sink.push_line(message));
        }
        {
            let sink = buffer.clone();
            engine.on_debug(move |message, _source, _pos| sink.push_line(message));
        }

        helpers::register_all(&mut engine, &self.registry, session_id);

        match engine.eval::<Dynamic>(code) {
            Ok(value) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                let (output, _) = buffer.take();
                let result = if value.is_unit() {
                    None
                } else {
                    rhai::serde::from_dynamic(&value).ok()
                };
                ExecuteOutcome {
                    record: ExecutionRecord::success(output, duration_ms),
                    result,
                }
            }
            Err(err) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                if matches!(*err, EvalAltResult::ErrorTerminated(..)) {
                    // Timeout discards captured output.
                    ExecuteOutcome {
                        record: ExecutionRecord::failure(
                            String::new(),
                            format!("Execution timed out after {}ms", budget.as_millis()),
                            duration_ms,
                        ),
                        result: None,
                    }
                } else {
                    let (output, _) = buffer.take();
                    ExecuteOutcome {
                        record: ExecutionRecord::failure(output, err.to_string(), duration_ms),
                        result: None,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlm_session::{SessionLimits, DEFAULT_SESSION_ID};

    fn engine_with_registry() -> (ExpressionEngine, Arc<SessionRegistry>) {
        let registry = Arc::new(SessionRegistry::new(SessionLimits::default(), None));
        let engine = ExpressionEngine::new(registry.clone(), EngineLimits::default());
        (engine, registry)
    }

    #[test]
    fn print_is_captured() {
        let (engine, _registry) = engine_with_registry();
        let outcome = engine.execute(DEFAULT_SESSION_ID, r#"print("hello"); print(42);"#);
        assert!(outcome.record.success);
        assert_eq!(outcome.record.output, "hello\n42\n");
    }

    #[test]
    fn final_value_is_returned() {
        let (engine, _registry) = engine_with_registry();
        let outcome = engine.execute(DEFAULT_SESSION_ID, "1 + 2");
        assert_eq!(outcome.result, Some(serde_json::json!(3)));
    }

    #[test]
    fn variables_roundtrip_through_session() {
        let (engine, registry) = engine_with_registry();
        let outcome = engine.execute(
            DEFAULT_SESSION_ID,
            r#"setVar("count", 7); getVar("count") + 1"#,
        );
        assert!(outcome.record.success, "error: {:?}", outcome.record.error);
        assert_eq!(outcome.result, Some(serde_json::json!(8)));
        let stored = registry
            .get_variable(None, "count")
            .expect("session exists")
            .expect("variable set");
        assert_eq!(stored, serde_json::json!(7));
    }

    #[test]
    fn invalid_variable_names_are_silently_ignored() {
        let (engine, registry) = engine_with_registry();
        let outcome = engine.execute(DEFAULT_SESSION_ID, r#"setVar("__proto__", 1); 2"#);
        assert!(outcome.record.success);
        assert!(registry
            .get_variable(None, "__proto__")
            .expect("session exists")
            .is_none());
    }

    #[test]
    fn context_access_is_read_only_views() {
        let (engine, registry) = engine_with_registry();
        registry
            .load_context(None, "doc", "line one\nline two".into())
            .expect("load");
        let outcome = engine.execute(
            DEFAULT_SESSION_ID,
            r#"let c = getContext("doc"); let m = getContextMetadata("doc"); c.len + m.lineCount"#,
        );
        assert_eq!(outcome.result, Some(serde_json::json!(19)));
        // Missing contexts come back as unit, not an error.
        let outcome = engine.execute(DEFAULT_SESSION_ID, r#"getContext("ghost") == ()"#);
        assert_eq!(outcome.result, Some(serde_json::json!(true)));
    }

    #[test]
    fn sessions_are_isolated() {
        let (engine, registry) = engine_with_registry();
        let other = registry.create_session().expect("session");
        registry
            .set_variable(Some(&other), "secret", serde_json::json!("hidden"))
            .expect("set");
        let outcome = engine.execute(DEFAULT_SESSION_ID, r#"getVar("secret") == ()"#);
        assert_eq!(outcome.result, Some(serde_json::json!(true)));
    }

    #[test]
    fn answer_helpers_accumulate() {
        let (engine, registry) = engine_with_registry();
        let outcome = engine.execute(
            DEFAULT_SESSION_ID,
            r#"setAnswer("part one", false); appendAnswer(" and two"); getAnswer().ready"#,
        );
        assert_eq!(outcome.result, Some(serde_json::json!(false)));
        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        assert_eq!(handle.read().answer.content, "part one and two");
    }

    #[test]
    fn regex_helpers_never_throw() {
        let (engine, _registry) = engine_with_registry();
        let outcome = engine.execute(
            DEFAULT_SESSION_ID,
            r#"
                let hits = findAll("a1 b2 c3", "[a-z]\\d");
                let bad = findAll("text", "(a+)+b");
                let safe = test("text", "(a+)+b");
                hits.len + bad.len + if safe { 100 } else { 0 }
            "#,
        );
        assert_eq!(outcome.result, Some(serde_json::json!(3)));
    }

    #[test]
    fn collection_helpers() {
        let (engine, _registry) = engine_with_registry();
        let outcome = engine.execute(
            DEFAULT_SESSION_ID,
            r#"
                let grouped = groupBy([1, 2, 3, 4], |x| if x % 2 == 0 { "even" } else { "odd" });
                let evens = grouped["even"];
                sum(evens) + unique([1, 1, 2]).len + flatten([[1], [2, 3]]).len
            "#,
        );
        assert_eq!(outcome.result, Some(serde_json::json!(11.0)));
    }

    #[test]
    fn json_helpers_absorb_errors() {
        let (engine, _registry) = engine_with_registry();
        let outcome = engine.execute(
            DEFAULT_SESSION_ID,
            r#"
                let ok = parseJson("{\"a\": 5}");
                let bad = parseJson("{nope");
                ok.a + if bad == () { 1 } else { 0 }
            "#,
        );
        assert_eq!(outcome.result, Some(serde_json::json!(6)));
    }

    #[test]
    fn script_errors_become_records() {
        let (engine, registry) = engine_with_registry();
        let outcome = engine.execute(DEFAULT_SESSION_ID, "this is not rhai ((");
        assert!(!outcome.record.success);
        assert!(outcome.record.error.is_some());
        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        assert_eq!(handle.read().history_len(), 1);
    }

    #[test]
    fn infinite_loop_times_out_with_marker() {
        let registry = Arc::new(SessionRegistry::new(SessionLimits::default(), None));
        let engine = ExpressionEngine::new(
            registry.clone(),
            EngineLimits {
                budget: Duration::from_millis(100),
                ..Default::default()
            },
        );
        let before_vars = {
            let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
            let count = handle.read().variable_count();
            count
        };
        let outcome = engine.execute(DEFAULT_SESSION_ID, "while true {}");
        assert!(!outcome.record.success);
        let error = outcome.record.error.as_deref().expect("error recorded");
        assert!(error.contains("timed out"), "got: {error}");
        assert!(outcome.record.output.is_empty());
        assert!(outcome.record.duration_ms >= 100);

        // Session stays usable; only the history grew.
        let handle = registry.session(DEFAULT_SESSION_ID).expect("session");
        assert_eq!(handle.read().variable_count(), before_vars);
        assert_eq!(handle.read().history_len(), 1);
        drop(handle);
        let after = engine.execute(DEFAULT_SESSION_ID, "2 + 2");
        assert_eq!(after.result, Some(serde_json::json!(4)));
    }

    #[test]
    fn output_is_truncated_at_cap() {
        let registry = Arc::new(SessionRegistry::new(SessionLimits::default(), None));
        let engine = ExpressionEngine::new(
            registry,
            EngineLimits {
                output_cap: 50,
                ..Default::default()
            },
        );
        let outcome = engine.execute(
            DEFAULT_SESSION_ID,
            r#"for i in 0..100 { print("line number " + i); } "done""#,
        );
        assert!(outcome.record.output.contains("…[output truncated]"));
        assert!(outcome.record.output.chars().count() < 200);
    }
}
