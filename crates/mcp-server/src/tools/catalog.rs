use serde_json::json;

#[derive(Clone, Copy, Debug)]
pub(crate) struct ToolDescriptor {
    pub(crate) name: &'static str,
    pub(crate) summary: &'static str,
}

pub(crate) const TOOL_CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "rlm_load_context",
        summary: "Create/replace a named context in a session.",
    },
    ToolDescriptor {
        name: "rlm_append_context",
        summary: "Append or prepend content to a context.",
    },
    ToolDescriptor {
        name: "rlm_unload_context",
        summary: "Drop a context from live memory (persists first when storage is enabled).",
    },
    ToolDescriptor {
        name: "rlm_get_context_info",
        summary: "Context metadata plus optional preview.",
    },
    ToolDescriptor {
        name: "rlm_read_context",
        summary: "Read a range by char offsets or line numbers.",
    },
    ToolDescriptor {
        name: "rlm_decompose_context",
        summary: "Produce chunks; returns a decompose_id.",
    },
    ToolDescriptor {
        name: "rlm_get_chunks",
        summary: "Fetch chunk content by indices via decompose_id or last decomposition.",
    },
    ToolDescriptor {
        name: "rlm_search_context",
        summary: "Regex search with optional compact output.",
    },
    ToolDescriptor {
        name: "rlm_find_all",
        summary: "Substring scan returning offsets.",
    },
    ToolDescriptor {
        name: "rlm_rank_chunks",
        summary: "BM25-rank the chunks of a decomposition.",
    },
    ToolDescriptor {
        name: "rlm_suggest_strategy",
        summary: "Heuristic strategy recommendation.",
    },
    ToolDescriptor {
        name: "rlm_get_statistics",
        summary: "Structural stats of a context.",
    },
    ToolDescriptor {
        name: "rlm_execute_code",
        summary: "Run a sandboxed snippet against session state.",
    },
    ToolDescriptor {
        name: "rlm_set_variable",
        summary: "Set a session-scoped variable.",
    },
    ToolDescriptor {
        name: "rlm_get_variable",
        summary: "Get a session-scoped variable.",
    },
    ToolDescriptor {
        name: "rlm_set_answer",
        summary: "Set or append the incrementally-built answer.",
    },
    ToolDescriptor {
        name: "rlm_get_answer",
        summary: "Read the answer state.",
    },
    ToolDescriptor {
        name: "rlm_create_session",
        summary: "Create an isolated session.",
    },
    ToolDescriptor {
        name: "rlm_get_session_info",
        summary: "Session overview (contexts, variables, history, memory).",
    },
    ToolDescriptor {
        name: "rlm_clear_session",
        summary: "Clear or destroy a session.",
    },
    ToolDescriptor {
        name: "rlm_get_metrics",
        summary: "Counters, gauges, and duration histograms.",
    },
];

pub(crate) fn tool_instructions() -> String {
    "RLM provides context infrastructure for long-context reasoning: load text with \
     rlm_load_context, split it with rlm_decompose_context, find relevant parts with \
     rlm_search_context / rlm_rank_chunks, fetch them with rlm_get_chunks or \
     rlm_read_context, run small computations with rlm_execute_code, and accumulate \
     the result with rlm_set_answer. Sessions isolate state; omit session_id to use \
     the shared 'default' session."
        .to_string()
}

/// Inventory payload for `--print-tools`.
pub(crate) fn tool_inventory_json(version: &str) -> String {
    let tools: Vec<serde_json::Value> = TOOL_CATALOG
        .iter()
        .map(|tool| json!({ "name": tool.name, "summary": tool.summary }))
        .collect();
    json!({ "server": "rlm-mcp", "version": version, "tools": tools }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_lists_every_tool() {
        let raw = tool_inventory_json("0.0.0");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(
            value["tools"].as_array().expect("tools array").len(),
            TOOL_CATALOG.len()
        );
        assert_eq!(TOOL_CATALOG.len(), 21);
    }
}
