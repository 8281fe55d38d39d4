use crate::context::Context;
use crate::decomposition::DecompositionRecord;
use crate::history::ExecutionRecord;
use crate::memory;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::SystemTime;

/// The reserved incrementally-built answer, seeded empty and not-ready on
/// session creation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerState {
    pub content: String,
    pub ready: bool,
}

/// The unit of isolation: named contexts, variables, decomposition records,
/// execution history, and answer state. Quota enforcement lives in the
/// registry; this type keeps the books.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub created_at: SystemTime,
    pub last_activity: SystemTime,
    pub answer: AnswerState,
    contexts: HashMap<String, Context>,
    variables: HashMap<String, Value>,
    history: VecDeque<ExecutionRecord>,
    decompositions: HashMap<String, DecompositionRecord>,
    last_decompose_by_context: HashMap<String, String>,
    last_decompose_id: Option<String>,
    context_bytes: usize,
    variable_bytes: usize,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = SystemTime::now();
        Self {
            id: id.into(),
            created_at: now,
            last_activity: now,
            answer: AnswerState::default(),
            contexts: HashMap::new(),
            variables: HashMap::new(),
            history: VecDeque::new(),
            decompositions: HashMap::new(),
            last_decompose_by_context: HashMap::new(),
            last_decompose_id: None,
            context_bytes: 0,
            variable_bytes: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = SystemTime::now();
    }

    // -- contexts ---------------------------------------------------------

    pub fn context(&self, id: &str) -> Option<&Context> {
        self.contexts.get(id)
    }

    pub fn context_ids(&self) -> Vec<&str> {
        self.contexts.keys().map(String::as_str).collect()
    }

    pub fn contexts(&self) -> impl Iterator<Item = (&String, &Context)> {
        self.contexts.iter()
    }

    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    pub fn insert_context(&mut self, id: String, context: Context) {
        if let Some(prior) = self.contexts.get(&id) {
            self.context_bytes -= prior.estimated_bytes();
        }
        self.context_bytes += context.estimated_bytes();
        self.contexts.insert(id, context);
    }

    pub fn remove_context(&mut self, id: &str) -> Option<Context> {
        let removed = self.contexts.remove(id)?;
        self.context_bytes -= removed.estimated_bytes();
        self.last_decompose_by_context.remove(id);
        Some(removed)
    }

    // -- variables --------------------------------------------------------

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn set_variable(&mut self, name: String, value: Value) {
        if let Some(prior) = self.variables.get(&name) {
            self.variable_bytes -= memory::estimate_value(prior);
        }
        self.variable_bytes += memory::estimate_value(&value);
        self.variables.insert(name, value);
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        let removed = self.variables.remove(name)?;
        self.variable_bytes -= memory::estimate_value(&removed);
        Some(removed)
    }

    // -- memory -----------------------------------------------------------

    /// Estimated memory of contexts plus variables.
    pub fn memory_bytes(&self) -> usize {
        self.context_bytes + self.variable_bytes
    }

    // -- execution history ------------------------------------------------

    pub fn push_history(&mut self, record: ExecutionRecord, max_depth: usize) {
        self.history.push_back(record);
        while self.history.len() > max_depth {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    // -- decomposition records --------------------------------------------

    pub fn record_decomposition(&mut self, record: DecompositionRecord) {
        self.last_decompose_by_context
            .insert(record.context_id.clone(), record.id.clone());
        self.last_decompose_id = Some(record.id.clone());
        self.decompositions.insert(record.id.clone(), record);
    }

    pub fn decomposition(&self, id: &str) -> Option<&DecompositionRecord> {
        self.decompositions.get(id)
    }

    pub fn last_decomposition_for(&self, context_id: &str) -> Option<&DecompositionRecord> {
        let id = self.last_decompose_by_context.get(context_id)?;
        self.decompositions.get(id)
    }

    pub fn last_decomposition(&self) -> Option<&DecompositionRecord> {
        let id = self.last_decompose_id.as_ref()?;
        self.decompositions.get(id)
    }

    pub fn decomposition_count(&self) -> usize {
        self.decompositions.len()
    }

    // -- lifecycle --------------------------------------------------------

    /// Drop all state; identity and creation time survive.
    pub fn clear(&mut self) {
        self.contexts.clear();
        self.variables.clear();
        self.history.clear();
        self.decompositions.clear();
        self.last_decompose_by_context.clear();
        self.last_decompose_id = None;
        self.answer = AnswerState::default();
        self.context_bytes = 0;
        self.variable_bytes = 0;
        self.touch();
    }
}
