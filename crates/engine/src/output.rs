use parking_lot::Mutex;
use std::sync::Arc;

const TRUNCATION_MARKER: &str = "\n…[output truncated]";

/// Bounded capture target for `print`/`debug` inside the sandbox.
#[derive(Clone)]
pub(crate) struct OutputBuffer {
    inner: Arc<Mutex<BufferState>>,
}

struct BufferState {
    text: String,
    chars: usize,
    cap: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferState {
                text: String::new(),
                chars: 0,
                cap,
                truncated: false,
            })),
        }
    }

    pub(crate) fn push_line(&self, line: &str) {
        let mut state = self.inner.lock();
        if state.truncated {
            return;
        }
        let line_chars = line.chars().count() + 1;
        if state.chars + line_chars > state.cap {
            let room = state.cap.saturating_sub(state.chars);
            let cut: String = line.chars().take(room).collect();
            state.text.push_str(&cut);
            state.text.push_str(TRUNCATION_MARKER);
            state.chars = state.cap;
            state.truncated = true;
            return;
        }
        state.text.push_str(line);
        state.text.push('\n');
        state.chars += line_chars;
    }

    pub(crate) fn take(&self) -> (String, bool) {
        let mut state = self.inner.lock();
        let truncated = state.truncated;
        (std::mem::take(&mut state.text), truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_lines() {
        let buffer = OutputBuffer::new(100);
        buffer.push_line("one");
        buffer.push_line("two");
        let (text, truncated) = buffer.take();
        assert_eq!(text, "one\ntwo\n");
        assert!(!truncated);
    }

    #[test]
    fn truncates_at_cap_with_marker() {
        let buffer = OutputBuffer::new(10);
        buffer.push_line("1234567890abcdef");
        buffer.push_line("ignored after truncation");
        let (text, truncated) = buffer.take();
        assert!(truncated);
        assert!(text.starts_with("1234567890"));
        assert!(text.ends_with("…[output truncated]"));
    }
}
