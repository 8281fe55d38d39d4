//! Tokenizer provider backed by `tiktoken-rs`, selected by model family or
//! encoding name and cached per selection.

use parking_lot::Mutex;
use rlm_chunker::{ChunkerError, TokenizerProvider, TokenizerSelector};
use rlm_protocol::{Result, RlmError};
use std::collections::HashMap;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

#[derive(Debug)]
pub struct TiktokenProvider {
    bpe: CoreBPE,
}

impl TokenizerProvider for TiktokenProvider {
    fn encode(&self, text: &str) -> rlm_chunker::Result<Vec<usize>> {
        Ok(self.bpe.encode_with_special_tokens(text))
    }

    fn decode(&self, tokens: &[usize]) -> rlm_chunker::Result<String> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|err| ChunkerError::TokenizerFailed(err.to_string()))
    }
}

fn build(selector: &TokenizerSelector) -> Result<TiktokenProvider> {
    let bpe = match (&selector.model, &selector.encoding) {
        (Some(model), _) => tiktoken_rs::get_bpe_from_model(model).map_err(|err| {
            RlmError::invalid_input(format!("unknown tokenizer model '{model}': {err}"))
        })?,
        (None, Some(encoding)) => match encoding.as_str() {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            other => {
                return Err(RlmError::invalid_input(format!(
                    "unknown tokenizer encoding '{other}'"
                )))
            }
        }
        .map_err(|err| RlmError::invalid_input(format!("tokenizer init failed: {err}")))?,
        // Default: a Unicode-BPE-compatible encoding.
        (None, None) => tiktoken_rs::cl100k_base()
            .map_err(|err| RlmError::invalid_input(format!("tokenizer init failed: {err}")))?,
    };
    Ok(TiktokenProvider { bpe })
}

/// Cache of resolved providers keyed by the selector.
#[derive(Default)]
pub struct TokenizerCache {
    providers: Mutex<HashMap<String, Arc<TiktokenProvider>>>,
}

impl TokenizerCache {
    pub fn resolve(&self, selector: &TokenizerSelector) -> Result<Arc<TiktokenProvider>> {
        let key = format!(
            "{}|{}",
            selector.model.as_deref().unwrap_or(""),
            selector.encoding.as_deref().unwrap_or("")
        );
        if let Some(provider) = self.providers.lock().get(&key) {
            return Ok(provider.clone());
        }
        let provider = Arc::new(build(selector)?);
        self.providers.lock().insert(key, provider.clone());
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_encoding_roundtrips() {
        let cache = TokenizerCache::default();
        let provider = cache
            .resolve(&TokenizerSelector::default())
            .expect("default tokenizer");
        let tokens = provider.encode("hello tokenizer world").expect("encode");
        assert!(!tokens.is_empty());
        let text = provider.decode(&tokens).expect("decode");
        assert_eq!(text, "hello tokenizer world");
    }

    #[test]
    fn unknown_encoding_is_invalid_input() {
        let cache = TokenizerCache::default();
        let err = cache
            .resolve(&TokenizerSelector {
                model: None,
                encoding: Some("base64k".into()),
            })
            .unwrap_err();
        assert_eq!(err.code, rlm_protocol::ErrorCode::InvalidInput);
    }

    #[test]
    fn named_model_resolves() {
        let cache = TokenizerCache::default();
        assert!(cache
            .resolve(&TokenizerSelector {
                model: Some("gpt-4".into()),
                encoding: None,
            })
            .is_ok());
    }
}
