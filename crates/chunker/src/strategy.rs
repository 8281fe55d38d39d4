use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tokenizer selection for the token strategy. `model` picks an encoding
/// for a named model family; `encoding` picks a named encoding directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerSelector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl TokenizerSelector {
    fn cache_key(&self) -> String {
        format!(
            "{}:{}",
            self.model.as_deref().unwrap_or(""),
            self.encoding.as_deref().unwrap_or("")
        )
    }
}

/// A decomposition strategy with its validated option record.
///
/// Parsed from the tool-level `(strategy, options)` pair; options unrelated
/// to the chosen strategy are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Strategy {
    FixedSize {
        chunk_size: usize,
        overlap: usize,
    },
    ByLines {
        lines_per_chunk: usize,
        overlap: usize,
    },
    ByParagraphs,
    BySections {
        merge_empty_sections: bool,
        min_section_length: usize,
    },
    ByRegex {
        pattern: String,
    },
    BySentences,
    ByTokens {
        tokens_per_chunk: usize,
        token_overlap: usize,
        tokenizer: TokenizerSelector,
    },
}

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_LINES_PER_CHUNK: usize = 50;
pub const DEFAULT_TOKENS_PER_CHUNK: usize = 500;

fn opt_usize(options: &Value, keys: &[&str], default: usize) -> Result<usize> {
    for key in keys {
        if let Some(raw) = options.get(key) {
            let value = raw.as_u64().ok_or_else(|| {
                ChunkerError::invalid_options(format!("option '{key}' must be a non-negative integer"))
            })?;
            return Ok(value as usize);
        }
    }
    Ok(default)
}

fn opt_bool(options: &Value, keys: &[&str], default: bool) -> Result<bool> {
    for key in keys {
        if let Some(raw) = options.get(key) {
            let value = raw
                .as_bool()
                .ok_or_else(|| ChunkerError::invalid_options(format!("option '{key}' must be a boolean")))?;
            return Ok(value);
        }
    }
    Ok(default)
}

fn opt_string(options: &Value, keys: &[&str]) -> Result<Option<String>> {
    for key in keys {
        if let Some(raw) = options.get(key) {
            let value = raw
                .as_str()
                .ok_or_else(|| ChunkerError::invalid_options(format!("option '{key}' must be a string")))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

impl Strategy {
    /// Parse a strategy from its wire name and option bag. Option keys are
    /// accepted in camelCase (the wire form) with snake_case fallback.
    pub fn from_options(name: &str, options: &Value) -> Result<Self> {
        match name {
            "fixed_size" => {
                let chunk_size =
                    opt_usize(options, &["chunkSize", "chunk_size"], DEFAULT_CHUNK_SIZE)?;
                let overlap = opt_usize(options, &["overlap"], 0)?;
                if chunk_size == 0 {
                    return Err(ChunkerError::invalid_options("chunkSize must be >= 1"));
                }
                if overlap >= chunk_size {
                    return Err(ChunkerError::invalid_options(
                        "overlap must be smaller than chunkSize",
                    ));
                }
                Ok(Strategy::FixedSize {
                    chunk_size,
                    overlap,
                })
            }
            "by_lines" => {
                let lines_per_chunk = opt_usize(
                    options,
                    &["linesPerChunk", "lines_per_chunk"],
                    DEFAULT_LINES_PER_CHUNK,
                )?;
                let overlap = opt_usize(options, &["overlap"], 0)?;
                if lines_per_chunk == 0 {
                    return Err(ChunkerError::invalid_options("linesPerChunk must be >= 1"));
                }
                Ok(Strategy::ByLines {
                    lines_per_chunk,
                    overlap,
                })
            }
            "by_paragraphs" => Ok(Strategy::ByParagraphs),
            "by_sections" => Ok(Strategy::BySections {
                merge_empty_sections: opt_bool(
                    options,
                    &["mergeEmptySections", "merge_empty_sections"],
                    false,
                )?,
                min_section_length: opt_usize(
                    options,
                    &["minSectionLength", "min_section_length"],
                    0,
                )?,
            }),
            "by_regex" => {
                let pattern = opt_string(options, &["pattern"])?
                    .ok_or_else(|| ChunkerError::invalid_options("by_regex requires 'pattern'"))?;
                Ok(Strategy::ByRegex { pattern })
            }
            "by_sentences" => Ok(Strategy::BySentences),
            "by_tokens" => {
                let tokens_per_chunk = opt_usize(
                    options,
                    &["tokensPerChunk", "tokens_per_chunk"],
                    DEFAULT_TOKENS_PER_CHUNK,
                )?;
                let token_overlap = opt_usize(options, &["tokenOverlap", "token_overlap"], 0)?;
                if tokens_per_chunk == 0 {
                    return Err(ChunkerError::invalid_options("tokensPerChunk must be >= 1"));
                }
                if token_overlap >= tokens_per_chunk {
                    return Err(ChunkerError::invalid_options(
                        "tokenOverlap must be smaller than tokensPerChunk",
                    ));
                }
                Ok(Strategy::ByTokens {
                    tokens_per_chunk,
                    token_overlap,
                    tokenizer: TokenizerSelector {
                        model: opt_string(options, &["model"])?,
                        encoding: opt_string(options, &["encoding"])?,
                    },
                })
            }
            other => Err(ChunkerError::invalid_options(format!(
                "unknown strategy '{other}'"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::FixedSize { .. } => "fixed_size",
            Strategy::ByLines { .. } => "by_lines",
            Strategy::ByParagraphs => "by_paragraphs",
            Strategy::BySections { .. } => "by_sections",
            Strategy::ByRegex { .. } => "by_regex",
            Strategy::BySentences => "by_sentences",
            Strategy::ByTokens { .. } => "by_tokens",
        }
    }

    /// Canonicalized option form, stable across equivalent option bags.
    /// Used as the cache-key component for chunk and index caches.
    pub fn cache_key(&self) -> String {
        match self {
            Strategy::FixedSize {
                chunk_size,
                overlap,
            } => format!("fixed_size?size={chunk_size}&overlap={overlap}"),
            Strategy::ByLines {
                lines_per_chunk,
                overlap,
            } => format!("by_lines?lines={lines_per_chunk}&overlap={overlap}"),
            Strategy::ByParagraphs => "by_paragraphs".to_string(),
            Strategy::BySections {
                merge_empty_sections,
                min_section_length,
            } => format!("by_sections?merge={merge_empty_sections}&min={min_section_length}"),
            Strategy::ByRegex { pattern } => format!("by_regex?pattern={pattern}"),
            Strategy::BySentences => "by_sentences".to_string(),
            Strategy::ByTokens {
                tokens_per_chunk,
                token_overlap,
                tokenizer,
            } => format!(
                "by_tokens?tokens={tokens_per_chunk}&overlap={token_overlap}&tok={}",
                tokenizer.cache_key()
            ),
        }
    }

    /// The option bag in wire form, as recorded on decomposition records.
    pub fn options_json(&self) -> Value {
        match self {
            Strategy::FixedSize {
                chunk_size,
                overlap,
            } => serde_json::json!({ "chunkSize": chunk_size, "overlap": overlap }),
            Strategy::ByLines {
                lines_per_chunk,
                overlap,
            } => serde_json::json!({ "linesPerChunk": lines_per_chunk, "overlap": overlap }),
            Strategy::ByParagraphs | Strategy::BySentences => serde_json::json!({}),
            Strategy::BySections {
                merge_empty_sections,
                min_section_length,
            } => serde_json::json!({
                "mergeEmptySections": merge_empty_sections,
                "minSectionLength": min_section_length,
            }),
            Strategy::ByRegex { pattern } => serde_json::json!({ "pattern": pattern }),
            Strategy::ByTokens {
                tokens_per_chunk,
                token_overlap,
                tokenizer,
            } => {
                let mut bag = serde_json::json!({
                    "tokensPerChunk": tokens_per_chunk,
                    "tokenOverlap": token_overlap,
                });
                if let Some(model) = &tokenizer.model {
                    bag["model"] = Value::String(model.clone());
                }
                if let Some(encoding) = &tokenizer.encoding {
                    bag["encoding"] = Value::String(encoding.clone());
                }
                bag
            }
        }
    }
}
