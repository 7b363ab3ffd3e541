//! Text echo with optional reversal.
//!
//! Length and reversal both operate on Unicode scalar values (code points),
//! not bytes and not grapheme clusters.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EchoResult {
    pub original: String,
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reversed: Option<String>,
}

pub fn echo(text: &str, reverse: bool) -> EchoResult {
    EchoResult {
        original: text.to_string(),
        length: text.chars().count(),
        reversed: reverse.then(|| text.chars().rev().collect()),
    }
}
