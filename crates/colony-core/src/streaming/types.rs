use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw provider chunk carried by an `agent_stream_token` event.
/// The backend passes these through without transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Raw AI SDK chunk - passthrough without transformation
    pub data: Value,
}

impl StreamChunk {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Extract text delta if this is a text-delta chunk
    pub fn text_delta(&self) -> Option<&str> {
        if self.data.get("type")?.as_str()? == "text-delta" {
            // AI SDK v6 uses "text", older versions used "textDelta"
            self.data
                .get("text")
                .or_else(|| self.data.get("textDelta"))
                .and_then(|v| v.as_str())
        } else {
            None
        }
    }

    /// Extract reasoning delta if this is a reasoning-delta chunk
    pub fn thinking_delta(&self) -> Option<&str> {
        if self.data.get("type")?.as_str()? == "reasoning-delta" {
            // AI SDK uses "delta" or "text" for reasoning chunks
            self.data
                .get("delta")
                .or_else(|| self.data.get("text"))
                .and_then(|v| v.as_str())
        } else {
            None
        }
    }

    /// Check if this is a finish chunk
    pub fn is_finish(&self) -> bool {
        self.data
            .get("type")
            .and_then(|t| t.as_str())
            .map(|t| t == "finish")
            .unwrap_or(false)
    }
}
