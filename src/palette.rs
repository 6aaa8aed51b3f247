//! Layer-name → color assignment for scatter plots.
//!
//! Rules are substring matches checked in order; the first hit wins. The
//! default rules cover GPT-NeoX parameter names.

use serde::{Deserialize, Serialize};

/// Color used when no rule matches.
pub const FALLBACK_COLOR: &str = "black";

/// One substring → color rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRule {
    pub pattern: String,
    pub color: String,
}

/// Ordered color rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    rules: Vec<ColorRule>,
    fallback: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self::gpt_neox()
    }
}

impl Palette {
    /// Palette with no rules; every layer gets `fallback`.
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Colors for GPT-NeoX (Pythia) parameter names.
    ///
    /// `attention.dense` is listed after `attention.query_key_value` and the
    /// layer-norm rules use their full prefixes, so the order below matters.
    #[must_use]
    pub fn gpt_neox() -> Self {
        Self::new(FALLBACK_COLOR)
            .with_rule("attention.query_key_value", "brown")
            .with_rule("attention.dense", "peru")
            .with_rule("mlp.dense_4h_to_h", "gold")
            .with_rule("mlp.dense_h_to_4h", "yellowgreen")
            .with_rule("input_layernorm", "forestgreen")
            .with_rule("post_attention_layernorm", "darkcyan")
            .with_rule("final_layer_norm", "slategrey")
            .with_rule("embed_in", "slateblue")
            .with_rule("embed_out", "hotpink")
    }

    /// Append a rule (lowest priority so far).
    #[must_use]
    pub fn with_rule(mut self, pattern: impl Into<String>, color: impl Into<String>) -> Self {
        self.rules.push(ColorRule {
            pattern: pattern.into(),
            color: color.into(),
        });
        self
    }

    /// Color for `layer_name`.
    #[must_use]
    pub fn color_for(&self, layer_name: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| layer_name.contains(&rule.pattern))
            .map_or(self.fallback.as_str(), |rule| rule.color.as_str())
    }

    #[must_use]
    pub fn rules(&self) -> &[ColorRule] {
        &self.rules
    }
}
