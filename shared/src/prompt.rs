//! Prompt construction for the generation service.

use serde::Deserialize;
use std::path::Path;

use crate::models::{CardFact, GenerationRequest, ReadingMode};
use crate::{Error, Result};

/// Sampling temperature for single-card readings. Kept low for stable card picks.
pub const SINGLE_CARD_TEMPERATURE: f64 = 1.0;

/// Sampling temperature for spreads, where richer narrative is wanted.
pub const SPREAD_TEMPERATURE: f64 = 1.3;

const DEFAULT_TEMPLATE_VERSION: &str = "2024-06-single-spread";

/// Versioned system instructions, one per reading mode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplates {
    pub version: String,
    pub single_card: String,
    pub spread: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            version: DEFAULT_TEMPLATE_VERSION.to_string(),
            single_card: include_str!("../prompts/single.txt").trim().to_string(),
            spread: include_str!("../prompts/spread.txt").trim().to_string(),
        }
    }
}

impl PromptTemplates {
    /// Load templates from a JSON file with `version`, `singleCard` and `spread` keys.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read prompt templates {}: {}", path.display(), e))
        })?;

        let templates: Self = serde_json::from_str(&contents)?;
        if templates.single_card.trim().is_empty() || templates.spread.trim().is_empty() {
            return Err(Error::Config(format!(
                "Prompt templates {} contain an empty instruction",
                path.display()
            )));
        }

        Ok(templates)
    }
}

/// Builds generation requests from typed inputs.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    templates: PromptTemplates,
    single_card_temperature: f64,
    spread_temperature: f64,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(PromptTemplates::default())
    }
}

impl PromptBuilder {
    pub fn new(templates: PromptTemplates) -> Self {
        Self {
            templates,
            single_card_temperature: SINGLE_CARD_TEMPERATURE,
            spread_temperature: SPREAD_TEMPERATURE,
        }
    }

    /// Override the per-mode sampling temperatures.
    pub fn with_temperatures(mut self, single_card: f64, spread: f64) -> Self {
        self.single_card_temperature = single_card;
        self.spread_temperature = spread;
        self
    }

    /// Build the request for one reading.
    pub fn build(&self, query: &str, cards: &[CardFact], mode: ReadingMode) -> GenerationRequest {
        match mode {
            ReadingMode::Single => GenerationRequest {
                system_instruction: self.templates.single_card.clone(),
                user_message: format!("求问：{}", query),
                temperature: self.single_card_temperature,
                structured_output_hint: true,
            },
            ReadingMode::Spread => GenerationRequest {
                system_instruction: self.templates.spread.clone(),
                user_message: format!("求问：{}\n\n牌阵：\n{}", query, render_cards(cards)),
                temperature: self.spread_temperature,
                structured_output_hint: true,
            },
        }
    }
}

/// Render cards as `"<index>. [<position>] <name> - <state>"` lines, in order.
pub fn render_cards(cards: &[CardFact]) -> String {
    cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            let state = if card.reversed { "逆位" } else { "正位" };
            format!("{}. [{}] {} - {}", i + 1, card.position_label, card.name, state)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
