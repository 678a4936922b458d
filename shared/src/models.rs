//! Shared data models.

use serde::{Deserialize, Serialize};

/// A pre-drawn card, in the order the caller laid it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFact {
    pub name: String,
    /// Spread position such as PAST, PRESENT or FUTURE
    pub position_label: String,
    #[serde(default)]
    pub reversed: bool,
}

/// Which reading shape is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    Single,
    Spread,
}

/// Reading request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadingRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub cards: Vec<CardFact>,
    pub mode: Option<ReadingMode>,
}

impl ReadingRequest {
    /// Explicit mode if given, otherwise spread whenever cards were drawn.
    pub fn mode(&self) -> ReadingMode {
        match self.mode {
            Some(mode) => mode,
            None if self.cards.is_empty() => ReadingMode::Single,
            None => ReadingMode::Spread,
        }
    }
}

/// Prompt pair plus sampling settings for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub user_message: String,
    pub temperature: f64,
    pub structured_output_hint: bool,
}

/// Text returned by the generation service, as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct RawGenerationOutput {
    pub text: String,
    pub elapsed_ms: u64,
}

/// Single-card reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardReading {
    /// Roman numeral of the card
    pub id: String,
    pub title: String,
    pub en_title: String,
    pub desc: String,
}

/// Multi-card spread reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadReading {
    pub valid: bool,
    /// One entry per drawn card, same order. Empty when `valid` is false.
    pub per_card_interpretation: Vec<String>,
    pub synthesis: String,
    /// Legacy alias of `synthesis`
    pub analysis: String,
}

impl SpreadReading {
    pub fn new(valid: bool, per_card_interpretation: Vec<String>, synthesis: String) -> Self {
        Self {
            valid,
            per_card_interpretation,
            analysis: synthesis.clone(),
            synthesis,
        }
    }
}

/// The structured result returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructuredReading {
    Single(CardReading),
    Spread(SpreadReading),
}

/// Debugging aid attached next to the reading. Not part of the contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<String>,
}

/// Success envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingResponse {
    pub result: StructuredReading,
    /// Set only when the fallback reading was used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    pub elapsed_ms: u64,
}

/// Error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_inferred_from_cards() {
        let single: ReadingRequest = serde_json::from_str(r#"{"query":"will it rain?"}"#).unwrap();
        assert_eq!(single.mode(), ReadingMode::Single);

        let spread: ReadingRequest = serde_json::from_str(
            r#"{"query":"career","cards":[{"name":"The Fool","positionLabel":"PAST","reversed":true}]}"#,
        )
        .unwrap();
        assert_eq!(spread.mode(), ReadingMode::Spread);
        assert!(spread.cards[0].reversed);

        let forced: ReadingRequest =
            serde_json::from_str(r#"{"query":"x","mode":"spread"}"#).unwrap();
        assert_eq!(forced.mode(), ReadingMode::Spread);
    }

    #[test]
    fn test_spread_reading_serializes_alias() {
        let reading = StructuredReading::Spread(SpreadReading::new(
            true,
            vec!["a".to_string()],
            "whole story".to_string(),
        ));
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["perCardInterpretation"][0], "a");
        assert_eq!(json["synthesis"], "whole story");
        assert_eq!(json["analysis"], "whole story");
    }

    #[test]
    fn test_single_reading_serializes_camel_case() {
        let reading = StructuredReading::Single(CardReading {
            id: "I".to_string(),
            title: "魔术师".to_string(),
            en_title: "THE MAGICIAN".to_string(),
            desc: "...".to_string(),
        });
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["enTitle"], "THE MAGICIAN");
        assert!(json.get("valid").is_none());
    }
}
