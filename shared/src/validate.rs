//! Turns an extracted payload into a complete reading.
//!
//! Parsing is the only thing that can fail here. Missing or blank fields are
//! filled with the defaults below rather than rejecting the payload.

use serde_json::{Map, Value};

use crate::models::{CardReading, SpreadReading};
use crate::{Error, Result};

pub const DEFAULT_CARD_ID: &str = "0";
pub const DEFAULT_CARD_TITLE: &str = "未知之牌";
pub const DEFAULT_CARD_EN_TITLE: &str = "THE UNKNOWN";
pub const DEFAULT_CARD_DESC: &str = "牌面笼罩在迷雾之中，此刻的讯息尚不清晰。请静下心来，稍后再问一次。";

/// Placeholder for a card the generator did not interpret.
pub const DEFAULT_CARD_INTERPRETATION: &str = "这张牌的讯息尚未显现，请结合其他牌的指引来理解它。";
/// Placeholder synthesis for a valid spread without one.
pub const DEFAULT_SYNTHESIS: &str = "牌阵的整体讯息仍在酝酿之中，请留意各张牌之间的呼应。";
/// Used only when the generator rejected the query without saying why.
pub const DEFAULT_REJECTION: &str = "塔罗无法解读这个问题，请换一种方式清晰地描述你的困惑。";

fn parse_object(payload: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(Error::MalformedPayload {
            raw: payload.to_string(),
        }),
    }
}

/// Scalar as trimmed text. Numbers and booleans keep their JSON spelling.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    Some(text).filter(|s| !s.is_empty())
}

/// First non-blank scalar among `keys`.
fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key))
        .find_map(scalar_text)
}

/// `valid` flag, also accepting `"true"`/`"false"` strings.
fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn text_or(map: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    text_field(map, keys).unwrap_or_else(|| default.to_string())
}

/// Validate a single-card payload.
pub fn validate_card(payload: &str) -> Result<CardReading> {
    let map = parse_object(payload)?;

    Ok(CardReading {
        id: text_or(&map, &["id"], DEFAULT_CARD_ID),
        title: text_or(&map, &["title"], DEFAULT_CARD_TITLE),
        en_title: text_or(&map, &["enTitle", "en_title", "englishTitle"], DEFAULT_CARD_EN_TITLE),
        desc: text_or(&map, &["desc", "description", "interpretation"], DEFAULT_CARD_DESC),
    })
}

/// One interpretation entry, either a bare string or an object wrapping one.
fn interpretation_text(entry: &Value) -> Option<String> {
    match entry {
        Value::Object(map) => text_field(map, &["interpretation", "text", "desc"]),
        other => scalar_text(other),
    }
}

/// Validate a spread payload for `card_count` drawn cards.
///
/// A rejected query (`valid: false`) clears the per-card list and keeps the
/// generator's own synthesis. Otherwise the list is padded or truncated to
/// exactly one entry per card.
pub fn validate_spread(payload: &str, card_count: usize) -> Result<SpreadReading> {
    let map = parse_object(payload)?;

    let valid = map.get("valid").and_then(flag).unwrap_or(true);
    let synthesis = text_field(&map, &["synthesis", "analysis"]);

    if !valid {
        let synthesis = synthesis.unwrap_or_else(|| DEFAULT_REJECTION.to_string());
        return Ok(SpreadReading::new(false, Vec::new(), synthesis));
    }

    let entries = ["perCardInterpretation", "interpretations", "cards"]
        .iter()
        .filter_map(|key| map.get(*key))
        .find_map(Value::as_array);

    let interpretations = (0..card_count)
        .map(|i| {
            entries
                .and_then(|list| list.get(i))
                .and_then(interpretation_text)
                .unwrap_or_else(|| DEFAULT_CARD_INTERPRETATION.to_string())
        })
        .collect();

    Ok(SpreadReading::new(
        true,
        interpretations,
        synthesis.unwrap_or_else(|| DEFAULT_SYNTHESIS.to_string()),
    ))
}
