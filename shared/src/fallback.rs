//! Fixed substitute reading used whenever a pipeline stage fails.

use tracing::warn;

use crate::models::{CardReading, ReadingMode, SpreadReading, StructuredReading};
use crate::pipeline::Stage;
use crate::Error;

/// Message shown next to a fallback reading.
pub const FALLBACK_NOTICE: &str = "与宇宙的连接受到了干扰，请稍后再试一次。";

pub const FALLBACK_CARD_ID: &str = "XXI";
pub const FALLBACK_CARD_TITLE: &str = "星辰的沉默";
pub const FALLBACK_CARD_EN_TITLE: &str = "THE SILENT STARS";
pub const FALLBACK_CARD_DESC: &str =
    "星辰暂时隐去了它们的低语，占卜的连接受到了干扰。请深呼吸，稍后再来叩问命运。";

pub const FALLBACK_INTERPRETATION: &str = "这张牌的光芒被迷雾遮蔽，连接受到了干扰。";
pub const FALLBACK_SYNTHESIS: &str =
    "牌阵与宇宙之间的连接暂时中断，此刻无法完整解读。请稍后再试一次。";

/// A fallback reading plus the notice to show with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    pub reading: StructuredReading,
    pub notice: &'static str,
}

/// Build the fallback for `mode`.
///
/// The result depends only on `mode` and `card_count`, never on the error.
pub fn fallback_reading(mode: ReadingMode, card_count: usize) -> Fallback {
    let reading = match mode {
        ReadingMode::Single => StructuredReading::Single(CardReading {
            id: FALLBACK_CARD_ID.to_string(),
            title: FALLBACK_CARD_TITLE.to_string(),
            en_title: FALLBACK_CARD_EN_TITLE.to_string(),
            desc: FALLBACK_CARD_DESC.to_string(),
        }),
        ReadingMode::Spread => StructuredReading::Spread(SpreadReading::new(
            true,
            vec![FALLBACK_INTERPRETATION.to_string(); card_count],
            FALLBACK_SYNTHESIS.to_string(),
        )),
    };

    Fallback {
        reading,
        notice: FALLBACK_NOTICE,
    }
}

/// Log the failure and return the fallback.
pub fn apply(stage: Stage, error: &Error, mode: ReadingMode, card_count: usize) -> Fallback {
    warn!(stage = %stage, ?mode, error = %error, "Pipeline stage failed, using fallback reading");
    fallback_reading(mode, card_count)
}
