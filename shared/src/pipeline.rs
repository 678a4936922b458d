//! The reading pipeline: prompt, generate, extract, validate, or fall back.
//!
//! Any stage failure short-circuits to the fixed fallback reading, so `run`
//! always yields a complete [`ReadingResponse`]. There are no retries here.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

use crate::client::Generator;
use crate::extract::extract_payload;
use crate::fallback;
use crate::models::{
    Diagnostics, GenerationRequest, RawGenerationOutput, ReadingMode, ReadingRequest,
    ReadingResponse, StructuredReading,
};
use crate::prompt::{PromptBuilder, PromptTemplates};
use crate::validate::{validate_card, validate_spread};
use crate::{Config, Error, Result};

/// Pipeline stages that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generation,
    Extraction,
    Validation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Generation => "generation",
            Stage::Extraction => "extraction",
            Stage::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// Immutable after construction; share it across invocations behind an `Arc`.
pub struct ReadingPipeline<G> {
    generator: G,
    prompts: PromptBuilder,
    timeout: Duration,
    include_diagnostics: bool,
}

impl<G: Generator> ReadingPipeline<G> {
    pub fn new(generator: G, prompts: PromptBuilder, timeout: Duration) -> Self {
        Self {
            generator,
            prompts,
            timeout,
            include_diagnostics: true,
        }
    }

    /// Build from configuration, loading prompt templates from disk if configured.
    pub fn from_config(config: &Config, generator: G) -> Result<Self> {
        let templates = match &config.prompt_templates_path {
            Some(path) => PromptTemplates::from_file(path)?,
            None => PromptTemplates::default(),
        };
        info!(version = %templates.version, "Loaded prompt templates");

        let prompts = PromptBuilder::new(templates)
            .with_temperatures(config.single_card_temperature, config.spread_temperature);

        Ok(Self::new(generator, prompts, config.request_timeout)
            .with_diagnostics(config.include_diagnostics))
    }

    pub fn with_diagnostics(mut self, include: bool) -> Self {
        self.include_diagnostics = include;
        self
    }

    /// Produce a reading. Never fails.
    pub async fn run(&self, request: &ReadingRequest) -> ReadingResponse {
        let started = Instant::now();
        let mode = request.mode();
        let card_count = request.cards.len();

        let generation = self.prompts.build(&request.query, &request.cards, mode);

        let raw = match self.generate(&generation).await {
            Ok(raw) => raw,
            Err(e) => {
                let fallback = fallback::apply(Stage::Generation, &e, mode, card_count);
                let diagnostics = Diagnostics {
                    raw_text: None,
                    elapsed_ms: elapsed_ms(started),
                    failed_stage: Some(Stage::Generation.to_string()),
                };
                return self.respond(fallback.reading, Some(fallback.notice), diagnostics, started);
            }
        };

        match normalize(&raw.text, mode, card_count) {
            Ok(reading) => {
                info!(?mode, elapsed_ms = raw.elapsed_ms, "Generated reading validated");
                let diagnostics = Diagnostics {
                    raw_text: Some(raw.text),
                    elapsed_ms: raw.elapsed_ms,
                    failed_stage: None,
                };
                self.respond(reading, None, diagnostics, started)
            }
            Err((stage, e)) => {
                let fallback = fallback::apply(stage, &e, mode, card_count);
                let diagnostics = diagnostics_for_failure(raw, stage);
                self.respond(fallback.reading, Some(fallback.notice), diagnostics, started)
            }
        }
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<RawGenerationOutput> {
        match tokio::time::timeout(self.timeout, self.generator.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Transport(format!(
                "Generation did not complete within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }

    fn respond(
        &self,
        result: StructuredReading,
        notice: Option<&str>,
        diagnostics: Diagnostics,
        started: Instant,
    ) -> ReadingResponse {
        ReadingResponse {
            result,
            notice: notice.map(String::from),
            diagnostics: self.include_diagnostics.then_some(diagnostics),
            elapsed_ms: elapsed_ms(started),
        }
    }
}

/// Extract and validate, tagging any failure with its stage.
fn normalize(
    text: &str,
    mode: ReadingMode,
    card_count: usize,
) -> std::result::Result<StructuredReading, (Stage, Error)> {
    let payload = extract_payload(text).map_err(|e| (Stage::Extraction, e))?;

    let reading = match mode {
        ReadingMode::Single => validate_card(payload).map(StructuredReading::Single),
        ReadingMode::Spread => validate_spread(payload, card_count).map(StructuredReading::Spread),
    };
    reading.map_err(|e| (Stage::Validation, e))
}

fn diagnostics_for_failure(raw: RawGenerationOutput, stage: Stage) -> Diagnostics {
    Diagnostics {
        raw_text: Some(raw.text),
        elapsed_ms: raw.elapsed_ms,
        failed_stage: Some(stage.to_string()),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
