use base64::engine::{general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::{json, Value};
use std::path::Path;
use strum::{Display, EnumString};

use crate::error::Error;

pub const MIN_ITERATIONS: u32 = 100;
pub const MAX_ITERATIONS: u32 = 1000;
pub const ALLOWED_LORA_RANKS: [u32; 2] = [16, 32];

/// Captioning mode for the training set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CaptionMode {
    #[default]
    Character,
    Product,
    Style,
    General,
}

/// Queue priority the remote trainer applies to the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Speed,
    #[default]
    Quality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FinetuneType {
    #[default]
    Full,
    Lora,
}

/// A validated-on-serialization fine-tune submission.
///
/// `file_data` holds the raw training archive; it is base64-embedded into
/// the wire payload, never uploaded separately. `comment` doubles as the
/// human-readable registry name.
#[derive(Debug, Clone, PartialEq)]
pub struct FinetuneRequest {
    pub file_data: Vec<u8>,
    pub comment: String,
    pub trigger_word: String,
    pub mode: CaptionMode,
    pub iterations: u32,
    pub learning_rate: Option<f64>,
    pub captioning: bool,
    pub priority: Priority,
    pub finetune_type: FinetuneType,
    pub lora_rank: u32,
}

impl FinetuneRequest {
    pub fn builder(file_data: Vec<u8>, comment: impl Into<String>) -> FinetuneRequestBuilder {
        FinetuneRequestBuilder::new(file_data, comment)
    }

    /// Serializes the request into the wire payload. Pure; performs all
    /// field validation so a bad request never reaches the network.
    ///
    /// `learning_rate` is omitted entirely when unset so the server picks
    /// its own default; sending `null` is rejected remotely.
    pub fn to_payload(&self) -> Result<Value, Error> {
        self.validate()?;

        let mut payload = json!({
            "finetune_comment": self.comment,
            "trigger_word": self.trigger_word,
            "file_data": BASE64_STANDARD.encode(&self.file_data),
            "iterations": self.iterations,
            "mode": self.mode.to_string(),
            "captioning": self.captioning,
            "priority": self.priority.to_string(),
            "lora_rank": self.lora_rank,
            "finetune_type": self.finetune_type.to_string(),
        });

        if let Some(rate) = self.learning_rate {
            payload
                .as_object_mut()
                .unwrap()
                .insert("learning_rate".to_string(), json!(rate));
        }

        Ok(payload)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.file_data.is_empty() {
            return Err(Error::InvalidArgument(
                "training archive is empty".to_string(),
            ));
        }
        if self.comment.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "finetune comment must not be empty".to_string(),
            ));
        }
        if self.trigger_word.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "trigger word must not be empty".to_string(),
            ));
        }
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(Error::InvalidArgument(format!(
                "iterations must be within [{}, {}], got {}",
                MIN_ITERATIONS, MAX_ITERATIONS, self.iterations
            )));
        }
        if let Some(rate) = self.learning_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::InvalidArgument(format!(
                    "learning rate must be a positive number, got {}",
                    rate
                )));
            }
        }
        if !ALLOWED_LORA_RANKS.contains(&self.lora_rank) {
            return Err(Error::InvalidArgument(format!(
                "lora_rank must be one of {:?}, got {}",
                ALLOWED_LORA_RANKS, self.lora_rank
            )));
        }
        Ok(())
    }
}

/// Reads a training archive from disk. A missing or unreadable path maps
/// to [`Error::ResourceNotFound`]: the input is caller-supplied and
/// caller-recoverable.
pub fn read_training_archive(path: impl AsRef<Path>) -> Result<Vec<u8>, Error> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| {
        Error::ResourceNotFound(format!("training archive {}: {}", path.display(), e))
    })
}

pub struct FinetuneRequestBuilder {
    request: FinetuneRequest,
}

impl FinetuneRequestBuilder {
    pub fn new(file_data: Vec<u8>, comment: impl Into<String>) -> Self {
        Self {
            request: FinetuneRequest {
                file_data,
                comment: comment.into(),
                trigger_word: "TOK".to_string(),
                mode: CaptionMode::default(),
                iterations: 300,
                learning_rate: None,
                captioning: true,
                priority: Priority::default(),
                finetune_type: FinetuneType::default(),
                lora_rank: 32,
            },
        }
    }

    pub fn trigger_word(mut self, trigger_word: impl Into<String>) -> Self {
        self.request.trigger_word = trigger_word.into();
        self
    }

    pub fn mode(mut self, mode: CaptionMode) -> Self {
        self.request.mode = mode;
        self
    }

    pub fn iterations(mut self, iterations: u32) -> Self {
        self.request.iterations = iterations;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.request.learning_rate = Some(learning_rate);
        self
    }

    pub fn captioning(mut self, captioning: bool) -> Self {
        self.request.captioning = captioning;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.request.priority = priority;
        self
    }

    pub fn finetune_type(mut self, finetune_type: FinetuneType) -> Self {
        self.request.finetune_type = finetune_type;
        self
    }

    pub fn lora_rank(mut self, lora_rank: u32) -> Self {
        self.request.lora_rank = lora_rank;
        self
    }

    pub fn build(self) -> FinetuneRequest {
        self.request
    }
}
