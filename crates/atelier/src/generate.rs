use serde_json::{json, Value};
use strum::{Display, EnumString};

use crate::error::Error;

/// Output resolutions the endpoint accepts, per side.
pub const ALLOWED_DIMENSIONS: [u32; 7] = [256, 512, 768, 1024, 1280, 1344, 1440];

pub const MIN_STRENGTH: f64 = 0.0;
pub const MAX_STRENGTH: f64 = 2.0;
pub const MIN_STEPS: u32 = 1;
pub const MAX_STEPS: u32 = 50;
pub const MIN_GUIDANCE: f64 = 1.5;
pub const MAX_GUIDANCE: f64 = 5.0;
pub const MAX_SAFETY_TOLERANCE: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

/// An inference request against a previously trained fine-tune.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub finetune_id: String,
    pub prompt: String,
    pub finetune_strength: f64,
    pub steps: u32,
    pub guidance: f64,
    pub width: u32,
    pub height: u32,
    pub seed: Option<i64>,
    pub safety_tolerance: u32,
    pub output_format: OutputFormat,
}

impl GenerateRequest {
    pub fn builder(
        finetune_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> GenerateRequestBuilder {
        GenerateRequestBuilder::new(finetune_id, prompt)
    }

    /// Serializes the request into the wire payload, validating every
    /// bounded field first. `seed` is omitted entirely when unset so the
    /// server draws a random one.
    pub fn to_payload(&self) -> Result<Value, Error> {
        self.validate()?;

        let mut payload = json!({
            "finetune_id": self.finetune_id,
            "finetune_strength": self.finetune_strength,
            "prompt": self.prompt,
            "steps": self.steps,
            "guidance": self.guidance,
            "width": self.width,
            "height": self.height,
            "safety_tolerance": self.safety_tolerance,
            "output_format": self.output_format.to_string(),
        });

        if let Some(seed) = self.seed {
            payload
                .as_object_mut()
                .unwrap()
                .insert("seed".to_string(), json!(seed));
        }

        Ok(payload)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.finetune_id.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "finetune_id must not be empty".to_string(),
            ));
        }
        if self.prompt.trim().is_empty() {
            return Err(Error::InvalidArgument("prompt must not be empty".to_string()));
        }
        if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&self.finetune_strength) {
            return Err(Error::InvalidArgument(format!(
                "finetune_strength must be within [{}, {}], got {}",
                MIN_STRENGTH, MAX_STRENGTH, self.finetune_strength
            )));
        }
        if !(MIN_STEPS..=MAX_STEPS).contains(&self.steps) {
            return Err(Error::InvalidArgument(format!(
                "steps must be within [{}, {}], got {}",
                MIN_STEPS, MAX_STEPS, self.steps
            )));
        }
        if !(MIN_GUIDANCE..=MAX_GUIDANCE).contains(&self.guidance) {
            return Err(Error::InvalidArgument(format!(
                "guidance must be within [{}, {}], got {}",
                MIN_GUIDANCE, MAX_GUIDANCE, self.guidance
            )));
        }
        for (side, value) in [("width", self.width), ("height", self.height)] {
            if !ALLOWED_DIMENSIONS.contains(&value) {
                return Err(Error::InvalidArgument(format!(
                    "{} must be one of {:?}, got {}",
                    side, ALLOWED_DIMENSIONS, value
                )));
            }
        }
        if self.safety_tolerance > MAX_SAFETY_TOLERANCE {
            return Err(Error::InvalidArgument(format!(
                "safety_tolerance must be within [0, {}], got {}",
                MAX_SAFETY_TOLERANCE, self.safety_tolerance
            )));
        }
        Ok(())
    }
}

pub struct GenerateRequestBuilder {
    request: GenerateRequest,
}

impl GenerateRequestBuilder {
    pub fn new(finetune_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            request: GenerateRequest {
                finetune_id: finetune_id.into(),
                prompt: prompt.into(),
                finetune_strength: 1.1,
                steps: 40,
                guidance: 2.5,
                width: 512,
                height: 512,
                seed: None,
                safety_tolerance: 2,
                output_format: OutputFormat::default(),
            },
        }
    }

    pub fn finetune_strength(mut self, finetune_strength: f64) -> Self {
        self.request.finetune_strength = finetune_strength;
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.request.steps = steps;
        self
    }

    pub fn guidance(mut self, guidance: f64) -> Self {
        self.request.guidance = guidance;
        self
    }

    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.request.width = width;
        self.request.height = height;
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.request.seed = Some(seed);
        self
    }

    pub fn safety_tolerance(mut self, safety_tolerance: u32) -> Self {
        self.request.safety_tolerance = safety_tolerance;
        self
    }

    pub fn output_format(mut self, output_format: OutputFormat) -> Self {
        self.request.output_format = output_format;
        self
    }

    pub fn build(self) -> GenerateRequest {
        self.request
    }
}
