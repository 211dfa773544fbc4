//! Client for the FLUX fine-tuning and fine-tuned inference API.
//!
//! The lifecycle is the same for both job kinds: build a request, submit
//! it, poll the returned [`JobHandle`] until a terminal [`JobStatus`], then
//! pull the artifact out of a `Ready` result. Fine-tunes are remembered by
//! name in a small on-disk registry so later inference runs can reference
//! them without carrying raw identifiers around.

pub mod artifact;
pub mod client;
pub mod config;
pub mod error;
pub mod finetune;
pub mod generate;
pub mod poll;
pub mod registry;
pub mod status;

pub use artifact::{extract_artifact, Artifact};
pub use client::{BflClient, JobHandle, JobKind};
pub use config::ApiConfig;
pub use error::Error;
pub use finetune::{
    read_training_archive, CaptionMode, FinetuneRequest, FinetuneRequestBuilder, FinetuneType,
    Priority,
};
pub use generate::{GenerateRequest, GenerateRequestBuilder, OutputFormat};
pub use poll::{poll_until_terminal, PollOptions};
pub use registry::{FileRegistryStore, FinetuneRegistry, RegistryStore};
pub use status::JobStatus;
