use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

#[derive(Parser)]
#[command(
    name = "atelier",
    version,
    about = "Fine-tune FLUX image models and generate with them"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a new fine-tune from a zipped set of images
    Finetune(FinetuneArgs),
    /// Generate an image with a registered fine-tune
    Generate(GenerateArgs),
    /// Show the current status of a job id
    Status(StatusArgs),
    /// List fine-tunes recorded in the registry
    List(ListArgs),
}

#[derive(Args)]
pub struct FinetuneArgs {
    /// Zip archive with training images (and optional caption text files)
    pub archive: PathBuf,

    /// Name the fine-tune is registered under
    #[arg(short, long)]
    pub name: String,

    /// Token that invokes the trained concept in prompts
    #[arg(long, default_value = "TOK")]
    pub trigger_word: String,

    /// Captioning mode: character, product, style or general
    #[arg(long, default_value = "character")]
    pub mode: String,

    /// Training iterations (100-1000)
    #[arg(long, default_value_t = 300)]
    pub iterations: u32,

    /// Learning rate override; the server picks one when omitted
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Disable automatic caption generation
    #[arg(long)]
    pub no_captioning: bool,

    /// Queue priority: speed or quality
    #[arg(long, default_value = "quality")]
    pub priority: String,

    /// Training style: full or lora
    #[arg(long = "type", default_value = "full")]
    pub finetune_type: String,

    /// LoRA rank, 16 or 32
    #[arg(long, default_value_t = 32)]
    pub lora_rank: u32,

    /// Submit and register without waiting for training to finish
    #[arg(long)]
    pub no_wait: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Registered fine-tune name to draw with
    pub finetune: String,

    /// Prompt; include the trigger word to invoke the concept
    pub prompt: String,

    /// How strongly the fine-tune shapes the output (0-2)
    #[arg(long, default_value_t = 1.1)]
    pub strength: f64,

    /// Diffusion steps (1-50)
    #[arg(long, default_value_t = 40)]
    pub steps: u32,

    /// Guidance scale (1.5-5)
    #[arg(long, default_value_t = 2.5)]
    pub guidance: f64,

    /// Output width in pixels
    #[arg(long, default_value_t = 512)]
    pub width: u32,

    /// Output height in pixels
    #[arg(long, default_value_t = 512)]
    pub height: u32,

    /// Fixed seed for reproducible outputs
    #[arg(long)]
    pub seed: Option<i64>,

    /// Moderation strictness, 0 (strict) to 6 (permissive)
    #[arg(long, default_value_t = 2)]
    pub safety_tolerance: u32,

    /// Output format: jpeg or png
    #[arg(long, default_value = "jpeg")]
    pub output_format: String,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Job id returned at submission time
    pub id: String,

    /// API key; read from BFL_API_KEY otherwise
    #[arg(long)]
    pub api_key: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Registry file to read instead of the default
    #[arg(long)]
    pub registry: Option<PathBuf>,
}

/// Flags shared by the job-submitting subcommands.
#[derive(Args)]
pub struct CommonArgs {
    /// API key; read from BFL_API_KEY (or a .env file) otherwise
    #[arg(long)]
    pub api_key: Option<String>,

    /// Registry file to use instead of the default
    #[arg(long)]
    pub registry: Option<PathBuf>,

    /// Give up after this many seconds of polling
    #[arg(long)]
    pub deadline: Option<u64>,
}

pub async fn cli() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Finetune(args) => commands::finetune::handle_finetune(args).await,
        Command::Generate(args) => commands::generate::handle_generate(args).await,
        Command::Status(args) => commands::status::handle_status(args).await,
        Command::List(args) => commands::list::handle_list(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn finetune_args_apply_reference_defaults() {
        let cli =
            Cli::try_parse_from(["atelier", "finetune", "data.zip", "--name", "cat-v1"]).unwrap();
        match cli.command {
            Command::Finetune(args) => {
                assert_eq!(args.trigger_word, "TOK");
                assert_eq!(args.mode, "character");
                assert_eq!(args.iterations, 300);
                assert_eq!(args.learning_rate, None);
                assert!(!args.no_captioning);
                assert_eq!(args.priority, "quality");
                assert_eq!(args.finetune_type, "full");
                assert_eq!(args.lora_rank, 32);
                assert!(!args.no_wait);
            }
            _ => panic!("expected the finetune subcommand"),
        }
    }

    #[test]
    fn generate_args_parse_overrides() {
        let cli = Cli::try_parse_from([
            "atelier",
            "generate",
            "cat-v1",
            "TOK at the beach",
            "--width",
            "1024",
            "--seed",
            "7",
            "--output-format",
            "png",
            "--deadline",
            "120",
        ])
        .unwrap();
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.finetune, "cat-v1");
                assert_eq!(args.prompt, "TOK at the beach");
                assert_eq!((args.width, args.height), (1024, 512));
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.output_format, "png");
                assert_eq!(args.common.deadline, Some(120));
            }
            _ => panic!("expected the generate subcommand"),
        }
    }

    #[test]
    fn finetune_requires_a_name() {
        assert!(Cli::try_parse_from(["atelier", "finetune", "data.zip"]).is_err());
    }
}
