use anyhow::{Context, Result};
use atelier::{
    poll_until_terminal, read_training_archive, CaptionMode, FinetuneRequest, FinetuneType,
    Priority,
};
use console::style;

use super::{build_client, interactive_poll_options, open_registry, progress_bar, render_progress};
use crate::cli::FinetuneArgs;

pub async fn handle_finetune(args: FinetuneArgs) -> Result<()> {
    let mode: CaptionMode = args
        .mode
        .parse()
        .with_context(|| format!("unknown mode {:?}, expected character, product, style or general", args.mode))?;
    let priority: Priority = args
        .priority
        .parse()
        .with_context(|| format!("unknown priority {:?}, expected speed or quality", args.priority))?;
    let finetune_type: FinetuneType = args
        .finetune_type
        .parse()
        .with_context(|| format!("unknown type {:?}, expected full or lora", args.finetune_type))?;

    let archive = read_training_archive(&args.archive)?;
    let mut builder = FinetuneRequest::builder(archive, &args.name)
        .trigger_word(&args.trigger_word)
        .mode(mode)
        .iterations(args.iterations)
        .captioning(!args.no_captioning)
        .priority(priority)
        .finetune_type(finetune_type)
        .lora_rank(args.lora_rank);
    if let Some(rate) = args.learning_rate {
        builder = builder.learning_rate(rate);
    }
    let request = builder.build();

    let client = build_client(args.common.api_key)?;
    let registry = open_registry(args.common.registry)?;

    let handle = client.submit_finetune(&request).await?;
    // Register before waiting: an interrupted wait must not lose the id.
    registry
        .put(&args.name, &handle.id)
        .context("fine-tune submitted but could not be registered")?;
    println!(
        "Submitted fine-tune {} as {}",
        style(&args.name).green().bold(),
        style(&handle.id).dim()
    );

    if args.no_wait {
        println!("Not waiting; check on it with: atelier status {}", handle.id);
        return Ok(());
    }

    let options = interactive_poll_options(handle.kind, args.common.deadline);
    let bar = progress_bar("training")?;
    let status = poll_until_terminal(&client, &handle.id, &options, |s| {
        render_progress(&bar, s)
    })
    .await;
    bar.finish_and_clear();

    let status = status?;
    super::report_terminal(&status, &handle.id)?;
    println!(
        "Fine-tune {} is ready. Generate with: atelier generate {} \"{} ...\"",
        style(&args.name).green().bold(),
        args.name,
        args.trigger_word
    );
    Ok(())
}
