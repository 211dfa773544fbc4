use anyhow::{bail, Context, Result};
use atelier::{extract_artifact, poll_until_terminal, GenerateRequest, OutputFormat};
use console::style;

use super::{build_client, interactive_poll_options, open_registry, progress_bar, render_progress};
use crate::cli::GenerateArgs;

pub async fn handle_generate(args: GenerateArgs) -> Result<()> {
    let output_format: OutputFormat = args
        .output_format
        .parse()
        .with_context(|| format!("unknown output format {:?}, expected jpeg or png", args.output_format))?;

    let registry = open_registry(args.common.registry)?;
    let finetune_id = match registry.get(&args.finetune)? {
        Some(id) => id,
        None => {
            let known = registry.get_all()?;
            if known.is_empty() {
                bail!("No fine-tunes found. Run `atelier finetune` first.");
            }
            bail!(
                "no fine-tune named {:?}; known names: {}",
                args.finetune,
                known.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        }
    };

    let mut builder = GenerateRequest::builder(&finetune_id, &args.prompt)
        .finetune_strength(args.strength)
        .steps(args.steps)
        .guidance(args.guidance)
        .dimensions(args.width, args.height)
        .safety_tolerance(args.safety_tolerance)
        .output_format(output_format);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let request = builder.build();

    let client = build_client(args.common.api_key)?;
    let handle = client.submit_generate(&request).await?;
    println!(
        "Submitted generation {} against fine-tune {}",
        style(&handle.id).dim(),
        style(&args.finetune).green()
    );

    let options = interactive_poll_options(handle.kind, args.common.deadline);
    let bar = progress_bar("generating")?;
    let status = poll_until_terminal(&client, &handle.id, &options, |s| {
        render_progress(&bar, s)
    })
    .await;
    bar.finish_and_clear();

    let status = status?;
    super::report_terminal(&status, &handle.id)?;
    let artifact = extract_artifact(&status)?;
    println!("{}", style("Image ready:").green().bold());
    println!("{}", artifact.url);
    Ok(())
}
