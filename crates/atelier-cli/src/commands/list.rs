use anyhow::Result;
use console::style;

use super::open_registry;
use crate::cli::ListArgs;

pub async fn handle_list(args: ListArgs) -> Result<()> {
    let registry = open_registry(args.registry)?;
    let finetunes = registry.get_all()?;

    if finetunes.is_empty() {
        println!("No fine-tunes found. Run `atelier finetune` first.");
        return Ok(());
    }

    for (name, id) in finetunes {
        println!("{}  {}", style(name).green().bold(), style(id).dim());
    }
    Ok(())
}
