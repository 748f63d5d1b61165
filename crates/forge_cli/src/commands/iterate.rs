//! Iterate command - Apply a conversational edit to a project.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use forge_engine::ActiveFile;

use super::GlobalArgs;

#[derive(Args)]
pub struct IterateArgs {
    /// ID of the project to edit
    #[arg(short, long)]
    pub project: String,

    /// Instruction for the assistant
    #[arg(short, long)]
    pub message: String,

    /// File the user is looking at, passed to the model as context
    #[arg(long)]
    pub active_file: Option<PathBuf>,
}

pub async fn execute(args: IterateArgs, global: &GlobalArgs) -> Result<()> {
    let active_file = match &args.active_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read active file {}", path.display()))?;
            Some(ActiveFile::new(path.display().to_string(), content))
        }
        None => None,
    };

    let service = global.service()?;
    info!("Applying iteration to project {}", args.project);

    let outcome = service
        .apply_iteration(&args.project, &args.message, active_file.as_ref())
        .await?;

    println!("💬 {}", outcome.message);
    println!();
    println!("✅ {} change(s) applied", outcome.applied_count);

    Ok(())
}
