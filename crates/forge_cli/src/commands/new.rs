//! New command - Create a draft project.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use super::{synthesize, GlobalArgs};

#[derive(Args)]
pub struct NewArgs {
    /// Display name of the project
    #[arg(short, long)]
    pub name: String,

    /// Free-text description of the application to build
    #[arg(short, long)]
    pub prompt: String,

    /// Run synthesis right after creating the project
    #[arg(long)]
    pub synthesize: bool,
}

pub async fn execute(args: NewArgs, global: &GlobalArgs) -> Result<()> {
    info!("Creating project: {}", args.name);

    let store = global.store()?;
    let project = store
        .create_project(&args.name, &args.prompt)
        .await
        .context("Failed to create project")?;

    println!("✅ Project '{}' created", project.name);
    println!();
    println!("Project ID: {}", project.id);
    println!("Status: {}", project.status);

    if args.synthesize {
        println!();
        return synthesize::run(&project.id, global).await;
    }

    println!();
    println!("Next steps:");
    println!("  forge synthesize --project {}", project.id);

    Ok(())
}
