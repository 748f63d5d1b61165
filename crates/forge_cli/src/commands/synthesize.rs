//! Synthesize command - Run the staged synthesis for a project.

use anyhow::Result;
use clap::Args;
use tracing::info;

use super::{require_project, GlobalArgs};

#[derive(Args)]
pub struct SynthesizeArgs {
    /// ID of the project to synthesize
    #[arg(short, long)]
    pub project: String,
}

pub async fn execute(args: SynthesizeArgs, global: &GlobalArgs) -> Result<()> {
    run(&args.project, global).await
}

/// Synthesize an existing project from its stored request
pub async fn run(project_id: &str, global: &GlobalArgs) -> Result<()> {
    let service = global.service()?;
    let project = require_project(service.store().as_ref(), project_id).await?;

    info!("Synthesizing project: {} ({})", project.name, project.id);
    println!("🔨 Synthesizing '{}'", project.name);
    println!("   schema → components → pages");

    let report = service.start_synthesis(&project.id, &project.prompt).await?;

    println!();
    println!("✅ Synthesis completed");
    println!("   Entities:   {}", report.entities.len());
    for entity in &report.entities {
        println!("      - {}", entity.name);
    }
    println!("   Components: {}", report.components.len());
    for component in &report.components {
        println!("      - {}", component.name);
    }
    println!("   Pages:      {}", report.pages.len());
    for page in &report.pages {
        println!("      - {} ({})", page.name, page.route);
    }

    Ok(())
}
