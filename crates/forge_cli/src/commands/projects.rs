//! Projects command - List projects in the workspace.

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct ProjectsArgs {
    /// Print the project records as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ProjectsArgs, global: &GlobalArgs) -> Result<()> {
    let store = global.store()?;
    let projects = store.list_projects().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
        return Ok(());
    }

    if projects.is_empty() {
        println!("No projects yet. Create one with `forge new --name <name> --prompt <request>`.");
        return Ok(());
    }

    for project in &projects {
        println!(
            "{}  {:<22} {}  {}",
            project.id,
            project.status.to_string(),
            project.created_at.format("%Y-%m-%d %H:%M"),
            project.name
        );
    }

    Ok(())
}
