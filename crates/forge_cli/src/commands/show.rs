//! Show command - Print a project's architecture.

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;

#[derive(Args)]
pub struct ShowArgs {
    /// ID of the project to show
    #[arg(short, long)]
    pub project: String,

    /// Print the full architecture as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ShowArgs, global: &GlobalArgs) -> Result<()> {
    let store = global.store()?;
    let arch = store.load_architecture(&args.project).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&arch)?);
        return Ok(());
    }

    let project = &arch.project;
    println!("📦 {} ({})", project.name, project.id);
    println!("   Status:  {}", project.status);
    println!("   Request: {}", project.prompt);
    println!();

    println!("Entities ({}):", arch.entities.len());
    for entity in &arch.entities {
        let fields: Vec<String> = entity
            .fields
            .iter()
            .map(|(name, field_type)| format!("{}: {}", name, field_type))
            .collect();
        println!("   - {} {{ {} }}", entity.name, fields.join(", "));
    }

    println!("Components ({}):", arch.components.len());
    for component in &arch.components {
        println!("   - {}", component.name);
    }

    println!("Pages ({}):", arch.pages.len());
    for page in &arch.pages {
        let kind = if page.is_api_route() { " [api]" } else { "" };
        println!("   - {} ({}){}", page.name, page.route, kind);
    }

    println!("Messages: {}", arch.messages.len());

    Ok(())
}
