use anyhow::{Context, Result};
use catalog_cli::rename::{self, PendingRename, RenamePlan, RenameReport};
use catalog_cli::{confirm, init_tracing, rule};
use catalog_core::Config;
use catalog_db::ImageRepository;
use catalog_storage::{create_storage, Storage};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "rename_to_new_format")]
#[command(about = "Rename stored images to {publisher}_{range}_{name}_initial.{ext}")]
struct Args {
    /// Show the planned renames without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let args = Args::parse();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    let images = ImageRepository::new(pool);
    let storage = create_storage(&config).await?;

    let all = images.list_all().await?;
    println!("Found {} images", all.len());

    let mut report = RenameReport::default();
    let mut pending = Vec::new();
    for image in &all {
        match rename::plan(image) {
            RenamePlan::NoFile => {
                report.skipped += 1;
                tracing::debug!(image_id = %image.id, "Image has no file");
            }
            RenamePlan::AlreadyNewFormat => report.skipped += 1,
            RenamePlan::Rename { from, to } => {
                if !storage.exists(&from).await? {
                    report.skipped += 1;
                    println!("Missing file, skipped: {}", from);
                    continue;
                }
                pending.push(PendingRename {
                    image_id: image.id,
                    entry_name: image.name.clone(),
                    from,
                    to,
                });
            }
        }
    }

    if pending.is_empty() {
        println!("Nothing to rename ({} skipped)", report.skipped);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{}", rule('='));
    for item in &pending {
        println!("{}", item.entry_name);
        println!("  {}", item.from);
        println!("  -> {}", item.to);
    }
    println!("{}", rule('='));
    println!("{} images to rename, {} skipped", pending.len(), report.skipped);

    if args.dry_run {
        println!("Dry run, nothing changed");
        return Ok(ExitCode::SUCCESS);
    }
    if !args.force && !confirm("Rename these files?")? {
        println!("Aborted");
        return Ok(ExitCode::SUCCESS);
    }

    for item in &pending {
        match commit(storage.as_ref(), &images, item).await {
            Ok(()) => report.renamed += 1,
            Err(e) => {
                report.errors += 1;
                println!("Error renaming {}: {:#}", item.from, e);
            }
        }
    }

    println!("{}", rule('='));
    println!("Renamed: {}", report.renamed);
    println!("Skipped: {}", report.skipped);
    println!("Errors:  {}", report.errors);

    Ok(if report.errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Move the object, then point the row at it; a failed row update moves it back
async fn commit(storage: &dyn Storage, images: &ImageRepository, item: &PendingRename) -> Result<()> {
    if storage.exists(&item.to).await? {
        anyhow::bail!("Target already exists: {}", item.to);
    }
    storage
        .rename(&item.from, &item.to)
        .await
        .context("Failed to rename file")?;

    if let Err(e) = images.update_path(item.image_id, &item.to).await {
        let restorable =
            storage.exists(&item.to).await.unwrap_or(false) && !storage.exists(&item.from).await.unwrap_or(true);
        if restorable {
            if let Err(undo) = storage.rename(&item.to, &item.from).await {
                tracing::error!(error = %undo, from = %item.to, to = %item.from, "Failed to restore file");
            }
        }
        return Err(anyhow::Error::new(e).context("Failed to update database"));
    }
    Ok(())
}
