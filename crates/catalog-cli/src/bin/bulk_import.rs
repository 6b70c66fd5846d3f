use anyhow::Result;
use catalog_api_client::{ApiClient, ApiFailure, TagNames, DEFAULT_BASE_URL};
use catalog_cli::import::{self, CsvRow, TAG_TYPES};
use catalog_cli::{init_tracing, rule};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "bulk_import")]
#[command(about = "Import catalog entries and their images from a CSV file")]
struct Args {
    /// CSV file with Name, Folder path, Publisher, Range, Faction Tag, Army Role and
    /// GW Alternative columns
    #[arg(value_name = "CSV")]
    csv: PathBuf,

    /// Catalog server URL
    #[arg(long, env = "CATALOG_API_URL", default_value = DEFAULT_BASE_URL)]
    url: String,

    #[arg(long, env = "CATALOG_USERNAME")]
    username: String,

    #[arg(long, env = "CATALOG_PASSWORD", hide_env_values = true)]
    password: String,

    /// Validate the CSV and report what would happen without creating anything
    #[arg(long)]
    test: bool,

    /// Print every row, not only problems
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let args = Args::parse();

    let client = ApiClient::new(&args.url, &args.username, &args.password)?;
    if let Err(e) = check_connection(&client).await {
        eprintln!("Cannot use the catalog API at {}: {}", client.base_url(), e);
        if let Some(failure) = e.downcast_ref::<ApiFailure>() {
            if failure.is_unauthorized() {
                eprintln!("Check the username and password, and that the account has staff permission.");
            }
        }
        return Ok(ExitCode::FAILURE);
    }

    let rows = match import::read_rows(&args.csv) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("{:#}", e);
            return Ok(ExitCode::FAILURE);
        }
    };
    println!("Read {} rows from {}", rows.len(), args.csv.display());

    if args.test {
        test_run(&client, &rows, args.verbose).await
    } else {
        import_run(&client, &rows, args.verbose).await
    }
}

async fn check_connection(client: &ApiClient) -> Result<()> {
    let health = client.health().await?;
    println!(
        "Connected to {} as {} ({})",
        client.base_url(),
        health.username,
        health.status
    );
    Ok(())
}

/// Dry run: local checks, duplicate lookups and the tags that would be created
async fn test_run(client: &ApiClient, rows: &[CsvRow], verbose: bool) -> Result<ExitCode> {
    let existing = client.get_tags().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not load existing tags");
        TagNames::default()
    });

    let mut invalid = 0usize;
    let mut duplicates = 0usize;
    let mut ready = 0usize;

    println!("{}", rule('='));
    for row in rows {
        let errors = import::validate_row(row);
        if !errors.is_empty() {
            invalid += 1;
            println!("Row {}: {}", row.row_number, display_name(row));
            for error in &errors {
                println!("  ERROR: {}", error);
            }
            continue;
        }

        let duplicate = client
            .check_duplicate(&row.name, row.publisher(), row.range())
            .await;
        match duplicate {
            Ok(check) if check.exists => {
                duplicates += 1;
                println!(
                    "Row {}: {} already exists (entry {})",
                    row.row_number,
                    row.name,
                    check.entry_id.map(|id| id.to_string()).unwrap_or_default()
                );
            }
            Ok(_) => {
                ready += 1;
                if verbose {
                    let images = import::find_images(std::path::Path::new(&row.folder_path));
                    println!(
                        "Row {}: {} ready ({} images)",
                        row.row_number,
                        row.name,
                        images.len()
                    );
                }
            }
            Err(e) => {
                invalid += 1;
                println!("Row {}: duplicate check failed: {}", row.row_number, e);
            }
        }
    }

    let new_tags = import::new_tags(rows, &existing.tags);
    if !new_tags.is_empty() {
        println!("{}", rule('-'));
        println!("Tags that will be created:");
        for tag_type in TAG_TYPES {
            if let Some(names) = new_tags.get(tag_type) {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                println!("  {}: {}", tag_type, names.join(", "));
            }
        }
    }

    println!("{}", rule('='));
    println!("Test summary");
    println!("  Rows:        {}", rows.len());
    println!("  Ready:       {}", ready);
    println!("  Duplicates:  {}", duplicates);
    println!("  Errors:      {}", invalid);

    Ok(if invalid > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

#[derive(Debug, Default)]
struct ImportCounts {
    created: usize,
    skipped: usize,
    failed: usize,
    images: usize,
    image_errors: usize,
}

async fn import_run(client: &ApiClient, rows: &[CsvRow], verbose: bool) -> Result<ExitCode> {
    let mut counts = ImportCounts::default();

    println!("{}", rule('='));
    for row in rows {
        let errors = import::validate_row(row);
        if !errors.is_empty() {
            counts.failed += 1;
            println!("Row {}: skipped, {}", row.row_number, errors.join("; "));
            continue;
        }

        match client
            .check_duplicate(&row.name, row.publisher(), row.range())
            .await
        {
            Ok(check) if check.exists => {
                counts.skipped += 1;
                println!("Row {}: {} already exists, skipped", row.row_number, row.name);
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                counts.failed += 1;
                println!("Row {}: duplicate check failed: {}", row.row_number, e);
                continue;
            }
        }

        let created = match client.create_entry(&row.to_request()).await {
            Ok(created) => created,
            Err(e) => {
                counts.failed += 1;
                println!("Row {}: failed to create {}: {}", row.row_number, row.name, e);
                continue;
            }
        };
        counts.created += 1;

        let images = import::find_images(std::path::Path::new(&row.folder_path));
        let mut uploaded = 0usize;
        for (idx, image) in images.iter().enumerate() {
            match client.upload_image(created.entry_id, image, idx == 0).await {
                Ok(result) => {
                    uploaded += 1;
                    if verbose {
                        println!("  uploaded {} -> {}", image.display(), result.filename);
                    }
                }
                Err(e) => {
                    counts.image_errors += 1;
                    println!("  failed to upload {}: {}", image.display(), e);
                }
            }
        }
        counts.images += uploaded;

        println!(
            "Row {}: created {} ({} tags, {}/{} images)",
            row.row_number,
            created.entry_name,
            created.tags_assigned,
            uploaded,
            images.len()
        );
    }

    println!("{}", rule('='));
    println!("Import summary");
    println!("  Created:       {}", counts.created);
    println!("  Skipped:       {}", counts.skipped);
    println!("  Failed:        {}", counts.failed);
    println!("  Images:        {}", counts.images);
    println!("  Image errors:  {}", counts.image_errors);

    Ok(if counts.failed > 0 || counts.image_errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn display_name(row: &CsvRow) -> &str {
    if row.name.is_empty() {
        "(no name)"
    } else {
        &row.name
    }
}
