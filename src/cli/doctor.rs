//! CLI `doctor` command: run database and inference diagnostics and print a health report.

use anyhow::{Context, Result};

use gemi::config::GemiConfig;
use gemi::db;
use gemi::inference::{self, InferenceService};

pub async fn doctor(config: &GemiConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("Gemi Health Report");
    println!("==================");
    println!();

    if db_path.exists() {
        let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

        let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
        let report = db::check_database_health(&conn).context("failed to run health check")?;

        println!("Database:          {}", db_path.display());
        println!("File size:         {}", super::format_bytes(file_size));
        println!("Schema version:    {}", report.schema_version);
        println!("SQLite:            v{}", report.sqlite_version);
        println!();
        println!("Row counts:");
        println!("  Memories:        {}", report.memory_count);
        println!("  Pinned:          {}", report.pinned_count);
        println!("  Audit log:       {}", report.log_count);
        println!();
        if report.integrity_ok {
            println!("Integrity check:   PASSED");
        } else {
            println!("Integrity check:   FAILED ({})", report.integrity_details);
            println!();
            println!("Recovery steps:");
            println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
            println!("  2. Or start fresh: gemi memory clear --include-pinned");
        }
    } else {
        println!("Database:          not found at {}", db_path.display());
        println!("                   (created on first `gemi chat` or `gemi memory add`)");
    }

    println!();
    let service = inference::create_service(&config.inference)?;
    let ready = service.check_status().await;
    println!("Inference service: {}", service.location());
    println!("Model:             {}", config.inference.model);
    if ready {
        println!("Status:            ready");
    } else {
        println!("Status:            unavailable (run `ollama serve` and `ollama pull {}`)", config.inference.model);
    }

    Ok(())
}
