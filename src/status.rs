// System status display — DB stats, stored model, last runs.

use anyhow::Result;
use rusqlite::Connection;

use crate::db::queries;
use crate::output::terminal::colorize_label;

/// Display system status to the terminal. `conn` is None when the database
/// file doesn't exist yet.
pub fn show(conn: Option<&Connection>, db_path: &str) -> Result<()> {
    let Some(conn) = conn else {
        println!("Database: not initialized");
        println!("\nRun `sieve init` to set up the database.");
        return Ok(());
    };

    let file_size = std::fs::metadata(db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", db_path, file_size);

    match queries::latest_model(conn)? {
        Some(model) => {
            println!(
                "Cluster model: #{} with {} components (fitted {}, log-likelihood {:.3})",
                model.id, model.components, model.fitted_at, model.log_likelihood
            );
        }
        None => {
            println!("Cluster model: not yet fitted");
            println!("  Run `sieve classify --input <comments.csv>` to fit one");
        }
    }

    let total = queries::classification_count(conn)?;
    if total == 0 {
        println!("Classifications: none stored");
    } else {
        let parts: Vec<String> = queries::label_counts(conn)?
            .into_iter()
            .map(|(label, n)| format!("{} {}", n, colorize_label(label)))
            .collect();
        println!("Classifications: {} ({})", total, parts.join(", "));
    }

    let sweep = queries::get_coherence_sweep(conn)?;
    match queries::get_run_state(conn, "selected_k")? {
        Some(k) => println!("Topic sweep: {} K values, selected K={}", sweep.len(), k),
        None if sweep.is_empty() => println!("Topic sweep: none stored"),
        None => println!("Topic sweep: {} K values", sweep.len()),
    }

    for (key, what) in [
        ("last_classify_at", "Last classify"),
        ("last_rescore_at", "Last rescore"),
        ("last_export_at", "Last export"),
    ] {
        let when = queries::get_run_state(conn, key)?.unwrap_or_else(|| "never".to_string());
        println!("{what}: {when}");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
