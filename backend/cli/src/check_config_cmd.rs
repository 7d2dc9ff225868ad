//! CLI Check-Config Command
//!
//! Loads the config file and prints the validation report.

use std::path::Path;

use anyhow::{bail, Result};
use docsnap_config::{redact, validate};

use crate::config::load_unchecked;

pub async fn run(path: &Path, show: bool) -> Result<()> {
    println!("\nChecking {}\n", path.display());

    let config = load_unchecked(path).await?;
    let report = validate(&config);

    for warning in &report.warnings {
        println!("  🟡 {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("  🔴 {}: {}", error.path, error.message);
    }

    if show {
        let value = serde_json::to_value(&config)?;
        println!("\n{}", serde_json::to_string_pretty(&redact(&value))?);
    }

    println!();
    if report.is_valid() {
        println!("✅ Config is valid ({} warning(s)).", report.warnings.len());
        Ok(())
    } else {
        bail!("config has {} error(s)", report.errors.len())
    }
}
