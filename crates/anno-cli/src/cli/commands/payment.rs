//! Implementation of `anno payment` subcommands.

use anyhow::Result;
use std::path::Path;

use anno_core::syllable::count_syllables;

use crate::cli::commands::helpers::open_services;
use crate::output::{Formatter, OutputFormat};

/// Calculate payment for a project window.
#[tracing::instrument(skip(data_root, format))]
pub fn run_payment_calc(
    data_root: &Path,
    project_name: &str,
    minutes: f64,
    segments: i64,
    syllables: i64,
    format: OutputFormat,
) -> Result<()> {
    let services = open_services(data_root)?;
    let breakdown = services
        .payment()
        .calculate(project_name, minutes, segments, syllables);

    Formatter::new(format).print(&breakdown)?;
    Ok(())
}

/// Count syllables in a text.
#[tracing::instrument(skip(text, format))]
pub fn run_payment_syllables(text: &str, format: OutputFormat) -> Result<()> {
    let count = count_syllables(text);

    let output = serde_json::json!({
        "syllables": count,
    });
    Formatter::new(format).print(&output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::init::run_init;
    use tempfile::tempdir;

    #[test]
    fn test_payment_calc_runs() {
        let dir = tempdir().unwrap();
        run_init(dir.path()).unwrap();

        run_payment_calc(dir.path(), "KH_MV_A", 10.0, 0, 200, OutputFormat::Text).unwrap();
    }

    #[test]
    fn test_syllables_command() {
        run_payment_syllables("a b c", OutputFormat::Text).unwrap();
    }
}
