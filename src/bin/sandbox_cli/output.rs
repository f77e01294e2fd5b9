//! JSON output for sc-sandbox.

use anyhow::{Context, Result};
use serde::Serialize;

pub fn format_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON output")
}

pub fn print_summary<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", format_json(value)?);
    Ok(())
}
