//! Build script for spotplus.
//!
//! Copies the `.env.example` template into the local data directory so the
//! binary finds a ready-made configuration skeleton next to where it loads
//! its `.env` from:
//!
//! - Linux: `~/.local/share/spotplus/.env.example`
//! - macOS: `~/Library/Application Support/spotplus/.env.example`
//! - Windows: `%LOCALAPPDATA%/spotplus/.env.example`

use std::{env, fs, path::PathBuf};

/// Copies the configuration template, warning instead of failing when the
/// template is absent from the crate root.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let template = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("spotplus");
    fs::create_dir_all(&out_dir)?;

    if template.is_file() {
        let contents = fs::read_to_string(&template)?;
        fs::write(out_dir.join(".env.example"), contents)?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            template.display()
        );
    }

    Ok(())
}
