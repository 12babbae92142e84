use anyhow::{Context, Result};
use std::path::PathBuf;

pub fn locate_gdbridge_mcp_bin() -> Result<PathBuf> {
    if let Some(path) = option_env!("CARGO_BIN_EXE_gdbridge-mcp") {
        return Ok(PathBuf::from(path));
    }

    // Try to resolve from the current test executable location.
    if let Ok(exe) = std::env::current_exe() {
        if let Some(target_profile_dir) = exe.parent().and_then(|p| p.parent()) {
            let candidate = target_profile_dir.join("gdbridge-mcp");
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir
        .ancestors()
        .nth(2)
        .context("failed to resolve repo root from CARGO_MANIFEST_DIR")?;
    for rel in ["target/debug/gdbridge-mcp", "target/release/gdbridge-mcp"] {
        let candidate = repo_root.join(rel);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    anyhow::bail!("failed to locate gdbridge-mcp binary; build with: cargo build -p gdbridge-mcp")
}
