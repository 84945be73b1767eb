//! `loopclaw init`: write a default config and create the workspace.

use std::path::Path;

use loopclaw_config::AppConfig;

/// Write `content` to `path` unless it exists and `force` is off.
/// Returns whether the file was written.
fn write_config(path: &Path, content: &str, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(true)
}

pub fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");

    println!("LoopClaw setup");
    println!("==============\n");

    if write_config(&config_path, &AppConfig::default_toml(), force)? {
        println!("  Wrote {}", config_path.display());
    } else {
        println!(
            "  {} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let config = AppConfig::load_from(&config_path)?;
    let workspace = &config.tools.workspace_dir;
    if workspace.exists() {
        println!("  Workspace exists: {}", workspace.display());
    } else {
        std::fs::create_dir_all(workspace)?;
        println!("  Created workspace: {}", workspace.display());
    }

    println!();
    println!("  Next: point provider.base_url at your model server, then run `loopclaw doctor`.");
    Ok(())
}
