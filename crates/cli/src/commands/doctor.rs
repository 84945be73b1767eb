//! `loopclaw doctor`: check config, model backend, tools and interpreters.

use std::path::{Path, PathBuf};

use loopclaw_config::AppConfig;
use loopclaw_core::provider::Provider;
use loopclaw_providers::OpenAiCompatProvider;

/// First match for `bin` on `path_var`, or `bin` itself when it is a path.
fn find_binary(bin: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let candidate = Path::new(bin);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    std::env::split_paths(path_var?)
        .map(|dir| dir.join(bin))
        .find(|p| p.is_file())
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("LoopClaw doctor");
    println!("===============\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults (run `loopclaw init`)");
        issues += 1;
    }
    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  1 issue(s) found, cannot continue.");
            return Ok(());
        }
    };

    // Model backend
    match OpenAiCompatProvider::from_config(&config.provider) {
        Ok(provider) => match provider.health_check().await {
            Ok(true) => {
                println!("  ✅ Model backend reachable at {}", config.provider.base_url);
                match provider.list_models().await {
                    Ok(models) if models.iter().any(|m| m == &config.provider.model) => {
                        println!("  ✅ Model '{}' available", config.provider.model);
                    }
                    Ok(models) if models.is_empty() => {
                        println!("  ⚠️  Backend lists no models");
                        issues += 1;
                    }
                    Ok(models) => {
                        println!(
                            "  ⚠️  Model '{}' not listed (have: {})",
                            config.provider.model,
                            models.join(", ")
                        );
                        issues += 1;
                    }
                    Err(e) => {
                        println!("  ⚠️  Could not list models: {e}");
                        issues += 1;
                    }
                }
            }
            Ok(false) => {
                println!("  ❌ Model backend unhealthy at {}", config.provider.base_url);
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Model backend unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Provider misconfigured: {e}");
            issues += 1;
        }
    }

    // Tools
    match loopclaw_tools::builtin_registry(config.tools.clone()) {
        Ok(registry) => println!("  ✅ {} tools registered", registry.len()),
        Err(e) => {
            println!("  ❌ Tool registry invalid: {e}");
            issues += 1;
        }
    }

    if config.tools.workspace_dir.is_dir() {
        println!("  ✅ Workspace {}", config.tools.workspace_dir.display());
    } else {
        println!(
            "  ⚠️  Workspace {} missing (created on first tool use)",
            config.tools.workspace_dir.display()
        );
        issues += 1;
    }

    let path_var = std::env::var_os("PATH");
    for bin in [
        &config.tools.python_bin,
        &config.tools.node_bin,
        &config.tools.bash_bin,
        &config.tools.ffmpeg_bin,
    ] {
        match find_binary(bin, path_var.as_deref()) {
            Some(path) => println!("  ✅ {bin} → {}", path.display()),
            None => {
                println!("  ⚠️  {bin} not found on PATH");
                issues += 1;
            }
        }
    }

    match &config.tools.browser_url {
        Some(url) => println!("  ✅ Browser service {url}"),
        None => println!("  ℹ️  No browser service, browser_action limited to navigate/extract_text"),
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
