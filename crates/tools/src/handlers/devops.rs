//! `devops`: container, git, deploy, CI and monitoring commands.

use std::sync::Arc;

use async_trait::async_trait;
use loopclaw_core::error::ToolError;
use loopclaw_core::tool::{Tool, ToolOutput};
use loopclaw_security::Blocked;
use serde_json::Value;

use super::required_str;
use crate::context::ToolContext;
use crate::kind::ToolKind;
use crate::process;

/// Commands `monitor` may start with. Two-word entries pin the subcommand.
const MONITOR_COMMANDS: &[&str] = &[
    "ps", "df", "du", "free", "uptime", "top -b", "uname", "whoami", "netstat", "ss", "cat", "tail",
    "head", "journalctl", "systemctl status", "docker ps", "docker stats", "docker logs",
    "docker inspect", "kubectl get", "kubectl describe", "kubectl logs", "kubectl top", "curl -i",
];

pub struct DevopsTool {
    ctx: Arc<ToolContext>,
}

impl DevopsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

fn first_word_is(command: &str, word: &str) -> bool {
    command.split_whitespace().next() == Some(word)
}

fn is_monitoring(command: &str) -> bool {
    let words: Vec<String> = command.split_whitespace().map(str::to_ascii_lowercase).collect();
    MONITOR_COMMANDS.iter().any(|allowed| {
        let prefix: Vec<&str> = allowed.split(' ').collect();
        words.len() >= prefix.len() && words.iter().zip(&prefix).all(|(w, p)| w == p)
    })
}

/// Policy for one action, applied before anything is spawned.
///
/// Every action passes the privileged-container list, since any of them can
/// reach `docker` through the shell. `git` and `monitor` must also be a single
/// plain command, so an allowed prefix cannot carry a second command.
pub fn check_action(action: &str, command: &str) -> Result<(), Blocked> {
    let require = |word: &str| {
        if first_word_is(command, word) {
            Ok(())
        } else {
            Err(Blocked {
                pattern: format!("{action} commands must start with '{word}'"),
            })
        }
    };
    match action {
        "docker" => require("docker")?,
        "git" => {
            require("git")?;
            loopclaw_security::check_single_command(command)?;
        }
        "monitor" => {
            loopclaw_security::check_single_command(command)?;
            if !is_monitoring(command) {
                return Err(Blocked {
                    pattern: "monitor only runs read-only inspection commands".into(),
                });
            }
        }
        _ => {}
    }
    loopclaw_security::check_docker(command)
}

#[async_trait]
impl Tool for DevopsTool {
    fn name(&self) -> &str {
        ToolKind::Devops.name()
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let action = required_str(&arguments, "action")?;
        let command = required_str(&arguments, "command")?;

        check_action(action, command).map_err(|b| ToolError::Blocked {
            tool_name: self.name().into(),
            pattern: b.pattern,
        })?;

        let mut cmd = process::shell(command);
        cmd.current_dir(self.ctx.workspace.root());

        let config_file = match (action, arguments.get("config")) {
            ("deploy" | "ci_cd", Some(config)) if config.is_object() => {
                let path = self.ctx.scratch_file("json");
                let body = serde_json::to_vec_pretty(config).map_err(|e| ToolError::failed(self.name(), e))?;
                tokio::fs::write(&path, body)
                    .await
                    .map_err(|e| ToolError::failed(self.name(), format!("could not write config: {e}")))?;
                cmd.env("DEVOPS_CONFIG", &path);
                Some(path)
            }
            _ => None,
        };

        let limit = self.ctx.config.timeouts.devops_secs;
        let outcome = process::run(cmd, ToolContext::secs(limit), self.name()).await;
        if let Some(path) = config_file
            && let Err(e) = tokio::fs::remove_file(&path).await
        {
            tracing::debug!(path = %path.display(), error = %e, "Could not remove config file");
        }
        let outcome = outcome?;

        let text = format!("[{action}] {command}\n{}", outcome.render());
        Ok(if outcome.success() {
            ToolOutput::ok(text)
        } else {
            ToolOutput::failed(text)
        })
    }
}
