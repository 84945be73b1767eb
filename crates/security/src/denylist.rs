//! Destructive-pattern deny-lists.
//!
//! Checked before a process is spawned. A match is a policy rejection the
//! calling tool reports as a failed result; nothing runs.

/// A command rejected by policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command blocked: matches '{pattern}'")]
pub struct Blocked {
    pub pattern: String,
}

/// Substrings that are never allowed anywhere in a shell command.
const SHELL_SUBSTRINGS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "rm -rf *",
    "rm -fr /",
    "dd if=",
    ":(){",
    "> /dev/sda",
    "chmod -r 777 /",
    "format c:",
];

/// Commands blocked when they appear as a word of their own (`mkfs.ext4` too).
const SHELL_COMMANDS: &[&str] = &["mkfs", "shutdown", "reboot", "halt", "poweroff"];

/// Container flags that hand the host to the container.
const DOCKER_PRIVILEGED: &[&str] = &[
    "--privileged",
    "--cap-add",
    "--pid=host",
    "--net=host",
    "--network=host",
    "--network host",
    "--userns=host",
    "-v /:/",
    "--volume /:/",
    "/var/run/docker.sock",
];

/// Anything that would turn an ffmpeg invocation into a general shell.
const FFMPEG_SUBSTRINGS: &[&str] = &["rm ", "mkfs", "dd if="];

/// Shell syntax that chains, backgrounds, substitutes or redirects commands.
/// Checked on the raw command, since newlines separate commands too.
const CHAINING: &[&str] = &["&&", "||", ";", "|", "&", "`", "$(", ">", "<", "\n", "\r"];

/// Lowercase, drop quoting and collapse runs of whitespace so spacing and
/// quoting tricks (`--privi"leged"`) do not slip past.
fn normalize(command: &str) -> String {
    command
        .replace(['"', '\'', '\\'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn find_substring(normalized: &str, patterns: &[&str]) -> Option<String> {
    patterns
        .iter()
        .find(|p| normalized.contains(*p))
        .map(|p| p.to_string())
}

fn find_command_word(normalized: &str, words: &[&str]) -> Option<String> {
    let tokens = normalized.split(|c: char| c.is_whitespace() || ";|&()`$".contains(c));
    for token in tokens {
        let token = token.rsplit('/').next().unwrap_or(token);
        for word in words {
            if token == *word || token.strip_prefix(word).is_some_and(|rest| rest.starts_with('.')) {
                return Some(word.to_string());
            }
        }
    }
    None
}

/// Reject anything that is more than one plain command.
pub fn check_single_command(command: &str) -> Result<(), Blocked> {
    if let Some(pattern) = CHAINING.iter().find(|p| command.contains(*p)) {
        let pattern = pattern.escape_default().to_string();
        tracing::warn!(%pattern, "Blocked chained command");
        return Err(Blocked { pattern });
    }
    Ok(())
}

/// Check a shell command against the destructive-command list.
pub fn check_shell(command: &str) -> Result<(), Blocked> {
    let normalized = normalize(command);
    if let Some(pattern) = find_substring(&normalized, SHELL_SUBSTRINGS)
        .or_else(|| find_command_word(&normalized, SHELL_COMMANDS))
    {
        tracing::warn!(%pattern, "Blocked shell command");
        return Err(Blocked { pattern });
    }
    Ok(())
}

/// Check a container command: the shell list plus privileged flags.
pub fn check_docker(command: &str) -> Result<(), Blocked> {
    check_shell(command)?;
    let normalized = normalize(command);
    if let Some(pattern) = find_substring(&normalized, DOCKER_PRIVILEGED) {
        tracing::warn!(%pattern, "Blocked privileged container command");
        return Err(Blocked { pattern });
    }
    Ok(())
}

/// Check an ffmpeg command: it must invoke ffmpeg and nothing else.
pub fn check_ffmpeg(command: &str) -> Result<(), Blocked> {
    let normalized = normalize(command);
    if !(normalized == "ffmpeg" || normalized.starts_with("ffmpeg ")) {
        return Err(Blocked {
            pattern: "command must start with 'ffmpeg'".into(),
        });
    }
    check_single_command(command)?;
    if let Some(pattern) = find_substring(&normalized, FFMPEG_SUBSTRINGS) {
        tracing::warn!(%pattern, "Blocked ffmpeg command");
        return Err(Blocked { pattern });
    }
    check_shell(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_blocks_destructive_commands() {
        for cmd in [
            "rm -rf /",
            "sudo rm -rf /var",
            "RM  -RF   ~",
            "cd /tmp && rm -rf *",
            "dd if=/dev/zero of=/dev/sda",
            ":(){ :|:& };:",
            "mkfs.ext4 /dev/sdb1",
            "sudo shutdown -h now",
            "/sbin/reboot",
            "echo hi; halt",
            "chmod -R 777 /",
        ] {
            assert!(check_shell(cmd).is_err(), "expected block: {cmd}");
        }
    }

    #[test]
    fn shell_allows_ordinary_commands() {
        for cmd in [
            "ls -la",
            "echo hello",
            "cat asphalt.txt",
            "grep -r shutdown_hook src/",
            "rm build/output.o",
            "python3 script.py",
        ] {
            assert!(check_shell(cmd).is_ok(), "expected allow: {cmd}");
        }
    }

    #[test]
    fn blocked_reports_pattern() {
        let err = check_shell("rm -rf /").unwrap_err();
        assert_eq!(err.pattern, "rm -rf /");
        assert!(err.to_string().contains("rm -rf /"));
    }

    #[test]
    fn docker_blocks_privileged_flags() {
        for cmd in [
            "docker run --privileged ubuntu",
            "docker run --cap-add=SYS_ADMIN alpine",
            "docker run --pid=host alpine",
            "docker run --network host nginx",
            "docker run -v /:/host alpine",
            "docker run -v /var/run/docker.sock:/var/run/docker.sock alpine",
        ] {
            assert!(check_docker(cmd).is_err(), "expected block: {cmd}");
        }
        assert!(check_docker("docker ps -a").is_ok());
        assert!(check_docker("docker run -p 8080:80 nginx").is_ok());
    }

    #[test]
    fn ffmpeg_must_be_ffmpeg() {
        assert!(check_ffmpeg("ffmpeg -i in.mp4 -vf scale=640:-1 out.mp4").is_ok());
        assert!(check_ffmpeg("ls -la").is_err());
        assert!(check_ffmpeg("ffmpeg -i a.mp4 b.mp4; rm -rf ~").is_err());
        assert!(check_ffmpeg("ffmpeg -i a.mp4 b.mp4 && curl evil").is_err());
        assert!(check_ffmpeg("ffmpeg -i $(cat list) out.mp4").is_err());
        assert!(check_ffmpeg("ffmpeg -i a.mp4 b.mp4\ntouch x").is_err());
    }

    #[test]
    fn single_command_rejects_chaining() {
        for cmd in [
            "git status && docker run --privileged alpine",
            "ps || true",
            "ps; touch x",
            "ps | sh",
            "sleep 999 &",
            "echo `id`",
            "echo $(id)",
            "ps > out.txt",
            "cat < /etc/passwd",
            "git status\ndocker ps",
        ] {
            assert!(check_single_command(cmd).is_err(), "expected block: {cmd}");
        }
        assert!(check_single_command("git log --oneline -n 5").is_ok());
        assert!(check_single_command("docker ps -a").is_ok());
    }

    #[test]
    fn quoting_does_not_hide_privileged_flags() {
        assert!(check_docker(r#"docker run --privi"leged" alpine"#).is_err());
        assert!(check_docker("docker run --priv'ileged' alpine").is_err());
    }
}
