//! `loopclaw chat`: interactive or single-message chat.
//!
//! Model text goes to stdout as it arrives; tool lifecycle goes to stderr so
//! the answer stays pipeable.

use std::io::Write;
use std::sync::Arc;

use loopclaw_agent::{AgentLoop, DEFAULT_SYSTEM_PROMPT, Session, SessionRegistry, StreamEvent, TurnOutcome, stream_turn};
use tokio::io::{AsyncBufReadExt, BufReader};

const PREVIEW_CHARS: usize = 160;

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    }
}

/// Render one event for a terminal.
pub fn render_event(event: &StreamEvent, out: &mut impl Write, err: &mut impl Write) -> std::io::Result<()> {
    match event {
        StreamEvent::Text { content } => {
            writeln!(out, "{content}")?;
            out.flush()
        }
        StreamEvent::ToolCall { name, arguments, .. } => {
            writeln!(err, "  → {name} {}", preview(&arguments.to_string()))
        }
        StreamEvent::ToolResult {
            tool_name,
            result,
            success,
            duration_ms,
            ..
        } => {
            let mark = if *success { "✓" } else { "✗" };
            writeln!(err, "  {mark} {tool_name} ({duration_ms} ms): {}", preview(result))
        }
        StreamEvent::Error { message } => writeln!(err, "  [Error] {message}"),
        StreamEvent::Done {
            outcome, tool_calls, ..
        } => match outcome {
            TurnOutcome::Complete if *tool_calls == 0 => Ok(()),
            _ => writeln!(err, "  [{outcome}, {tool_calls} tool call(s)]"),
        },
    }
}

async fn turn(agent: &Arc<AgentLoop>, session: &Arc<Session>, message: String) -> std::io::Result<TurnOutcome> {
    let mut rx = stream_turn(agent.clone(), session.clone(), message);
    let mut outcome = TurnOutcome::Disconnected;
    let (mut out, mut err) = (std::io::stdout(), std::io::stderr());
    while let Some(event) = rx.recv().await {
        render_event(&event, &mut out, &mut err)?;
        if let StreamEvent::Done { outcome: o, .. } = event {
            outcome = o;
        }
    }
    Ok(outcome)
}

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let agent = super::build_agent(&config)?;

    let system_prompt = config
        .agent
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let sessions = SessionRegistry::new(system_prompt, 1);
    let session = sessions.create().await;

    if let Some(msg) = message {
        // Single message mode
        return match turn(&agent, &session, msg).await? {
            TurnOutcome::Aborted => Err("The model backend failed; run `loopclaw doctor` to check it.".into()),
            _ => Ok(()),
        };
    }

    // Interactive mode
    println!();
    println!("  LoopClaw, interactive mode");
    println!();
    println!("  Model:     {} @ {}", config.provider.model, config.provider.base_url);
    println!("  Tools:     {}", agent.executor().definitions().len());
    println!("  Workspace: {}", config.tools.workspace_dir.display());
    println!("  Tool cap:  {} per turn", agent.max_tool_calls());
    println!();
    println!("  Type your message and press Enter.");
    println!("  '/reset' clears the conversation, 'exit' quits.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                session.reset().await;
                println!("  (conversation cleared)");
            }
            _ => {
                println!();
                turn(&agent, &session, line.to_string()).await?;
                println!();
            }
        }
    }

    println!();
    println!("  Goodbye!");
    Ok(())
}
