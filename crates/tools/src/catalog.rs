//! The static tool catalog.
//!
//! Built once, read by the model gateway (as tool definitions) and by the
//! executor (as the schema every call is validated against).

use std::sync::LazyLock;

use loopclaw_core::provider::ToolDefinition;
use loopclaw_core::tool::{ParamSpec, ParameterSchema, ToolSpec};

use crate::kind::ToolKind;

static CATALOG: LazyLock<Vec<ToolSpec>> =
    LazyLock::new(|| ToolKind::ALL.into_iter().map(build).collect());

/// The catalog entry for a kind.
pub fn spec(kind: ToolKind) -> &'static ToolSpec {
    &CATALOG[kind.index()]
}

/// Every entry, in catalog order.
pub fn all() -> &'static [ToolSpec] {
    &CATALOG
}

/// The full catalog as sent to the model.
pub fn definitions() -> Vec<ToolDefinition> {
    CATALOG.iter().map(ToolSpec::to_definition).collect()
}

fn build(kind: ToolKind) -> ToolSpec {
    let (description, parameters) = match kind {
        ToolKind::ExecuteCode => (
            "Execute Python, JavaScript or Bash code and return stdout, stderr and the exit code. \
             Use it for calculations, data processing and quick experiments.",
            ParameterSchema::new()
                .required(
                    "language",
                    ParamSpec::string("Language of the code").one_of(&["python", "javascript", "bash"]),
                )
                .required("code", ParamSpec::string("The source code to run"))
                .optional(
                    "timeout",
                    ParamSpec::integer("Time limit in seconds (default 30, max 300)"),
                ),
        ),
        ToolKind::RunShell => (
            "Run a shell command inside the agent workspace and return its output. \
             Destructive commands are refused.",
            ParameterSchema::new()
                .required("command", ParamSpec::string("The shell command to execute"))
                .optional(
                    "cwd",
                    ParamSpec::string("Working directory relative to the workspace root"),
                )
                .optional(
                    "timeout",
                    ParamSpec::integer("Time limit in seconds (default 120, max 600)"),
                ),
        ),
        ToolKind::WebSearch => (
            "Search the web and return a ranked list of results with title, URL and snippet.",
            ParameterSchema::new()
                .required("query", ParamSpec::string("The search query"))
                .optional(
                    "num_results",
                    ParamSpec::integer("Number of results to return (1-10)").with_default(5),
                ),
        ),
        ToolKind::FetchUrl => (
            "Fetch a web page and return its content, cleaned to readable text by default.",
            ParameterSchema::new()
                .required("url", ParamSpec::string("http or https URL to fetch"))
                .optional(
                    "extract_text",
                    ParamSpec::boolean("Strip HTML down to readable text").with_default(true),
                ),
        ),
        ToolKind::GenerateImage => (
            "Generate an image from a text prompt and save it into the workspace.",
            ParameterSchema::new()
                .required("prompt", ParamSpec::string("Description of the image"))
                .optional("width", ParamSpec::integer("Width in pixels").with_default(1024))
                .optional("height", ParamSpec::integer("Height in pixels").with_default(1024))
                .optional("seed", ParamSpec::integer("Seed for reproducible output")),
        ),
        ToolKind::CreateVideo => (
            "Create or edit video and audio with an ffmpeg command run in the workspace. \
             The command must start with 'ffmpeg' and cannot chain other commands.",
            ParameterSchema::new()
                .required("ffmpeg_command", ParamSpec::string("Complete ffmpeg command line"))
                .required("description", ParamSpec::string("What the command produces")),
        ),
        ToolKind::FileRead => (
            "Read a text file from the workspace.",
            ParameterSchema::new().required(
                "path",
                ParamSpec::string("File path relative to the workspace root"),
            ),
        ),
        ToolKind::FileWrite => (
            "Write text to a file in the workspace, creating parent directories as needed.",
            ParameterSchema::new()
                .required(
                    "path",
                    ParamSpec::string("File path relative to the workspace root"),
                )
                .required("content", ParamSpec::string("The content to write"))
                .optional(
                    "mode",
                    ParamSpec::string("Replace the file or add to its end")
                        .one_of(&["overwrite", "append"])
                        .with_default("overwrite"),
                ),
        ),
        ToolKind::FileList => (
            "List the files and directories at a workspace path.",
            ParameterSchema::new().optional(
                "path",
                ParamSpec::string("Directory relative to the workspace root").with_default("."),
            ),
        ),
        ToolKind::BrowserAction => (
            "Drive a web browser: navigate, click, type, take screenshots, extract text or \
             evaluate JavaScript.",
            ParameterSchema::new()
                .required(
                    "action",
                    ParamSpec::string("Browser action").one_of(&[
                        "navigate",
                        "click",
                        "type",
                        "screenshot",
                        "extract_text",
                        "evaluate",
                    ]),
                )
                .optional("url", ParamSpec::string("Page URL (navigate, extract_text)"))
                .optional("selector", ParamSpec::string("CSS selector (click, type)"))
                .optional("text", ParamSpec::string("Text to type"))
                .optional("script", ParamSpec::string("JavaScript to evaluate")),
        ),
        ToolKind::AnalyzeData => (
            "Run Python analysis code. DATA_SOURCE holds the input path, and files written to \
             OUTPUT_DIR are returned as artifacts.",
            ParameterSchema::new()
                .required("code", ParamSpec::string("Python analysis code"))
                .optional(
                    "data_source",
                    ParamSpec::string("Input file relative to the workspace root"),
                ),
        ),
        ToolKind::DraftContent => (
            "Prepare a structured brief for writing content such as posts, scripts or articles. \
             Returns instructions to follow, not the finished content.",
            ParameterSchema::new()
                .required(
                    "type",
                    ParamSpec::string("Kind of content, e.g. reel_script, blog_post, thread"),
                )
                .required("topic", ParamSpec::string("What the content is about"))
                .optional(
                    "platform",
                    ParamSpec::string("Target platform, e.g. instagram, youtube, linkedin"),
                )
                .optional("tone", ParamSpec::string("Voice of the piece").with_default("engaging"))
                .optional(
                    "length",
                    ParamSpec::string("Target length")
                        .one_of(&["short", "medium", "long"])
                        .with_default("medium"),
                ),
        ),
        ToolKind::MlInference => (
            "Run a hosted machine learning model: classification, sentiment, generation, \
             summarization, translation or question answering.",
            ParameterSchema::new()
                .required(
                    "task",
                    ParamSpec::string("Task family").one_of(&[
                        "text-classification",
                        "sentiment-analysis",
                        "text-generation",
                        "summarization",
                        "translation",
                        "question-answering",
                    ]),
                )
                .required(
                    "input",
                    ParamSpec::string("Input text (the question for question-answering)"),
                )
                .optional("model", ParamSpec::string("Model id; a per-task default is used when absent"))
                .optional(
                    "context",
                    ParamSpec::string("Passage to answer from (question-answering only)"),
                ),
        ),
        ToolKind::Devops => (
            "Run DevOps commands: docker, git, deploy scripts, CI/CD steps and read-only \
             monitoring. Privileged container flags are refused.",
            ParameterSchema::new()
                .required(
                    "action",
                    ParamSpec::string("Action family").one_of(&["docker", "git", "deploy", "ci_cd", "monitor"]),
                )
                .required("command", ParamSpec::string("The command to run"))
                .optional(
                    "config",
                    ParamSpec::object("Settings passed to the command as a JSON file in DEVOPS_CONFIG"),
                ),
        ),
    };

    ToolSpec::new(kind.name(), description, parameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_kind() {
        assert_eq!(all().len(), ToolKind::ALL.len());
        for kind in ToolKind::ALL {
            assert_eq!(spec(kind).name, kind.name());
            assert!(!spec(kind).description.is_empty());
        }
    }

    #[test]
    fn required_params_are_declared() {
        for entry in all() {
            for name in &entry.parameters.required {
                assert!(
                    entry.parameters.properties.contains_key(name),
                    "{}: required '{name}' not declared",
                    entry.name
                );
            }
        }
    }

    #[test]
    fn definitions_are_json_schema_objects() {
        let defs = definitions();
        let code = defs.iter().find(|d| d.name == "execute_code").unwrap();
        assert_eq!(code.parameters["type"], "object");
        assert_eq!(
            code.parameters["properties"]["language"]["enum"],
            serde_json::json!(["python", "javascript", "bash"])
        );
        assert_eq!(code.parameters["required"], serde_json::json!(["language", "code"]));
    }
}
