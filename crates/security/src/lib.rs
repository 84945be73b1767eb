//! Security policies for LoopClaw tools.
//!
//! Provides:
//! - **Path scoping**: every file-touching tool resolves paths inside one workspace root
//! - **Deny-lists**: destructive shell, container and ffmpeg patterns, checked
//!   before any process is spawned

pub mod denylist;
pub mod path;

pub use denylist::{check_docker, check_ffmpeg, check_shell, check_single_command, Blocked};
pub use path::{PathValidationError, Workspace};
