//! The closed set of tool kinds.

use std::fmt;

/// Every tool the agent can call. Dispatch goes through this enum, never
/// through free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    ExecuteCode,
    RunShell,
    WebSearch,
    FetchUrl,
    GenerateImage,
    CreateVideo,
    FileRead,
    FileWrite,
    FileList,
    BrowserAction,
    AnalyzeData,
    DraftContent,
    MlInference,
    Devops,
}

impl ToolKind {
    /// All kinds, in catalog order.
    pub const ALL: [ToolKind; 14] = [
        ToolKind::ExecuteCode,
        ToolKind::RunShell,
        ToolKind::WebSearch,
        ToolKind::FetchUrl,
        ToolKind::GenerateImage,
        ToolKind::CreateVideo,
        ToolKind::FileRead,
        ToolKind::FileWrite,
        ToolKind::FileList,
        ToolKind::BrowserAction,
        ToolKind::AnalyzeData,
        ToolKind::DraftContent,
        ToolKind::MlInference,
        ToolKind::Devops,
    ];

    /// The name advertised to the model.
    pub const fn name(self) -> &'static str {
        match self {
            ToolKind::ExecuteCode => "execute_code",
            ToolKind::RunShell => "run_shell",
            ToolKind::WebSearch => "web_search",
            ToolKind::FetchUrl => "fetch_url",
            ToolKind::GenerateImage => "generate_image",
            ToolKind::CreateVideo => "create_video",
            ToolKind::FileRead => "file_read",
            ToolKind::FileWrite => "file_write",
            ToolKind::FileList => "file_list",
            ToolKind::BrowserAction => "browser_action",
            ToolKind::AnalyzeData => "analyze_data",
            ToolKind::DraftContent => "draft_content",
            ToolKind::MlInference => "ml_inference",
            ToolKind::Devops => "devops",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn lookup_is_exact() {
        assert_eq!(ToolKind::from_name("Execute_Code"), None);
        assert_eq!(ToolKind::from_name("shell"), None);
        assert_eq!(ToolKind::from_name(""), None);
    }

    #[test]
    fn index_matches_catalog_order() {
        for (i, kind) in ToolKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
