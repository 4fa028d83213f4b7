use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed document taxonomy shared with the loader.
///
/// Anything the loader cannot place (or a string this build does not know)
/// becomes [`Category::Unknown`] instead of failing ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Category {
    Api,
    Templates,
    Security,
    Integration,
    Examples,
    Frameworks,
    Dev,
    Config,
    Errors,
    #[default]
    Unknown,
}

impl Category {
    /// Every known tag except `Unknown`, in the order URL paths are checked.
    pub const KNOWN: [Category; 9] = [
        Category::Api,
        Category::Templates,
        Category::Security,
        Category::Integration,
        Category::Examples,
        Category::Frameworks,
        Category::Dev,
        Category::Config,
        Category::Errors,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Api => "api",
            Category::Templates => "templates",
            Category::Security => "security",
            Category::Integration => "integration",
            Category::Examples => "examples",
            Category::Frameworks => "frameworks",
            Category::Dev => "dev",
            Category::Config => "config",
            Category::Errors => "errors",
            Category::Unknown => "unknown",
        }
    }

    /// Lenient parse: unrecognized input maps to `Unknown`.
    pub fn parse(s: &str) -> Category {
        let s = s.trim();
        Category::KNOWN
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .unwrap_or(Category::Unknown)
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Category::parse(&s)
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::parse(s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
