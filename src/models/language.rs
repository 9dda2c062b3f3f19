use serde::{ Deserialize, Deserializer, Serialize, Serializer };
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Java,
    CSharp,
    Go,
    Html,
    Css,
    CPlusPlus,
    Ruby,
    Php,
    Swift,
    Kotlin,
    Rust,
    Dart,
}

impl Language {
    pub const ALL: [Language; 15] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Java,
        Language::CSharp,
        Language::Go,
        Language::Html,
        Language::Css,
        Language::CPlusPlus,
        Language::Ruby,
        Language::Php,
        Language::Swift,
        Language::Kotlin,
        Language::Rust,
        Language::Dart,
    ];

    /// Offered by the learning path and the quiz.
    pub const LEARNABLE: [Language; 12] = [
        Language::JavaScript,
        Language::TypeScript,
        Language::Python,
        Language::Java,
        Language::CSharp,
        Language::Go,
        Language::Rust,
        Language::Ruby,
        Language::Php,
        Language::Swift,
        Language::Kotlin,
        Language::Dart,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Java => "java",
            Language::CSharp => "csharp",
            Language::Go => "go",
            Language::Html => "html",
            Language::Css => "css",
            Language::CPlusPlus => "cplusplus",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Swift => "swift",
            Language::Kotlin => "kotlin",
            Language::Rust => "rust",
            Language::Dart => "dart",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Python => "Python",
            Language::Java => "Java",
            Language::CSharp => "C#",
            Language::Go => "Go",
            Language::Html => "HTML",
            Language::Css => "CSS",
            Language::CPlusPlus => "C++",
            Language::Ruby => "Ruby",
            Language::Php => "PHP",
            Language::Swift => "Swift",
            Language::Kotlin => "Kotlin",
            Language::Rust => "Rust",
            Language::Dart => "Dart",
        }
    }

    pub fn is_learnable(&self) -> bool {
        Language::LEARNABLE.contains(self)
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::JavaScript
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLanguageError {
    message: String,
}

impl fmt::Display for ParseLanguageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLanguageError {}

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Language::ALL
            .iter()
            .copied()
            .find(|lang| {
                lang.id().eq_ignore_ascii_case(wanted) ||
                    lang.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ParseLanguageError {
                message: format!("Unsupported language: '{}'", s),
            })
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.display_name())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
