use std::sync::LazyLock;

use regex::Regex;

/// Name returned when no signature matches.
pub const PLAIN_TEXT: &str = "text";

pub struct LanguageSignature {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pattern: Regex,
}

impl LanguageSignature {
    fn new(name: &'static str, extensions: &'static [&'static str], pattern: &str) -> Self {
        Self {
            name,
            extensions,
            pattern: Regex::new(pattern).unwrap(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Signatures in match order. The first match wins.
    pub fn get_all() -> &'static [LanguageSignature] {
        &SIGNATURES
    }

    pub fn get_by_extension(ext: &str) -> Option<&'static LanguageSignature> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::get_all()
            .iter()
            .find(|s| s.extensions.contains(&ext.as_str()))
    }
}

// Ordered from most to least distinctive; typescript before javascript since
// most javascript is also valid typescript.
static SIGNATURES: LazyLock<Vec<LanguageSignature>> = LazyLock::new(|| {
    vec![
        LanguageSignature::new(
            "python",
            &["py"],
            r#"(?m)^\s*(def \w+\(.*\)\s*(->.*)?:|class \w+(\(.*\))?:|from [\w.]+ import |if __name__ == ['"]__main__['"])"#,
        ),
        LanguageSignature::new(
            "rust",
            &["rs"],
            r"(?m)^\s*(pub(\(crate\))? )?(fn \w+|impl\b|struct \w+|enum \w+|mod \w+|use \w+::|let mut )",
        ),
        LanguageSignature::new(
            "go",
            &["go"],
            r"(?m)^\s*(package \w+|func (\(\w+ \*?\w+\) )?\w+\(|import \()",
        ),
        LanguageSignature::new(
            "java",
            &["java"],
            r"(?m)^\s*(public|private|protected)( static| final| abstract)* (class|interface|void|[\w<>\[\]]+ \w+\()",
        ),
        LanguageSignature::new(
            "typescript",
            &["ts", "tsx"],
            r"(?m)^\s*(export )?(interface \w+|type \w+ =|enum \w+|namespace \w+|declare )|\w+: (string|number|boolean)\b",
        ),
        LanguageSignature::new(
            "javascript",
            &["js", "jsx", "mjs", "cjs"],
            r"(?m)^\s*(const|let|var) \w+ =|\bfunction\s*\w*\(|=>|\brequire\(",
        ),
    ]
});

/// Best-effort guess of the programming language of `text`.
///
/// Returns the first matching signature name, or [`PLAIN_TEXT`]. The
/// result is informational and never changes how content is chunked.
pub fn detect_language(text: &str) -> &'static str {
    LanguageSignature::get_all()
        .iter()
        .find(|s| s.matches(text))
        .map_or(PLAIN_TEXT, |s| s.name)
}
