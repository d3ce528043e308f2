//! Template lookup and placeholder substitution.

use std::path::{Path, PathBuf};

/// Overrides the primary template location.
pub const TEMPLATE_DIR_ENV: &str = "SHEETFORGE_TEMPLATE_DIR";

pub const RECORD_CLASS: &str = "RecordClass.txt";
pub const PURE_RECORD_CLASS: &str = "PureRecordClass.txt";
pub const DICTIONARY_TABLE: &str = "DictionaryTable.txt";
pub const SEARCHABLE_LIST_TABLE: &str = "SearchableListTable.txt";
pub const LIST_TABLE: &str = "ListTable.txt";
pub const ENUM: &str = "Enum.txt";

/// Finds template files by name in a primary and a fallback directory.
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    primary: PathBuf,
    fallback: PathBuf,
}

impl Default for TemplateLocator {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TemplateLocator {
    /// Primary is `configured`, else `$SHEETFORGE_TEMPLATE_DIR`, else
    /// `templates/` next to the running binary. The fallback is the
    /// directory shipped with this crate.
    pub fn new(configured: Option<&Path>) -> Self {
        let primary = configured
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(TEMPLATE_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(installed_dir);

        Self {
            primary,
            fallback: Path::new(env!("CARGO_MANIFEST_DIR")).join("templates"),
        }
    }

    pub fn with_dirs(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Paths tried for `file_name`, in order.
    pub fn candidates(&self, file_name: &str) -> [PathBuf; 2] {
        [self.primary.join(file_name), self.fallback.join(file_name)]
    }

    /// Template text, or empty text with an error logged when neither path
    /// has the file.
    pub fn load(&self, file_name: &str) -> String {
        let [primary, fallback] = self.candidates(file_name);
        for path in [&primary, &fallback] {
            if let Ok(text) = std::fs::read_to_string(path) {
                tracing::debug!(path = %path.display(), "loaded template");
                return text;
            }
        }
        tracing::error!(
            template = file_name,
            primary = %primary.display(),
            fallback = %fallback.display(),
            "template not found"
        );
        String::new()
    }

    pub fn template(&self, file_name: &str) -> Template {
        Template::new(self.load(file_name))
    }
}

fn installed_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("templates")))
        .unwrap_or_else(|| PathBuf::from("templates"))
}

/// Template text with `%Name%` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Substitute every `%Name%` token. Unknown tokens are left in place.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = self.text.clone();
        for (name, value) in values {
            out = out.replace(&format!("%{}%", name), value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_placeholders() {
        let template = Template::new("class %ClassName% : %Base% { %ClassName% x; }");
        assert_eq!(
            template.render(&[("ClassName", "Item")]),
            "class Item : %Base% { Item x; }"
        );
    }

    #[test]
    fn test_primary_wins_over_fallback() {
        let primary = TempDir::new().unwrap();
        let fallback = TempDir::new().unwrap();
        std::fs::write(primary.path().join(ENUM), "primary").unwrap();
        std::fs::write(fallback.path().join(ENUM), "fallback").unwrap();
        std::fs::write(fallback.path().join(LIST_TABLE), "list").unwrap();

        let locator = TemplateLocator::with_dirs(primary.path(), fallback.path());
        assert_eq!(locator.load(ENUM), "primary");
        assert_eq!(locator.load(LIST_TABLE), "list");
    }

    #[test]
    fn test_missing_template_is_empty() {
        let primary = TempDir::new().unwrap();
        let fallback = TempDir::new().unwrap();
        let locator = TemplateLocator::with_dirs(primary.path(), fallback.path());
        assert_eq!(locator.load("Nope.txt"), "");
        assert!(locator.template("Nope.txt").is_empty());
    }

    #[test]
    fn test_shipped_templates_present() {
        let missing = TempDir::new().unwrap();
        let locator = TemplateLocator::new(Some(missing.path()));
        for name in [
            RECORD_CLASS,
            PURE_RECORD_CLASS,
            DICTIONARY_TABLE,
            SEARCHABLE_LIST_TABLE,
            LIST_TABLE,
            ENUM,
        ] {
            assert!(!locator.load(name).is_empty(), "{} missing", name);
        }
    }
}
