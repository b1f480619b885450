//! Localized reply texts.
//!
//! One flat JSON document per language (`lang/<code>.json`, key -> template).
//! Templates use `{name}` placeholders. English is the mandatory fallback.

use std::{collections::HashMap, fs, path::Path, sync::Arc};

use crate::{errors::Error, Result};

pub const FALLBACK_LANGUAGE: &str = "en";

pub type LanguagePack = HashMap<String, String>;

/// All language packs, loaded once at startup and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct TextCatalog {
    packs: HashMap<String, LanguagePack>,
}

impl TextCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pack(&mut self, language: impl Into<String>, pack: LanguagePack) {
        self.packs.insert(language.into(), pack);
    }

    pub fn with_pack<K, V>(
        mut self,
        language: &str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let pack = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert_pack(language, pack);
        self
    }

    /// Load every `*.json` file in `dir`; the file stem is the language code.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let rd = fs::read_dir(dir)
            .map_err(|e| Error::Locale(format!("cannot read {}: {e}", dir.display())))?;

        let mut catalog = Self::new();
        for entry in rd {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(language) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let txt = fs::read_to_string(&path)?;
            let pack: LanguagePack =
                serde_json::from_str(&txt).map_err(|e| Error::InvalidDocument {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
            catalog.insert_pack(language.to_lowercase(), pack);
        }

        if !catalog.has_language(FALLBACK_LANGUAGE) {
            return Err(Error::Locale(format!(
                "fallback language pack {FALLBACK_LANGUAGE}.json missing in {}",
                dir.display()
            )));
        }
        Ok(catalog)
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.packs.contains_key(language)
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.packs.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    /// Resolve `key` in `language`, then the fallback language, then the key itself.
    ///
    /// Each `{name}` placeholder in `vars` replaces its first occurrence only;
    /// placeholders without a value are left as-is. Never returns an empty
    /// string for a non-empty key.
    pub fn resolve(&self, key: &str, language: &str, vars: &[(&str, String)]) -> String {
        let template = self
            .lookup(language, key)
            .or_else(|| self.lookup(FALLBACK_LANGUAGE, key))
            .unwrap_or(key);

        let mut text = template.to_string();
        for (name, value) in vars {
            text = text.replacen(&format!("{{{name}}}"), value, 1);
        }
        text
    }

    fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        self.packs
            .get(language)
            .and_then(|pack| pack.get(key))
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// A catalog bound to the configured language; what command handlers call.
#[derive(Clone, Debug)]
pub struct Texts {
    catalog: Arc<TextCatalog>,
    language: String,
}

impl Texts {
    pub fn new(catalog: Arc<TextCatalog>, language: impl Into<String>) -> Self {
        Self {
            catalog,
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn get(&self, key: &str) -> String {
        self.catalog.resolve(key, &self.language, &[])
    }

    pub fn format(&self, key: &str, vars: &[(&str, String)]) -> String {
        self.catalog.resolve(key, &self.language, vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TextCatalog {
        TextCatalog::new()
            .with_pack(
                "en",
                [
                    ("flood_control", "Slow down!"),
                    ("ping_response", "Pong! {ms}ms"),
                    ("only_en", "english only"),
                    ("twice", "{x} and {x}"),
                ],
            )
            .with_pack(
                "id",
                [
                    ("flood_control", "Pelan-pelan!"),
                    ("ping_response", "Pong! {ms}ms ({ms})"),
                    ("empty", ""),
                ],
            )
    }

    #[test]
    fn configured_language_wins() {
        assert_eq!(catalog().resolve("flood_control", "id", &[]), "Pelan-pelan!");
    }

    #[test]
    fn falls_back_to_english_then_key() {
        let c = catalog();
        assert_eq!(c.resolve("only_en", "id", &[]), "english only");
        assert_eq!(c.resolve("only_en", "fr", &[]), "english only");
        assert_eq!(c.resolve("no_such_key", "id", &[]), "no_such_key");
    }

    #[test]
    fn empty_template_is_treated_as_missing() {
        assert_eq!(catalog().resolve("empty", "id", &[]), "empty");
    }

    #[test]
    fn substitution_replaces_first_occurrence_only() {
        let c = catalog();
        assert_eq!(
            c.resolve("ping_response", "id", &[("ms", "42".to_string())]),
            "Pong! 42ms ({ms})"
        );
        assert_eq!(
            c.resolve("twice", "en", &[("x", "a".to_string())]),
            "a and {x}"
        );
    }

    #[test]
    fn unmatched_placeholders_are_left_intact() {
        let c = catalog();
        assert_eq!(c.resolve("ping_response", "en", &[]), "Pong! {ms}ms");
        assert_eq!(
            c.resolve("ping_response", "en", &[("other", "1".to_string())]),
            "Pong! {ms}ms"
        );
    }

    #[test]
    fn texts_binds_language() {
        let texts = Texts::new(Arc::new(catalog()), "id");
        assert_eq!(texts.get("flood_control"), "Pelan-pelan!");
        assert_eq!(
            texts.format("ping_response", &[("ms", "7".to_string())]),
            "Pong! 7ms ({ms})"
        );
    }

    #[test]
    fn load_dir_requires_english_pack() {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::path::PathBuf::from(format!(
            "/tmp/cmdbot-lang-{}-{ts}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("id.json"), r#"{ "hello": "halo" }"#).unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        assert!(matches!(TextCatalog::load_dir(&dir), Err(Error::Locale(_))));

        fs::write(dir.join("en.json"), r#"{ "hello": "hello" }"#).unwrap();
        let c = TextCatalog::load_dir(&dir).unwrap();
        assert_eq!(c.languages(), vec!["en", "id"]);
        assert_eq!(c.resolve("hello", "id", &[]), "halo");

        let _ = fs::remove_dir_all(&dir);
    }
}
