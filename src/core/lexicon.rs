/// Lexicon collaborator seam and a RON-backed implementation.
///
/// The realizer only ever calls [`Lexicon::lookup`]; it never writes and
/// never caches results. Lemma keys are language-neutral concept names
/// (`physicist`, `be`, `indef_article`) or knowledge-base ids for proper
/// names; the returned [`Lexeme`] carries the language's own lemma.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::matrix::ConfigError;
use crate::schema::lexeme::Lexeme;

/// Read-only lexical lookup. Implementations must be safe to share across
/// concurrent renders.
pub trait Lexicon: Send + Sync {
    fn lookup(&self, lemma: &str, pos: &str) -> Option<Lexeme>;
}

/// Resolves a profile's `lexicon_ref` to a lexicon. `Ok(None)` means the
/// language has no lexicon at all; renders then degrade instead of failing.
pub trait LexiconProvider: Send + Sync {
    fn lexicon(&self, lexicon_ref: &str) -> Result<Option<Arc<dyn Lexicon>>, ConfigError>;
}

#[derive(Debug, Deserialize)]
struct RonLexiconEntry {
    key: String,
    pos: String,
    #[serde(default)]
    lemma: String,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    forms: BTreeMap<String, String>,
    #[serde(default)]
    features: BTreeMap<String, String>,
    #[serde(default)]
    external_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RonLexicon {
    entries: Vec<RonLexiconEntry>,
}

/// A lexicon held in memory, keyed by `(key, pos)`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLexicon {
    entries: FxHashMap<(String, String), Lexeme>,
}

impl InMemoryLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, lexeme: Lexeme) {
        self.entries
            .insert((key.to_string(), lexeme.pos.clone()), lexeme);
    }

    pub fn with(mut self, key: &str, lexeme: Lexeme) -> Self {
        self.insert(key, lexeme);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry keys as `(key, pos)` pairs in sorted order.
    pub fn keys(&self) -> Vec<(&str, &str)> {
        let mut keys: Vec<(&str, &str)> = self
            .entries
            .keys()
            .map(|(k, p)| (k.as_str(), p.as_str()))
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn load_from_ron(path: &Path) -> Result<InMemoryLexicon, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<InMemoryLexicon, ConfigError> {
        let raw: RonLexicon = ron::from_str(input)?;
        let mut lexicon = InMemoryLexicon::new();
        for entry in raw.entries {
            let lemma = if entry.lemma.is_empty() {
                entry.key.clone()
            } else {
                entry.lemma
            };
            let lexeme = Lexeme {
                lemma,
                pos: entry.pos,
                gender: entry.gender,
                forms: entry.forms,
                features: entry.features,
                external_id: entry.external_id,
            };
            lexicon.insert(&entry.key, lexeme);
        }
        Ok(lexicon)
    }
}

impl Lexicon for InMemoryLexicon {
    fn lookup(&self, lemma: &str, pos: &str) -> Option<Lexeme> {
        self.entries
            .get(&(lemma.to_string(), pos.to_string()))
            .cloned()
    }
}

/// Lexicons registered up front under their reference names.
#[derive(Default, Clone)]
pub struct InMemoryLexiconProvider {
    lexicons: FxHashMap<String, Arc<dyn Lexicon>>,
}

impl InMemoryLexiconProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, lexicon_ref: &str, lexicon: impl Lexicon + 'static) -> Self {
        self.lexicons
            .insert(lexicon_ref.to_string(), Arc::new(lexicon));
        self
    }
}

impl LexiconProvider for InMemoryLexiconProvider {
    fn lexicon(&self, lexicon_ref: &str) -> Result<Option<Arc<dyn Lexicon>>, ConfigError> {
        Ok(self.lexicons.get(lexicon_ref).cloned())
    }
}

/// Reads `<root>/lexicon/<ref>.ron` on first use and keeps the parsed file.
pub struct RonLexiconProvider {
    root: PathBuf,
    loaded: Mutex<FxHashMap<String, Arc<InMemoryLexicon>>>,
}

impl RonLexiconProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loaded: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn path_for(&self, lexicon_ref: &str) -> PathBuf {
        self.root.join("lexicon").join(format!("{}.ron", lexicon_ref))
    }
}

impl LexiconProvider for RonLexiconProvider {
    fn lexicon(&self, lexicon_ref: &str) -> Result<Option<Arc<dyn Lexicon>>, ConfigError> {
        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lexicon) = loaded.get(lexicon_ref) {
            return Ok(Some(lexicon.clone()));
        }
        let path = self.path_for(lexicon_ref);
        if !path.exists() {
            return Ok(None);
        }
        let lexicon = Arc::new(InMemoryLexicon::load_from_ron(&path)?);
        tracing::debug!(lexicon = lexicon_ref, entries = lexicon.len(), "loaded lexicon");
        loaded.insert(lexicon_ref.to_string(), lexicon.clone());
        Ok(Some(lexicon))
    }
}
