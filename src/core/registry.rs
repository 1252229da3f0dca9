/// Configuration store seam and the language registry.
///
/// The registry resolves a language code once, merges its family matrix
/// with its card, and hands out shared immutable handles afterwards. Each
/// key has its own initialization guard so concurrent first renders of the
/// same language load it once, while other languages proceed in parallel.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::family::{engine_for, FamilyEngine};
use crate::core::matrix::{ConfigError, FamilyMatrix, LanguageCard, MergedMatrix};
use crate::schema::profile::{FamilyId, LanguageProfile};

/// Read-only source of profiles, family matrices and language cards.
pub trait ConfigStore: Send + Sync {
    fn load_profile(&self, code: &str) -> Result<Option<LanguageProfile>, ConfigError>;
    fn load_family_matrix(&self, family: FamilyId) -> Result<FamilyMatrix, ConfigError>;
    fn load_language_card(&self, code: &str) -> Result<Option<LanguageCard>, ConfigError>;

    /// Matrix at a profile's `morphology_config_path`. Stores without file
    /// locations serve the family's matrix.
    fn load_family_matrix_at(&self, family: FamilyId, _path: &str) -> Result<FamilyMatrix, ConfigError> {
        self.load_family_matrix(family)
    }
}

/// RON files under one data directory:
/// `profiles.ron`, `families/<family>.ron`, `cards/<code>.ron`.
#[derive(Debug, Clone)]
pub struct RonConfigStore {
    root: PathBuf,
}

impl RonConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every profile in `profiles.ron`.
    pub fn load_profiles(&self) -> Result<Vec<LanguageProfile>, ConfigError> {
        let contents = std::fs::read_to_string(self.root.join("profiles.ron"))?;
        let profiles: Vec<LanguageProfile> = ron::from_str(&contents)?;
        Ok(profiles)
    }

    fn load_matrix_file(&self, family: FamilyId, path: &Path) -> Result<FamilyMatrix, ConfigError> {
        let matrix = FamilyMatrix::load_from_ron(path)?;
        if matrix.family != family {
            return Err(ConfigError::Invalid {
                source_name: path.display().to_string(),
                message: format!("declares family {} but was loaded for {}", matrix.family, family),
            });
        }
        Ok(matrix)
    }
}

impl ConfigStore for RonConfigStore {
    fn load_profile(&self, code: &str) -> Result<Option<LanguageProfile>, ConfigError> {
        Ok(self.load_profiles()?.into_iter().find(|p| p.code == code))
    }

    fn load_family_matrix(&self, family: FamilyId) -> Result<FamilyMatrix, ConfigError> {
        let path = self.root.join("families").join(format!("{}.ron", family));
        self.load_matrix_file(family, &path)
    }

    fn load_family_matrix_at(&self, family: FamilyId, path: &str) -> Result<FamilyMatrix, ConfigError> {
        self.load_matrix_file(family, &self.root.join(path))
    }

    fn load_language_card(&self, code: &str) -> Result<Option<LanguageCard>, ConfigError> {
        let path = self.root.join("cards").join(format!("{}.ron", code));
        if !path.exists() {
            return Ok(None);
        }
        LanguageCard::load_from_ron(&path).map(Some)
    }
}

/// Configuration held in memory (tests, embedded builds).
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    profiles: BTreeMap<String, LanguageProfile>,
    matrices: BTreeMap<FamilyId, FamilyMatrix>,
    cards: BTreeMap<String, LanguageCard>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: LanguageProfile) -> Self {
        self.profiles.insert(profile.code.clone(), profile);
        self
    }

    pub fn with_matrix(mut self, matrix: FamilyMatrix) -> Self {
        self.matrices.insert(matrix.family, matrix);
        self
    }

    pub fn with_card(mut self, card: LanguageCard) -> Self {
        self.cards.insert(card.code.clone(), card);
        self
    }

    /// Parse RON sources: a profile list, family matrices and cards.
    pub fn from_ron(profiles: &str, matrices: &[&str], cards: &[&str]) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        let parsed: Vec<LanguageProfile> = ron::from_str(profiles)?;
        for profile in parsed {
            store = store.with_profile(profile);
        }
        for source in matrices {
            store = store.with_matrix(FamilyMatrix::parse_ron(source)?);
        }
        for source in cards {
            store = store.with_card(LanguageCard::parse_ron(source)?);
        }
        Ok(store)
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_profile(&self, code: &str) -> Result<Option<LanguageProfile>, ConfigError> {
        Ok(self.profiles.get(code).cloned())
    }

    fn load_family_matrix(&self, family: FamilyId) -> Result<FamilyMatrix, ConfigError> {
        self.matrices
            .get(&family)
            .cloned()
            .ok_or_else(|| ConfigError::Invalid {
                source_name: "memory".to_string(),
                message: format!("no family matrix for {}", family),
            })
    }

    fn load_language_card(&self, code: &str) -> Result<Option<LanguageCard>, ConfigError> {
        Ok(self.cards.get(code).cloned())
    }
}

/// How a resolved language is rendered.
#[derive(Clone)]
pub enum Backend {
    /// Realized here, by a family engine over the merged matrix.
    Core {
        engine: &'static dyn FamilyEngine,
        matrix: Arc<MergedMatrix>,
    },
    /// Delegated to the external renderer named by the profile's engine id.
    External,
    /// The family has no registered engine.
    Unsupported,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Core { engine, matrix } => f
                .debug_struct("Core")
                .field("family", &engine.family())
                .field("code", &matrix.code)
                .finish(),
            Self::External => f.write_str("External"),
            Self::Unsupported => f.write_str("Unsupported"),
        }
    }
}

/// A language ready to render. Immutable once built.
#[derive(Debug, Clone)]
pub struct LoadedLanguage {
    pub profile: LanguageProfile,
    pub backend: Backend,
}

type Guard<T> = Arc<Mutex<Option<Arc<T>>>>;

/// Lazily loaded, process-lifetime cache of languages and family matrices.
pub struct LanguageRegistry {
    store: Arc<dyn ConfigStore>,
    languages: Mutex<FxHashMap<String, Guard<LoadedLanguage>>>,
    families: Mutex<FxHashMap<(FamilyId, Option<String>), Guard<FamilyMatrix>>>,
}

fn guard_for<K, T>(map: &Mutex<FxHashMap<K, Guard<T>>>, key: K) -> Guard<T>
where
    K: std::hash::Hash + Eq,
{
    let mut map = map.lock().unwrap_or_else(|e| e.into_inner());
    map.entry(key).or_default().clone()
}

impl LanguageRegistry {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            languages: Mutex::new(FxHashMap::default()),
            families: Mutex::new(FxHashMap::default()),
        }
    }

    /// Resolve a language code. `Ok(None)` for codes without a profile;
    /// those are not cached, so a later profile addition is not masked.
    pub fn resolve(&self, code: &str) -> Result<Option<Arc<LoadedLanguage>>, ConfigError> {
        let guard = guard_for(&self.languages, code.to_string());
        let mut slot = guard.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(loaded) = slot.as_ref() {
            return Ok(Some(loaded.clone()));
        }
        let Some(profile) = self.store.load_profile(code)? else {
            return Ok(None);
        };
        let backend = if profile.is_external() {
            Backend::External
        } else {
            match engine_for(profile.family) {
                Some(engine) => {
                    let family = self.load_family(profile.family, profile.morphology_config_path.as_deref())?;
                    let card = self.store.load_language_card(code)?;
                    if let Some(card) = &card {
                        if card.code != code {
                            return Err(ConfigError::Invalid {
                                source_name: code.to_string(),
                                message: format!("card declares code '{}'", card.code),
                            });
                        }
                    }
                    Backend::Core {
                        engine,
                        matrix: Arc::new(family.merge(code, card.as_ref())),
                    }
                }
                None => Backend::Unsupported,
            }
        };
        tracing::debug!(lang = code, family = %profile.family, ?backend, "loaded language");
        let loaded = Arc::new(LoadedLanguage { profile, backend });
        *slot = Some(loaded.clone());
        Ok(Some(loaded))
    }

    /// Family matrix, loaded once per family and shared by its languages.
    pub fn family_matrix(&self, family: FamilyId) -> Result<Arc<FamilyMatrix>, ConfigError> {
        self.load_family(family, None)
    }

    /// Profiles naming their own matrix file get one cached copy per path.
    fn load_family(&self, family: FamilyId, path: Option<&str>) -> Result<Arc<FamilyMatrix>, ConfigError> {
        let guard = guard_for(&self.families, (family, path.map(str::to_string)));
        let mut slot = guard.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(matrix) = slot.as_ref() {
            return Ok(matrix.clone());
        }
        let matrix = match path {
            Some(path) => self.store.load_family_matrix_at(family, path)?,
            None => self.store.load_family_matrix(family)?,
        };
        tracing::debug!(%family, path, "loaded family matrix");
        let matrix = Arc::new(matrix);
        *slot = Some(matrix.clone());
        Ok(matrix)
    }

    /// Codes resolved so far.
    pub fn loaded_codes(&self) -> Vec<String> {
        let map = self.languages.lock().unwrap_or_else(|e| e.into_inner());
        let mut codes: Vec<String> = map
            .iter()
            .filter(|(_, guard)| {
                guard
                    .lock()
                    .map(|slot| slot.is_some())
                    .unwrap_or(false)
            })
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::profile::WordOrder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts matrix loads to check the once-per-key guard.
    struct CountingStore {
        inner: InMemoryConfigStore,
        matrix_loads: AtomicUsize,
    }

    impl ConfigStore for CountingStore {
        fn load_profile(&self, code: &str) -> Result<Option<LanguageProfile>, ConfigError> {
            self.inner.load_profile(code)
        }

        fn load_family_matrix(&self, family: FamilyId) -> Result<FamilyMatrix, ConfigError> {
            self.matrix_loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_family_matrix(family)
        }

        fn load_language_card(&self, code: &str) -> Result<Option<LanguageCard>, ConfigError> {
            self.inner.load_language_card(code)
        }
    }

    fn store() -> InMemoryConfigStore {
        let mut tamil = LanguageProfile::new("ta", FamilyId::Dravidian, WordOrder::Sov);
        tamil.engine_id = "core".to_string();
        let mut welsh = LanguageProfile::new("cy", FamilyId::Celtic, WordOrder::Vso);
        welsh.engine_id = "gf".to_string();
        InMemoryConfigStore::new()
            .with_profile(LanguageProfile::new("it", FamilyId::Romance, WordOrder::Svo))
            .with_profile(LanguageProfile::new("es", FamilyId::Romance, WordOrder::Svo))
            .with_profile(tamil)
            .with_profile(welsh)
            .with_matrix(FamilyMatrix::parse_ron("(family: Romance)").unwrap())
            .with_card(LanguageCard {
                code: "it".to_string(),
                params: BTreeMap::from([("elide".to_string(), "yes".to_string())]),
                ..LanguageCard::default()
            })
    }

    #[test]
    fn resolves_and_merges_card() {
        let registry = LanguageRegistry::new(Arc::new(store()));
        let it = registry.resolve("it").unwrap().unwrap();
        match &it.backend {
            Backend::Core { engine, matrix } => {
                assert_eq!(engine.family(), FamilyId::Romance);
                assert_eq!(matrix.param("elide"), Some("yes"));
            }
            other => panic!("unexpected backend {:?}", other),
        }
        assert!(registry.resolve("xx").unwrap().is_none());
    }

    #[test]
    fn unsupported_and_external_backends() {
        let registry = LanguageRegistry::new(Arc::new(store()));
        assert!(matches!(registry.resolve("ta").unwrap().unwrap().backend, Backend::Unsupported));
        assert!(matches!(registry.resolve("cy").unwrap().unwrap().backend, Backend::External));
    }

    #[test]
    fn loads_each_family_once_across_threads() {
        let store = Arc::new(CountingStore {
            inner: store(),
            matrix_loads: AtomicUsize::new(0),
        });
        let registry = Arc::new(LanguageRegistry::new(store.clone()));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let code = if i % 2 == 0 { "it" } else { "es" };
                    registry.resolve(code).unwrap().unwrap()
                })
            })
            .collect();
        let loaded: Vec<Arc<LoadedLanguage>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(store.matrix_loads.load(Ordering::SeqCst), 1);
        let first_it = loaded.iter().find(|l| l.profile.code == "it").unwrap();
        assert!(Arc::ptr_eq(first_it, &registry.resolve("it").unwrap().unwrap()));
        assert_eq!(registry.loaded_codes(), vec!["es".to_string(), "it".to_string()]);
    }

    /// Records the matrix paths profiles ask for.
    struct PathStore {
        inner: InMemoryConfigStore,
        paths: Mutex<Vec<String>>,
    }

    impl ConfigStore for PathStore {
        fn load_profile(&self, code: &str) -> Result<Option<LanguageProfile>, ConfigError> {
            self.inner.load_profile(code)
        }

        fn load_family_matrix(&self, family: FamilyId) -> Result<FamilyMatrix, ConfigError> {
            self.inner.load_family_matrix(family)
        }

        fn load_language_card(&self, code: &str) -> Result<Option<LanguageCard>, ConfigError> {
            self.inner.load_language_card(code)
        }

        fn load_family_matrix_at(&self, family: FamilyId, path: &str) -> Result<FamilyMatrix, ConfigError> {
            self.paths.lock().unwrap().push(path.to_string());
            self.inner.load_family_matrix(family)
        }
    }

    #[test]
    fn profile_matrix_path_is_honoured() {
        let mut portuguese = LanguageProfile::new("pt", FamilyId::Romance, WordOrder::Svo);
        portuguese.morphology_config_path = Some("families/romance_pt.ron".to_string());
        let store = Arc::new(PathStore {
            inner: store().with_profile(portuguese),
            paths: Mutex::new(Vec::new()),
        });
        let registry = LanguageRegistry::new(store.clone());
        registry.resolve("pt").unwrap().unwrap();
        registry.resolve("pt").unwrap().unwrap();
        registry.resolve("it").unwrap().unwrap();
        assert_eq!(*store.paths.lock().unwrap(), vec!["families/romance_pt.ron".to_string()]);
        assert!(!Arc::ptr_eq(
            &registry.family_matrix(FamilyId::Romance).unwrap(),
            &registry.load_family(FamilyId::Romance, Some("families/romance_pt.ron")).unwrap()
        ));
    }
}
