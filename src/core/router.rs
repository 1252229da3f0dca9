/// Render entry point: language resolution, backend dispatch, and the
/// discourse commit protocol.
///
/// [`Router::render`] works on a copy of the caller's [`DiscourseState`] and
/// writes it back only when every sentence of the frame realized. A failed
/// render leaves the caller's state untouched.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::core::construction::{apply, ClauseInput, ConstructionError, RoleValue};
use crate::core::discourse::{advance, resolve_reference, DiscourseState, Position, Register};
use crate::core::family::{realize, Diagnostic, FamilyEngine, RealizationError};
use crate::core::lexicon::{InMemoryLexicon, Lexicon, LexiconProvider, RonLexiconProvider};
use crate::core::matrix::{ConfigError, MergedMatrix};
use crate::core::planner::plan;
use crate::core::registry::{Backend, ConfigStore, LanguageRegistry, LoadedLanguage, RonConfigStore};
use crate::schema::frame::{Frame, FrameKind};
use crate::schema::profile::{FamilyId, LanguageProfile};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
    #[error("no engine for family {family} (language '{code}')")]
    UnsupportedFamily { code: String, family: FamilyId },
    #[error("no construction matches {kind} frame{}", .event_type.as_deref().map(|t| format!(" '{}'", t)).unwrap_or_default())]
    ConstructionSelectionFailed {
        kind: FrameKind,
        event_type: Option<String>,
    },
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    Realization(#[from] RealizationError),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("no external renderer registered for engine '{0}'")]
    ExternalRendererUnavailable(String),
    #[error("external renderer failed: {0}")]
    External(String),
}

/// Per-render knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Upper bound on sentences per frame. `Some(0)` is treated as one.
    #[serde(default)]
    pub max_sentences: Option<usize>,
    #[serde(default)]
    pub register: Register,
}

/// Final output of a render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedText {
    pub text: String,
    pub sentences: Vec<String>,
    pub degraded: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// `core` for in-crate families, otherwise the external engine id.
    pub backend: String,
}

/// A renderer outside the family-engine core, selected by a profile's
/// `engine_id`. It receives the caller's discourse state directly and is
/// responsible for its own commit behaviour.
pub trait ExternalRenderer: Send + Sync {
    fn render(
        &self,
        frame: &Frame,
        profile: &LanguageProfile,
        state: Option<&mut DiscourseState>,
        options: &RenderOptions,
    ) -> Result<RenderedText, RenderError>;
}

/// Builder for [`Router`].
#[derive(Default)]
pub struct RouterBuilder {
    data_dir: Option<PathBuf>,
    store: Option<Arc<dyn ConfigStore>>,
    lexicons: Option<Arc<dyn LexiconProvider>>,
    external: FxHashMap<String, Arc<dyn ExternalRenderer>>,
}

impl RouterBuilder {
    /// Read profiles, matrices, cards and lexicons from a data directory.
    /// An explicit config store or lexicon provider takes precedence.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn config_store(mut self, store: impl ConfigStore + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn lexicons(mut self, provider: impl LexiconProvider + 'static) -> Self {
        self.lexicons = Some(Arc::new(provider));
        self
    }

    pub fn external_renderer(mut self, engine_id: &str, renderer: Arc<dyn ExternalRenderer>) -> Self {
        self.external.insert(engine_id.to_string(), renderer);
        self
    }

    pub fn build(self) -> Result<Router, RenderError> {
        let store: Arc<dyn ConfigStore> = match (self.store, &self.data_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(RonConfigStore::new(dir.clone())),
            (None, None) => {
                return Err(ConfigError::invalid("router", "no config store or data directory").into());
            }
        };
        let lexicons: Arc<dyn LexiconProvider> = match (self.lexicons, &self.data_dir) {
            (Some(provider), _) => provider,
            (None, Some(dir)) => Arc::new(RonLexiconProvider::new(dir.clone())),
            (None, None) => {
                return Err(ConfigError::invalid("router", "no lexicon provider or data directory").into());
            }
        };
        Ok(Router {
            registry: LanguageRegistry::new(store),
            lexicons,
            external: self.external,
        })
    }
}

/// Routes frames to the backend of the requested language.
pub struct Router {
    registry: LanguageRegistry,
    lexicons: Arc<dyn LexiconProvider>,
    external: FxHashMap<String, Arc<dyn ExternalRenderer>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Resolve a code or fail with [`RenderError::UnknownLanguage`].
    pub fn language(&self, lang_code: &str) -> Result<Arc<LoadedLanguage>, RenderError> {
        self.registry
            .resolve(lang_code)?
            .ok_or_else(|| RenderError::UnknownLanguage(lang_code.to_string()))
    }

    /// Render a frame. When `state` is given, it is advanced past the
    /// rendered sentences on success and left as it was on failure.
    pub fn render(
        &self,
        frame: &Frame,
        lang_code: &str,
        state: Option<&mut DiscourseState>,
        options: &RenderOptions,
    ) -> Result<RenderedText, RenderError> {
        let language = self.language(lang_code)?;
        let profile = &language.profile;
        match &language.backend {
            Backend::Core { engine, matrix } => {
                let scratch = state.as_deref().cloned().unwrap_or_default();
                let (rendered, next) = self.render_core(*engine, matrix, profile, frame, scratch, options)?;
                if let Some(state) = state {
                    *state = next;
                }
                Ok(rendered)
            }
            Backend::External => {
                let renderer = self
                    .external
                    .get(&profile.engine_id)
                    .ok_or_else(|| RenderError::ExternalRendererUnavailable(profile.engine_id.clone()))?;
                tracing::debug!(lang = lang_code, engine = %profile.engine_id, "delegating to external renderer");
                renderer.render(frame, profile, state, options)
            }
            Backend::Unsupported => Err(RenderError::UnsupportedFamily {
                code: profile.code.clone(),
                family: profile.family,
            }),
        }
    }

    fn lexicon_for(&self, profile: &LanguageProfile, diagnostics: &mut Vec<Diagnostic>) -> Result<Arc<dyn Lexicon>, RenderError> {
        let lexicon_ref = profile.lexicon_ref();
        match self.lexicons.lexicon(lexicon_ref)? {
            Some(lexicon) => Ok(lexicon),
            None => {
                tracing::warn!(lang = %profile.code, lexicon = lexicon_ref, "no lexicon; rendering degraded");
                diagnostics.push(Diagnostic::MissingLexicon {
                    lexicon_ref: lexicon_ref.to_string(),
                });
                Ok(Arc::new(InMemoryLexicon::new()))
            }
        }
    }

    fn render_core(
        &self,
        engine: &dyn FamilyEngine,
        matrix: &MergedMatrix,
        profile: &LanguageProfile,
        frame: &Frame,
        mut state: DiscourseState,
        options: &RenderOptions,
    ) -> Result<(RenderedText, DiscourseState), RenderError> {
        let mut diagnostics = Vec::new();
        let lexicon = self.lexicon_for(profile, &mut diagnostics)?;
        let planned = plan(frame, profile, options)?;
        diagnostics.extend(planned.diagnostics);
        let mut degraded = !diagnostics.is_empty();
        let mut sentences = Vec::new();

        for mut input in planned.clauses {
            state = assign_references(&mut input, state, profile, options.register);
            let clause = apply(&input, profile, matrix)?;
            let output = realize(engine, clause, profile, matrix, lexicon.as_ref())?;
            degraded |= output.degraded;
            diagnostics.extend(output.diagnostics);
            sentences.push(output.text);
            let subject = input.subject_entity().map(|e| e.entity_ref());
            state = advance(&state, subject.as_ref());
        }

        let text = sentences.join(&matrix.join.separator);
        tracing::debug!(lang = %profile.code, sentences = sentences.len(), degraded, "rendered frame");
        let rendered = RenderedText {
            text,
            sentences,
            degraded,
            diagnostics,
            backend: profile.engine_id.clone(),
        };
        Ok((rendered, state))
    }
}

/// Decide referring expressions for every entity role of a clause, in the
/// construction's declaration order, threading the state through each
/// decision.
fn assign_references(
    input: &mut ClauseInput,
    mut state: DiscourseState,
    profile: &LanguageProfile,
    register: Register,
) -> DiscourseState {
    let spec = input.construction_id.spec();
    for role in spec.required.iter().chain(spec.optional) {
        let Some(RoleValue::Entity(entity)) = input.roles.get(*role) else {
            continue;
        };
        let position = if Some(*role) == spec.subject_role {
            Position::Subject
        } else {
            Position::NonSubject
        };
        let (form, next) = resolve_reference(entity, &state, position, profile.flags.pro_drop, register);
        input.references.insert(role.to_string(), form);
        state = next;
    }
    state
}

/// A render session: one language, one evolving discourse state.
pub struct RenderSession<'r> {
    router: &'r Router,
    lang_code: String,
    options: RenderOptions,
    state: DiscourseState,
}

impl<'r> RenderSession<'r> {
    pub fn new(router: &'r Router, lang_code: &str) -> Self {
        Self {
            router,
            lang_code: lang_code.to_string(),
            options: RenderOptions::default(),
            state: DiscourseState::new(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options_mut(&mut self) -> &mut RenderOptions {
        &mut self.options
    }

    pub fn state(&self) -> &DiscourseState {
        &self.state
    }

    pub fn lang_code(&self) -> &str {
        &self.lang_code
    }

    pub fn render(&mut self, frame: &Frame) -> Result<RenderedText, RenderError> {
        self.router
            .render(frame, &self.lang_code, Some(&mut self.state), &self.options)
    }

    /// Forget everything mentioned so far.
    pub fn reset(&mut self) {
        self.state = DiscourseState::new();
    }
}
