//! WASM bindings for realization-engine — powers the multilingual web demo.

use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

use realization_engine::core::discourse::{DiscourseState, Register};
use realization_engine::core::lexicon::{InMemoryLexicon, InMemoryLexiconProvider};
use realization_engine::core::registry::InMemoryConfigStore;
use realization_engine::schema::frame::Frame;
use realization_engine::schema::profile::LanguageProfile;
use realization_engine::{RenderOptions, Router};

// ---------------------------------------------------------------------------
// Embedded language data — compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const PROFILES: &str = include_str!("../../lang_data/profiles.ron");

    pub const FAMILIES: [&str; 7] = [
        include_str!("../../lang_data/families/romance.ron"),
        include_str!("../../lang_data/families/germanic.ron"),
        include_str!("../../lang_data/families/slavic.ron"),
        include_str!("../../lang_data/families/agglutinative.ron"),
        include_str!("../../lang_data/families/bantu.ron"),
        include_str!("../../lang_data/families/isolating.ron"),
        include_str!("../../lang_data/families/semitic.ron"),
    ];

    pub const CARDS: [&str; 5] = [
        include_str!("../../lang_data/cards/it.ron"),
        include_str!("../../lang_data/cards/fr.ron"),
        include_str!("../../lang_data/cards/en.ron"),
        include_str!("../../lang_data/cards/tr.ron"),
        include_str!("../../lang_data/cards/ja.ron"),
    ];

    pub const LEXICONS: [(&str, &str); 10] = [
        ("it", include_str!("../../lang_data/lexicon/it.ron")),
        ("es", include_str!("../../lang_data/lexicon/es.ron")),
        ("fr", include_str!("../../lang_data/lexicon/fr.ron")),
        ("en", include_str!("../../lang_data/lexicon/en.ron")),
        ("ru", include_str!("../../lang_data/lexicon/ru.ron")),
        ("tr", include_str!("../../lang_data/lexicon/tr.ron")),
        ("ja", include_str!("../../lang_data/lexicon/ja.ron")),
        ("sw", include_str!("../../lang_data/lexicon/sw.ron")),
        ("zh", include_str!("../../lang_data/lexicon/zh.ron")),
        ("ar", include_str!("../../lang_data/lexicon/ar.ron")),
    ];

    pub const SAMPLE_FRAMES: [(&str, &str); 3] = [
        ("marie_curie", include_str!("../../lang_data/frames/marie_curie.ron")),
        ("marie_curie_full", include_str!("../../lang_data/frames/marie_curie_full.ron")),
        ("polonium", include_str!("../../lang_data/frames/polonium.ron")),
    ];
}

#[derive(serde::Serialize)]
struct LanguageInfo {
    code: String,
    family: String,
    engine: String,
}

fn build_router() -> Result<Router, JsError> {
    let store = InMemoryConfigStore::from_ron(data::PROFILES, &data::FAMILIES, &data::CARDS)
        .map_err(|e| JsError::new(&format!("Language data error: {e}")))?;

    let mut lexicons = InMemoryLexiconProvider::new();
    for (code, source) in data::LEXICONS {
        let lexicon = InMemoryLexicon::parse_ron(source)
            .map_err(|e| JsError::new(&format!("Lexicon '{code}' parse error: {e}")))?;
        lexicons = lexicons.with(code, lexicon);
    }

    Router::builder()
        .config_store(store)
        .lexicons(lexicons)
        .build()
        .map_err(|e| JsError::new(&format!("Router build error: {e}")))
}

thread_local! {
    static SHARED_ROUTER: RefCell<Option<Rc<Router>>> = const { RefCell::new(None) };
}

fn shared_router() -> Result<Rc<Router>, JsError> {
    SHARED_ROUTER.with(|cell| {
        if let Some(router) = cell.borrow().as_ref() {
            return Ok(Rc::clone(router));
        }
        let router = Rc::new(build_router()?);
        *cell.borrow_mut() = Some(Rc::clone(&router));
        Ok(router)
    })
}

/// Stateless one-shot render: a JSON frame in, the rendered text as JSON
/// out. Every call starts from an empty discourse.
#[wasm_bindgen]
pub fn render_json(frame_json: &str, lang_code: &str) -> Result<String, JsError> {
    let frame: Frame = serde_json::from_str(frame_json)
        .map_err(|e| JsError::new(&format!("Invalid frame JSON: {e}")))?;
    let rendered = shared_router()?
        .render(&frame, lang_code, None, &RenderOptions::default())
        .map_err(|e| JsError::new(&format!("Render error: {e}")))?;
    serde_json::to_string(&rendered)
        .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

/// One language, one running discourse: consecutive renders pronominalize
/// entities already mentioned.
#[wasm_bindgen]
pub struct RealizationDemo {
    router: Router,
    lang: String,
    options: RenderOptions,
    state: DiscourseState,
}

#[wasm_bindgen]
impl RealizationDemo {
    /// Create a demo instance rendering into `lang`.
    #[wasm_bindgen(constructor)]
    pub fn new(lang: &str) -> Result<RealizationDemo, JsError> {
        let router = build_router()?;
        router
            .language(lang)
            .map_err(|e| JsError::new(&format!("{e}")))?;
        Ok(RealizationDemo {
            router,
            lang: lang.to_string(),
            options: RenderOptions::default(),
            state: DiscourseState::new(),
        })
    }

    /// Render a frame given as JSON, e.g.
    /// ```json
    /// {"Bio": {"main_entity": {"name": "Marie Curie", "gender": "Female"},
    ///          "profession_lemmas": ["physicist"],
    ///          "nationality_lemmas": ["polish"]}}
    /// ```
    /// Returns the rendered text as a JSON object with `text`, `sentences`,
    /// `degraded`, `diagnostics` and `backend`.
    pub fn render(&mut self, frame_json: &str) -> Result<String, JsError> {
        let frame: Frame = serde_json::from_str(frame_json)
            .map_err(|e| JsError::new(&format!("Invalid frame JSON: {e}")))?;
        self.render_frame(&frame)
    }

    /// Render one of the bundled sample frames by name.
    pub fn render_sample(&mut self, name: &str) -> Result<String, JsError> {
        let source = data::SAMPLE_FRAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, s)| *s)
            .ok_or_else(|| JsError::new(&format!("Unknown sample: {name}")))?;
        let frame: Frame = ron::from_str(source)
            .map_err(|e| JsError::new(&format!("Sample parse error: {e}")))?;
        self.render_frame(&frame)
    }

    /// Switch language. The discourse state starts over.
    pub fn set_language(&mut self, lang: &str) -> Result<(), JsError> {
        self.router
            .language(lang)
            .map_err(|e| JsError::new(&format!("{e}")))?;
        self.lang = lang.to_string();
        self.state = DiscourseState::new();
        Ok(())
    }

    /// `"formal"` repeats full names; anything else is neutral.
    pub fn set_register(&mut self, register: &str) {
        self.options.register = match register {
            "formal" => Register::Formal,
            _ => Register::Neutral,
        };
    }

    /// Limit sentences per frame; 0 removes the limit.
    pub fn set_max_sentences(&mut self, max: usize) {
        self.options.max_sentences = (max > 0).then_some(max);
    }

    /// Forget all mentioned entities.
    pub fn reset(&mut self) {
        self.state = DiscourseState::new();
    }

    /// JSON array of the bundled languages with their family and engine.
    pub fn languages() -> Result<String, JsError> {
        let profiles: Vec<LanguageProfile> = ron::from_str(data::PROFILES)
            .map_err(|e| JsError::new(&format!("Language data error: {e}")))?;
        let info: Vec<LanguageInfo> = profiles
            .into_iter()
            .map(|p| LanguageInfo {
                code: p.code,
                family: p.family.to_string(),
                engine: p.engine_id,
            })
            .collect();
        serde_json::to_string(&info)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }

    /// JSON array of the bundled sample frame names.
    pub fn samples() -> String {
        let names: Vec<&str> = data::SAMPLE_FRAMES.iter().map(|(n, _)| *n).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }
}

impl RealizationDemo {
    fn render_frame(&mut self, frame: &Frame) -> Result<String, JsError> {
        let rendered = self
            .router
            .render(frame, &self.lang, Some(&mut self.state), &self.options)
            .map_err(|e| JsError::new(&format!("Render error: {e}")))?;
        serde_json::to_string(&rendered)
            .map_err(|e| JsError::new(&format!("Serialization error: {e}")))
    }
}
