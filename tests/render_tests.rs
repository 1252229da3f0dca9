/// Render integration tests — frames from lang_data rendered end to end.

use realization_engine::core::construction::{apply, ClauseInput, ConstructionId, RoleValue};
use realization_engine::core::family::{realize, Diagnostic};
use realization_engine::core::lexicon::{InMemoryLexicon, InMemoryLexiconProvider};
use realization_engine::core::registry::{Backend, InMemoryConfigStore};
use realization_engine::core::router::ExternalRenderer;
use realization_engine::schema::entity::{Entity, Gender, TimeSpan, Value};
use realization_engine::schema::frame::{EventFrame, LifeEvent};
use realization_engine::schema::profile::{FamilyId, LanguageProfile};
use realization_engine::{
    DiscourseState, Frame, Register, RenderError, RenderOptions, RenderSession, RenderedText, Router,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn router() -> Router {
    Router::builder().data_dir("lang_data").build().unwrap()
}

fn frame(name: &str) -> Frame {
    let path = format!("lang_data/frames/{}.ron", name);
    ron::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn render(router: &Router, frame: &Frame, lang: &str) -> RenderedText {
    router
        .render(frame, lang, None, &RenderOptions::default())
        .unwrap_or_else(|e| panic!("{} render failed: {}", lang, e))
}

fn curie_deceased() -> Frame {
    let Frame::Bio(mut bio) = frame("marie_curie") else {
        panic!("marie_curie is a bio frame");
    };
    bio.death_event = Some(LifeEvent {
        time: Some(TimeSpan::year(1934)),
        place: None,
    });
    Frame::Bio(bio)
}

fn curie_discovers(object: Entity) -> Frame {
    Frame::Event(EventFrame {
        event_type: "discover".to_string(),
        participants: BTreeMap::from([
            (
                "subject".to_string(),
                Entity::person("Marie Curie", Some(Gender::Female)).with_id("Q7186"),
            ),
            ("object".to_string(), object),
        ]),
        time: None,
        location: None,
        properties: BTreeMap::from([("tense".to_string(), Value::String("past".to_string()))]),
    })
}

fn existence(theme: &str, place: &str) -> Frame {
    ron::from_str(&format!(
        r#"Event((
            event_type: "existence",
            location: Some((name: "{}")),
            properties: {{"theme": String("{}")}},
        ))"#,
        place, theme
    ))
    .unwrap()
}

// ---------------------------------------------------------------------------
// One biography, every core family
// ---------------------------------------------------------------------------

#[test]
fn italian_biography() {
    let out = render(&router(), &frame("marie_curie"), "it");
    assert_eq!(
        out.sentences,
        vec!["Marie Curie è una fisica polacca.", "Nacque a Varsavia nel 1867."]
    );
    assert_eq!(out.text, "Marie Curie è una fisica polacca. Nacque a Varsavia nel 1867.");
    assert!(!out.degraded, "diagnostics: {:?}", out.diagnostics);
    assert_eq!(out.backend, "core");
}

#[test]
fn english_biography() {
    let out = render(&router(), &frame("marie_curie"), "en");
    assert_eq!(
        out.sentences,
        vec!["Marie Curie is a Polish physicist.", "She was born in Warsaw in 1867."]
    );
    assert!(!out.degraded, "diagnostics: {:?}", out.diagnostics);
}

#[test]
fn french_biography() {
    let out = render(&router(), &frame("marie_curie"), "fr");
    assert_eq!(
        out.sentences,
        vec![
            "Marie Curie est une physicienne polonaise.",
            "Elle est née à Varsovie en 1867."
        ]
    );
}

#[test]
fn russian_biography_present_and_past() {
    let r = router();
    let out = render(&r, &frame("marie_curie"), "ru");
    assert_eq!(
        out.sentences,
        vec!["Мари Кюри — польский физик.", "Она родилась в Варшаве в 1867 году."]
    );

    // A death date moves the main clause to the past: overt copula and an
    // instrumental predicate.
    let out = render(&r, &curie_deceased(), "ru");
    assert_eq!(out.sentences[0], "Мари Кюри была польским физиком.");
}

#[test]
fn turkish_biography() {
    let out = render(&router(), &frame("marie_curie"), "tr");
    assert_eq!(
        out.sentences,
        vec!["Marie Curie Polonyalı bir fizikçidir.", "1867'de Varşova'da doğdu."]
    );
}

#[test]
fn japanese_biography() {
    let out = render(&router(), &frame("marie_curie"), "ja");
    assert_eq!(
        out.sentences,
        vec!["マリー・キュリーはポーランドの物理学者です。", "1867年にワルシャワで生まれました。"]
    );
    assert_eq!(out.text, out.sentences.concat());
}

#[test]
fn chinese_biography() {
    let out = render(&router(), &frame("marie_curie"), "zh");
    assert_eq!(
        out.sentences,
        vec!["玛丽·居里是一位波兰物理学家。", "她1867年在华沙出生。"]
    );
}

#[test]
fn swahili_biography() {
    let out = render(&router(), &frame("marie_curie"), "sw");
    assert_eq!(
        out.sentences,
        vec!["Marie Curie ni mwanafizikia wa Poland.", "Alizaliwa Warszawa mwaka 1867."]
    );
}

#[test]
fn arabic_biography() {
    let out = render(&router(), &frame("marie_curie"), "ar");
    assert_eq!(
        out.sentences,
        vec!["ماري كوري فيزيائية بولندية.", "ولدت في وارسو في 1867."]
    );
}

// ---------------------------------------------------------------------------
// Constructions beyond the biography
// ---------------------------------------------------------------------------

#[test]
fn transitive_event() {
    let out = render(&router(), &frame("polonium"), "en");
    assert_eq!(out.text, "Marie Curie discovered polonium in Paris in 1898.");
}

#[test]
fn italian_existential_elides_ci() {
    let out = render(&router(), &existence("physicist", "Paris"), "it");
    assert_eq!(out.text, "C'è un fisico a Parigi.");
}

#[test]
fn coordinated_professions() {
    let out = render(&router(), &frame("marie_curie_full"), "en");
    assert_eq!(out.sentences.len(), 3);
    assert!(out.sentences[0].contains("physicist and chemist"), "{}", out.sentences[0]);
    assert!(out.sentences[0].starts_with("Marie Curie was"), "{}", out.sentences[0]);
    assert_eq!(out.sentences[2], "She died in 1934.");
}

#[test]
fn object_given_as_property_is_rendered() {
    let discovery = Frame::Event(EventFrame {
        event_type: "discover".to_string(),
        participants: BTreeMap::from([(
            "subject".to_string(),
            Entity::person("Marie Curie", Some(Gender::Female)).with_id("Q7186"),
        )]),
        time: None,
        location: None,
        properties: BTreeMap::from([
            ("object".to_string(), Value::String("polonium".to_string())),
            ("tense".to_string(), Value::String("past".to_string())),
        ]),
    });
    let out = render(&router(), &discovery, "en");
    assert_eq!(out.text, "Marie Curie discovered polonium.");
    assert!(!out.degraded, "diagnostics: {:?}", out.diagnostics);
}

// ---------------------------------------------------------------------------
// Discourse
// ---------------------------------------------------------------------------

#[test]
fn session_pronominalizes_across_frames() {
    let r = router();
    let mut session = RenderSession::new(&r, "en");
    session.render(&frame("marie_curie")).unwrap();
    let out = session.render(&frame("polonium")).unwrap();
    assert_eq!(out.text, "She discovered polonium in Paris in 1898.");
}

#[test]
fn pro_drop_language_drops_focused_subject() {
    let r = router();
    let mut session = RenderSession::new(&r, "it");
    session.render(&frame("marie_curie")).unwrap();
    let out = session.render(&frame("polonium")).unwrap();
    assert!(!out.text.contains("Marie Curie"), "{}", out.text);
    assert!(!out.text.contains("Lei"), "{}", out.text);
}

#[test]
fn stateless_renders_start_fresh() {
    let r = router();
    let first = render(&r, &frame("polonium"), "en");
    let second = render(&r, &frame("polonium"), "en");
    assert_eq!(first, second);
    assert!(first.text.starts_with("Marie Curie"));
}

#[test]
fn formal_register_keeps_full_names() {
    let r = router();
    let pierre = Entity::person("Pierre Curie", Some(Gender::Male));

    let mut neutral = RenderSession::new(&r, "en");
    neutral.render(&curie_discovers(pierre.clone())).unwrap();
    let out = neutral.render(&curie_discovers(pierre.clone())).unwrap();
    assert_eq!(out.text, "She discovered Curie.");

    let mut formal = RenderSession::new(&r, "en").with_options(RenderOptions {
        register: Register::Formal,
        ..RenderOptions::default()
    });
    formal.render(&curie_discovers(pierre.clone())).unwrap();
    let out = formal.render(&curie_discovers(pierre)).unwrap();
    assert_eq!(out.text, "She discovered Pierre Curie.");
}

#[test]
fn failed_render_leaves_state_untouched() {
    let r = router();
    let mut state = DiscourseState::new();
    r.render(&frame("marie_curie"), "en", Some(&mut state), &RenderOptions::default())
        .unwrap();
    let before = state.clone();
    assert_eq!(before.current_focus.as_ref().map(|e| e.0.as_str()), Some("Q7186"));

    let unmatched = Frame::Event(EventFrame {
        event_type: "ceremony".to_string(),
        participants: BTreeMap::new(),
        time: None,
        location: None,
        properties: BTreeMap::new(),
    });
    let err = r
        .render(&unmatched, "en", Some(&mut state), &RenderOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::ConstructionSelectionFailed { .. }));
    assert_eq!(state, before);
}

#[test]
fn successful_render_commits_state() {
    let r = router();
    let mut state = DiscourseState::new();
    r.render(&frame("polonium"), "en", Some(&mut state), &RenderOptions::default())
        .unwrap();
    assert!(state.mentioned.iter().any(|e| e.0 == "Q7186"));
    assert!(state.mentioned.iter().any(|e| e.0 == "polonium"));
    assert_eq!(state.current_focus.as_ref().map(|e| e.0.as_str()), Some("Q7186"));
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[test]
fn max_sentences_limits_output() {
    let r = router();
    for max in [0, 1] {
        let options = RenderOptions {
            max_sentences: Some(max),
            ..RenderOptions::default()
        };
        let out = r.render(&frame("marie_curie_full"), "en", None, &options).unwrap();
        assert_eq!(out.sentences.len(), 1, "max_sentences = {}", max);
    }
    let options = RenderOptions {
        max_sentences: Some(10),
        ..RenderOptions::default()
    };
    let out = r.render(&frame("marie_curie_full"), "en", None, &options).unwrap();
    assert_eq!(out.sentences.len(), 3);
}

// ---------------------------------------------------------------------------
// Degradation and routing failures
// ---------------------------------------------------------------------------

#[test]
fn unused_event_property_is_reported() {
    let Frame::Event(mut event) = frame("polonium") else {
        panic!("polonium is an event frame");
    };
    event
        .properties
        .insert("instrument".to_string(), Value::String("electrometer".to_string()));
    let out = render(&router(), &Frame::Event(event), "en");
    assert_eq!(out.text, "Marie Curie discovered polonium in Paris in 1898.");
    assert!(out.degraded);
    assert_eq!(
        out.diagnostics,
        vec![Diagnostic::DroppedRole {
            construction: "transitive_event".to_string(),
            role: "instrument".to_string(),
        }]
    );
}

#[test]
fn missing_lexicon_degrades() {
    let out = render(&router(), &frame("marie_curie"), "zu");
    assert!(out.degraded);
    assert!(!out.text.is_empty());
    assert!(out.diagnostics.contains(&Diagnostic::MissingLexicon {
        lexicon_ref: "zu".to_string()
    }));
}

#[test]
fn missing_lexeme_uses_raw_lemma() {
    let Frame::Bio(mut bio) = frame("marie_curie") else {
        panic!("marie_curie is a bio frame");
    };
    bio.profession_lemmas = vec!["astronaut".to_string()];
    let out = render(&router(), &Frame::Bio(bio), "en");
    assert!(out.degraded);
    assert!(out.sentences[0].contains("astronaut"), "{}", out.sentences[0]);
    assert!(out.diagnostics.iter().any(|d| matches!(
        d,
        Diagnostic::LexemeNotFound { lemma, .. } if lemma == "astronaut"
    )));
}

#[test]
fn unknown_language() {
    let err = router()
        .render(&frame("marie_curie"), "xx", None, &RenderOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::UnknownLanguage(code) if code == "xx"));
}

#[test]
fn family_without_engine_is_unsupported() {
    let err = router()
        .render(&frame("marie_curie"), "ta", None, &RenderOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::UnsupportedFamily { family: FamilyId::Dravidian, .. }
    ));
    assert_eq!(err.to_string(), "no engine for family dravidian (language 'ta')");
}

#[test]
fn external_engine_without_renderer() {
    let err = router()
        .render(&frame("marie_curie"), "cy", None, &RenderOptions::default())
        .unwrap_err();
    assert!(matches!(err, RenderError::ExternalRendererUnavailable(id) if id == "gf"));
}

/// Records calls and answers with a fixed sentence.
struct CannedRenderer {
    calls: AtomicUsize,
}

impl ExternalRenderer for CannedRenderer {
    fn render(
        &self,
        _frame: &Frame,
        profile: &LanguageProfile,
        state: Option<&mut DiscourseState>,
        _options: &RenderOptions,
    ) -> Result<RenderedText, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(state.is_some());
        Ok(RenderedText {
            text: "Roedd Marie Curie yn ffisegydd.".to_string(),
            sentences: vec!["Roedd Marie Curie yn ffisegydd.".to_string()],
            degraded: false,
            diagnostics: Vec::new(),
            backend: profile.engine_id.clone(),
        })
    }
}

#[test]
fn external_engine_delegates() {
    let renderer = Arc::new(CannedRenderer {
        calls: AtomicUsize::new(0),
    });
    let r = Router::builder()
        .data_dir("lang_data")
        .external_renderer("gf", renderer.clone())
        .build()
        .unwrap();
    let mut session = RenderSession::new(&r, "cy");
    let out = session.render(&frame("marie_curie")).unwrap();
    assert_eq!(out.backend, "gf");
    assert_eq!(out.text, "Roedd Marie Curie yn ffisegydd.");
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn in_memory_store_renders_like_disk() {
    let read = |p: &str| std::fs::read_to_string(format!("lang_data/{}", p)).unwrap();
    let profiles = read("profiles.ron");
    let romance = read("families/romance.ron");
    let card = read("cards/it.ron");
    let store = InMemoryConfigStore::from_ron(&profiles, &[&romance], &[&card]).unwrap();
    let lexicon =
        realization_engine::core::lexicon::InMemoryLexicon::parse_ron(&read("lexicon/it.ron")).unwrap();
    let r = Router::builder()
        .config_store(store)
        .lexicons(InMemoryLexiconProvider::new().with("it", lexicon))
        .build()
        .unwrap();
    assert_eq!(
        render(&r, &frame("marie_curie"), "it"),
        render(&router(), &frame("marie_curie"), "it")
    );
}

#[test]
fn concurrent_first_renders_agree() {
    let r = Arc::new(router());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let r = r.clone();
            std::thread::spawn(move || {
                let lang = if i % 2 == 0 { "it" } else { "en" };
                (lang, render(&r, &frame("marie_curie"), lang).text)
            })
        })
        .collect();
    let mut seen: BTreeMap<&str, String> = BTreeMap::new();
    for handle in handles {
        let (lang, text) = handle.join().unwrap();
        if let Some(previous) = seen.get(lang) {
            assert_eq!(previous, &text);
        }
        seen.insert(lang, text);
    }
    assert_eq!(seen.len(), 2);
}

// ---------------------------------------------------------------------------
// Agreement
// ---------------------------------------------------------------------------

/// Every determiner and adjective in a predicate nominal carries the gender
/// of the noun it modifies, for every noun/adjective pair in each gendered
/// lexicon and for subjects of either gender.
#[test]
fn predicate_modifiers_agree_with_head_gender() {
    let r = router();
    for code in ["it", "es", "fr", "ru", "ar"] {
        let language = r.language(code).unwrap();
        let Backend::Core { engine, matrix } = &language.backend else {
            panic!("{} is not a core language", code);
        };
        let path = format!("lang_data/lexicon/{}.ron", language.profile.lexicon_ref());
        let lexicon = InMemoryLexicon::load_from_ron(std::path::Path::new(&path)).unwrap();
        let keys = lexicon.keys();
        let nouns: Vec<&str> = keys
            .iter()
            .filter(|(key, pos)| *pos == "noun" && !key.contains(':'))
            .map(|(key, _)| *key)
            .collect();
        let adjectives: Vec<&str> = keys
            .iter()
            .filter(|(_, pos)| *pos == "adj")
            .map(|(key, _)| *key)
            .collect();

        let mut checked = 0;
        for noun in &nouns {
            for adjective in &adjectives {
                for gender in [Gender::Male, Gender::Female] {
                    let input = ClauseInput::new(ConstructionId::EquativeCopula)
                        .with_role("subject", RoleValue::Entity(Entity::person("Alex Doe", Some(gender))))
                        .with_role("predicate", RoleValue::lemma(noun, "noun"))
                        .with_role("modifier", RoleValue::lemma(adjective, "adj"))
                        .with_feature("tense", "pres");
                    let clause = apply(&input, &language.profile, matrix).unwrap();
                    let out = realize(*engine, clause, &language.profile, matrix, &lexicon).unwrap();

                    let head = out
                        .tokens
                        .iter()
                        .find(|t| t.role == "predicate" && t.dep == "head")
                        .unwrap_or_else(|| panic!("{}: no predicate head in {:?}", code, out.text));
                    let Some(head_gender) = head.features.get("gender") else {
                        continue;
                    };
                    for token in out
                        .tokens
                        .iter()
                        .filter(|t| t.role == "predicate" && (t.dep == "det" || t.dep == "amod"))
                    {
                        assert_eq!(
                            token.features.get("gender"),
                            Some(head_gender),
                            "{}: '{}' in {:?} ({} {} {:?})",
                            code,
                            token.text,
                            out.text,
                            noun,
                            adjective,
                            gender
                        );
                    }
                    checked += 1;
                }
            }
        }
        assert!(checked > 0, "{}: no gendered predicate heads", code);
    }
}
