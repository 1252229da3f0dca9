/// Family engines: realize an abstract clause against a merged matrix and a
/// lexicon.
///
/// Realization runs in fixed steps: engine-specific clause preparation,
/// lexicon lookup per slot, feature resolution (explicit, then lexical,
/// then agreement, then matrix defaults), inflection, phrase-internal and
/// clause-level ordering, and a single left-to-right join pass.
///
/// Engines differ only through the [`FamilyEngine`] hooks; everything else
/// is driven by matrix data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::construction::{AbstractClause, ConstructionId, Controller, Slot, SlotContent};
use crate::core::lexicon::Lexicon;
use crate::core::linearizer::{merged_weights, order};
use crate::core::matrix::{JoinRules, MergedMatrix, Phonology};
use crate::core::morphology::{inflect, Attach, Token};
use crate::core::phonology::{apply_actions, attach_suffix, boundary_holds};
use crate::schema::lexeme::{feature, FeatureBundle, Lexeme};
use crate::schema::profile::{FamilyId, LanguageProfile, Linearization};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RealizationError {
    #[error("feature conflict in '{role}': {feature} is '{expected}' but agreement requires '{found}'")]
    FeatureConflict {
        role: String,
        feature: String,
        expected: String,
        found: String,
    },
}

/// A recoverable problem. The render still completes and is marked degraded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    LexemeNotFound { lemma: String, pos: String },
    NoMatchingMorphologyRule { lemma: String, features: FeatureBundle },
    MissingLexicon { lexicon_ref: String },
    /// A frame participant or property with no slot in the selected
    /// construction.
    DroppedRole { construction: String, role: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LexemeNotFound { lemma, pos } => write!(f, "lexeme not found: {} ({})", lemma, pos),
            Self::NoMatchingMorphologyRule { lemma, features } => {
                let features: Vec<String> = features.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "no morphology rule for {} [{}]", lemma, features.join(", "))
            }
            Self::MissingLexicon { lexicon_ref } => write!(f, "no lexicon '{}'", lexicon_ref),
            Self::DroppedRole { construction, role } => {
                write!(f, "{} has no slot for '{}'; dropped", construction, role)
            }
        }
    }
}

/// A realized clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseOutput {
    pub tokens: Vec<Token>,
    pub text: String,
    pub degraded: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Family-specific behaviour layered over the shared realization steps.
pub trait FamilyEngine: Send + Sync {
    fn family(&self) -> FamilyId;

    /// Rewrite the clause before lookup (case marking, dropped copulas,
    /// inserted classifiers).
    fn prepare(&self, _clause: &mut AbstractClause, _matrix: &MergedMatrix) {}

    /// Features a slot carries lexically.
    fn lexical_features(&self, _slot: &Slot, lexeme: Option<&Lexeme>) -> FeatureBundle {
        lexeme.map(Lexeme::inherent_features).unwrap_or_default()
    }
}

/// Purely data-driven engine (Romance, Germanic, Agglutinative).
pub struct StandardEngine {
    family: FamilyId,
}

impl FamilyEngine for StandardEngine {
    fn family(&self) -> FamilyId {
        self.family
    }
}

/// Predicate nominals take the instrumental outside the present tense.
pub struct SlavicEngine;

impl FamilyEngine for SlavicEngine {
    fn family(&self) -> FamilyId {
        FamilyId::Slavic
    }

    fn prepare(&self, clause: &mut AbstractClause, matrix: &MergedMatrix) {
        if !matches!(
            clause.construction,
            ConstructionId::EquativeCopula | ConstructionId::AttributiveCopula
        ) || clause.tense() == Some("pres")
        {
            return;
        }
        let case = matrix.param("predicate_case").unwrap_or("ins").to_string();
        for role in ["predicate", "attribute"] {
            if let Some(predicate) = clause.constituent_mut(role) {
                predicate.features.insert(feature::CASE, &case);
            }
        }
    }
}

/// Present-tense copular clauses have no overt copula.
pub struct SemiticEngine;

impl FamilyEngine for SemiticEngine {
    fn family(&self) -> FamilyId {
        FamilyId::Semitic
    }

    fn prepare(&self, clause: &mut AbstractClause, matrix: &MergedMatrix) {
        if clause.construction.is_copular()
            && clause.tense() == Some("pres")
            && matrix.param("zero_copula") != Some("no")
        {
            clause.constituents.retain(|c| c.role != "copula");
        }
    }
}

/// Noun-class defaults: human referents are class 1 (plural 2), other
/// nouns without a lexical class are class 9.
pub struct BantuEngine;

impl FamilyEngine for BantuEngine {
    fn family(&self) -> FamilyId {
        FamilyId::Bantu
    }

    fn lexical_features(&self, slot: &Slot, lexeme: Option<&Lexeme>) -> FeatureBundle {
        let mut bundle = lexeme.map(Lexeme::inherent_features).unwrap_or_default();
        if bundle.contains_key(feature::CLASS) {
            return bundle;
        }
        let human = slot.features.get("animacy") == Some("human") || bundle.get("animacy") == Some("human");
        if human {
            let plural = slot.features.get(feature::NUMBER) == Some("pl");
            bundle.insert(feature::CLASS, if plural { "2" } else { "1" });
        } else if slot.pos() == "noun" {
            bundle.insert(feature::CLASS, "9");
        }
        bundle
    }
}

/// A numeral determiner takes a classifier chosen by the head noun.
pub struct IsolatingEngine;

impl FamilyEngine for IsolatingEngine {
    fn family(&self) -> FamilyId {
        FamilyId::Isolating
    }

    fn prepare(&self, clause: &mut AbstractClause, _matrix: &MergedMatrix) {
        for constituent in &mut clause.constituents {
            let mut i = 0;
            while i < constituent.slots.len() {
                let numeral = matches!(
                    &constituent.slots[i].content,
                    SlotContent::Function { lemma, .. } if lemma == "indef_article"
                );
                if numeral {
                    let mut classifier = Slot::new(
                        "det",
                        SlotContent::Function {
                            lemma: "classifier".to_string(),
                            pos: "clf".to_string(),
                        },
                    );
                    classifier.agrees_with = Some(Controller::PhraseHead);
                    constituent.slots.insert(i + 1, classifier);
                    i += 1;
                }
                i += 1;
            }
        }
    }
}

static ENGINES: [&dyn FamilyEngine; 7] = [
    &StandardEngine {
        family: FamilyId::Romance,
    },
    &StandardEngine {
        family: FamilyId::Germanic,
    },
    &StandardEngine {
        family: FamilyId::Agglutinative,
    },
    &SlavicEngine,
    &SemiticEngine,
    &BantuEngine,
    &IsolatingEngine,
];

/// The registered engine for a family, if any.
pub fn engine_for(family: FamilyId) -> Option<&'static dyn FamilyEngine> {
    ENGINES.iter().copied().find(|e| e.family() == family)
}

/// Result of looking up one slot.
enum Lookup {
    Found(Lexeme),
    /// Content word missing from the lexicon: rendered as the raw lemma.
    Missing(String),
    /// Function word the language does not have.
    Omitted,
    Text(String),
    Punct(String),
    Silent,
}

impl Lookup {
    fn lexeme(&self) -> Option<&Lexeme> {
        match self {
            Self::Found(lexeme) => Some(lexeme),
            _ => None,
        }
    }
}

fn lookup_slot(slot: &Slot, lexicon: &dyn Lexicon, diagnostics: &mut Vec<Diagnostic>) -> Lookup {
    match &slot.content {
        SlotContent::Lexical { lemma, pos } => match lexicon.lookup(lemma, pos) {
            Some(lexeme) => Lookup::Found(lexeme),
            None => {
                tracing::warn!(lemma = %lemma, pos = %pos, "lexeme not found; using raw lemma");
                diagnostics.push(Diagnostic::LexemeNotFound {
                    lemma: lemma.clone(),
                    pos: pos.clone(),
                });
                Lookup::Missing(lemma.clone())
            }
        },
        SlotContent::Function { lemma, pos } => match lexicon.lookup(lemma, pos) {
            Some(lexeme) => Lookup::Found(lexeme),
            None => {
                tracing::trace!(lemma = %lemma, "function word absent; omitted");
                Lookup::Omitted
            }
        },
        SlotContent::Name { text, key, short } => {
            let localised = key.as_deref().and_then(|k| lexicon.lookup(k, "propn"));
            match (localised, short) {
                (Some(lexeme), false) => Lookup::Found(lexeme),
                (Some(lexeme), true) => Lookup::Text(
                    lexeme
                        .forms
                        .get("short")
                        .cloned()
                        .or_else(|| lexeme.lemma.split_whitespace().last().map(str::to_string))
                        .unwrap_or_else(|| text.clone()),
                ),
                (None, _) => Lookup::Text(text.clone()),
            }
        }
        SlotContent::Literal(text) => Lookup::Text(text.clone()),
        SlotContent::Punct(text) => Lookup::Punct(text.clone()),
        SlotContent::Null => Lookup::Silent,
    }
}

/// Mass nouns (lexeme feature `mass: "yes"`) take no indefinite article.
fn omit_mass_articles(clause: &AbstractClause, lookups: &mut [Vec<Lookup>]) {
    for (ci, constituent) in clause.constituents.iter().enumerate() {
        let mass = constituent
            .head_index()
            .and_then(|h| lookups[ci][h].lexeme())
            .is_some_and(|l| l.features.get("mass").is_some_and(|v| v == "yes"));
        if !mass {
            continue;
        }
        for (si, slot) in constituent.slots.iter().enumerate() {
            if matches!(&slot.content, SlotContent::Function { lemma, .. } if lemma == "indef_article") {
                lookups[ci][si] = Lookup::Omitted;
            }
        }
    }
}

/// Resolves slot feature bundles, following agreement controllers with
/// memoisation. A controller cycle falls back to the slot's own features.
struct FeatureResolver<'a> {
    clause: &'a AbstractClause,
    lookups: &'a [Vec<Lookup>],
    matrix: &'a MergedMatrix,
    engine: &'a dyn FamilyEngine,
    memo: Vec<Vec<Option<FeatureBundle>>>,
    visiting: Vec<Vec<bool>>,
}

impl<'a> FeatureResolver<'a> {
    fn new(
        clause: &'a AbstractClause,
        lookups: &'a [Vec<Lookup>],
        matrix: &'a MergedMatrix,
        engine: &'a dyn FamilyEngine,
    ) -> Self {
        Self {
            clause,
            lookups,
            matrix,
            engine,
            memo: clause
                .constituents
                .iter()
                .map(|c| vec![None; c.slots.len()])
                .collect(),
            visiting: clause
                .constituents
                .iter()
                .map(|c| vec![false; c.slots.len()])
                .collect(),
        }
    }

    fn explicit(&self, ci: usize, si: usize) -> FeatureBundle {
        let constituent = &self.clause.constituents[ci];
        let mut bundle = self.clause.features.clone();
        bundle.overlay(&constituent.features);
        bundle.overlay(&constituent.slots[si].features);
        bundle
    }

    fn controller(&self, ci: usize, si: usize) -> Option<(usize, usize)> {
        let constituent = &self.clause.constituents[ci];
        match constituent.slots[si].agrees_with.as_ref()? {
            Controller::PhraseHead => constituent
                .head_index()
                .filter(|h| *h != si)
                .map(|h| (ci, h)),
            Controller::Role(role) => {
                let target = self.clause.constituents.iter().position(|c| &c.role == role)?;
                let head = self.clause.constituents[target].head_index()?;
                Some((target, head))
            }
        }
    }

    fn resolve(&mut self, ci: usize, si: usize) -> Result<FeatureBundle, RealizationError> {
        if let Some(done) = &self.memo[ci][si] {
            return Ok(done.clone());
        }
        if self.visiting[ci][si] {
            return Ok(self.explicit(ci, si));
        }
        self.visiting[ci][si] = true;

        let (clause, matrix) = (self.clause, self.matrix);
        let slot = &clause.constituents[ci].slots[si];
        let explicit = self.explicit(ci, si);
        let lexical = self
            .engine
            .lexical_features(slot, self.lookups[ci][si].lexeme());
        let mut bundle = explicit.clone();
        bundle.fill_missing(&lexical);

        if let Some((cc, cs)) = self.controller(ci, si) {
            let source = self.resolve(cc, cs)?;
            for name in matrix.agreement_features(slot.pos()) {
                if lexical.contains_key(name) {
                    continue;
                }
                let Some(value) = source.get(name) else {
                    continue;
                };
                match explicit.get(name) {
                    Some(own) if own != value => {
                        return Err(RealizationError::FeatureConflict {
                            role: clause.constituents[ci].role.clone(),
                            feature: name.clone(),
                            expected: own.to_string(),
                            found: value.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => bundle.insert(name, value),
                }
            }
        }
        if let Some(defaults) = matrix.defaults_for(slot.pos()) {
            bundle.fill_missing(defaults);
        }

        self.visiting[ci][si] = false;
        self.memo[ci][si] = Some(bundle.clone());
        Ok(bundle)
    }
}

/// Realize one abstract clause. Missing lexemes and morphology gaps are
/// recorded as diagnostics; only agreement conflicts fail.
pub fn realize(
    engine: &dyn FamilyEngine,
    mut clause: AbstractClause,
    profile: &LanguageProfile,
    matrix: &MergedMatrix,
    lexicon: &dyn Lexicon,
) -> Result<ClauseOutput, RealizationError> {
    engine.prepare(&mut clause, matrix);

    let mut diagnostics = Vec::new();
    let mut lookups: Vec<Vec<Lookup>> = Vec::with_capacity(clause.constituents.len());
    for constituent in &clause.constituents {
        let mut row = Vec::with_capacity(constituent.slots.len());
        for slot in &constituent.slots {
            row.push(lookup_slot(slot, lexicon, &mut diagnostics));
        }
        lookups.push(row);
    }
    omit_mass_articles(&clause, &mut lookups);

    let mut bundles: Vec<Vec<FeatureBundle>> = Vec::with_capacity(clause.constituents.len());
    {
        let mut resolver = FeatureResolver::new(&clause, &lookups, matrix, engine);
        for (ci, constituent) in clause.constituents.iter().enumerate() {
            let mut row = Vec::with_capacity(constituent.slots.len());
            for si in 0..constituent.slots.len() {
                row.push(resolver.resolve(ci, si)?);
            }
            bundles.push(row);
        }
    }

    let phrase_weights = matrix.phrase_weights();
    let mut phrases: Vec<(String, Vec<Token>)> = Vec::with_capacity(clause.constituents.len());
    for (ci, constituent) in clause.constituents.iter().enumerate() {
        let mut slots: Vec<(String, Token)> = Vec::new();
        for (si, slot) in constituent.slots.iter().enumerate() {
            let features = &bundles[ci][si];
            let token = match &lookups[ci][si] {
                Lookup::Found(lexeme) => {
                    let token = inflect(lexeme, features, matrix);
                    if token.degraded {
                        diagnostics.push(Diagnostic::NoMatchingMorphologyRule {
                            lemma: lexeme.lemma.clone(),
                            features: features.clone(),
                        });
                    }
                    token
                }
                Lookup::Missing(lemma) => Token {
                    degraded: true,
                    features: features.clone(),
                    ..Token::literal(lemma, slot.pos())
                },
                Lookup::Text(text) => Token {
                    features: features.clone(),
                    ..Token::literal(text, slot.pos())
                },
                Lookup::Punct(text) => Token {
                    attach: Attach::Left,
                    ..Token::literal(text, "punct")
                },
                Lookup::Omitted | Lookup::Silent => continue,
            };
            slots.push((
                slot.dep.clone(),
                Token {
                    role: constituent.role.clone(),
                    dep: slot.dep.clone(),
                    ..token
                },
            ));
        }
        let label = constituent_label(profile, &constituent.role, &constituent.dep);
        phrases.push((label, order(slots, &phrase_weights)));
    }

    let weights = clause_weights(&clause, profile, matrix);
    let tokens: Vec<Token> = order(phrases, &weights).into_iter().flatten().collect();
    let text = join(&tokens, &matrix.join, &matrix.phonology, clause.is_sentence);
    let degraded = tokens.iter().any(|t| t.degraded) || !diagnostics.is_empty();
    Ok(ClauseOutput {
        tokens,
        text,
        degraded,
        diagnostics,
    })
}

/// Templates order by role; weighted topology orders by dependency label.
fn constituent_label(profile: &LanguageProfile, role: &str, dep: &str) -> String {
    match profile.linearization {
        Linearization::Topology => dep.to_string(),
        Linearization::Template => role.to_string(),
    }
}

fn clause_weights(clause: &AbstractClause, profile: &LanguageProfile, matrix: &MergedMatrix) -> BTreeMap<String, i32> {
    let topology = || merged_weights(profile.word_order, &matrix.topology_weights);
    match profile.linearization {
        Linearization::Topology => {
            tracing::debug!(lang = %profile.code, "weighted topology linearization");
            topology()
        }
        Linearization::Template => match matrix.clause_template(clause.construction.as_str()) {
            Some(template) => {
                let mut weights: BTreeMap<String, i32> = template
                    .iter()
                    .enumerate()
                    .map(|(i, role)| (role.clone(), i as i32))
                    .collect();
                for constituent in &clause.constituents {
                    weights
                        .entry(constituent.role.clone())
                        .or_insert(template.len() as i32);
                }
                weights
            }
            None => {
                tracing::debug!(lang = %profile.code, construction = %clause.construction, "no clause template; using word-order presets");
                let by_dep = topology();
                clause
                    .constituents
                    .iter()
                    .map(|c| (c.role.clone(), by_dep.get(&c.dep).copied().unwrap_or(0)))
                    .collect()
            }
        },
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join tokens into a string: clitics and punctuation attach to their
/// host, the first matching boundary rule applies between free words,
/// then capitalization and final punctuation for full sentences.
pub fn join(tokens: &[Token], rules: &JoinRules, phonology: &Phonology, is_sentence: bool) -> String {
    let mut words: Vec<(String, String)> = Vec::new();
    for token in tokens.iter().filter(|t| !t.text.is_empty()) {
        if token.attach == Attach::Left {
            if let Some((_, last)) = words.last_mut() {
                *last = attach_suffix(last, &token.text, phonology);
                continue;
            }
        }
        let mut word = token.text.clone();
        let mut glue = rules.separator.clone();
        if let Some((_, last)) = words.last_mut() {
            if let Some(rule) = rules
                .elision
                .iter()
                .find(|r| boundary_holds(r, last, &word, phonology))
            {
                apply_actions(rule, last, &mut word);
                if let Some(g) = &rule.glue {
                    glue = g.clone();
                }
            }
        }
        words.push((glue, word));
    }

    let mut text = String::new();
    for (i, (glue, word)) in words.iter().enumerate() {
        if i > 0 {
            text.push_str(glue);
        }
        text.push_str(word);
    }
    if is_sentence {
        if rules.capitalize_first {
            text = capitalize(&text);
        }
        text.push_str(&rules.sentence_final);
    }
    text
}
