/// Construction library: family-agnostic clause patterns.
///
/// A construction turns a role-filled [`ClauseInput`] into an
/// [`AbstractClause`]: constituents of abstract slots carrying role labels,
/// dependency labels, explicit features and agreement controllers. It never
/// consults the lexicon and never inflects; the family engine does both.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::core::discourse::ReferenceForm;
use crate::core::matrix::MergedMatrix;
use crate::schema::entity::{DatePrecision, Entity, Location, TimeSpan};
use crate::schema::frame::{Frame, FrameKind};
use crate::schema::lexeme::{feature, FeatureBundle};
use crate::schema::profile::LanguageProfile;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("construction '{construction}' is missing required role '{role}'")]
    MissingRequiredRole { construction: String, role: String },
    #[error("role '{role}' expects {expected}")]
    InvalidRoleValue { role: String, expected: String },
}

/// Identifier of a clause pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionId {
    EquativeCopula,
    AttributiveCopula,
    LocativeCopula,
    Existential,
    PossessionHave,
    IntransitiveEvent,
    TransitiveEvent,
    RelativeClauseSubjectGap,
    TopicCommentCopula,
    Comparative,
}

impl ConstructionId {
    pub const ALL: [ConstructionId; 10] = [
        Self::EquativeCopula,
        Self::AttributiveCopula,
        Self::LocativeCopula,
        Self::Existential,
        Self::PossessionHave,
        Self::IntransitiveEvent,
        Self::TransitiveEvent,
        Self::RelativeClauseSubjectGap,
        Self::TopicCommentCopula,
        Self::Comparative,
    ];

    /// Key used by clause templates in family matrices.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EquativeCopula => "equative_copula",
            Self::AttributiveCopula => "attributive_copula",
            Self::LocativeCopula => "locative_copula",
            Self::Existential => "existential",
            Self::PossessionHave => "possession_have",
            Self::IntransitiveEvent => "intransitive_event",
            Self::TransitiveEvent => "transitive_event",
            Self::RelativeClauseSubjectGap => "relative_clause_subject_gap",
            Self::TopicCommentCopula => "topic_comment_copula",
            Self::Comparative => "comparative",
        }
    }

    pub fn parse(s: &str) -> Option<ConstructionId> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    pub fn spec(&self) -> &'static ConstructionSpec {
        // ALL and SPECS are declared in the same order.
        &SPECS[*self as usize]
    }

    /// Copular constructions, where some families drop or mark the copula.
    pub fn is_copular(&self) -> bool {
        matches!(
            self,
            Self::EquativeCopula
                | Self::AttributiveCopula
                | Self::LocativeCopula
                | Self::TopicCommentCopula
                | Self::Comparative
        )
    }
}

impl std::fmt::Display for ConstructionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role inventory of one construction.
#[derive(Debug)]
pub struct ConstructionSpec {
    pub id: ConstructionId,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Role whose entity is the grammatical subject (drives discourse focus).
    pub subject_role: Option<&'static str>,
}

impl ConstructionSpec {
    pub fn accepts(&self, role: &str) -> bool {
        self.required.contains(&role) || self.optional.contains(&role)
    }
}

static SPECS: [ConstructionSpec; 10] = [
    ConstructionSpec {
        id: ConstructionId::EquativeCopula,
        required: &["subject", "predicate"],
        optional: &["modifier", "time"],
        subject_role: Some("subject"),
    },
    ConstructionSpec {
        id: ConstructionId::AttributiveCopula,
        required: &["subject", "attribute"],
        optional: &["time"],
        subject_role: Some("subject"),
    },
    ConstructionSpec {
        id: ConstructionId::LocativeCopula,
        required: &["subject", "location"],
        optional: &["time"],
        subject_role: Some("subject"),
    },
    ConstructionSpec {
        id: ConstructionId::Existential,
        required: &["theme"],
        optional: &["location", "time"],
        subject_role: None,
    },
    ConstructionSpec {
        id: ConstructionId::PossessionHave,
        required: &["possessor", "possessed"],
        optional: &["time"],
        subject_role: Some("possessor"),
    },
    ConstructionSpec {
        id: ConstructionId::IntransitiveEvent,
        required: &["subject", "verb"],
        optional: &["predicate", "location", "time"],
        subject_role: Some("subject"),
    },
    ConstructionSpec {
        id: ConstructionId::TransitiveEvent,
        required: &["subject", "verb", "object"],
        optional: &["location", "time"],
        subject_role: Some("subject"),
    },
    ConstructionSpec {
        id: ConstructionId::RelativeClauseSubjectGap,
        required: &["head", "verb"],
        optional: &["object"],
        subject_role: None,
    },
    ConstructionSpec {
        id: ConstructionId::TopicCommentCopula,
        required: &["topic", "comment"],
        optional: &["modifier"],
        subject_role: Some("topic"),
    },
    ConstructionSpec {
        id: ConstructionId::Comparative,
        required: &["subject", "attribute", "standard"],
        optional: &[],
        subject_role: Some("subject"),
    },
];

/// What fills a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoleValue {
    Entity(Entity),
    Lemma {
        lemma: String,
        pos: String,
        #[serde(default)]
        features: FeatureBundle,
    },
    Literal(String),
    Time(TimeSpan),
    Place(Location),
    /// Coordinated fillers, e.g. several professions.
    Coordination(Vec<RoleValue>),
}

impl RoleValue {
    pub fn lemma(lemma: &str, pos: &str) -> Self {
        Self::Lemma {
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            features: FeatureBundle::new(),
        }
    }
}

/// A role-filled request for one clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseInput {
    pub construction_id: ConstructionId,
    pub roles: BTreeMap<String, RoleValue>,
    /// Referring-expression decisions for entity roles; absent means full name.
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceForm>,
    /// Clause-level features such as tense.
    #[serde(default)]
    pub features: FeatureBundle,
}

impl ClauseInput {
    pub fn new(construction_id: ConstructionId) -> Self {
        Self {
            construction_id,
            roles: BTreeMap::new(),
            references: BTreeMap::new(),
            features: FeatureBundle::new(),
        }
    }

    pub fn with_role(mut self, role: &str, value: RoleValue) -> Self {
        self.roles.insert(role.to_string(), value);
        self
    }

    pub fn with_feature(mut self, key: &str, value: &str) -> Self {
        self.features.insert(key, value);
        self
    }

    /// The entity in the construction's subject role, if any.
    pub fn subject_entity(&self) -> Option<&Entity> {
        let role = self.construction_id.spec().subject_role?;
        match self.roles.get(role)? {
            RoleValue::Entity(e) => Some(e),
            _ => None,
        }
    }
}

/// Where a slot takes agreement features from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    /// The head slot of the slot's own constituent.
    PhraseHead,
    /// The head slot of the constituent with this role.
    Role(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotContent {
    /// A content word; missing from the lexicon means a degraded placeholder.
    Lexical { lemma: String, pos: String },
    /// A function word; silently omitted when the lexicon lacks it.
    Function { lemma: String, pos: String },
    /// A proper name, localised through the lexicon when `key` resolves.
    Name {
        text: String,
        key: Option<String>,
        short: bool,
    },
    Literal(String),
    /// Punctuation written onto the preceding token.
    Punct(String),
    /// A silent slot: contributes features (pro-drop subjects) but no text.
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Phrase-internal dependency: `head`, `det`, `amod`, `case`, `conj`, ...
    pub dep: String,
    pub content: SlotContent,
    pub features: FeatureBundle,
    pub agrees_with: Option<Controller>,
}

impl Slot {
    pub fn new(dep: &str, content: SlotContent) -> Self {
        Self {
            dep: dep.to_string(),
            content,
            features: FeatureBundle::new(),
            agrees_with: None,
        }
    }

    fn lexical(dep: &str, lemma: &str, pos: &str) -> Self {
        Self::new(
            dep,
            SlotContent::Lexical {
                lemma: lemma.to_string(),
                pos: pos.to_string(),
            },
        )
    }

    fn function(dep: &str, lemma: &str, pos: &str) -> Self {
        Self::new(
            dep,
            SlotContent::Function {
                lemma: lemma.to_string(),
                pos: pos.to_string(),
            },
        )
    }

    fn agreeing(mut self, controller: Controller) -> Self {
        self.agrees_with = Some(controller);
        self
    }

    fn with_features(mut self, features: FeatureBundle) -> Self {
        self.features.overlay(&features);
        self
    }

    fn with_feature(mut self, key: &str, value: &str) -> Self {
        self.features.insert(key, value);
        self
    }

    pub fn is_head(&self) -> bool {
        self.dep == "head"
    }

    /// Part of speech the slot realizes, for agreement and default lookup.
    pub fn pos(&self) -> &str {
        match &self.content {
            SlotContent::Lexical { pos, .. } | SlotContent::Function { pos, .. } => pos,
            SlotContent::Name { .. } => "propn",
            SlotContent::Literal(_) => "num",
            SlotContent::Punct(_) => "punct",
            SlotContent::Null => "pron",
        }
    }
}

/// A clause-level phrase: the unit the linearizer orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constituent {
    pub role: String,
    /// Clause-level dependency label used by weighted topology.
    pub dep: String,
    pub slots: Vec<Slot>,
    pub features: FeatureBundle,
}

impl Constituent {
    fn new(role: &str, dep: &str, slots: Vec<Slot>) -> Self {
        Self {
            role: role.to_string(),
            dep: dep.to_string(),
            slots,
            features: FeatureBundle::new(),
        }
    }

    fn with_feature(mut self, key: &str, value: &str) -> Self {
        self.features.insert(key, value);
        self
    }

    pub fn head_index(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_head)
    }
}

/// Ordered abstract slots awaiting realization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractClause {
    pub construction: ConstructionId,
    pub constituents: Vec<Constituent>,
    pub features: FeatureBundle,
    /// Full sentences get sentence-final punctuation and capitalization.
    pub is_sentence: bool,
}

impl AbstractClause {
    pub fn constituent(&self, role: &str) -> Option<&Constituent> {
        self.constituents.iter().find(|c| c.role == role)
    }

    pub fn constituent_mut(&mut self, role: &str) -> Option<&mut Constituent> {
        self.constituents.iter_mut().find(|c| c.role == role)
    }

    pub fn tense(&self) -> Option<&str> {
        self.features.get(feature::TENSE)
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// A condition on frame shape and language flags.
#[derive(Debug, Clone, Copy)]
enum Requirement {
    TopicPreference,
    Professions,
    Nationalities,
    /// The role is filled, by a participant or a property.
    Participant(&'static str),
}

struct SelectionRule {
    kind: FrameKind,
    event_type: Option<&'static str>,
    requires: &'static [Requirement],
    construction: ConstructionId,
}

/// Most specific first; the first matching rule wins.
static SELECTION: &[SelectionRule] = &[
    SelectionRule {
        kind: FrameKind::Bio,
        event_type: None,
        requires: &[Requirement::TopicPreference, Requirement::Professions],
        construction: ConstructionId::TopicCommentCopula,
    },
    SelectionRule {
        kind: FrameKind::Bio,
        event_type: None,
        requires: &[Requirement::Professions],
        construction: ConstructionId::EquativeCopula,
    },
    SelectionRule {
        kind: FrameKind::Bio,
        event_type: None,
        requires: &[Requirement::Nationalities],
        construction: ConstructionId::AttributiveCopula,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: Some("birth"),
        requires: &[],
        construction: ConstructionId::IntransitiveEvent,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: Some("death"),
        requires: &[],
        construction: ConstructionId::IntransitiveEvent,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: Some("possession"),
        requires: &[],
        construction: ConstructionId::PossessionHave,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: Some("location"),
        requires: &[],
        construction: ConstructionId::LocativeCopula,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: Some("existence"),
        requires: &[],
        construction: ConstructionId::Existential,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: Some("comparison"),
        requires: &[],
        construction: ConstructionId::Comparative,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: None,
        requires: &[Requirement::Participant("object")],
        construction: ConstructionId::TransitiveEvent,
    },
    SelectionRule {
        kind: FrameKind::Event,
        event_type: None,
        requires: &[Requirement::Participant("subject")],
        construction: ConstructionId::IntransitiveEvent,
    },
];

fn requirement_holds(req: Requirement, frame: &Frame, profile: &LanguageProfile) -> bool {
    match (req, frame) {
        (Requirement::TopicPreference, _) => profile.flags.topic_comment_preference,
        (Requirement::Professions, Frame::Bio(bio)) => !bio.profession_lemmas.is_empty(),
        (Requirement::Nationalities, Frame::Bio(bio)) => !bio.nationality_lemmas.is_empty(),
        (Requirement::Participant(role), Frame::Event(event)) => {
            event.participants.contains_key(role) || event.properties.contains_key(role)
        }
        _ => false,
    }
}

/// Pick the construction for a frame's main clause. `None` when no rule
/// matches the frame's shape.
pub fn select(frame: &Frame, profile: &LanguageProfile) -> Option<ConstructionId> {
    let kind = frame.kind();
    let event_type = frame.event_type();
    SELECTION
        .iter()
        .find(|rule| {
            rule.kind == kind
                && rule.event_type.map_or(true, |t| Some(t) == event_type)
                && rule.requires.iter().all(|r| requirement_holds(*r, frame, profile))
        })
        .map(|rule| rule.construction)
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Build the abstract clause for `input`. Required roles are checked
/// against the static table before anything is assembled.
pub fn apply(
    input: &ClauseInput,
    profile: &LanguageProfile,
    matrix: &MergedMatrix,
) -> Result<AbstractClause, ConstructionError> {
    let id = input.construction_id;
    let spec = id.spec();
    for role in spec.required {
        if !input.roles.contains_key(*role) {
            return Err(ConstructionError::MissingRequiredRole {
                construction: id.as_str().to_string(),
                role: role.to_string(),
            });
        }
    }
    for role in input.roles.keys() {
        if !spec.accepts(role) {
            tracing::debug!(construction = %id, role = %role, "ignoring role the construction does not use");
        }
    }

    let b = Builder { input, matrix };
    let mut constituents = Vec::new();
    match id {
        ConstructionId::EquativeCopula => {
            constituents.push(b.argument("subject", "nsubj", "nom")?);
            constituents.push(b.copula("subject"));
            constituents.push(b.nominal_predicate("predicate", "attr", Some("subject"))?);
        }
        ConstructionId::AttributiveCopula => {
            constituents.push(b.argument("subject", "nsubj", "nom")?);
            constituents.push(b.copula("subject"));
            constituents.push(b.adjectival("attribute", "attr", &[])?);
        }
        ConstructionId::LocativeCopula => {
            constituents.push(b.argument("subject", "nsubj", "nom")?);
            constituents.push(b.copula("subject"));
            constituents.push(b.place("location")?);
        }
        ConstructionId::Existential => {
            constituents.push(Constituent::new(
                "expletive",
                "expl",
                vec![Slot::function("head", "existential_marker", "pron")],
            ));
            constituents.push(b.copula("theme"));
            constituents.push(b.argument("theme", "theme", "nom")?);
            if input.roles.contains_key("location") {
                constituents.push(b.place("location")?);
            }
        }
        ConstructionId::PossessionHave => {
            constituents.push(b.argument("possessor", "nsubj", "nom")?);
            constituents.push(b.verb("verb", "have", "possessor"));
            constituents.push(b.argument("possessed", "obj", "acc")?);
        }
        ConstructionId::IntransitiveEvent => {
            constituents.push(b.argument("subject", "nsubj", "nom")?);
            constituents.push(b.verb_role("verb", "subject")?);
            if input.roles.contains_key("predicate") {
                constituents.push(b.argument("predicate", "obj", "nom")?);
            }
            if input.roles.contains_key("location") {
                constituents.push(b.place("location")?);
            }
        }
        ConstructionId::TransitiveEvent => {
            constituents.push(b.argument("subject", "nsubj", "nom")?);
            constituents.push(b.verb_role("verb", "subject")?);
            constituents.push(b.argument("object", "obj", "acc")?);
            if input.roles.contains_key("location") {
                constituents.push(b.place("location")?);
            }
        }
        ConstructionId::RelativeClauseSubjectGap => {
            constituents.push(b.argument("head", "relhead", "nom")?);
            constituents.push(Constituent::new(
                "relativizer",
                "mark",
                vec![Slot::function("head", "relativizer", "pron").agreeing(Controller::Role("head".to_string()))],
            ));
            constituents.push(
                b.verb_role("verb", "head")?
                    .with_feature(feature::VERBFORM, "rel"),
            );
            if input.roles.contains_key("object") {
                constituents.push(b.argument("object", "obj", "acc")?);
            }
        }
        ConstructionId::TopicCommentCopula => {
            let mut topic = b.argument("topic", "topic", "nom")?;
            if topic.slots.iter().any(|s| s.content != SlotContent::Null) {
                topic.slots.push(Slot::function("case", "topic_marker", "adp"));
            }
            constituents.push(topic);
            constituents.push(b.nominal_predicate("comment", "attr", Some("topic"))?);
            constituents.push(b.copula("topic"));
        }
        ConstructionId::Comparative => {
            constituents.push(b.argument("subject", "nsubj", "nom")?);
            constituents.push(b.copula("subject"));
            constituents.push(b.adjectival(
                "attribute",
                "attr",
                &[Slot::function("advmod", "comparative_marker", "adv")],
            )?);
            let mut standard = b.argument("standard", "obl", "abl")?;
            standard.slots.insert(0, Slot::function("case", "than", "adp"));
            constituents.push(standard);
            if let Some(attr) = constituents.iter_mut().find(|c| c.role == "attribute") {
                for slot in attr.slots.iter_mut().filter(|s| s.is_head()) {
                    slot.features.insert(feature::DEGREE, "cmp");
                }
            }
        }
    }
    if input.roles.contains_key("time") && spec.accepts("time") {
        if let Some(time) = b.time("time")? {
            constituents.push(time);
        }
    }

    let mut features = input.features.clone();
    if features.get(feature::TENSE).is_none() {
        features.insert(feature::TENSE, "pres");
    }
    tracing::debug!(construction = %id, lang = %profile.code, constituents = constituents.len(), "assembled clause");
    Ok(AbstractClause {
        construction: id,
        constituents,
        features,
        is_sentence: id != ConstructionId::RelativeClauseSubjectGap,
    })
}

/// Assembles constituents for one input. Holds no state beyond the input.
struct Builder<'a> {
    input: &'a ClauseInput,
    matrix: &'a MergedMatrix,
}

impl<'a> Builder<'a> {
    fn role(&self, role: &str) -> Result<&'a RoleValue, ConstructionError> {
        self.input
            .roles
            .get(role)
            .ok_or_else(|| ConstructionError::MissingRequiredRole {
                construction: self.input.construction_id.as_str().to_string(),
                role: role.to_string(),
            })
    }

    fn invalid(role: &str, expected: &str) -> ConstructionError {
        ConstructionError::InvalidRoleValue {
            role: role.to_string(),
            expected: expected.to_string(),
        }
    }

    fn copula(&self, controller: &str) -> Constituent {
        self.verb("copula", "be", controller)
    }

    fn verb(&self, role: &str, lemma: &str, controller: &str) -> Constituent {
        Constituent::new(
            role,
            "root",
            vec![Slot::lexical("head", lemma, "verb").agreeing(Controller::Role(controller.to_string()))],
        )
    }

    /// A verb supplied through a role (a lemma or a literal form).
    fn verb_role(&self, role: &str, controller: &str) -> Result<Constituent, ConstructionError> {
        let slot = match self.role(role)? {
            RoleValue::Lemma { lemma, pos, features } => Slot::lexical("head", lemma, pos).with_features(features.clone()),
            RoleValue::Literal(text) => Slot::lexical("head", text, "verb"),
            _ => return Err(Self::invalid(role, "a verb lemma")),
        };
        Ok(Constituent::new(
            role,
            "root",
            vec![slot.agreeing(Controller::Role(controller.to_string()))],
        ))
    }

    /// An argument noun phrase: an entity mention or a common noun.
    fn argument(&self, role: &str, dep: &str, case: &str) -> Result<Constituent, ConstructionError> {
        let slots = match self.role(role)? {
            RoleValue::Entity(entity) => {
                let form = self
                    .input
                    .references
                    .get(role)
                    .copied()
                    .unwrap_or(ReferenceForm::FullName);
                vec![mention(entity, form)]
            }
            RoleValue::Lemma { lemma, pos, features } => {
                let mut slots = Vec::new();
                if pos == "noun" && dep != "nsubj" && dep != "topic" {
                    slots.push(Slot::function("det", "indef_article", "det").agreeing(Controller::PhraseHead));
                }
                slots.push(Slot::lexical("head", lemma, pos).with_features(features.clone()));
                slots
            }
            RoleValue::Literal(text) => vec![Slot::new("head", SlotContent::Literal(text.clone()))],
            RoleValue::Coordination(items) => {
                let mut slots = self.coordinate(role, items, "noun", &Controller::PhraseHead)?;
                if let Some(head) = slots.iter_mut().find(|s| s.is_head()) {
                    head.agrees_with = None;
                }
                slots
            }
            _ => return Err(Self::invalid(role, "an entity or a noun")),
        };
        Ok(Constituent::new(role, dep, slots).with_feature(feature::CASE, case))
    }

    /// Predicate nominal: (det) head noun, optional coordinated nouns and a
    /// `modifier` adjective, all agreeing with the subject where the family
    /// says nouns agree.
    fn nominal_predicate(
        &self,
        role: &str,
        dep: &str,
        subject: Option<&str>,
    ) -> Result<Constituent, ConstructionError> {
        let controller = subject.map(|s| Controller::Role(s.to_string()));
        let value = self.role(role)?;
        let mut slots = vec![Slot::function("det", "indef_article", "det").agreeing(Controller::PhraseHead)];
        match value {
            RoleValue::Lemma { lemma, pos, features } => {
                let mut head = Slot::lexical("head", lemma, pos).with_features(features.clone());
                head.agrees_with = controller;
                slots.push(head);
            }
            RoleValue::Coordination(items) => {
                let controller = controller.unwrap_or(Controller::PhraseHead);
                slots.extend(self.coordinate(role, items, "noun", &controller)?);
            }
            RoleValue::Literal(text) => slots.push(Slot::new("head", SlotContent::Literal(text.clone()))),
            _ => return Err(Self::invalid(role, "a noun lemma")),
        }
        if let Some(modifier) = self.input.roles.get("modifier") {
            slots.extend(modifiers(modifier, "amod").ok_or_else(|| Self::invalid("modifier", "adjective lemmas"))?);
        }
        Ok(Constituent::new(role, dep, slots))
    }

    /// Adjectival predicate, agreeing with the subject.
    fn adjectival(
        &self,
        role: &str,
        dep: &str,
        before_head: &[Slot],
    ) -> Result<Constituent, ConstructionError> {
        let subject_role = self.input.construction_id.spec().subject_role;
        let subject = Controller::Role(subject_role.unwrap_or("subject").to_string());
        let mut slots = before_head.to_vec();
        match self.role(role)? {
            RoleValue::Lemma { lemma, pos, features } => {
                slots.push(
                    Slot::lexical("head", lemma, pos)
                        .with_features(features.clone())
                        .agreeing(subject),
                );
            }
            RoleValue::Coordination(items) => slots.extend(self.coordinate(role, items, "adj", &subject)?),
            _ => return Err(Self::invalid(role, "an adjective lemma")),
        }
        Ok(Constituent::new(role, dep, slots))
    }

    /// Conjuncts: first as head, the rest as `conj` with a conjunction before
    /// the last one and commas between the others.
    fn coordinate(
        &self,
        role: &str,
        items: &[RoleValue],
        default_pos: &str,
        controller: &Controller,
    ) -> Result<Vec<Slot>, ConstructionError> {
        let mut slots = Vec::new();
        let count = items.len();
        for (i, item) in items.iter().enumerate() {
            let (lemma, pos, features) = match item {
                RoleValue::Lemma { lemma, pos, features } => (lemma.as_str(), pos.as_str(), features.clone()),
                RoleValue::Literal(text) => (text.as_str(), default_pos, FeatureBundle::new()),
                _ => return Err(Self::invalid(role, "coordinated lemmas")),
            };
            let dep = if i == 0 { "head" } else { "conj" };
            if i > 0 {
                if i + 1 == count {
                    slots.push(Slot::function("conj", "and", "cconj"));
                } else {
                    slots.push(Slot::new("conj", SlotContent::Punct(",".to_string())));
                }
            }
            slots.push(
                Slot::lexical(dep, lemma, pos)
                    .with_features(features)
                    .agreeing(controller.clone()),
            );
        }
        if slots.is_empty() {
            return Err(Self::invalid(role, "at least one conjunct"));
        }
        Ok(slots)
    }

    /// `location` as an oblique: adposition plus localised place name.
    fn place(&self, role: &str) -> Result<Constituent, ConstructionError> {
        let name = match self.role(role)? {
            RoleValue::Place(place) => place_slot(place),
            RoleValue::Entity(entity) => mention(entity, ReferenceForm::FullName),
            RoleValue::Literal(text) => Slot::new("head", SlotContent::Literal(text.clone())),
            _ => return Err(Self::invalid(role, "a place")),
        };
        Ok(Constituent::new(
            role,
            "obl",
            vec![Slot::function("case", "loc_prep", "adp"), name],
        )
        .with_feature(feature::CASE, "loc"))
    }

    /// A date phrase at the precision the span carries. `None` when the
    /// span has no year.
    fn time(&self, role: &str) -> Result<Option<Constituent>, ConstructionError> {
        let RoleValue::Time(span) = self.role(role)? else {
            return Err(Self::invalid(role, "a time span"));
        };
        let Some(precision) = span.precision() else {
            tracing::debug!(role, "dropping time span without a year");
            return Ok(None);
        };
        let marker = match precision {
            DatePrecision::Year => "in_year",
            DatePrecision::Month => "in_month",
            DatePrecision::Day => "on_date",
        };
        let mut slots = vec![Slot::function("case", marker, "adp")];
        for part in &self.matrix.date_order {
            match (part.as_str(), precision) {
                ("year", _) => {
                    if let Some(year) = span.start_year {
                        slots.push(Slot::new("head", SlotContent::Literal(year.to_string())));
                        if precision == DatePrecision::Year {
                            slots.push(Slot::function("head", "year_marker", "noun"));
                        }
                    }
                }
                ("month", DatePrecision::Month | DatePrecision::Day) => {
                    if let Some(month) = span.start_month {
                        slots.push(
                            Slot::lexical("head", &format!("month:{}", month), "noun")
                                .with_feature(feature::CASE, if precision == DatePrecision::Day { "gen" } else { "loc" }),
                        );
                    }
                }
                ("day", DatePrecision::Day) => {
                    if let Some(day) = span.start_day {
                        slots.push(Slot::new("head", SlotContent::Literal(day.to_string())));
                    }
                }
                _ => {}
            }
        }
        Ok(Some(Constituent::new(role, "obl:tmod", slots)))
    }
}

/// Adjective modifiers from a lemma or a coordination of lemmas.
fn modifiers(value: &RoleValue, dep: &str) -> Option<Vec<Slot>> {
    let values: Vec<&RoleValue> = match value {
        RoleValue::Coordination(items) => items.iter().collect(),
        other => vec![other],
    };
    values
        .into_iter()
        .map(|v| match v {
            RoleValue::Lemma { lemma, pos, features } => Some(
                Slot::lexical(dep, lemma, pos)
                    .with_features(features.clone())
                    .agreeing(Controller::PhraseHead),
            ),
            _ => None,
        })
        .collect()
}

/// Features an entity mention carries regardless of its surface form.
fn entity_features(entity: &Entity) -> FeatureBundle {
    let mut features = FeatureBundle::new()
        .with(feature::PERSON, "3")
        .with(feature::NUMBER, entity.number());
    if let Some(gender) = entity.gender {
        features.insert(feature::GENDER, gender.feature_value());
    }
    if entity.human {
        features.insert("animacy", "human");
    }
    features
}

/// The head slot for an entity mention in a given referring form.
pub fn mention(entity: &Entity, form: ReferenceForm) -> Slot {
    let features = entity_features(entity);
    let content = match form {
        ReferenceForm::FullName | ReferenceForm::ShortName => SlotContent::Name {
            text: match form {
                ReferenceForm::ShortName => entity.short_name().unwrap_or_default(),
                _ => entity.display_name().unwrap_or_default().to_string(),
            },
            key: Some(entity.entity_ref().0),
            short: form == ReferenceForm::ShortName,
        },
        ReferenceForm::Pronoun { .. } => SlotContent::Lexical {
            lemma: "pronoun".to_string(),
            pos: "pron".to_string(),
        },
        ReferenceForm::ZeroSubject => SlotContent::Null,
    };
    let mut slot = Slot::new("head", content).with_features(features);
    if let ReferenceForm::Pronoun { gender, number } = form {
        slot.features.insert(feature::GENDER, gender.feature_value());
        slot.features.insert(feature::NUMBER, number.feature_value());
    }
    slot
}

fn place_slot(place: &Location) -> Slot {
    Slot::new(
        "head",
        SlotContent::Name {
            text: place.name.clone(),
            key: Some(place.lexicon_key().to_string()),
            short: false,
        },
    )
    .with_feature(feature::NUMBER, "sg")
}
