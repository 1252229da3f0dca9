/// Discourse state machine: who has been mentioned, who is in focus, and
/// which referring expression a mention should use.
///
/// The policy is a single-focus simplification of centering: the focus is
/// the subject of the last rendered sentence. There is no ranking among
/// competing candidates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::entity::{Entity, EntityRef, Gender};

/// Per-session discourse memory. Cloned before a render and replaced only
/// when the render succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscourseState {
    /// Mentioned entities in order of first mention.
    pub mentioned: Vec<EntityRef>,
    pub current_focus: Option<EntityRef>,
    /// Sentences since each entity was last the subject.
    pub recency: BTreeMap<EntityRef, u32>,
}

/// How a mention is realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceForm {
    FullName,
    ShortName,
    Pronoun { gender: Gender, number: GrammaticalNumber },
    ZeroSubject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrammaticalNumber {
    Singular,
    Plural,
}

impl GrammaticalNumber {
    pub fn feature_value(&self) -> &'static str {
        match self {
            Self::Singular => "sg",
            Self::Plural => "pl",
        }
    }
}

/// Syntactic position of the mention being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Subject,
    NonSubject,
}

/// Caller hint for choosing among equally valid referring expressions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Register {
    #[default]
    Neutral,
    /// Repeat full names instead of shortening them.
    Formal,
}

impl DiscourseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mentioned(&self, entity: &EntityRef) -> bool {
        self.mentioned.contains(entity)
    }

    pub fn is_focus(&self, entity: &EntityRef) -> bool {
        self.current_focus.as_ref() == Some(entity)
    }

    fn with_mention(mut self, entity: EntityRef) -> Self {
        if !self.mentioned.contains(&entity) {
            self.mentioned.push(entity.clone());
        }
        self.recency.entry(entity).or_insert(0);
        self
    }
}

/// Decide the referring expression for `entity` and record the mention.
///
/// The focused entity becomes a zero subject (pro-drop languages, subject
/// position) or a pronoun; without a known gender it keeps its full name.
/// Other entities get their full name on first mention and a short name
/// afterwards, unless the register is formal.
pub fn resolve_reference(
    entity: &Entity,
    state: &DiscourseState,
    position: Position,
    pro_drop: bool,
    register: Register,
) -> (ReferenceForm, DiscourseState) {
    let entity_ref = entity.entity_ref();
    let form = if state.is_focus(&entity_ref) {
        match (position, pro_drop, entity.gender) {
            (Position::Subject, true, _) => ReferenceForm::ZeroSubject,
            (_, _, Some(gender)) => ReferenceForm::Pronoun {
                gender,
                number: if entity.number() == "pl" {
                    GrammaticalNumber::Plural
                } else {
                    GrammaticalNumber::Singular
                },
            },
            (_, _, None) => ReferenceForm::FullName,
        }
    } else if state.is_mentioned(&entity_ref) && register == Register::Neutral {
        ReferenceForm::ShortName
    } else {
        ReferenceForm::FullName
    };
    tracing::debug!(entity = %entity_ref.0, ?form, "resolved reference");
    (form, state.clone().with_mention(entity_ref))
}

/// Transition after a rendered sentence. The subject takes the focus and
/// its recency resets; every other mentioned entity ages by one. Without a
/// subject the state is unchanged.
pub fn advance(state: &DiscourseState, subject: Option<&EntityRef>) -> DiscourseState {
    let Some(subject) = subject else {
        return state.clone();
    };
    let mut next = state.clone().with_mention(subject.clone());
    for (entity, age) in next.recency.iter_mut() {
        if entity == subject {
            *age = 0;
        } else {
            *age = age.saturating_add(1);
        }
    }
    if next.current_focus.as_ref() != Some(subject) {
        tracing::debug!(from = ?next.current_focus, to = %subject.0, "focus shift");
        next.current_focus = Some(subject.clone());
    }
    next
}
