/// Frame → clause plan.
///
/// A frame becomes one or more [`ClauseInput`]s. Biographies plan a main
/// copular sentence plus optional birth and death sentences; event frames
/// plan a single clause. Referring expressions are left unset: the router
/// decides them clause by clause as the discourse state evolves.

use crate::core::construction::{select, ClauseInput, ConstructionId, RoleValue};
use crate::core::family::Diagnostic;
use crate::core::router::{RenderError, RenderOptions};
use crate::schema::entity::Value;
use crate::schema::frame::{BioFrame, EventFrame, Frame, LifeEvent};
use crate::schema::lexeme::feature;
use crate::schema::profile::LanguageProfile;

/// One lemma, or a coordination when there are several.
fn lemmas(items: &[String], pos: &str) -> Option<RoleValue> {
    match items {
        [] => None,
        [single] => Some(RoleValue::lemma(single, pos)),
        many => Some(RoleValue::Coordination(
            many.iter().map(|l| RoleValue::lemma(l, pos)).collect(),
        )),
    }
}

fn select_or_fail(frame: &Frame, profile: &LanguageProfile) -> Result<ConstructionId, RenderError> {
    select(frame, profile).ok_or_else(|| RenderError::ConstructionSelectionFailed {
        kind: frame.kind(),
        event_type: frame.event_type().map(str::to_string),
    })
}

/// The clauses planned for one frame, plus anything the plan had to leave
/// out.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub clauses: Vec<ClauseInput>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Plan the clauses for a frame, truncated to `options.max_sentences`
/// (at least one sentence is always kept).
pub fn plan(frame: &Frame, profile: &LanguageProfile, options: &RenderOptions) -> Result<Plan, RenderError> {
    let construction = select_or_fail(frame, profile)?;
    let mut planned = match frame {
        Frame::Bio(bio) => Plan {
            clauses: plan_bio(bio, construction),
            diagnostics: Vec::new(),
        },
        Frame::Event(event) => {
            let mut diagnostics = Vec::new();
            let clause = plan_event(event, construction, &mut diagnostics);
            Plan {
                clauses: vec![clause],
                diagnostics,
            }
        }
    };
    if let Some(max) = options.max_sentences {
        planned.clauses.truncate(max.max(1));
    }
    tracing::debug!(construction = %construction, clauses = planned.clauses.len(), "planned frame");
    Ok(planned)
}

fn plan_bio(bio: &BioFrame, construction: ConstructionId) -> Vec<ClauseInput> {
    let subject = RoleValue::Entity(bio.main_entity.clone());
    let tense = if bio.death_event.is_some() { "past" } else { "pres" };
    let professions = lemmas(&bio.profession_lemmas, "noun");
    let nationalities = lemmas(&bio.nationality_lemmas, "adj");

    let mut main = ClauseInput::new(construction).with_feature(feature::TENSE, tense);
    match construction {
        ConstructionId::TopicCommentCopula => {
            main = main.with_role("topic", subject.clone());
            if let Some(p) = professions {
                main = main.with_role("comment", p);
            }
            if let Some(n) = nationalities {
                main = main.with_role("modifier", n);
            }
        }
        ConstructionId::AttributiveCopula => {
            main = main.with_role("subject", subject.clone());
            if let Some(n) = nationalities {
                main = main.with_role("attribute", n);
            }
        }
        _ => {
            main = main.with_role("subject", subject.clone());
            if let Some(p) = professions {
                main = main.with_role("predicate", p);
            }
            if let Some(n) = nationalities {
                main = main.with_role("modifier", n);
            }
        }
    }

    let mut clauses = vec![main];
    for (event, verb) in [(&bio.birth_event, "be_born"), (&bio.death_event, "die")] {
        if let Some(event) = event.as_ref().filter(|e| !e.is_empty()) {
            clauses.push(life_event(subject.clone(), event, verb));
        }
    }
    clauses
}

fn life_event(subject: RoleValue, event: &LifeEvent, verb: &str) -> ClauseInput {
    let mut clause = ClauseInput::new(ConstructionId::IntransitiveEvent)
        .with_role("subject", subject)
        .with_role("verb", RoleValue::lemma(verb, "verb"))
        .with_feature(feature::TENSE, "past");
    if let Some(place) = &event.place {
        clause = clause.with_role("location", RoleValue::Place(place.clone()));
    }
    if let Some(time) = &event.time {
        clause = clause.with_role("time", RoleValue::Time(time.clone()));
    }
    clause
}

/// Part of speech for a role filled from a frame property.
fn property_pos(role: &str) -> &'static str {
    match role {
        "verb" => "verb",
        "attribute" | "modifier" => "adj",
        _ => "noun",
    }
}

fn dropped(construction: ConstructionId, role: &str, diagnostics: &mut Vec<Diagnostic>) {
    tracing::warn!(construction = %construction, role, "construction has no slot for role; dropped");
    diagnostics.push(Diagnostic::DroppedRole {
        construction: construction.as_str().to_string(),
        role: role.to_string(),
    });
}

fn plan_event(event: &EventFrame, construction: ConstructionId, diagnostics: &mut Vec<Diagnostic>) -> ClauseInput {
    let spec = construction.spec();
    let mut clause = ClauseInput::new(construction);
    for (role, entity) in &event.participants {
        if !spec.accepts(role) {
            dropped(construction, role, diagnostics);
            continue;
        }
        clause = clause.with_role(role, RoleValue::Entity(entity.clone()));
    }
    if let Some(place) = &event.location {
        clause = clause.with_role("location", RoleValue::Place(place.clone()));
    }
    if let Some(time) = &event.time {
        clause = clause.with_role("time", RoleValue::Time(time.clone()));
    }

    let default_tense = match event.event_type.as_str() {
        "birth" | "death" => "past",
        _ => "pres",
    };
    let tense = event
        .properties
        .get(feature::TENSE)
        .and_then(Value::as_str)
        .unwrap_or(default_tense);
    clause = clause.with_feature(feature::TENSE, tense);

    for (key, value) in &event.properties {
        if key == feature::TENSE || clause.roles.contains_key(key) {
            continue;
        }
        if !spec.accepts(key) {
            dropped(construction, key, diagnostics);
            continue;
        }
        let filler = match value {
            Value::String(lemma) => RoleValue::lemma(lemma, property_pos(key)),
            other => RoleValue::Literal(other.to_text()),
        };
        clause = clause.with_role(key, filler);
    }

    if spec.accepts("verb") && !clause.roles.contains_key("verb") {
        let verb = match event.event_type.as_str() {
            "birth" => "be_born",
            "death" => "die",
            other => other,
        };
        clause = clause.with_role("verb", RoleValue::lemma(verb, "verb"));
    }
    clause
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::entity::{Entity, Gender, Location, TimeSpan};
    use crate::schema::profile::{FamilyId, WordOrder};
    use std::collections::BTreeMap;

    fn curie_bio() -> BioFrame {
        BioFrame {
            main_entity: Entity::person("Marie Curie", Some(Gender::Female)).with_id("Q7186"),
            profession_lemmas: vec!["physicist".to_string(), "chemist".to_string()],
            nationality_lemmas: vec!["polish".to_string()],
            birth_event: Some(LifeEvent {
                time: Some(TimeSpan::year(1867)),
                place: Some(Location::named("Warsaw")),
            }),
            death_event: Some(LifeEvent {
                time: Some(TimeSpan::year(1934)),
                place: None,
            }),
        }
    }

    fn english() -> LanguageProfile {
        LanguageProfile::new("en", FamilyId::Germanic, WordOrder::Svo)
    }

    #[test]
    fn bio_plans_three_sentences() {
        let clauses = plan(&Frame::Bio(curie_bio()), &english(), &RenderOptions::default())
            .unwrap()
            .clauses;
        let ids: Vec<ConstructionId> = clauses.iter().map(|c| c.construction_id).collect();
        assert_eq!(
            ids,
            vec![
                ConstructionId::EquativeCopula,
                ConstructionId::IntransitiveEvent,
                ConstructionId::IntransitiveEvent
            ]
        );
        assert_eq!(clauses[0].features.get("tense"), Some("past"));
        assert!(matches!(clauses[0].roles["predicate"], RoleValue::Coordination(ref items) if items.len() == 2));
        assert!(matches!(&clauses[2].roles["verb"], RoleValue::Lemma { lemma, .. } if lemma == "die"));
        assert!(!clauses[2].roles.contains_key("location"));
    }

    #[test]
    fn max_sentences_truncates() {
        let options = RenderOptions {
            max_sentences: Some(1),
            ..RenderOptions::default()
        };
        assert_eq!(plan(&Frame::Bio(curie_bio()), &english(), &options).unwrap().clauses.len(), 1);
    }

    #[test]
    fn empty_bio_fails_selection() {
        let mut bio = curie_bio();
        bio.profession_lemmas.clear();
        bio.nationality_lemmas.clear();
        assert!(matches!(
            plan(&Frame::Bio(bio), &english(), &RenderOptions::default()),
            Err(RenderError::ConstructionSelectionFailed { .. })
        ));
    }

    fn discovery(properties: &[(&str, &str)]) -> EventFrame {
        EventFrame {
            event_type: "discover".to_string(),
            participants: BTreeMap::from([(
                "subject".to_string(),
                Entity::person("Marie Curie", Some(Gender::Female)),
            )]),
            time: Some(TimeSpan::year(1898)),
            location: None,
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        }
    }

    #[test]
    fn event_properties_fill_roles() {
        let event = discovery(&[("object", "polonium"), ("tense", "past")]);
        let planned = plan(&Frame::Event(event), &english(), &RenderOptions::default()).unwrap();
        let clause = &planned.clauses[0];
        assert_eq!(clause.construction_id, ConstructionId::TransitiveEvent);
        assert_eq!(clause.features.get("tense"), Some("past"));
        assert!(matches!(&clause.roles["object"], RoleValue::Lemma { lemma, pos, .. } if lemma == "polonium" && pos == "noun"));
        assert!(matches!(&clause.roles["verb"], RoleValue::Lemma { lemma, .. } if lemma == "discover"));
        assert!(planned.diagnostics.is_empty());
    }

    #[test]
    fn unused_property_is_reported() {
        let event = discovery(&[("instrument", "electrometer")]);
        let planned = plan(&Frame::Event(event), &english(), &RenderOptions::default()).unwrap();
        assert_eq!(planned.clauses[0].construction_id, ConstructionId::IntransitiveEvent);
        assert!(!planned.clauses[0].roles.contains_key("instrument"));
        assert_eq!(
            planned.diagnostics,
            vec![Diagnostic::DroppedRole {
                construction: "intransitive_event".to_string(),
                role: "instrument".to_string(),
            }]
        );
    }
}
