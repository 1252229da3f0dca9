/// Entities, places and partial dates that appear inside frames.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable identity used by the discourse tracker.
///
/// Knowledge-base ids (e.g. `Q7186`) win; entities without one are
/// identified by name, which keeps identity value-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef(pub String);

/// Grammatical gender of a referent, when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Neuter,
}

impl Gender {
    /// Feature value used in bundles and form keys: "m", "f", "n".
    pub fn feature_value(&self) -> &'static str {
        match self {
            Self::Male => "m",
            Self::Female => "f",
            Self::Neuter => "n",
        }
    }
}

/// A dynamic value that can be stored in entity features or frame properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used when a value is realized as a literal.
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Float(f) => f.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// Anything a frame can talk about: a person, an organisation, an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
    #[serde(default)]
    pub human: bool,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
}

fn default_entity_type() -> String {
    "person".to_string()
}

impl Entity {
    /// A human entity with a name and optional knowledge-base id.
    pub fn person(name: &str, gender: Option<Gender>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            entity_type: default_entity_type(),
            human: true,
            gender,
            features: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_feature(mut self, key: &str, value: Value) -> Self {
        self.features.insert(key.to_string(), value);
        self
    }

    /// Discourse identity: the id when present, the name otherwise.
    pub fn entity_ref(&self) -> EntityRef {
        match &self.id {
            Some(id) if !id.is_empty() => EntityRef(id.clone()),
            _ => EntityRef(self.name.clone()),
        }
    }

    /// The name to print on first mention. Falls back to the id, so an
    /// unnamed entity is still visible in the output.
    pub fn display_name(&self) -> Option<&str> {
        if !self.name.is_empty() {
            Some(&self.name)
        } else {
            self.id.as_deref().filter(|id| !id.is_empty())
        }
    }

    /// The name used for later, non-focal mentions: an explicit
    /// `short_name` feature, or the last word of the name.
    pub fn short_name(&self) -> Option<String> {
        if let Some(short) = self.features.get("short_name").and_then(Value::as_str) {
            return Some(short.to_string());
        }
        let name = self.display_name()?;
        name.split_whitespace().last().map(str::to_string)
    }

    /// Grammatical number; plural when the `plural` feature is set.
    pub fn number(&self) -> &'static str {
        match self.features.get("plural") {
            Some(Value::Bool(true)) => "pl",
            _ => "sg",
        }
    }
}

/// A place: a city, a country, a building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

impl Location {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            kind: None,
            country_code: None,
        }
    }

    /// Lexicon key for localised names: the id when present, else the name.
    pub fn lexicon_key(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

/// A partial date or interval. Any component may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub start_month: Option<u8>,
    #[serde(default)]
    pub start_day: Option<u8>,
    #[serde(default)]
    pub end_year: Option<i32>,
    #[serde(default)]
    pub end_month: Option<u8>,
    #[serde(default)]
    pub end_day: Option<u8>,
}

/// How much of a date is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePrecision {
    Year,
    Month,
    Day,
}

impl TimeSpan {
    pub fn year(year: i32) -> Self {
        Self {
            start_year: Some(year),
            ..Self::default()
        }
    }

    pub fn date(year: i32, month: u8, day: u8) -> Self {
        Self {
            start_year: Some(year),
            start_month: Some(month),
            start_day: Some(day),
            ..Self::default()
        }
    }

    /// Precision of the start point. Without a year nothing is renderable;
    /// a day without a month degrades to month-less year precision.
    pub fn precision(&self) -> Option<DatePrecision> {
        self.start_year?;
        let month = self.start_month.filter(|m| (1..=12).contains(m));
        match (month, self.start_day.filter(|d| (1..=31).contains(d))) {
            (Some(_), Some(_)) => Some(DatePrecision::Day),
            (Some(_), None) => Some(DatePrecision::Month),
            (None, _) => Some(DatePrecision::Year),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_prefers_id() {
        let e = Entity::person("Marie Curie", Some(Gender::Female)).with_id("Q7186");
        assert_eq!(e.entity_ref(), EntityRef("Q7186".to_string()));

        let anonymous = Entity::person("Pierre Curie", Some(Gender::Male));
        assert_eq!(anonymous.entity_ref(), EntityRef("Pierre Curie".to_string()));
    }

    #[test]
    fn short_name_uses_feature_then_surname() {
        let e = Entity::person("Marie Curie", Some(Gender::Female));
        assert_eq!(e.short_name().as_deref(), Some("Curie"));

        let e = e.with_feature("short_name", Value::String("Marie".to_string()));
        assert_eq!(e.short_name().as_deref(), Some("Marie"));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let mut e = Entity::person("", None).with_id("Q42");
        assert_eq!(e.display_name(), Some("Q42"));
        e.id = None;
        assert_eq!(e.display_name(), None);
    }

    #[test]
    fn time_span_precision() {
        assert_eq!(TimeSpan::year(1867).precision(), Some(DatePrecision::Year));
        assert_eq!(TimeSpan::date(1867, 11, 7).precision(), Some(DatePrecision::Day));
        let month_only = TimeSpan {
            start_year: Some(1867),
            start_month: Some(11),
            ..TimeSpan::default()
        };
        assert_eq!(month_only.precision(), Some(DatePrecision::Month));
        let no_year = TimeSpan {
            start_month: Some(11),
            ..TimeSpan::default()
        };
        assert_eq!(no_year.precision(), None);
    }

    #[test]
    fn value_text() {
        assert_eq!(Value::Int(1867).to_text(), "1867");
        assert_eq!(Value::String("radium".to_string()).as_str(), Some("radium"));
        assert_eq!(Value::Bool(true).as_str(), None);
    }
}
