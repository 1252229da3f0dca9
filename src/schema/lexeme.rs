/// Lexical entries and feature bundles.
///
/// Lexemes are owned by the lexicon collaborator; the realizer only reads
/// them. Form keys are `.`-separated feature values (`f.sg`, `past.3.sg`)
/// and the keys `base` / `stem` match any bundle with zero specificity.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known feature names. Families may use others freely.
pub mod feature {
    pub const GENDER: &str = "gender";
    pub const NUMBER: &str = "number";
    pub const PERSON: &str = "person";
    pub const CASE: &str = "case";
    pub const TENSE: &str = "tense";
    pub const CLASS: &str = "class";
    pub const DEGREE: &str = "degree";
    pub const VERBFORM: &str = "verbform";
}

/// Lexeme features that are lexically fixed and travel into the bundle.
const INHERENT_KEYS: &[&str] = &[feature::CLASS, "animacy", "classifier"];

/// Form keys that match every bundle.
const UNIVERSAL_FORM_KEYS: &[&str] = &["base", "stem"];

/// A set of grammatical features, e.g. `{gender: f, number: sg}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureBundle(BTreeMap<String, String>);

impl FeatureBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` onto `self`; `other` wins on shared keys.
    pub fn overlay(&mut self, other: &FeatureBundle) {
        for (k, v) in &other.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Add entries from `other` only where `self` has no value yet.
    pub fn fill_missing(&mut self, other: &FeatureBundle) {
        for (k, v) in &other.0 {
            self.0.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    /// Restrict the bundle to the given feature names.
    pub fn project(&self, keys: &[String]) -> FeatureBundle {
        FeatureBundle(
            self.0
                .iter()
                .filter(|(k, _)| keys.iter().any(|key| key == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Drop the given feature names.
    pub fn without(&self, keys: &[String]) -> FeatureBundle {
        FeatureBundle(
            self.0
                .iter()
                .filter(|(k, _)| !keys.iter().any(|key| key == *k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    fn has_value(&self, value: &str) -> bool {
        self.0.values().any(|v| v == value)
    }
}

impl<const N: usize> From<[(&str, &str); N]> for FeatureBundle {
    fn from(entries: [(&str, &str); N]) -> Self {
        FeatureBundle(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// True for form keys that match any bundle (`base`, `stem`).
pub fn is_universal_form_key(key: &str) -> bool {
    UNIVERSAL_FORM_KEYS.contains(&key)
}

/// A lexical entry as returned by a lexicon lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexeme {
    pub lemma: String,
    pub pos: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub forms: BTreeMap<String, String>,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl Lexeme {
    pub fn new(lemma: &str, pos: &str) -> Self {
        Self {
            lemma: lemma.to_string(),
            pos: pos.to_string(),
            gender: None,
            forms: BTreeMap::new(),
            features: BTreeMap::new(),
            external_id: None,
        }
    }

    pub fn with_form(mut self, key: &str, form: &str) -> Self {
        self.forms.insert(key.to_string(), form.to_string());
        self
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_feature(mut self, key: &str, value: &str) -> Self {
        self.features.insert(key.to_string(), value.to_string());
        self
    }

    /// Paradigm class: an explicit `paradigm` feature, else the part of speech.
    pub fn paradigm_id(&self) -> &str {
        self.features
            .get("paradigm")
            .map(String::as_str)
            .unwrap_or(&self.pos)
    }

    /// Features the lexeme fixes for itself (gender, noun class, animacy).
    pub fn inherent_features(&self) -> FeatureBundle {
        let mut bundle = FeatureBundle::new();
        if let Some(gender) = &self.gender {
            bundle.insert(feature::GENDER, gender);
        }
        for key in INHERENT_KEYS {
            if let Some(value) = self.features.get(*key) {
                bundle.insert(key, value);
            }
        }
        bundle
    }

    /// True when the lexeme is a left-attaching clitic.
    pub fn is_left_clitic(&self) -> bool {
        self.features.get("clitic").map(String::as_str) == Some("left")
    }

    /// Consonantal root for root-and-pattern morphology, e.g. `k t b`.
    pub fn root(&self) -> Vec<String> {
        self.features
            .get("root")
            .map(|r| {
                r.split(|c: char| c.is_whitespace() || c == '-')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A listed form whose key names exactly the bundle's values.
    pub fn form_exact(&self, bundle: &FeatureBundle) -> Option<&str> {
        if bundle.is_empty() {
            return None;
        }
        self.forms.iter().find_map(|(key, form)| {
            let parts: Vec<&str> = key.split('.').collect();
            let covers_bundle = bundle.iter().all(|(_, v)| parts.contains(&v));
            let within_bundle = parts.iter().all(|p| bundle.has_value(p));
            (parts.len() == bundle.len() && covers_bundle && within_bundle).then_some(form.as_str())
        })
    }

    /// The most specific listed form compatible with the bundle. `base` and
    /// `stem` are always compatible; ties go to the first key in order.
    pub fn best_form(&self, bundle: &FeatureBundle) -> Option<(&str, &str)> {
        let mut best: Option<(usize, &str, &str)> = None;
        for (key, form) in &self.forms {
            let score = if is_universal_form_key(key) {
                0
            } else {
                let parts: Vec<&str> = key.split('.').collect();
                if !parts.iter().all(|p| bundle.has_value(p)) {
                    continue;
                }
                parts.len()
            };
            if best.map_or(true, |(s, _, _)| score > s) {
                best = Some((score, key, form));
            }
        }
        best.map(|(_, key, form)| (key, form))
    }
}
