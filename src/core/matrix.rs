/// Family matrices, language cards and their merged view.
///
/// A family matrix carries the paradigm, agreement, phonology and ordering
/// data shared by a family. A language card shadows matrix entries with the
/// same key and inherits everything else. The merge is pure; the registry
/// computes it once per language.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::schema::lexeme::FeatureBundle;
use crate::schema::profile::FamilyId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid configuration in {source_name}: {message}")]
    Invalid {
        source_name: String,
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(source_name: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

/// A string transformation applied to a base form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAction {
    /// Leave the base untouched.
    Noop,
    /// Strip `strip` from the end (when present) and append `add`.
    Suffix {
        #[serde(default)]
        strip: String,
        add: String,
    },
    /// Strip `strip` from the start (when present) and prepend `add`.
    Prefix {
        #[serde(default)]
        strip: String,
        add: String,
    },
    /// Suppletive replacement of the whole form.
    Replace(String),
    /// Root-and-pattern template: digits `1`..`9` are replaced by the
    /// lexeme's root radicals, everything else is copied.
    Pattern(String),
    /// Apply several actions left to right.
    Chain(Vec<RuleAction>),
}

/// A paradigm cell: the features it realizes and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflectionRule {
    #[serde(default)]
    pub when: FeatureBundle,
    pub action: RuleAction,
}

/// Inflection class for one part of speech (or an explicit paradigm id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paradigm {
    /// Features this paradigm inflects for.
    pub features: Vec<String>,
    /// Features ignored by partial matching.
    #[serde(default)]
    pub optional: Vec<String>,
    #[serde(default)]
    pub rules: Vec<InflectionRule>,
    #[serde(default)]
    pub default: Option<RuleAction>,
}

/// A condition on the boundary between a left and a right string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    LeftEndsWithVowel,
    LeftEndsWithConsonant,
    LeftEndsWithAny(String),
    LeftIn(Vec<String>),
    RightStartsWithVowel,
    RightStartsWithConsonant,
    RightStartsWith(String),
}

/// A change applied at a boundary once its conditions hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryAction {
    /// Insert a buffer segment between left and right.
    Insert(String),
    DropLeftFinal,
    DropRightInitial,
    ReplaceLeft(String),
    ReplaceRightPrefix { from: String, to: String },
}

/// Predicate/action pair evaluated once at a boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryRule {
    pub when: Vec<BoundaryCondition>,
    pub actions: Vec<BoundaryAction>,
    /// Separator override between the two tokens (join rules only).
    #[serde(default)]
    pub glue: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarmonyGroup {
    pub name: String,
    pub vowels: String,
    /// Broader classes this group belongs to, most specific first.
    #[serde(default)]
    pub also: Vec<String>,
}

/// A suffix letter whose surface value depends on the host's harmony group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archiphoneme {
    pub symbol: char,
    #[serde(default)]
    pub variants: BTreeMap<String, String>,
    pub default: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Harmony {
    pub groups: Vec<HarmonyGroup>,
    pub default_group: String,
    #[serde(default)]
    pub archiphonemes: Vec<Archiphoneme>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phonology {
    #[serde(default)]
    pub vowels: String,
    #[serde(default)]
    pub harmony: Option<Harmony>,
    /// Hooks evaluated between a stem (or clitic host) and a suffix.
    #[serde(default)]
    pub suffix_hooks: Vec<BoundaryRule>,
}

/// How realized tokens become a sentence string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRules {
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_final")]
    pub sentence_final: String,
    #[serde(default = "default_true")]
    pub capitalize_first: bool,
    /// Token-boundary rules (elision, a/an alternation), first match wins.
    #[serde(default)]
    pub elision: Vec<BoundaryRule>,
}

fn default_separator() -> String {
    " ".to_string()
}

fn default_final() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for JoinRules {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            sentence_final: default_final(),
            capitalize_first: true,
            elision: Vec::new(),
        }
    }
}

fn default_phrase_order() -> Vec<String> {
    ["case", "det", "amod", "head", "conj"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_date_order() -> Vec<String> {
    ["day", "month", "year"].iter().map(|s| s.to_string()).collect()
}

/// Shared paradigm data for one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMatrix {
    pub family: FamilyId,
    #[serde(default)]
    pub paradigms: BTreeMap<String, Paradigm>,
    /// Target part of speech → features copied from its controller.
    #[serde(default)]
    pub agreement: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub feature_defaults: BTreeMap<String, FeatureBundle>,
    /// Construction id → constituent roles in surface order.
    #[serde(default)]
    pub clause_templates: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub topology_weights: BTreeMap<String, i32>,
    #[serde(default = "default_phrase_order")]
    pub phrase_order: Vec<String>,
    #[serde(default = "default_date_order")]
    pub date_order: Vec<String>,
    #[serde(default)]
    pub phonology: Phonology,
    #[serde(default)]
    pub join: JoinRules,
    /// Family-engine parameters (e.g. the Slavic predicate case).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Per-language overrides layered onto a family matrix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageCard {
    pub code: String,
    #[serde(default)]
    pub paradigms: BTreeMap<String, Paradigm>,
    #[serde(default)]
    pub agreement: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub feature_defaults: BTreeMap<String, FeatureBundle>,
    #[serde(default)]
    pub clause_templates: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub topology_weights: BTreeMap<String, i32>,
    #[serde(default)]
    pub phrase_order: Option<Vec<String>>,
    #[serde(default)]
    pub date_order: Option<Vec<String>>,
    #[serde(default)]
    pub phonology: Option<Phonology>,
    #[serde(default)]
    pub join: Option<JoinRules>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// The read-only view a family engine renders with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedMatrix {
    pub family: FamilyId,
    pub code: String,
    pub paradigms: BTreeMap<String, Paradigm>,
    pub agreement: BTreeMap<String, Vec<String>>,
    pub feature_defaults: BTreeMap<String, FeatureBundle>,
    pub clause_templates: BTreeMap<String, Vec<String>>,
    pub topology_weights: BTreeMap<String, i32>,
    pub phrase_order: Vec<String>,
    pub date_order: Vec<String>,
    pub phonology: Phonology,
    pub join: JoinRules,
    pub params: BTreeMap<String, String>,
}

fn shadow<V: Clone>(base: &BTreeMap<String, V>, over: &BTreeMap<String, V>) -> BTreeMap<String, V> {
    let mut merged = base.clone();
    for (k, v) in over {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

impl FamilyMatrix {
    pub fn load_from_ron(path: &Path) -> Result<FamilyMatrix, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<FamilyMatrix, ConfigError> {
        let matrix: FamilyMatrix = ron::from_str(input)?;
        matrix.validate()?;
        Ok(matrix)
    }

    /// Load-time checks; render code relies on these instead of re-checking.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.family.as_str();
        validate_common(
            name,
            &self.paradigms,
            &self.clause_templates,
            Some(&self.phrase_order),
            Some(&self.phonology),
        )
    }

    /// Merge a language card over this matrix. Card entries shadow matrix
    /// entries with the same key; everything else is inherited.
    pub fn merge(&self, code: &str, card: Option<&LanguageCard>) -> MergedMatrix {
        let empty = LanguageCard::default();
        let card = card.unwrap_or(&empty);
        MergedMatrix {
            family: self.family,
            code: code.to_string(),
            paradigms: shadow(&self.paradigms, &card.paradigms),
            agreement: shadow(&self.agreement, &card.agreement),
            feature_defaults: shadow(&self.feature_defaults, &card.feature_defaults),
            clause_templates: shadow(&self.clause_templates, &card.clause_templates),
            topology_weights: shadow(&self.topology_weights, &card.topology_weights),
            phrase_order: card
                .phrase_order
                .clone()
                .unwrap_or_else(|| self.phrase_order.clone()),
            date_order: card
                .date_order
                .clone()
                .unwrap_or_else(|| self.date_order.clone()),
            phonology: card
                .phonology
                .clone()
                .unwrap_or_else(|| self.phonology.clone()),
            join: card.join.clone().unwrap_or_else(|| self.join.clone()),
            params: shadow(&self.params, &card.params),
        }
    }
}

impl LanguageCard {
    pub fn load_from_ron(path: &Path) -> Result<LanguageCard, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<LanguageCard, ConfigError> {
        let card: LanguageCard = ron::from_str(input)?;
        card.validate()?;
        Ok(card)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_common(
            &self.code,
            &self.paradigms,
            &self.clause_templates,
            self.phrase_order.as_ref(),
            self.phonology.as_ref(),
        )
    }
}

fn validate_common(
    name: &str,
    paradigms: &BTreeMap<String, Paradigm>,
    templates: &BTreeMap<String, Vec<String>>,
    phrase_order: Option<&Vec<String>>,
    phonology: Option<&Phonology>,
) -> Result<(), ConfigError> {
    if let Some(order) = phrase_order {
        if !order.iter().any(|d| d == "head") {
            return Err(ConfigError::invalid(name, "phrase_order must contain \"head\""));
        }
    }

    for (construction, roles) in templates {
        for (i, role) in roles.iter().enumerate() {
            if roles[..i].contains(role) {
                return Err(ConfigError::invalid(
                    name,
                    format!("template '{}' repeats role '{}'", construction, role),
                ));
            }
        }
    }

    for (id, paradigm) in paradigms {
        for rule in &paradigm.rules {
            for (key, _) in rule.when.iter() {
                if !paradigm.features.iter().any(|f| f == key) {
                    return Err(ConfigError::invalid(
                        name,
                        format!("paradigm '{}' rule conditions on undeclared feature '{}'", id, key),
                    ));
                }
            }
            validate_action(name, id, &rule.action)?;
        }
        if let Some(action) = &paradigm.default {
            validate_action(name, id, action)?;
        }
    }

    if let Some(harmony) = phonology.and_then(|p| p.harmony.as_ref()) {
        if harmony.groups.is_empty() {
            return Err(ConfigError::invalid(name, "harmony declares no groups"));
        }
        if !harmony.groups.iter().any(|g| g.name == harmony.default_group) {
            return Err(ConfigError::invalid(
                name,
                format!("harmony default group '{}' is not declared", harmony.default_group),
            ));
        }
    }

    Ok(())
}

fn validate_action(name: &str, paradigm: &str, action: &RuleAction) -> Result<(), ConfigError> {
    match action {
        RuleAction::Pattern(template) if !template.chars().any(|c| c.is_ascii_digit()) => {
            Err(ConfigError::invalid(
                name,
                format!("pattern '{}' in paradigm '{}' has no root slots", template, paradigm),
            ))
        }
        RuleAction::Chain(actions) => actions
            .iter()
            .try_for_each(|a| validate_action(name, paradigm, a)),
        _ => Ok(()),
    }
}

impl MergedMatrix {
    pub fn paradigm(&self, id: &str) -> Option<&Paradigm> {
        self.paradigms.get(id)
    }

    /// Features a part of speech copies from its controller.
    pub fn agreement_features(&self, pos: &str) -> &[String] {
        self.agreement.get(pos).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn defaults_for(&self, pos: &str) -> Option<&FeatureBundle> {
        self.feature_defaults.get(pos)
    }

    pub fn clause_template(&self, construction: &str) -> Option<&[String]> {
        self.clause_templates.get(construction).map(Vec::as_slice)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Phrase order as linearizer weights: positions relative to `head`.
    pub fn phrase_weights(&self) -> BTreeMap<String, i32> {
        let head = self
            .phrase_order
            .iter()
            .position(|d| d == "head")
            .unwrap_or(0) as i32;
        self.phrase_order
            .iter()
            .enumerate()
            .map(|(i, dep)| (dep.clone(), i as i32 - head))
            .collect()
    }
}
