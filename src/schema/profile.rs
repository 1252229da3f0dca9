use serde::{Deserialize, Serialize};

/// Typological families with shared paradigm data.
///
/// A family listed here does not imply a registered engine: languages of
/// an engine-less family fail with `UnsupportedFamily`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FamilyId {
    Romance,
    Germanic,
    Slavic,
    Agglutinative,
    Bantu,
    Isolating,
    Semitic,
    Dravidian,
    Celtic,
}

impl FamilyId {
    /// File stem of the family matrix, e.g. `romance`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Romance => "romance",
            Self::Germanic => "germanic",
            Self::Slavic => "slavic",
            Self::Agglutinative => "agglutinative",
            Self::Bantu => "bantu",
            Self::Isolating => "isolating",
            Self::Semitic => "semitic",
            Self::Dravidian => "dravidian",
            Self::Celtic => "celtic",
        }
    }
}

impl std::fmt::Display for FamilyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Basic constituent order of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordOrder {
    Svo,
    Sov,
    Vso,
    Vos,
    Ovs,
    Osv,
}

impl WordOrder {
    pub const ALL: [WordOrder; 6] = [
        Self::Svo,
        Self::Sov,
        Self::Vso,
        Self::Vos,
        Self::Ovs,
        Self::Osv,
    ];

    /// Positions of subject, object and verb, in that order.
    pub fn positions(&self) -> (i32, i32, i32) {
        match self {
            Self::Svo => (0, 2, 1),
            Self::Sov => (0, 1, 2),
            Self::Vso => (1, 2, 0),
            Self::Vos => (2, 1, 0),
            Self::Ovs => (2, 0, 1),
            Self::Osv => (1, 0, 2),
        }
    }

    pub fn verb_final(&self) -> bool {
        self.positions().2 == 2
    }
}

/// How clause constituents are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Linearization {
    /// Family clause templates, with weighted topology as a fallback.
    #[default]
    Template,
    /// Weighted topology only (under-resourced languages with no templates).
    Topology,
}

/// Per-language switches consumed by discourse and construction selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageFlags {
    #[serde(default)]
    pub pro_drop: bool,
    #[serde(default)]
    pub has_gender: bool,
    #[serde(default)]
    pub topic_comment_preference: bool,
}

/// Engine id for languages realized by this crate.
pub const CORE_ENGINE: &str = "core";

/// Everything the router needs to know about one language. Loaded once and
/// cached; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    pub code: String,
    pub family: FamilyId,
    #[serde(default = "default_engine")]
    pub engine_id: String,
    /// Family matrix file, relative to the data root; defaults to
    /// `families/<family>.ron`.
    #[serde(default)]
    pub morphology_config_path: Option<String>,
    /// Lexicon to resolve lemmas against; defaults to the language code.
    #[serde(default)]
    pub lexicon_ref: Option<String>,
    pub word_order: WordOrder,
    #[serde(default)]
    pub linearization: Linearization,
    #[serde(default)]
    pub flags: LanguageFlags,
}

fn default_engine() -> String {
    CORE_ENGINE.to_string()
}

impl LanguageProfile {
    pub fn new(code: &str, family: FamilyId, word_order: WordOrder) -> Self {
        Self {
            code: code.to_string(),
            family,
            engine_id: default_engine(),
            morphology_config_path: None,
            lexicon_ref: None,
            word_order,
            linearization: Linearization::Template,
            flags: LanguageFlags::default(),
        }
    }

    pub fn lexicon_ref(&self) -> &str {
        self.lexicon_ref.as_deref().unwrap_or(&self.code)
    }

    /// True when rendering is delegated to an external (Tier-1) renderer.
    pub fn is_external(&self) -> bool {
        self.engine_id != CORE_ENGINE
    }
}
