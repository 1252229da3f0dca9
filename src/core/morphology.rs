/// Family-parameterized inflection.
///
/// Selection order for a lexeme and a target bundle:
/// 1. a listed form naming exactly the projected features (irregulars),
/// 2. a paradigm rule: exact features, then partial match ignoring the
///    paradigm's optional features, then the paradigm default,
///    applied to the best listed form (the lemma when none is listed),
/// 3. the bare lemma, marked degraded.
///
/// Parts of speech without a paradigm are uninflected in that family.

use serde::{Deserialize, Serialize};

use crate::core::matrix::{MergedMatrix, Paradigm, Phonology, RuleAction};
use crate::core::phonology::attach_suffix;
use crate::schema::lexeme::{is_universal_form_key, FeatureBundle, Lexeme};

/// How a token joins its left neighbour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attach {
    #[default]
    Free,
    /// Written onto the preceding token (clitics, punctuation).
    Left,
}

/// A realized surface word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lemma: String,
    pub pos: String,
    /// Constituent role and phrase-internal dependency, set by the family engine.
    pub role: String,
    pub dep: String,
    pub features: FeatureBundle,
    pub degraded: bool,
    pub attach: Attach,
}

impl Token {
    pub fn literal(text: &str, pos: &str) -> Self {
        Self {
            text: text.to_string(),
            lemma: text.to_string(),
            pos: pos.to_string(),
            role: String::new(),
            dep: String::new(),
            features: FeatureBundle::new(),
            degraded: false,
            attach: Attach::Free,
        }
    }
}

/// Which selection step produced a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleMatch {
    Exact,
    Partial,
    Default,
}

fn select_rule<'a>(paradigm: &'a Paradigm, projected: &FeatureBundle) -> Option<(&'a RuleAction, RuleMatch)> {
    if let Some(rule) = paradigm.rules.iter().find(|r| &r.when == projected) {
        return Some((&rule.action, RuleMatch::Exact));
    }
    let reduced = projected.without(&paradigm.optional);
    if let Some(rule) = paradigm
        .rules
        .iter()
        .find(|r| r.when.without(&paradigm.optional) == reduced)
    {
        return Some((&rule.action, RuleMatch::Partial));
    }
    paradigm.default.as_ref().map(|a| (a, RuleMatch::Default))
}

/// Apply a rule action to a base form. `None` when the action cannot apply
/// (a root pattern for a lexeme without a root).
pub fn apply_action(action: &RuleAction, base: &str, lexeme: &Lexeme, phonology: &Phonology) -> Option<String> {
    match action {
        RuleAction::Noop => Some(base.to_string()),
        RuleAction::Suffix { strip, add } => {
            let stem = base.strip_suffix(strip.as_str()).unwrap_or(base);
            Some(attach_suffix(stem, add, phonology))
        }
        RuleAction::Prefix { strip, add } => {
            let stem = base.strip_prefix(strip.as_str()).unwrap_or(base);
            Some(format!("{}{}", add, stem))
        }
        RuleAction::Replace(form) => Some(form.clone()),
        RuleAction::Pattern(template) => {
            let root = lexeme.root();
            if root.is_empty() {
                return None;
            }
            let mut out = String::new();
            for c in template.chars() {
                match c.to_digit(10) {
                    Some(d) if d >= 1 => out.push_str(root.get(d as usize - 1)?),
                    _ => out.push(c),
                }
            }
            Some(out)
        }
        RuleAction::Chain(actions) => actions
            .iter()
            .try_fold(base.to_string(), |acc, a| apply_action(a, &acc, lexeme, phonology)),
    }
}

/// Inflect a lexeme for a feature bundle. Never fails: when nothing
/// applies the bare lemma comes back with `degraded` set.
pub fn inflect(lexeme: &Lexeme, features: &FeatureBundle, matrix: &MergedMatrix) -> Token {
    let mut token = Token {
        text: String::new(),
        lemma: lexeme.lemma.clone(),
        pos: lexeme.pos.clone(),
        role: String::new(),
        dep: String::new(),
        features: features.clone(),
        degraded: false,
        attach: if lexeme.is_left_clitic() {
            Attach::Left
        } else {
            Attach::Free
        },
    };

    let Some(paradigm) = matrix.paradigm(lexeme.paradigm_id()) else {
        token.text = lexeme
            .best_form(features)
            .map(|(_, form)| form.to_string())
            .unwrap_or_else(|| lexeme.lemma.clone());
        return token;
    };

    let projected = features.project(&paradigm.features);
    if let Some(form) = lexeme.form_exact(&projected) {
        token.text = form.to_string();
        return token;
    }

    let best = lexeme.best_form(&projected);
    let stem = best.map(|(_, form)| form).unwrap_or(&lexeme.lemma);
    if let Some((action, matched)) = select_rule(paradigm, &projected) {
        if let Some(text) = apply_action(action, stem, lexeme, &matrix.phonology) {
            tracing::trace!(lemma = %lexeme.lemma, ?matched, %text, "inflected");
            token.text = text;
            return token;
        }
    }

    match best {
        Some((key, form)) if !is_universal_form_key(key) || projected.is_empty() => {
            token.text = form.to_string();
        }
        _ if projected.is_empty() => token.text = lexeme.lemma.clone(),
        _ => {
            tracing::warn!(lemma = %lexeme.lemma, features = ?projected, "no morphology rule; using bare lemma");
            token.text = lexeme.lemma.clone();
            token.degraded = true;
        }
    }
    token
}
