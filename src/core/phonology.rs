/// Boundary phonology: vowel harmony, archiphoneme resolution and the
/// predicate/action hooks evaluated where a suffix meets its stem or a
/// token meets its neighbour. Every hook is evaluated once, in order.

use crate::core::matrix::{BoundaryAction, BoundaryCondition, BoundaryRule, Harmony, HarmonyGroup, Phonology};

const DEFAULT_VOWELS: &str = "aeiouàèéìòóùáíúâêîôûäëïöü";

fn is_vowel(c: char, phonology: &Phonology) -> bool {
    let vowels = if phonology.vowels.is_empty() {
        DEFAULT_VOWELS
    } else {
        phonology.vowels.as_str()
    };
    c.to_lowercase().any(|lc| vowels.contains(lc))
}

/// The harmony group of a word: the group of its last vowel, or the
/// declared default when the word has no vowel (digits, abbreviations).
pub fn harmony_group<'a>(word: &str, harmony: &'a Harmony) -> Option<&'a HarmonyGroup> {
    for c in word.chars().rev().flat_map(char::to_lowercase) {
        if let Some(group) = harmony.groups.iter().find(|g| g.vowels.contains(c)) {
            return Some(group);
        }
    }
    harmony
        .groups
        .iter()
        .find(|g| g.name == harmony.default_group)
}

/// Replace archiphoneme symbols in `suffix` by the variant matching the
/// host's harmony group (falling back through the group's broader classes,
/// then the archiphoneme default).
pub fn resolve_archiphonemes(host: &str, suffix: &str, harmony: &Harmony) -> String {
    if harmony.archiphonemes.is_empty() {
        return suffix.to_string();
    }
    let group = harmony_group(host, harmony);
    let mut out = String::with_capacity(suffix.len());
    for c in suffix.chars() {
        match harmony.archiphonemes.iter().find(|a| a.symbol == c) {
            Some(arch) => {
                let variant = group.and_then(|g| {
                    std::iter::once(&g.name)
                        .chain(g.also.iter())
                        .find_map(|class| arch.variants.get(class))
                });
                out.push_str(variant.unwrap_or(&arch.default));
            }
            None => out.push(c),
        }
    }
    out
}

/// True when every condition of the rule holds at the boundary.
pub fn boundary_holds(rule: &BoundaryRule, left: &str, right: &str, phonology: &Phonology) -> bool {
    rule.when.iter().all(|cond| match cond {
        BoundaryCondition::LeftEndsWithVowel => left.chars().last().is_some_and(|c| is_vowel(c, phonology)),
        BoundaryCondition::LeftEndsWithConsonant => left
            .chars()
            .last()
            .is_some_and(|c| c.is_alphabetic() && !is_vowel(c, phonology)),
        BoundaryCondition::LeftEndsWithAny(chars) => left.chars().last().is_some_and(|c| chars.contains(c)),
        BoundaryCondition::LeftIn(words) => words.iter().any(|w| w.eq_ignore_ascii_case(left)),
        BoundaryCondition::RightStartsWithVowel => right.chars().next().is_some_and(|c| is_vowel(c, phonology)),
        BoundaryCondition::RightStartsWithConsonant => right
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() && !is_vowel(c, phonology)),
        BoundaryCondition::RightStartsWith(prefix) => right.starts_with(prefix.as_str()),
    })
}

/// Apply a rule's actions to the two sides of a boundary.
pub fn apply_actions(rule: &BoundaryRule, left: &mut String, right: &mut String) {
    for action in &rule.actions {
        match action {
            BoundaryAction::Insert(segment) => left.push_str(segment),
            BoundaryAction::DropLeftFinal => {
                left.pop();
            }
            BoundaryAction::DropRightInitial => {
                if let Some(first) = right.chars().next() {
                    right.replace_range(..first.len_utf8(), "");
                }
            }
            BoundaryAction::ReplaceLeft(word) => *left = word.clone(),
            BoundaryAction::ReplaceRightPrefix { from, to } => {
                if let Some(rest) = right.strip_prefix(from.as_str()) {
                    *right = format!("{}{}", to, rest);
                }
            }
        }
    }
}

/// Attach a suffix (or left clitic) to its host: run the suffix hooks,
/// resolve archiphonemes against the host, concatenate.
pub fn attach_suffix(host: &str, suffix: &str, phonology: &Phonology) -> String {
    let mut left = host.to_string();
    let mut right = suffix.to_string();
    for hook in &phonology.suffix_hooks {
        if boundary_holds(hook, &left, &right, phonology) {
            apply_actions(hook, &mut left, &mut right);
        }
    }
    if let Some(harmony) = &phonology.harmony {
        right = resolve_archiphonemes(&left, &right, harmony);
    }
    left.push_str(&right);
    left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matrix::Archiphoneme;
    use std::collections::BTreeMap;

    fn turkish() -> Phonology {
        let group = |name: &str, vowels: &str, also: &[&str]| HarmonyGroup {
            name: name.to_string(),
            vowels: vowels.to_string(),
            also: also.iter().map(|s| s.to_string()).collect(),
        };
        Phonology {
            vowels: "aeıioöuü".to_string(),
            harmony: Some(Harmony {
                groups: vec![
                    group("back_unrounded", "aı", &["back"]),
                    group("back_rounded", "ou", &["back"]),
                    group("front_unrounded", "ei", &["front"]),
                    group("front_rounded", "öü", &["front"]),
                ],
                default_group: "front_unrounded".to_string(),
                archiphonemes: vec![
                    Archiphoneme {
                        symbol: 'A',
                        variants: BTreeMap::from([
                            ("back".to_string(), "a".to_string()),
                            ("front".to_string(), "e".to_string()),
                        ]),
                        default: "e".to_string(),
                    },
                    Archiphoneme {
                        symbol: 'I',
                        variants: BTreeMap::from([
                            ("back_unrounded".to_string(), "ı".to_string()),
                            ("back_rounded".to_string(), "u".to_string()),
                            ("front_unrounded".to_string(), "i".to_string()),
                            ("front_rounded".to_string(), "ü".to_string()),
                        ]),
                        default: "i".to_string(),
                    },
                    Archiphoneme {
                        symbol: 'D',
                        variants: BTreeMap::new(),
                        default: "d".to_string(),
                    },
                ],
            }),
            suffix_hooks: vec![BoundaryRule {
                when: vec![
                    BoundaryCondition::LeftEndsWithAny("çfhkpsşt".to_string()),
                    BoundaryCondition::RightStartsWith("'D".to_string()),
                ],
                actions: vec![BoundaryAction::ReplaceRightPrefix {
                    from: "'D".to_string(),
                    to: "'t".to_string(),
                }],
                glue: None,
            }],
        }
    }

    #[test]
    fn two_way_harmony() {
        let p = turkish();
        assert_eq!(attach_suffix("kitap", "lAr", &p), "kitaplar");
        assert_eq!(attach_suffix("ev", "lAr", &p), "evler");
    }

    #[test]
    fn four_way_harmony() {
        let p = turkish();
        assert_eq!(attach_suffix("fizikçi", "DIr", &p), "fizikçidir");
        assert_eq!(attach_suffix("okul", "DIr", &p), "okuldur");
        assert_eq!(attach_suffix("göz", "DIr", &p), "gözdür");
    }

    #[test]
    fn voiceless_assimilation_hook() {
        let p = turkish();
        assert_eq!(attach_suffix("Paris", "'DA", &p), "Paris'te");
        assert_eq!(attach_suffix("Varşova", "'DA", &p), "Varşova'da");
    }

    #[test]
    fn vowelless_host_uses_default_group() {
        let p = turkish();
        assert_eq!(attach_suffix("1867", "'DA", &p), "1867'de");
    }

    #[test]
    fn elision_boundary() {
        let rule = BoundaryRule {
            when: vec![
                BoundaryCondition::LeftIn(vec!["una".to_string(), "lo".to_string()]),
                BoundaryCondition::RightStartsWithVowel,
            ],
            actions: vec![BoundaryAction::DropLeftFinal, BoundaryAction::Insert("'".to_string())],
            glue: Some(String::new()),
        };
        let p = Phonology::default();
        assert!(boundary_holds(&rule, "una", "americana", &p));
        assert!(!boundary_holds(&rule, "una", "fisica", &p));
        let mut left = "una".to_string();
        let mut right = "americana".to_string();
        apply_actions(&rule, &mut left, &mut right);
        assert_eq!(format!("{}{}", left, right), "un'americana");
    }

    #[test]
    fn drop_right_initial_is_char_aware() {
        let rule = BoundaryRule {
            when: vec![],
            actions: vec![BoundaryAction::DropRightInitial],
            glue: None,
        };
        let mut left = String::new();
        let mut right = "ılar".to_string();
        apply_actions(&rule, &mut left, &mut right);
        assert_eq!(right, "lar");
    }
}
