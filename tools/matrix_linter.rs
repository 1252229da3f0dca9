/// Matrix Linter — validates language data coverage and consistency.
///
/// Usage: matrix_linter <data_dir> [--lang <code>]
///
/// Checks every profile (or one, with --lang): the family matrix and card
/// load and validate, template-linearized languages have a template for
/// every construction, and the lexicon carries the function words the
/// constructions ask for.

use realization_engine::core::construction::ConstructionId;
use realization_engine::core::family::engine_for;
use realization_engine::core::lexicon::{InMemoryLexicon, Lexicon, RonLexiconProvider};
use realization_engine::core::matrix::{FamilyMatrix, LanguageCard};
use realization_engine::core::registry::RonConfigStore;
use realization_engine::schema::profile::{LanguageProfile, Linearization};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::process;

/// Function words by (lemma key, part of speech), with whether their
/// absence is an error. Missing optional words are simply not rendered.
const FUNCTION_WORDS: [(&str, &str, bool); 5] = [
    ("be", "verb", true),
    ("indef_article", "det", false),
    ("loc_prep", "adp", false),
    ("in_year", "adp", false),
    ("and", "cconj", false),
];

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: matrix_linter <data_dir> [--lang <code>]");
        process::exit(0);
    }

    let data_dir = Path::new(&args[1]);
    let mut only_lang = None;

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--lang" && i + 1 < args.len() {
            i += 1;
            only_lang = Some(args[i].clone());
        }
        i += 1;
    }

    let store = RonConfigStore::new(data_dir);
    let profiles = match store.load_profiles() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: Failed to load profiles: {}", e);
            process::exit(1);
        }
    };
    println!("Loaded {} profiles", profiles.len());

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut families: FxHashMap<String, Option<FamilyMatrix>> = FxHashMap::default();
    let lexicons = RonLexiconProvider::new(data_dir);

    for profile in &profiles {
        if only_lang.as_deref().is_some_and(|l| l != profile.code) {
            continue;
        }
        lint_profile(
            profile,
            data_dir,
            &mut families,
            &lexicons,
            &mut errors,
            &mut warnings,
        );
    }

    println!("\n=== Matrix Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn lint_profile(
    profile: &LanguageProfile,
    data_dir: &Path,
    families: &mut FxHashMap<String, Option<FamilyMatrix>>,
    lexicons: &RonLexiconProvider,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let code = &profile.code;
    if profile.is_external() {
        println!("  {}: external engine '{}', skipped", code, profile.engine_id);
        return;
    }
    if engine_for(profile.family).is_none() {
        warnings.push(format!("{}: family {} has no engine; renders will fail", code, profile.family));
        return;
    }

    let matrix_path = profile
        .morphology_config_path
        .clone()
        .unwrap_or_else(|| format!("families/{}.ron", profile.family.as_str()));
    let family = families.entry(matrix_path).or_insert_with_key(|matrix_path| {
        let path = data_dir.join(matrix_path);
        match FamilyMatrix::load_from_ron(&path) {
            Ok(m) => {
                println!("  Loaded: {}", path.display());
                Some(m)
            }
            Err(e) => {
                errors.push(format!("{}: {}", path.display(), e));
                None
            }
        }
    });
    let Some(family) = family.as_ref() else {
        errors.push(format!("{}: family matrix {} unavailable", code, profile.family));
        return;
    };
    if family.family != profile.family {
        errors.push(format!(
            "{}: matrix declares family {} but the profile is {}",
            code, family.family, profile.family
        ));
        return;
    }

    let card_path = data_dir.join("cards").join(format!("{}.ron", code));
    let card = if card_path.exists() {
        match LanguageCard::load_from_ron(&card_path) {
            Ok(card) if card.code != *code => {
                errors.push(format!("{}: card declares code '{}'", card_path.display(), card.code));
                return;
            }
            Ok(card) => Some(card),
            Err(e) => {
                errors.push(format!("{}: {}", card_path.display(), e));
                return;
            }
        }
    } else {
        None
    };
    let merged = family.merge(code, card.as_ref());

    if profile.linearization == Linearization::Template {
        let missing: Vec<&str> = ConstructionId::ALL
            .iter()
            .map(ConstructionId::as_str)
            .filter(|c| merged.clause_template(c).is_none())
            .collect();
        if !missing.is_empty() {
            warnings.push(format!(
                "{}: no clause template for {} (falls back to word order)",
                code,
                missing.join(", ")
            ));
        }
    }

    let lexicon_ref = profile.lexicon_ref();
    let path = lexicons.path_for(lexicon_ref);
    if !path.exists() {
        warnings.push(format!("{}: no lexicon '{}'; renders will be degraded", code, lexicon_ref));
        return;
    }
    match InMemoryLexicon::load_from_ron(&path) {
        Ok(lexicon) => {
            println!("  {}: {} lexicon entries", code, lexicon.len());
            lint_lexicon(profile, &lexicon, errors, warnings);
        }
        Err(e) => errors.push(format!("{}: {}", path.display(), e)),
    }
}

fn lint_lexicon(
    profile: &LanguageProfile,
    lexicon: &InMemoryLexicon,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) {
    let code = &profile.code;
    for (key, pos, required) in FUNCTION_WORDS {
        if lexicon.lookup(key, pos).is_none() {
            let message = format!("{}: missing function word '{}' ({})", code, key, pos);
            if required {
                errors.push(message);
            } else {
                warnings.push(message);
            }
        }
    }

    // Pro-drop languages drop a focused subject instead of pronominalizing.
    match lexicon.lookup("pronoun", "pron") {
        None if !profile.flags.pro_drop => {
            errors.push(format!("{}: missing pronoun entry and the language is not pro-drop", code));
        }
        Some(pronoun) if profile.flags.has_gender => {
            let has = |gender: &str| pronoun.forms.keys().any(|k| k.split('.').any(|c| c == gender));
            if !(has("m") && has("f")) {
                warnings.push(format!("{}: gendered language but the pronoun lacks m/f forms", code));
            }
        }
        _ => {}
    }
}
