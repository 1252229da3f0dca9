/// Weighted topology linearizer.
///
/// Items are ordered by the integer weight of their dependency label,
/// ascending. Labels missing from the table weigh `0` (the clausal root's
/// position); equal weights keep declaration order. Any basic word order
/// is just a different weight table.

use std::collections::BTreeMap;

use crate::schema::profile::WordOrder;

/// Order labelled items by weight. The sort is stable.
pub fn order<T>(slots: Vec<(String, T)>, weights: &BTreeMap<String, i32>) -> Vec<T> {
    let mut keyed: Vec<(i32, T)> = slots
        .into_iter()
        .map(|(label, item)| (weights.get(&label).copied().unwrap_or(0), item))
        .collect();
    keyed.sort_by_key(|(weight, _)| *weight);
    keyed.into_iter().map(|(_, item)| item).collect()
}

/// Default clause weights for a basic word order.
///
/// Subject, object and verb are spread ten apart around the root at `0`;
/// adjuncts go before the verb in verb-final orders and after everything
/// else otherwise. Topics and expletives open the clause.
pub fn preset_weights(word_order: WordOrder) -> BTreeMap<String, i32> {
    let (s, o, v) = word_order.positions();
    let subject = (s - v) * 10;
    let object = (o - v) * 10;
    let verb_final = word_order.verb_final();
    let last = subject.max(object).max(0);

    let mut weights = BTreeMap::new();
    weights.insert("nsubj".to_string(), subject);
    weights.insert("root".to_string(), 0);
    for dep in ["obj", "attr", "theme"] {
        weights.insert(dep.to_string(), object);
    }
    let (obl, tmod) = if verb_final { (-5, -7) } else { (last + 10, last + 15) };
    weights.insert("obl".to_string(), obl);
    weights.insert("obl:tmod".to_string(), tmod);
    weights.insert("expl".to_string(), -25);
    weights.insert("topic".to_string(), -30);
    weights.insert("mark".to_string(), if verb_final { 5 } else { -5 });
    weights.insert("relhead".to_string(), if verb_final { 40 } else { -40 });
    weights
}

/// Presets overlaid with configured weights; configured entries win.
pub fn merged_weights(word_order: WordOrder, overrides: &BTreeMap<String, i32>) -> BTreeMap<String, i32> {
    let mut weights = preset_weights(word_order);
    for (label, weight) in overrides {
        weights.insert(label.clone(), *weight);
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn labels(items: &[&str]) -> Vec<(String, String)> {
        items.iter().map(|l| (l.to_string(), l.to_string())).collect()
    }

    #[test]
    fn sov_scenario() {
        let weights = BTreeMap::from([
            ("nsubj".to_string(), -10),
            ("obj".to_string(), -5),
            ("root".to_string(), 0),
        ]);
        let slots = vec![
            ("nsubj".to_string(), "subject"),
            ("root".to_string(), "verb"),
            ("obj".to_string(), "predicate"),
        ];
        assert_eq!(order(slots, &weights), vec!["subject", "predicate", "verb"]);
    }

    #[test]
    fn presets_produce_every_basic_order() {
        let expected = [
            (WordOrder::Svo, ["nsubj", "root", "obj"]),
            (WordOrder::Sov, ["nsubj", "obj", "root"]),
            (WordOrder::Vso, ["root", "nsubj", "obj"]),
            (WordOrder::Vos, ["root", "obj", "nsubj"]),
            (WordOrder::Ovs, ["obj", "root", "nsubj"]),
            (WordOrder::Osv, ["obj", "nsubj", "root"]),
        ];
        for (word_order, want) in expected {
            let got = order(labels(&["nsubj", "root", "obj"]), &preset_weights(word_order));
            assert_eq!(got, want, "{:?}", word_order);
        }
    }

    #[test]
    fn unknown_labels_sit_at_the_root_in_declaration_order() {
        let weights = BTreeMap::from([("nsubj".to_string(), -10), ("obj".to_string(), 10)]);
        let got = order(labels(&["obj", "x", "root", "y", "nsubj"]), &weights);
        assert_eq!(got, vec!["nsubj", "x", "root", "y", "obj"]);
    }

    #[test]
    fn adjuncts_follow_verb_final_setting() {
        let sov = order(labels(&["nsubj", "root", "obl", "obl:tmod"]), &preset_weights(WordOrder::Sov));
        assert_eq!(sov, vec!["nsubj", "obl:tmod", "obl", "root"]);
        let svo = order(labels(&["obl:tmod", "obl", "root", "nsubj"]), &preset_weights(WordOrder::Svo));
        assert_eq!(svo, vec!["nsubj", "root", "obl", "obl:tmod"]);
    }

    #[test]
    fn overrides_win_over_presets() {
        let overrides = BTreeMap::from([("nsubj".to_string(), 50)]);
        let w = merged_weights(WordOrder::Svo, &overrides);
        assert_eq!(w["nsubj"], 50);
        assert_eq!(w["root"], 0);
    }

    #[test]
    fn randomized_weights_sort_stably() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let roles = ["nsubj", "root", "obj", "obl", "obl:tmod", "expl", "topic", "mark"];
        for word_order in WordOrder::ALL {
            for _ in 0..200 {
                let mut weights = preset_weights(word_order);
                for role in roles {
                    if rng.gen_bool(0.5) {
                        weights.insert(role.to_string(), rng.gen_range(-3..=3));
                    }
                }
                let n = rng.gen_range(1..=roles.len());
                let slots: Vec<(String, (usize, &str))> = (0..n)
                    .map(|i| {
                        let role = roles[rng.gen_range(0..roles.len())];
                        (role.to_string(), (i, role))
                    })
                    .collect();
                let ordered = order(slots, &weights);
                assert_eq!(ordered.len(), n);
                for pair in ordered.windows(2) {
                    let (ia, ra) = pair[0];
                    let (ib, rb) = pair[1];
                    let (wa, wb) = (weights[ra], weights[rb]);
                    assert!(wa <= wb, "{:?}: {} ({}) before {} ({})", word_order, ra, wa, rb, wb);
                    if wa == wb {
                        assert!(ia < ib, "tie broken out of declaration order");
                    }
                }
            }
        }
    }
}
