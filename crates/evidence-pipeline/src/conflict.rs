/// Keyword-based conflict detection between clinical guidelines.
///
/// Pairwise O(n²) scan over whitelisted organizations' records with
/// overlapping topics. A polarity flip on the same action is a major
/// conflict; numeric-threshold divergence on an otherwise aligned
/// recommendation is minor. First match per pair wins — no attempt to find
/// the "best" explanation. The phrase lexicon and unit list are static
/// configuration so they can be tested and extended independently of the
/// scanning logic.
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Conflict, ConflictSource, GuidelineRecord, Severity};

/// Organizations whose guidance is conflict-checked (case-insensitive).
/// Records from other organizations pass through unscanned.
pub const ORGANIZATION_WHITELIST: &[&str] = &["WHO", "CDC", "NICE", "BMJ", "ACC/AHA", "ESC", "AAP"];

/// Phrases affirming an action and the phrases that negate it in a position
/// statement. Variants are spelled out because matching happens on word
/// boundaries ("recommendation" must not affirm "recommend"). The negations
/// must be checked first: "do not recommend" still contains the word
/// "recommend".
struct PolarityRule {
    affirmations: &'static [&'static str],
    negations: &'static [&'static str],
}

const POLARITY_RULES: &[PolarityRule] = &[
    PolarityRule {
        affirmations: &["recommend", "recommends", "recommended"],
        negations: &[
            "do not recommend",
            "does not recommend",
            "not recommended",
            "recommend against",
            "recommends against",
        ],
    },
    PolarityRule {
        affirmations: &["should"],
        negations: &["should not", "should never"],
    },
    PolarityRule {
        affirmations: &["advise", "advises", "advised"],
        negations: &["advise against", "advises against", "do not advise"],
    },
    PolarityRule {
        affirmations: &["suggest", "suggests", "suggested"],
        negations: &["do not suggest", "suggest against", "suggests against"],
    },
];

struct CompiledRule {
    affirm: Regex,
    negate: Regex,
}

static COMPILED_RULES: LazyLock<Vec<CompiledRule>> = LazyLock::new(|| {
    POLARITY_RULES
        .iter()
        .map(|rule| CompiledRule {
            affirm: phrase_set(rule.affirmations),
            negate: phrase_set(rule.negations),
        })
        .collect()
});

/// Compile a phrase list into one word-bounded alternation, so "shoulder"
/// never matches "should".
fn phrase_set(phrases: &[&str]) -> Regex {
    let alternation = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"\b(?:{alternation})\b")).expect("valid regex")
}

static THRESHOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*(mg|mcg|g|mmhg|%|years?|months?|weeks?)\b").expect("valid regex")
});

/// Scan every unordered pair of guidelines for disagreements. Infallible:
/// the caller always receives a (possibly empty) list, never an error.
pub fn detect(guidelines: &[GuidelineRecord]) -> Vec<Conflict> {
    let scanned: Vec<&GuidelineRecord> = guidelines
        .iter()
        .filter(|g| is_whitelisted(&g.organization))
        .collect();

    let mut conflicts = Vec::new();
    for i in 0..scanned.len() {
        for j in i + 1..scanned.len() {
            if let Some(conflict) = evaluate_pair(scanned[i], scanned[j]) {
                conflicts.push(conflict);
            }
        }
    }
    conflicts
}

fn is_whitelisted(organization: &str) -> bool {
    ORGANIZATION_WHITELIST
        .iter()
        .any(|o| o.eq_ignore_ascii_case(organization.trim()))
}

/// Evaluate one pair. Topic and severity are symmetric under argument
/// reversal; only source order may differ.
fn evaluate_pair(a: &GuidelineRecord, b: &GuidelineRecord) -> Option<Conflict> {
    let topic = overlapping_topic(&a.topic, &b.topic)?;
    let position_a = a.position.to_lowercase();
    let position_b = b.position.to_lowercase();

    for rule in COMPILED_RULES.iter() {
        let (Some(pa), Some(pb)) = (polarity(&position_a, rule), polarity(&position_b, rule))
        else {
            continue;
        };
        if pa != pb {
            return Some(Conflict {
                description: format!(
                    "{} and {} take directly opposing positions on {topic}",
                    a.organization, b.organization
                ),
                topic,
                sources: vec![conflict_source(a), conflict_source(b)],
                severity: Severity::Major,
            });
        }
        // Aligned on this action; a later rule may still expose an
        // opposing pair, so keep scanning the lexicon.
    }

    let thresholds_a = thresholds(&position_a);
    let thresholds_b = thresholds(&position_b);
    for (unit, value_a) in &thresholds_a {
        let Some(value_b) = thresholds_b.get(unit) else {
            continue;
        };
        if (value_a - value_b).abs() > f64::EPSILON {
            return Some(Conflict {
                description: format!(
                    "{} and {} diverge on a {unit} threshold for {topic} ({value_a} vs {value_b})",
                    a.organization, b.organization
                ),
                topic,
                sources: vec![conflict_source(a), conflict_source(b)],
                severity: Severity::Minor,
            });
        }
    }

    None
}

fn conflict_source(record: &GuidelineRecord) -> ConflictSource {
    ConflictSource {
        organization: record.organization.clone(),
        position: record.position.clone(),
    }
}

/// Normalized topic two guidelines share, if any. Overlap is equality or
/// containment in either direction; the contained (shorter) topic names the
/// conflict so argument order cannot change it.
fn overlapping_topic(a: &str, b: &str) -> Option<String> {
    let na = a.trim().to_lowercase();
    let nb = b.trim().to_lowercase();
    if na.is_empty() || nb.is_empty() {
        return None;
    }
    if na == nb || na.contains(&nb) {
        Some(nb)
    } else if nb.contains(&na) {
        Some(na)
    } else {
        None
    }
}

/// `Some(true)` if the position affirms the action, `Some(false)` if it
/// negates it, `None` if the action isn't mentioned as a whole word.
fn polarity(position: &str, rule: &CompiledRule) -> Option<bool> {
    if rule.negate.is_match(position) {
        return Some(false);
    }
    if rule.affirm.is_match(position) {
        return Some(true);
    }
    None
}

/// Extract `unit -> value` for the first numeric threshold per unit.
/// BTreeMap keeps the scan order deterministic.
fn thresholds(position: &str) -> BTreeMap<String, f64> {
    let mut out = BTreeMap::new();
    for caps in THRESHOLD_RE.captures_iter(position) {
        let Ok(value) = caps[1].parse::<f64>() else {
            continue;
        };
        let unit = caps[2].trim_end_matches('s').to_string();
        out.entry(unit).or_insert(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(org: &str, topic: &str, position: &str) -> GuidelineRecord {
        GuidelineRecord {
            organization: org.to_string(),
            topic: topic.to_string(),
            position: position.to_string(),
            url: None,
            year: None,
        }
    }

    #[test]
    fn opposing_recommendations_are_a_major_conflict() {
        let a = record("WHO", "drug X", "recommend drug X");
        let b = record("CDC", "drug X", "do not recommend drug X");
        let conflicts = detect(&[a, b]);
        assert_eq!(conflicts.len(), 1);

        let c = &conflicts[0];
        assert_eq!(c.severity, Severity::Major);
        assert_eq!(c.topic, "drug x");
        assert_eq!(c.sources.len(), 2);
        let orgs: Vec<&str> = c.sources.iter().map(|s| s.organization.as_str()).collect();
        assert!(orgs.contains(&"WHO") && orgs.contains(&"CDC"));
        let who = c.sources.iter().find(|s| s.organization == "WHO").unwrap();
        assert_eq!(who.position, "recommend drug X");
        let cdc = c.sources.iter().find(|s| s.organization == "CDC").unwrap();
        assert_eq!(cdc.position, "do not recommend drug X");
    }

    #[test]
    fn conflict_is_symmetric_in_topic_and_severity() {
        let a = record("WHO", "statin therapy", "statins should be offered to all adults over 40");
        let b = record("NICE", "statin therapy in adults", "statins should not be offered routinely");
        let forward = detect(&[a.clone(), b.clone()]);
        let reverse = detect(&[b, a]);
        assert_eq!(forward.len(), 1);
        assert_eq!(reverse.len(), 1);
        assert_eq!(forward[0].topic, reverse[0].topic);
        assert_eq!(forward[0].severity, reverse[0].severity);
    }

    #[test]
    fn no_topic_overlap_never_fabricates_a_conflict() {
        let a = record("WHO", "malaria prophylaxis", "recommend chemoprophylaxis");
        let b = record("CDC", "influenza vaccination", "do not recommend early vaccination");
        assert!(detect(&[a, b]).is_empty());
    }

    #[test]
    fn threshold_divergence_is_minor() {
        let a = record("ACC/AHA", "blood pressure", "recommend treatment above 130 mmHg");
        let b = record("ESC", "blood pressure", "recommend treatment above 140 mmHg");
        let conflicts = detect(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Minor);
    }

    #[test]
    fn screening_age_divergence_is_minor() {
        let a = record("WHO", "screening", "screening should start at 50 years");
        let b = record("AAP", "screening", "screening should start at 45 years");
        let conflicts = detect(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Minor);
    }

    #[test]
    fn two_negative_positions_do_not_conflict() {
        let a = record("WHO", "drug X", "do not recommend drug X");
        let b = record("CDC", "drug X", "recommend against drug X");
        assert!(detect(&[a, b]).is_empty());
    }

    #[test]
    fn non_whitelisted_organizations_pass_through_unscanned() {
        let a = record("Acme Pharma", "drug X", "recommend drug X");
        let b = record("CDC", "drug X", "do not recommend drug X");
        assert!(detect(&[a, b]).is_empty());
    }

    #[test]
    fn whitelist_match_is_case_insensitive() {
        let a = record("who", "drug X", "recommend drug X");
        let b = record("cdc", "drug X", "do not recommend drug X");
        assert_eq!(detect(&[a, b]).len(), 1);
    }

    #[test]
    fn first_match_wins_over_threshold_divergence() {
        // Polarity flip and threshold divergence in the same pair: the major
        // explanation is emitted, not both.
        let a = record("WHO", "screening", "screening is recommended from 50 years");
        let b = record("CDC", "screening", "screening is not recommended before 45 years");
        let conflicts = detect(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Major);
    }

    #[test]
    fn aligned_action_does_not_mask_later_opposition() {
        // Both positions agree on "recommend"; the disagreement lives in a
        // later lexicon rule and must still be found.
        let a = record(
            "WHO",
            "drug x",
            "we recommend lifestyle changes and drug X should be offered",
        );
        let b = record(
            "CDC",
            "drug x",
            "we recommend lifestyle changes but drug X should not be offered",
        );
        let conflicts = detect(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Major);
    }

    #[test]
    fn word_fragments_do_not_affirm_actions() {
        // "shoulder" must not read as "should".
        let a = record("WHO", "frozen shoulder", "early physiotherapy for frozen shoulder");
        let b = record("BMJ", "frozen shoulder", "physiotherapy should not be delayed");
        assert!(detect(&[a, b]).is_empty());

        // "recommendation" must not read as "recommend".
        let c = record("WHO", "drug x", "the 2019 recommendation for drug X remains under review");
        let d = record("CDC", "drug x", "we do not recommend drug X");
        assert!(detect(&[c, d]).is_empty());
    }

    #[test]
    fn inflected_affirmations_still_match() {
        let a = record("WHO", "drug x", "drug X is recommended as first-line therapy");
        let b = record("CDC", "drug x", "we do not recommend drug X");
        let conflicts = detect(&[a, b]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Major);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn threshold_extraction_normalizes_units() {
        let t = thresholds("treat above 140 mmhg or 5 years after 2.5 mg");
        assert_eq!(t.get("mmhg"), Some(&140.0));
        assert_eq!(t.get("year"), Some(&5.0));
        assert_eq!(t.get("mg"), Some(&2.5));
    }
}
