/// Point-based evidence sufficiency scoring.
///
/// Fixed weights, each category contributing at most once regardless of how
/// far its count exceeds the threshold. The weights sum to 100, so the score
/// is capped by construction. The `reasoning` list always carries one line
/// per satisfied and per notably unsatisfied category.
use crate::model::{EvidenceCounts, ScoreBreakdown, SufficiencyLevel, SufficiencyScore};

pub const POINTS_COCHRANE_REVIEWS: u8 = 30;
pub const POINTS_GUIDELINES: u8 = 25;
pub const POINTS_RCTS_WITH_RESULTS: u8 = 20;
pub const POINTS_RECENT_ARTICLES: u8 = 15;
pub const POINTS_SYSTEMATIC_REVIEWS: u8 = 10;

/// Recent articles only count once at least this many are present.
pub const RECENT_ARTICLES_MIN: usize = 5;

/// Score categorized evidence counts. Pure: the level is a function of the
/// score, and the score equals the breakdown total.
pub fn score(counts: &EvidenceCounts) -> SufficiencyScore {
    let mut breakdown = ScoreBreakdown::default();
    let mut reasoning = Vec::new();

    if counts.cochrane_reviews >= 1 {
        breakdown.cochrane_reviews = POINTS_COCHRANE_REVIEWS;
        reasoning.push(format!(
            "{} Cochrane review(s) found",
            counts.cochrane_reviews
        ));
    } else {
        reasoning.push("No Cochrane reviews found".to_string());
    }

    if counts.guidelines >= 1 {
        breakdown.guidelines = POINTS_GUIDELINES;
        reasoning.push(format!("{} clinical guideline(s) found", counts.guidelines));
    } else {
        reasoning.push("No clinical guidelines found".to_string());
    }

    if counts.rcts_with_results >= 1 {
        breakdown.rcts = POINTS_RCTS_WITH_RESULTS;
        reasoning.push(format!(
            "{} randomized controlled trial(s) with reported results",
            counts.rcts_with_results
        ));
    } else {
        reasoning.push("No RCTs with reported results found".to_string());
    }

    if counts.recent_articles >= RECENT_ARTICLES_MIN {
        breakdown.recent_articles = POINTS_RECENT_ARTICLES;
        reasoning.push(format!(
            "{} articles from the last 5 years",
            counts.recent_articles
        ));
    } else {
        reasoning.push(format!(
            "Only {} article(s) from the last 5 years (need {})",
            counts.recent_articles, RECENT_ARTICLES_MIN
        ));
    }

    if counts.systematic_reviews >= 1 {
        breakdown.systematic_reviews = POINTS_SYSTEMATIC_REVIEWS;
        reasoning.push(format!(
            "{} non-Cochrane systematic review(s) found",
            counts.systematic_reviews
        ));
    } else {
        reasoning.push("No non-Cochrane systematic reviews found".to_string());
    }

    let total = breakdown.total();
    SufficiencyScore {
        score: total,
        level: SufficiencyLevel::from_score(total),
        reasoning,
        breakdown,
    }
}

/// Fixed record returned when scoring itself fails: deliberately mid-scale so
/// downstream consumers are neither alarmed nor falsely reassured. The single
/// reasoning line is the signal that this is a fallback, and it is the one
/// record whose breakdown does not sum to the score.
pub fn fallback_score() -> SufficiencyScore {
    SufficiencyScore {
        score: 50,
        level: SufficiencyLevel::Good,
        reasoning: vec!["Sufficiency scoring failed; returning neutral default".to_string()],
        breakdown: ScoreBreakdown::default(),
    }
}
