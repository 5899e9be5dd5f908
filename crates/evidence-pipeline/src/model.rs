use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The fixed allow-list of evidence sources. Cache keys embed the source
/// name, so anything outside this set is rejected at the boundary to keep
/// the key space clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Pubmed,
    Cochrane,
    ClinicalTrials,
    Crossref,
    Guidelines,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Pubmed,
        Source::Cochrane,
        Source::ClinicalTrials,
        Source::Crossref,
        Source::Guidelines,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Pubmed => "pubmed",
            Source::Cochrane => "cochrane",
            Source::ClinicalTrials => "clinicaltrials",
            Source::Crossref => "crossref",
            Source::Guidelines => "guidelines",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pubmed" => Ok(Source::Pubmed),
            "cochrane" => Ok(Source::Cochrane),
            "clinicaltrials" => Ok(Source::ClinicalTrials),
            "crossref" => Ok(Source::Crossref),
            "guidelines" => Ok(Source::Guidelines),
            other => Err(AppError::UnknownSource(other.to_string())),
        }
    }
}

/// A single clinical guideline statement as fetched from a source.
/// Immutable once fetched; owned by the pipeline for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidelineRecord {
    /// Issuing organization, e.g. "WHO", "CDC"
    pub organization: String,
    /// Clinical topic the position addresses
    pub topic: String,
    /// The position statement itself, verbatim
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// Study-type classification used for sufficiency counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleKind {
    CochraneReview,
    SystematicReview,
    Rct,
    Article,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub kind: ArticleKind,
    /// Whether results have been reported (meaningful for RCTs).
    #[serde(default)]
    pub has_results: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The normalized payload one source contributes to a request. This is also
/// the shape cached under `evidence:{hash}:{source}` as the opaque `data`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceEvidence {
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
    #[serde(default)]
    pub guidelines: Vec<GuidelineRecord>,
}

/// Categorized evidence counts the sufficiency scorer consumes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceCounts {
    pub cochrane_reviews: usize,
    pub guidelines: usize,
    pub rcts_with_results: usize,
    /// Articles of any kind published in the last five years (inclusive).
    pub recent_articles: usize,
    /// Systematic reviews that are not Cochrane reviews.
    pub systematic_reviews: usize,
}

impl EvidenceCounts {
    /// Tally category counts across per-source payloads.
    pub fn tally<'a, I>(payloads: I, current_year: i32) -> Self
    where
        I: IntoIterator<Item = &'a SourceEvidence>,
    {
        let mut counts = EvidenceCounts::default();
        for payload in payloads {
            counts.guidelines += payload.guidelines.len();
            for article in &payload.articles {
                match article.kind {
                    ArticleKind::CochraneReview => counts.cochrane_reviews += 1,
                    ArticleKind::SystematicReview => counts.systematic_reviews += 1,
                    ArticleKind::Rct if article.has_results => counts.rcts_with_results += 1,
                    _ => {}
                }
                if matches!(article.year, Some(y) if y >= current_year - 5) {
                    counts.recent_articles += 1;
                }
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Major,
    Minor,
}

/// One organization's position inside a detected conflict. Both sides are
/// listed with equal prominence, positions verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictSource {
    pub organization: String,
    pub position: String,
}

/// A detected disagreement between two guidelines. Derived per request,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub topic: String,
    pub sources: Vec<ConflictSource>,
    pub severity: Severity,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SufficiencyLevel {
    Excellent,
    Good,
    Limited,
    Insufficient,
}

impl SufficiencyLevel {
    /// Fixed threshold mapping: ≥70 excellent, ≥50 good, ≥30 limited.
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => SufficiencyLevel::Excellent,
            50..=69 => SufficiencyLevel::Good,
            30..=49 => SufficiencyLevel::Limited,
            _ => SufficiencyLevel::Insufficient,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SufficiencyLevel::Excellent => "excellent",
            SufficiencyLevel::Good => "good",
            SufficiencyLevel::Limited => "limited",
            SufficiencyLevel::Insufficient => "insufficient",
        }
    }
}

/// Points contributed per category. Field names are the persisted/API keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub cochrane_reviews: u8,
    pub guidelines: u8,
    pub rcts: u8,
    pub recent_articles: u8,
    pub systematic_reviews: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        self.cochrane_reviews
            + self.guidelines
            + self.rcts
            + self.recent_articles
            + self.systematic_reviews
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SufficiencyScore {
    /// 0–100; equals `breakdown.total()` for computed scores.
    pub score: u8,
    pub level: SufficiencyLevel,
    /// One human-readable line per satisfied and notably unsatisfied
    /// category. Never empty.
    pub reasoning: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

/// What one source contributed to the request and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSlice {
    pub source: Source,
    pub from_cache: bool,
    pub evidence: SourceEvidence,
}

/// The merged per-request evidence package the annotation steps run over.
#[derive(Debug, Clone, Serialize)]
pub struct EvidencePackage {
    pub query: String,
    pub slices: Vec<SourceSlice>,
    pub guidelines: Vec<GuidelineRecord>,
    pub counts: EvidenceCounts,
}

/// Final pipeline output: the package plus its annotations.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedEvidence {
    pub package: EvidencePackage,
    pub conflicts: Vec<Conflict>,
    pub sufficiency: SufficiencyScore,
    /// Formatted conflict notices and sufficiency warnings, ready to be
    /// prepended to the downstream generation step. May be empty.
    pub annotation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parse_is_case_insensitive_and_strict() {
        assert_eq!("PubMed".parse::<Source>().unwrap(), Source::Pubmed);
        assert_eq!(" cochrane ".parse::<Source>().unwrap(), Source::Cochrane);
        assert!("embase".parse::<Source>().is_err());
        assert!("".parse::<Source>().is_err());
    }

    #[test]
    fn source_round_trips_through_as_str() {
        for source in Source::ALL {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
    }

    #[test]
    fn tally_classifies_article_kinds() {
        let payload = SourceEvidence {
            articles: vec![
                ArticleRecord {
                    title: "Cochrane review".into(),
                    journal: None,
                    year: Some(2024),
                    kind: ArticleKind::CochraneReview,
                    has_results: false,
                    url: None,
                },
                ArticleRecord {
                    title: "RCT without results".into(),
                    journal: None,
                    year: Some(2010),
                    kind: ArticleKind::Rct,
                    has_results: false,
                    url: None,
                },
                ArticleRecord {
                    title: "RCT with results".into(),
                    journal: None,
                    year: Some(2023),
                    kind: ArticleKind::Rct,
                    has_results: true,
                    url: None,
                },
                ArticleRecord {
                    title: "Old systematic review".into(),
                    journal: None,
                    year: Some(2015),
                    kind: ArticleKind::SystematicReview,
                    has_results: false,
                    url: None,
                },
            ],
            guidelines: vec![GuidelineRecord {
                organization: "WHO".into(),
                topic: "x".into(),
                position: "y".into(),
                url: None,
                year: None,
            }],
        };

        let counts = EvidenceCounts::tally([&payload], 2026);
        assert_eq!(counts.cochrane_reviews, 1);
        assert_eq!(counts.systematic_reviews, 1);
        assert_eq!(counts.rcts_with_results, 1);
        assert_eq!(counts.guidelines, 1);
        // 2024 and 2023 fall inside the five-year window; 2010 and 2015 don't.
        assert_eq!(counts.recent_articles, 2);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(SufficiencyLevel::from_score(100), SufficiencyLevel::Excellent);
        assert_eq!(SufficiencyLevel::from_score(70), SufficiencyLevel::Excellent);
        assert_eq!(SufficiencyLevel::from_score(69), SufficiencyLevel::Good);
        assert_eq!(SufficiencyLevel::from_score(50), SufficiencyLevel::Good);
        assert_eq!(SufficiencyLevel::from_score(49), SufficiencyLevel::Limited);
        assert_eq!(SufficiencyLevel::from_score(30), SufficiencyLevel::Limited);
        assert_eq!(SufficiencyLevel::from_score(29), SufficiencyLevel::Insufficient);
        assert_eq!(SufficiencyLevel::from_score(0), SufficiencyLevel::Insufficient);
    }
}
