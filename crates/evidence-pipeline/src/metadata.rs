/// Citation metadata normalization for bibliographic lookups.
///
/// The HTTP lookup itself is an external collaborator; this module owns the
/// pure parts: extracting a DOI from a URL and mapping a CrossRef-style
/// response into a normalized citation record. The journal table is static
/// configuration, not literals scattered through the mapping code.
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Leading journals and their standard abbreviations. Matched exact or by
/// substring, case-insensitive; a match also marks the journal as leading.
const JOURNAL_ABBREVIATIONS: &[(&str, &str)] = &[
    ("New England Journal of Medicine", "N Engl J Med"),
    ("The Lancet", "Lancet"),
    ("JAMA", "JAMA"),
    ("BMJ", "BMJ"),
    ("Annals of Internal Medicine", "Ann Intern Med"),
    ("Nature Medicine", "Nat Med"),
    ("Circulation", "Circulation"),
    ("European Heart Journal", "Eur Heart J"),
    ("Pediatrics", "Pediatrics"),
    ("Cochrane Database of Systematic Reviews", "Cochrane Database Syst Rev"),
];

/// Authors beyond this count are collapsed into "et al.".
const MAX_AUTHORS: usize = 3;

static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"10\.\d{4,9}/[^\s?#]+").expect("valid regex"));

#[derive(Debug, Clone, Serialize)]
pub struct CitationMeta {
    pub title: String,
    /// Formatted author line, at most three names, ", et al." when truncated.
    pub authors: String,
    pub journal: Option<String>,
    pub published_date: Option<String>,
    pub year: Option<i32>,
    pub source_abbrev: Option<String>,
    pub is_leading_journal: bool,
}

/// Pull a DOI out of a URL, trimming trailing slashes and periods that
/// publishers like to append.
pub fn extract_doi(url: &str) -> Option<String> {
    DOI_RE
        .find(url)
        .map(|m| m.as_str().trim_end_matches(['.', '/']).to_string())
}

/// Look up the abbreviation for a leading journal, case-insensitive exact or
/// substring match. `None` means the journal is not on the leading list.
pub fn journal_abbreviation(journal: &str) -> Option<&'static str> {
    let lowered = journal.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    JOURNAL_ABBREVIATIONS.iter().find_map(|(name, abbrev)| {
        let name_lowered = name.to_lowercase();
        (lowered == name_lowered || lowered.contains(&name_lowered)).then_some(*abbrev)
    })
}

/// Map a CrossRef-style `message` object into a normalized citation.
/// Returns `None` when the record has no usable title — malformed input is
/// absence of data, not a failure.
pub fn normalize_citation(message: &serde_json::Value) -> Option<CitationMeta> {
    let title = message
        .get("title")
        .and_then(|t| t.get(0))
        .and_then(|t| t.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();

    let authors = format_authors(message.get("author").and_then(|a| a.as_array()));

    let journal = message
        .get("container-title")
        .and_then(|c| c.get(0))
        .and_then(|c| c.as_str())
        .map(str::trim)
        .filter(|j| !j.is_empty())
        .map(str::to_string);

    let (published_date, year) = published(message);

    let (source_abbrev, is_leading_journal) = match journal.as_deref().map(journal_abbreviation) {
        Some(Some(abbrev)) => (Some(abbrev.to_string()), true),
        _ => (None, false),
    };

    Some(CitationMeta {
        title,
        authors,
        journal,
        published_date,
        year,
        source_abbrev,
        is_leading_journal,
    })
}

fn format_authors(authors: Option<&Vec<serde_json::Value>>) -> String {
    let Some(authors) = authors else {
        return String::new();
    };
    let names: Vec<String> = authors
        .iter()
        .filter_map(|a| {
            let family = a.get("family").and_then(|f| f.as_str())?;
            match a.get("given").and_then(|g| g.as_str()) {
                Some(given) => Some(format!("{given} {family}")),
                None => Some(family.to_string()),
            }
        })
        .collect();

    if names.len() > MAX_AUTHORS {
        format!("{}, et al.", names[..MAX_AUTHORS].join(", "))
    } else {
        names.join(", ")
    }
}

/// Extract the publication date from `published` / `published-print` /
/// `issued` date-parts, first one present wins.
fn published(message: &serde_json::Value) -> (Option<String>, Option<i32>) {
    for field in ["published", "published-print", "issued"] {
        let Some(parts) = message
            .get(field)
            .and_then(|p| p.get("date-parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.as_array())
        else {
            continue;
        };
        let year = parts.first().and_then(|y| y.as_i64()).map(|y| y as i32);
        let Some(year) = year else { continue };

        let month = parts.get(1).and_then(|m| m.as_i64());
        let day = parts.get(2).and_then(|d| d.as_i64());
        let date = match (month, day) {
            (Some(m), Some(d)) => format!("{year}-{m:02}-{d:02}"),
            (Some(m), None) => format!("{year}-{m:02}"),
            _ => year.to_string(),
        };
        return (Some(date), Some(year));
    }
    (None, None)
}
