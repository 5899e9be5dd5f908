/// Annotation text prepended to the downstream generation step.
///
/// Wording is a presentation concern, not a contract: the only requirement
/// is a notice per conflict and a warning when the evidence base is limited
/// or insufficient.
use crate::model::{Conflict, Severity, SufficiencyLevel, SufficiencyScore};

pub fn render_annotation(conflicts: &[Conflict], sufficiency: &SufficiencyScore) -> String {
    let mut out = String::new();

    for conflict in conflicts {
        let severity = match conflict.severity {
            Severity::Major => "MAJOR",
            Severity::Minor => "minor",
        };
        out.push_str(&format!(
            "CONFLICT ({severity}) on {}: {}\n",
            conflict.topic, conflict.description
        ));
        for source in &conflict.sources {
            out.push_str(&format!("  - {}: {}\n", source.organization, source.position));
        }
    }

    if matches!(
        sufficiency.level,
        SufficiencyLevel::Limited | SufficiencyLevel::Insufficient
    ) {
        out.push_str(&format!(
            "WARNING: evidence base is {} ({}/100)\n",
            sufficiency.level.as_str(),
            sufficiency.score
        ));
        for reason in &sufficiency.reasoning {
            out.push_str(&format!("  - {reason}\n"));
        }
    }

    out
}
