use crate::db::models::RubricBreakdownEntry;

const MAX_WEAK_AREAS: usize = 5;
const FEEDBACK_MARKERS: [&str; 2] = ["improve", "incorrect"];
const NOTE_MARKERS: [&str; 2] = ["weak", "gap"];

/// Criteria a learner should revisit, in report order.
pub(crate) fn weak_areas(breakdown: &[RubricBreakdownEntry]) -> Vec<String> {
    breakdown
        .iter()
        .filter(|entry| is_weak(entry))
        .map(|entry| {
            entry
                .criterion_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(entry.criterion_id.as_str())
                .to_string()
        })
        .take(MAX_WEAK_AREAS)
        .collect()
}

pub(crate) fn follow_up_topic(weak_areas: &[String]) -> String {
    if weak_areas.is_empty() {
        "Follow-up practice based on your report".to_string()
    } else {
        format!("Follow-up practice on: {}", weak_areas.join(", "))
    }
}

fn is_weak(entry: &RubricBreakdownEntry) -> bool {
    let feedback = entry.score_or_feedback.to_lowercase();
    let note = entry.performance_note.to_lowercase();
    FEEDBACK_MARKERS.iter().any(|marker| feedback.contains(marker))
        || NOTE_MARKERS.iter().any(|marker| note.contains(marker))
}
