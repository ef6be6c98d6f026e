//! Display-tier classification of reported matches
//!
//! Classification never filters: every match the backend reports is kept,
//! the tier only changes how it is presented.

use crate::models::{FileRecord, MatchResult, MatchTier, Threshold};

/// Points above threshold a score needs to count as a strong match
pub const STRONG_MATCH_HEADROOM: f64 = 15.0;

/// Map a score/threshold pair to a display tier
///
/// Total over all finite and non-finite input; NaN scores classify as
/// [`MatchTier::None`].
pub fn classify(score: f64, threshold: Threshold) -> MatchTier {
    let threshold = threshold.value();
    if score >= threshold + STRONG_MATCH_HEADROOM {
        MatchTier::Strong
    } else if score >= threshold {
        MatchTier::Borderline
    } else {
        MatchTier::None
    }
}

/// Build a classified match for a resolved candidate
pub fn build_match(candidate: &FileRecord, score: f64, distance: f64, threshold: Threshold) -> MatchResult {
    MatchResult {
        candidate_id: candidate.id.clone(),
        candidate_name: candidate.name.clone(),
        score,
        distance,
        tier: classify(score, threshold),
    }
}
