//! Maps watch progress and the resolved next unit to a suggested action.

use episonext_common::SuggestedAction;

use super::resolver::NextUnit;

/// Default fraction of an episode after which it counts as watched.
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.9;

/// Pick the action to surface for a watch item.
///
/// No next unit means the series is done as far as the catalog knows. A
/// continuing unit, or any unit while the episode is still unfinished, means
/// keep watching.
pub fn classify(
    progress: f64,
    next_unit: Option<&NextUnit>,
    completion_threshold: f64,
) -> SuggestedAction {
    match next_unit {
        None => SuggestedAction::FinishedSeries,
        Some(unit) if unit.is_continuing() => SuggestedAction::ContinueWatching,
        Some(_) if progress >= completion_threshold => SuggestedAction::WatchNextEpisode,
        Some(_) => SuggestedAction::ContinueWatching,
    }
}
