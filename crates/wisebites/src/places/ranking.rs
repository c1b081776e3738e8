use std::cmp::Ordering;

use super::service::SearchResult;

/// Order search results for display.
///
/// Near a known origin, scored places come first (best score first) and the rest
/// follow by distance, with unknown distances last. Without an origin the
/// third-party rating decides.
pub fn rank_results(results: &mut [SearchResult], near_origin: bool) {
    if near_origin {
        results.sort_by(compare_near_origin);
    } else {
        results.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    }
}

fn positive_score(result: &SearchResult) -> Option<f64> {
    result.wise_bites_score.filter(|score| *score > 0.0)
}

fn compare_near_origin(a: &SearchResult, b: &SearchResult) -> Ordering {
    match (positive_score(a), positive_score(b)) {
        (Some(left), Some(right)) => right.total_cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match (a.distance_miles, b.distance_miles) {
            (Some(left), Some(right)) => left.total_cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}
