use super::policy::ScoringPolicy;
use super::{ReviewSignal, ScoreComponent, ScoreSignal};

pub(crate) fn community_components(
    ai_score: f64,
    community: &[ReviewSignal],
    policy: &ScoringPolicy,
) -> Vec<ScoreComponent> {
    let mut components = Vec::with_capacity(4);

    components.push(ScoreComponent {
        signal: ScoreSignal::AiSafety,
        points: ai_score * policy.community_ai_weight,
        notes: format!(
            "AI safety {ai_score:.1} weighted x{:.1}",
            policy.community_ai_weight
        ),
    });

    let total: u32 = community.iter().map(|review| u32::from(review.rating)).sum();
    let average = f64::from(total) / community.len() as f64;
    components.push(ScoreComponent {
        signal: ScoreSignal::CommunityRating,
        points: average * policy.community_rating_scale * policy.community_rating_weight,
        notes: format!(
            "community average {average:.2} across {} review(s)",
            community.len()
        ),
    });

    let unsafe_count = community.iter().filter(|review| !review.felt_safe).count();
    let safe_count = community.len() - unsafe_count;

    if unsafe_count > 0 {
        components.push(ScoreComponent {
            signal: ScoreSignal::UnsafeReports,
            points: -(unsafe_count as f64) * policy.unsafe_report_penalty,
            notes: format!("{unsafe_count} report(s) of not feeling safe"),
        });
    }

    if safe_count > 0 {
        components.push(ScoreComponent {
            signal: ScoreSignal::SafeReports,
            points: safe_count as f64 * policy.safe_report_bonus,
            notes: format!("{safe_count} report(s) of feeling safe"),
        });
    }

    components
}

pub(crate) fn third_party_components(
    ai_score: f64,
    relevant_count: u32,
    average_rating: f64,
    policy: &ScoringPolicy,
) -> Vec<ScoreComponent> {
    let weight = policy.rating_weight_for(relevant_count);

    vec![
        ScoreComponent {
            signal: ScoreSignal::AiSafety,
            points: ai_score * policy.third_party_ai_weight,
            notes: format!(
                "AI safety {ai_score:.1} weighted x{:.1}",
                policy.third_party_ai_weight
            ),
        },
        ScoreComponent {
            signal: ScoreSignal::ThirdPartyRating,
            points: average_rating * weight,
            notes: format!(
                "average rating {average_rating:.1} weighted x{weight:.1} for {relevant_count} relevant review(s)"
            ),
        },
    ]
}
