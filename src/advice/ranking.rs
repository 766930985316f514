// Shared ranking helpers for the decision engines.
//
// Every engine ends up grouping players by position and ordering them by
// some score; the helpers here centralize that so ties always break the same
// way (ascending player id), keeping full runs deterministic.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::model::Position;
use crate::projection::points::PlayerProjection;

/// Descending comparison for scores with an id tiebreak, tolerant of NaN
/// (NaN sorts last).
pub fn by_score_desc(
    a: &PlayerProjection,
    b: &PlayerProjection,
    score: impl Fn(&PlayerProjection) -> f64,
) -> Ordering {
    score(b)
        .partial_cmp(&score(a))
        .unwrap_or(Ordering::Equal)
        .then(a.player.cmp(&b.player))
}

/// Collect and sort projections descending by the given score.
pub fn rank_desc<'a, I>(
    items: I,
    score: impl Fn(&PlayerProjection) -> f64 + Copy,
) -> Vec<&'a PlayerProjection>
where
    I: IntoIterator<Item = &'a PlayerProjection>,
{
    let mut ranked: Vec<&PlayerProjection> = items.into_iter().collect();
    ranked.sort_by(|a, b| by_score_desc(a, b, score));
    ranked
}

/// Group projections by position, each group sorted descending by the score.
pub fn rank_by_position<'a, I>(
    items: I,
    score: impl Fn(&PlayerProjection) -> f64 + Copy,
) -> BTreeMap<Position, Vec<&'a PlayerProjection>>
where
    I: IntoIterator<Item = &'a PlayerProjection>,
{
    let mut groups: BTreeMap<Position, Vec<&PlayerProjection>> = BTreeMap::new();
    for projection in items {
        groups.entry(projection.position).or_default().push(projection);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| by_score_desc(a, b, score));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataQuality, FormTrend, PriceTrend};

    fn projection(id: u32, position: Position, next_four: f64) -> PlayerProjection {
        PlayerProjection {
            player: id,
            name: format!("P{id}"),
            team: 1,
            position,
            price: 5.0,
            ownership: 5.0,
            quality: DataQuality::Approximated,
            goals_p90: 0.0,
            assists_p90: 0.0,
            avg_minutes: 90.0,
            minutes: 900,
            starts: 10,
            form: FormTrend::Steady,
            chance_of_playing: None,
            price_trend: PriceTrend::Flat,
            xmin: 90.0,
            rounds: Vec::new(),
            next_round_points: 0.0,
            next_four_points: next_four,
            next_six_points: 0.0,
            avg_difficulty: 1.0,
        }
    }

    #[test]
    fn rank_desc_orders_by_score_then_id() {
        let a = projection(3, Position::Midfielder, 10.0);
        let b = projection(1, Position::Midfielder, 10.0);
        let c = projection(2, Position::Midfielder, 20.0);
        let ranked = rank_desc([&a, &b, &c], |p| p.next_four_points);
        let ids: Vec<u32> = ranked.iter().map(|p| p.player).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn rank_by_position_groups_and_sorts() {
        let a = projection(1, Position::Defender, 5.0);
        let b = projection(2, Position::Defender, 8.0);
        let c = projection(3, Position::Forward, 1.0);
        let groups = rank_by_position([&a, &b, &c], |p| p.next_four_points);
        assert_eq!(groups[&Position::Defender][0].player, 2);
        assert_eq!(groups[&Position::Defender][1].player, 1);
        assert_eq!(groups[&Position::Forward].len(), 1);
        assert!(!groups.contains_key(&Position::Goalkeeper));
    }
}
