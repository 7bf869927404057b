//! Placement and reward settlement.
//!
//! The entry-fee pool is folded into the podium rewards once, at start: 90% of
//! the pool is split 50/30/20 over first, second and third, the rest is retained.
//! At completion the podium is read off the bracket and every participant gets
//! exactly one payout keyed by `(tournament, participant, placement)`.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{
        ParticipantId, Payout, Placement, PoolBonus, RewardSchedule, Settlement, Tournament,
        TournamentId, TournamentStatus,
    },
};
use chrono::{DateTime, Utc};

/// Share of the entry-fee pool paid out, in percent
pub const POOL_PAYOUT_PERCENT: i64 = 90;

/// Split of the paid-out pool over first, second and third, in percent
pub const PODIUM_WEIGHTS: [i64; 3] = [50, 30, 20];

/// Largest pool or reward a tournament may carry. Requests are validated
/// against it so percentage math and reward sums stay in range.
pub const MAX_PRIZE_POOL: i64 = i64::MAX / 100;

impl PoolBonus {
    /// Split a pool. Integer rounding leftovers go to third place so that
    /// `first + second + third + retained == pool`.
    pub fn from_pool(pool: i64) -> Self {
        // Widened so no pool can overflow; each share is at most the pool
        let percent_of =
            |amount: i64, percent: i64| (amount as i128 * percent as i128 / 100) as i64;
        let distributable = percent_of(pool, POOL_PAYOUT_PERCENT);
        let first = percent_of(distributable, PODIUM_WEIGHTS[0]);
        let second = percent_of(distributable, PODIUM_WEIGHTS[1]);
        Self {
            first,
            second,
            third: distributable - first - second,
            retained: pool - distributable,
        }
    }

    /// Total added to the podium rewards
    pub fn distributed(&self) -> i64 {
        self.first + self.second + self.third
    }

    /// Add the bonus onto the podium coin rewards. Leaves `rewards` untouched
    /// if any sum would overflow.
    pub fn apply(&self, rewards: &mut RewardSchedule) -> TournamentResult<()> {
        let add = |coins: i64, bonus: i64| {
            coins.checked_add(bonus).ok_or_else(|| {
                TournamentError::invariant(format!(
                    "reward of {coins} plus pool share {bonus} overflows"
                ))
            })
        };
        let first = add(rewards.first.coins, self.first)?;
        let second = add(rewards.second.coins, self.second)?;
        let third = add(rewards.third.coins, self.third)?;

        rewards.first.coins = first;
        rewards.second.coins = second;
        rewards.third.coins = third;
        Ok(())
    }
}

/// Podium read off a finished bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placements {
    pub winner: ParticipantId,
    pub second: Option<ParticipantId>,
    pub third: Option<ParticipantId>,
}

impl Placements {
    pub fn placement_of(&self, participant_id: ParticipantId) -> Placement {
        if participant_id == self.winner {
            Placement::First
        } else if Some(participant_id) == self.second {
            Placement::Second
        } else if Some(participant_id) == self.third {
            Placement::Third
        } else {
            Placement::Participation
        }
    }
}

/// Ledger idempotency key of a payout
pub fn payout_key(
    tournament_id: TournamentId,
    participant_id: ParticipantId,
    placement: Placement,
) -> String {
    format!("tournament:{tournament_id}:payout:{participant_id}:{placement}")
}

/// Determine first, second and third.
///
/// Third place is the semifinal loser with the most wins; a tie goes to the
/// lower seed. No bronze match is played.
pub fn determine_placements(tournament: &Tournament) -> TournamentResult<Placements> {
    if tournament.total_rounds == 0 {
        return match tournament.participants.as_slice() {
            [champion] => Ok(Placements {
                winner: champion.id,
                second: None,
                third: None,
            }),
            other => Err(TournamentError::invariant(format!(
                "bracket without rounds has {} participants",
                other.len()
            ))),
        };
    }

    let final_match = tournament
        .final_match()
        .ok_or_else(|| TournamentError::invariant("bracket has no final match"))?;
    let winner = final_match
        .winner
        .ok_or_else(|| TournamentError::invariant("final match has no winner"))?;
    let second = final_match.loser();

    let third = if tournament.total_rounds >= 2 {
        let semifinal = tournament.total_rounds - 1;
        tournament
            .participants
            .iter()
            .filter(|p| p.eliminated_round == Some(semifinal))
            .max_by(|a, b| a.wins.cmp(&b.wins).then(b.seed.cmp(&a.seed)))
            .map(|p| p.id)
    } else {
        None
    };

    Ok(Placements {
        winner,
        second,
        third,
    })
}

/// One payout per participant, in seed order
pub fn plan_payouts(tournament: &Tournament, placements: &Placements) -> Vec<Payout> {
    let mut participants: Vec<_> = tournament.participants.iter().collect();
    participants.sort_by_key(|p| p.seed);

    participants
        .into_iter()
        .map(|p| {
            let placement = placements.placement_of(p.id);
            Payout {
                participant_id: p.id,
                placement,
                reward: tournament.rewards.for_placement(placement),
                idempotency_key: payout_key(tournament.id, p.id, placement),
            }
        })
        .collect()
}

/// Close the tournament: record the podium and payout plan, mark completed.
pub(crate) fn settle(tournament: &mut Tournament, now: DateTime<Utc>) -> TournamentResult<()> {
    if tournament.settlement.is_some() {
        return Err(TournamentError::invariant("tournament settled twice"));
    }

    let placements = determine_placements(tournament)?;
    let payouts = plan_payouts(tournament, &placements);

    tournament.winner_id = Some(placements.winner);
    tournament.second_id = placements.second;
    tournament.third_id = placements.third;
    tournament.settlement = Some(Settlement {
        winner_id: placements.winner,
        second_id: placements.second,
        third_id: placements.third,
        payouts,
        settled_at: now,
    });
    tournament.status = TournamentStatus::Completed;
    tournament.completed_at = Some(now);

    log::info!(
        "Tournament {} settled: winner {}, second {:?}, third {:?}",
        tournament.id,
        placements.winner,
        placements.second,
        placements.third
    );

    Ok(())
}
