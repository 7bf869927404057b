//! Single-elimination bracket generation.
//!
//! Matches live in a flat arena ordered round by round. Round `r` of a bracket
//! of size `B` holds `B / 2^r` matches starting at index `B - B / 2^(r-1)`, so the
//! match a winner advances into is found by index arithmetic alone.

use super::models::{
    BracketView, Match, MatchId, MatchStatus, MatchView, ParticipantId, RoundView, Tournament,
};

/// Shape of a bracket for a given roster size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketLayout {
    /// Smallest power of two >= participant count
    pub bracket_size: usize,
    pub total_rounds: u32,
    pub byes_needed: usize,
}

impl BracketLayout {
    /// Layout for `participants` entrants. Fewer than two entrants yield no rounds.
    pub fn for_participants(participants: usize) -> Self {
        if participants <= 1 {
            return Self {
                bracket_size: participants,
                total_rounds: 0,
                byes_needed: 0,
            };
        }

        let bracket_size = participants.next_power_of_two();
        Self {
            bracket_size,
            total_rounds: bracket_size.trailing_zeros(),
            byes_needed: bracket_size - participants,
        }
    }

    /// Layout of a bracket with `total_rounds` rounds
    pub fn from_rounds(total_rounds: u32) -> Self {
        Self {
            bracket_size: 1usize << total_rounds,
            total_rounds,
            byes_needed: 0,
        }
    }

    /// Number of matches in a 1-based round
    pub fn matches_in_round(&self, round: u32) -> usize {
        if round == 0 || round > self.total_rounds {
            0
        } else {
            self.bracket_size >> round
        }
    }

    /// Arena index of the first match of a round
    pub fn round_offset(&self, round: u32) -> usize {
        self.bracket_size - (self.bracket_size >> (round - 1))
    }

    /// Arena index of `(round, position)`
    pub fn match_index(&self, round: u32, position: u32) -> usize {
        self.round_offset(round) + position as usize
    }

    pub fn total_matches(&self) -> usize {
        if self.total_rounds == 0 {
            0
        } else {
            self.bracket_size - 1
        }
    }
}

/// Generated bracket: its layout plus every match from round 1 to the final
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    pub layout: BracketLayout,
    pub matches: Vec<Match>,
}

/// Build the full match tree for an already-seeded roster.
///
/// Round 1 pairs the roster in order; the last `byes_needed` round-1 matches get a
/// single player who wins immediately. Later rounds are empty placeholders.
/// The result depends only on the order of `seeded`.
pub fn generate_bracket(seeded: &[ParticipantId]) -> Bracket {
    let layout = BracketLayout::for_participants(seeded.len());
    let mut matches = Vec::with_capacity(layout.total_matches());

    if layout.total_rounds == 0 {
        return Bracket { layout, matches };
    }

    let first_round = layout.matches_in_round(1);
    let full_matches = first_round - layout.byes_needed;
    let mut roster = seeded.iter().copied();

    for position in 0..first_round {
        let mut m = Match::placeholder(matches.len() as MatchId, 1, position as u32);
        m.player1 = roster.next();
        if position < full_matches {
            m.player2 = roster.next();
        } else {
            m.winner = m.player1;
            m.status = MatchStatus::Bye;
        }
        matches.push(m);
    }

    for round in 2..=layout.total_rounds {
        for position in 0..layout.matches_in_round(round) {
            matches.push(Match::placeholder(
                matches.len() as MatchId,
                round,
                position as u32,
            ));
        }
    }

    Bracket { layout, matches }
}

/// Display name of a round
pub fn round_name(round: u32, total_rounds: u32) -> String {
    match total_rounds.saturating_sub(round) {
        0 => "Final".to_string(),
        1 => "Semifinal".to_string(),
        2 => "Quarterfinal".to_string(),
        _ => format!("Round {round}"),
    }
}

impl Tournament {
    /// Bracket layout implied by the stored round count
    pub fn layout(&self) -> BracketLayout {
        BracketLayout::from_rounds(self.total_rounds)
    }

    /// Read-only projection of the bracket with display names resolved
    pub fn bracket_view(&self) -> BracketView {
        let name_of = |id: Option<ParticipantId>| {
            id.map(|id| {
                self.participant(id)
                    .map(|p| p.display_name.clone())
                    .unwrap_or_else(|| format!("#{id}"))
            })
        };

        let rounds = (1..=self.total_rounds)
            .map(|round| RoundView {
                round,
                name: round_name(round, self.total_rounds),
                matches: self
                    .round_matches(round)
                    .map(|m| MatchView {
                        match_id: m.id,
                        position: m.position,
                        player1: name_of(m.player1),
                        player2: name_of(m.player2),
                        winner: name_of(m.winner),
                        status: m.status,
                    })
                    .collect(),
            })
            .collect();

        BracketView {
            tournament_id: self.id,
            name: self.name.clone(),
            status: self.status,
            current_round: self.current_round,
            total_rounds: self.total_rounds,
            rounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: usize) -> Vec<ParticipantId> {
        (1..=n as i64).collect()
    }

    #[test]
    fn test_five_participants_layout() {
        let bracket = generate_bracket(&roster(5));
        assert_eq!(bracket.layout.bracket_size, 8);
        assert_eq!(bracket.layout.byes_needed, 3);
        assert_eq!(bracket.layout.total_rounds, 3);

        let first_round: Vec<_> = bracket.matches.iter().filter(|m| m.round == 1).collect();
        assert_eq!(first_round.len(), 4);
        assert_eq!(
            first_round
                .iter()
                .filter(|m| m.status == MatchStatus::Bye)
                .count(),
            3
        );
        assert_eq!(bracket.matches.len(), 7);
    }

    #[test]
    fn test_round_one_assignment_order() {
        let bracket = generate_bracket(&roster(5));
        let m = &bracket.matches;
        assert_eq!((m[0].player1, m[0].player2), (Some(1), Some(2)));
        assert_eq!(m[0].status, MatchStatus::Pending);
        for (idx, expected) in [(1, 3), (2, 4), (3, 5)] {
            assert_eq!(m[idx].player1, Some(expected));
            assert_eq!(m[idx].player2, None);
            assert_eq!(m[idx].winner, Some(expected));
            assert_eq!(m[idx].status, MatchStatus::Bye);
        }
    }

    #[test]
    fn test_power_of_two_has_no_byes() {
        let bracket = generate_bracket(&roster(8));
        assert_eq!(bracket.layout.byes_needed, 0);
        assert!(bracket.matches.iter().all(|m| m.status != MatchStatus::Bye));
        assert!(
            bracket
                .matches
                .iter()
                .filter(|m| m.round == 1)
                .all(|m| m.player1.is_some() && m.player2.is_some())
        );
    }

    #[test]
    fn test_single_participant_has_no_matches() {
        let bracket = generate_bracket(&roster(1));
        assert_eq!(bracket.layout.total_rounds, 0);
        assert!(bracket.matches.is_empty());
    }

    #[test]
    fn test_two_participants_single_final() {
        let bracket = generate_bracket(&roster(2));
        assert_eq!(bracket.layout.total_rounds, 1);
        assert_eq!(bracket.matches.len(), 1);
        assert_eq!(bracket.matches[0].player1, Some(1));
        assert_eq!(bracket.matches[0].player2, Some(2));
    }

    #[test]
    fn test_later_rounds_are_empty_placeholders() {
        let bracket = generate_bracket(&roster(6));
        for m in bracket.matches.iter().filter(|m| m.round > 1) {
            assert_eq!(m.player1, None);
            assert_eq!(m.player2, None);
            assert_eq!(m.status, MatchStatus::Pending);
        }
    }

    #[test]
    fn test_match_index_arithmetic() {
        let layout = BracketLayout::for_participants(16);
        assert_eq!(layout.round_offset(1), 0);
        assert_eq!(layout.round_offset(2), 8);
        assert_eq!(layout.round_offset(3), 12);
        assert_eq!(layout.round_offset(4), 14);
        assert_eq!(layout.match_index(2, 3), 11);

        let bracket = generate_bracket(&roster(16));
        for m in &bracket.matches {
            assert_eq!(layout.match_index(m.round, m.position), m.id as usize);
        }
    }

    #[test]
    fn test_round_names() {
        assert_eq!(round_name(3, 3), "Final");
        assert_eq!(round_name(2, 3), "Semifinal");
        assert_eq!(round_name(2, 4), "Quarterfinal");
        assert_eq!(round_name(1, 5), "Round 1");
    }

    #[test]
    fn test_generation_is_deterministic() {
        let order = vec![9, 3, 7, 1, 5, 11];
        assert_eq!(generate_bracket(&order), generate_bracket(&order));
    }
}
