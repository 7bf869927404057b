/// Property-based tests for bracket generation and bracket play
///
/// These drive generated brackets through the state machine in arbitrary
/// order and check the structural invariants that must hold at every step.
use chrono::Utc;
use guild_tournaments::tournament::{
    BracketLayout, CreateTournamentRequest, MatchStatus, PoolBonus, ResultOutcome, Tournament,
    TournamentSettings, TournamentStatus, TournamentType, generate_bracket,
};
use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

// Tournament with `n` registered participants, started with a fixed RNG seed
fn started_tournament(n: usize, seed: u64) -> Tournament {
    let now = Utc::now();
    let request = CreateTournamentRequest::new("Prop Cup", TournamentType::Mining, "prop", 1)
        .with_capacity(1, 64);
    let mut t = Tournament::new(request, &TournamentSettings::default(), now).unwrap();
    for id in 1..=n as i64 {
        t.register(id, format!("p{id}"), None, now).unwrap();
    }
    t.start(&mut StdRng::seed_from_u64(seed), now).unwrap();
    t
}

fn completed_matches(t: &Tournament) -> usize {
    t.matches
        .iter()
        .filter(|m| m.status == MatchStatus::Completed)
        .count()
}

fn total_losses(t: &Tournament) -> usize {
    t.participants.iter().map(|p| p.losses as usize).sum()
}

proptest! {
    #[test]
    fn test_bracket_shape(n in 1usize..=128) {
        let roster: Vec<i64> = (1..=n as i64).collect();
        let bracket = generate_bracket(&roster);
        let layout = bracket.layout;

        let expected_rounds = (n as f64).log2().ceil() as u32;
        prop_assert_eq!(layout.total_rounds, expected_rounds);

        // A lone participant gets a bracket of size one and no matches
        prop_assert_eq!(bracket.matches.len(), layout.bracket_size - 1);

        let byes: Vec<_> = bracket
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Bye)
            .collect();
        prop_assert_eq!(byes.len(), layout.bracket_size - n);
        prop_assert_eq!(layout.byes_needed, layout.bracket_size - n);
        for bye in byes {
            prop_assert_eq!(bye.round, 1);
            prop_assert!(bye.player2.is_none());
            prop_assert_eq!(bye.winner, bye.player1);
        }
    }

    #[test]
    fn test_every_participant_placed_once(n in 2usize..=128) {
        let roster: Vec<i64> = (1..=n as i64).collect();
        let bracket = generate_bracket(&roster);
        let mut placed: Vec<i64> = bracket
            .matches
            .iter()
            .filter(|m| m.round == 1)
            .flat_map(|m| [m.player1, m.player2])
            .flatten()
            .collect();
        placed.sort_unstable();
        prop_assert_eq!(placed, roster);
    }

    #[test]
    fn test_arena_indices_match_positions(rounds in 1u32..=7) {
        let layout = BracketLayout::from_rounds(rounds);
        let mut expected = 0;
        for round in 1..=rounds {
            for position in 0..layout.matches_in_round(round) {
                prop_assert_eq!(layout.match_index(round, position as u32), expected);
                expected += 1;
            }
        }
        prop_assert_eq!(expected, layout.total_matches());
    }

    #[test]
    fn test_any_play_order_completes_once(
        n in 2usize..=40,
        seed in any::<u64>(),
        picks in prop::collection::vec((any::<prop::sample::Index>(), any::<bool>()), 64),
    ) {
        let mut t = started_tournament(n, seed);
        let mut settled = 0;
        let mut step = 0;

        while t.status == TournamentStatus::InProgress {
            let ready = t.ready_matches();
            prop_assert!(!ready.is_empty(), "an unfinished bracket always has a playable match");

            let (index, first_wins) = picks[step % picks.len()];
            let m = ready[index.index(ready.len())];
            let winner = if first_wins { m.player1 } else { m.player2 }.unwrap();
            let match_id = m.id;

            let outcome = t.record_result(match_id, winner, None, Utc::now()).unwrap();
            if outcome == ResultOutcome::Settled {
                settled += 1;
            }
            prop_assert_eq!(total_losses(&t), completed_matches(&t));
            step += 1;
        }

        prop_assert_eq!(settled, 1);
        prop_assert_eq!(t.status, TournamentStatus::Completed);
        prop_assert_eq!(completed_matches(&t), n - 1);

        let final_match = t.final_match().unwrap();
        prop_assert_eq!(final_match.status, MatchStatus::Completed);
        prop_assert_eq!(t.winner_id, final_match.winner);

        let survivors: Vec<_> = t.participants.iter().filter(|p| !p.eliminated).collect();
        prop_assert_eq!(survivors.len(), 1);
        prop_assert_eq!(Some(survivors[0].id), t.winner_id);

        let payouts = &t.settlement.as_ref().unwrap().payouts;
        prop_assert_eq!(payouts.len(), n);
    }

    #[test]
    fn test_recording_twice_equals_once(n in 2usize..=32, seed in any::<u64>(), first_wins in any::<bool>()) {
        let mut t = started_tournament(n, seed);
        let m = t.ready_matches()[0].clone();
        let winner = if first_wins { m.player1 } else { m.player2 }.unwrap();

        t.record_result(m.id, winner, None, Utc::now()).unwrap();
        let once = t.clone();
        let outcome = t.record_result(m.id, winner, None, Utc::now()).unwrap();

        prop_assert_eq!(outcome, ResultOutcome::Replayed);
        prop_assert_eq!(t, once);
    }

    #[test]
    fn test_pool_bonus_conserves_pool(pool in 0i64..=1_000_000_000) {
        let bonus = PoolBonus::from_pool(pool);
        prop_assert_eq!(bonus.first + bonus.second + bonus.third + bonus.retained, pool);
        prop_assert_eq!(bonus.distributed(), pool * 90 / 100);
        prop_assert!(bonus.first >= bonus.second);
        prop_assert!(bonus.retained >= 0);
    }
}
