//! Tournament settings.

use super::{
    errors::{TournamentError, TournamentResult},
    models::{CreateTournamentRequest, Reward, RewardSchedule},
    settlement::MAX_PRIZE_POOL,
};
use serde::{Deserialize, Serialize};
use std::env;

/// Settings shared by every tournament a manager creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentSettings {
    /// Reward schedule used when a request does not bring its own
    pub default_rewards: RewardSchedule,

    /// Upper bound on `max_participants` (default: 256)
    pub max_participants_cap: usize,

    /// Longest registration window in minutes (default: one week)
    pub max_registration_minutes: i64,

    /// Compare-and-swap attempts before giving up on a contended aggregate
    pub commit_attempts: u32,
}

impl TournamentSettings {
    /// Load settings from environment variables
    ///
    /// Recognized variables (all optional):
    /// - `TOURNAMENT_FIRST_COINS` / `TOURNAMENT_FIRST_XP`
    /// - `TOURNAMENT_SECOND_COINS` / `TOURNAMENT_SECOND_XP`
    /// - `TOURNAMENT_THIRD_COINS` / `TOURNAMENT_THIRD_XP`
    /// - `TOURNAMENT_PARTICIPATION_COINS` / `TOURNAMENT_PARTICIPATION_XP`
    /// - `TOURNAMENT_MAX_PARTICIPANTS`
    /// - `TOURNAMENT_MAX_REGISTRATION_MINUTES`
    /// - `TOURNAMENT_COMMIT_ATTEMPTS`
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let reward = |prefix: &str, fallback: Reward| {
            Reward::new(
                env_or(&format!("TOURNAMENT_{prefix}_COINS"), fallback.coins),
                env_or(&format!("TOURNAMENT_{prefix}_XP"), fallback.experience),
            )
        };

        Self {
            default_rewards: RewardSchedule {
                first: reward("FIRST", defaults.default_rewards.first),
                second: reward("SECOND", defaults.default_rewards.second),
                third: reward("THIRD", defaults.default_rewards.third),
                participation: reward("PARTICIPATION", defaults.default_rewards.participation),
            },
            max_participants_cap: env_or("TOURNAMENT_MAX_PARTICIPANTS", defaults.max_participants_cap),
            max_registration_minutes: env_or(
                "TOURNAMENT_MAX_REGISTRATION_MINUTES",
                defaults.max_registration_minutes,
            ),
            commit_attempts: env_or("TOURNAMENT_COMMIT_ATTEMPTS", defaults.commit_attempts).max(1),
        }
    }

    /// Reject requests no tournament could be built from
    pub fn validate_request(&self, request: &CreateTournamentRequest) -> TournamentResult<()> {
        let invalid = |reason: String| Err(TournamentError::InvalidConfig(reason));

        if request.name.trim().is_empty() {
            return invalid("name must not be empty".to_string());
        }
        if request.scope_id.trim().is_empty() {
            return invalid("scope must not be empty".to_string());
        }
        if request.min_participants == 0 {
            return invalid("at least one participant is required".to_string());
        }
        if request.max_participants < request.min_participants {
            return invalid(format!(
                "max participants {} is below min participants {}",
                request.max_participants, request.min_participants
            ));
        }
        if request.max_participants > self.max_participants_cap {
            return invalid(format!(
                "max participants {} exceeds the cap of {}",
                request.max_participants, self.max_participants_cap
            ));
        }
        if request.entry_fee < 0 {
            return invalid(format!("entry fee {} is negative", request.entry_fee));
        }
        if request.registration_minutes < 0
            || request.registration_minutes > self.max_registration_minutes
        {
            return invalid(format!(
                "registration window of {} minutes is outside 0..={}",
                request.registration_minutes, self.max_registration_minutes
            ));
        }
        let full_pool = request
            .entry_fee
            .checked_mul(request.max_participants as i64)
            .filter(|pool| *pool <= MAX_PRIZE_POOL);
        if full_pool.is_none() {
            return invalid(format!(
                "entry fee {} for {} participants exceeds the pool limit of {}",
                request.entry_fee, request.max_participants, MAX_PRIZE_POOL
            ));
        }
        if request.rewards.is_some_and(|r| r.has_negative()) {
            return invalid("rewards must not be negative".to_string());
        }
        let rewards = request.rewards.unwrap_or(self.default_rewards);
        if [rewards.first, rewards.second, rewards.third, rewards.participation]
            .iter()
            .any(|r| r.coins > MAX_PRIZE_POOL)
        {
            return invalid(format!("coin rewards must not exceed {MAX_PRIZE_POOL}"));
        }

        Ok(())
    }
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            default_rewards: RewardSchedule::default(),
            max_participants_cap: 256,
            max_registration_minutes: 7 * 24 * 60,
            commit_attempts: 5,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::TournamentType;
    use serial_test::serial;

    fn request() -> CreateTournamentRequest {
        CreateTournamentRequest::new("Weekly", TournamentType::Fishing, "guild-9", 3)
    }

    #[test]
    fn test_default_request_is_valid() {
        assert!(TournamentSettings::default().validate_request(&request()).is_ok());
    }

    #[test]
    fn test_rejects_inverted_capacity() {
        let settings = TournamentSettings::default();
        let err = settings
            .validate_request(&request().with_capacity(8, 4))
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_capacity_over_cap() {
        let settings = TournamentSettings {
            max_participants_cap: 32,
            ..Default::default()
        };
        assert!(settings.validate_request(&request().with_capacity(2, 64)).is_err());
        assert!(settings.validate_request(&request().with_capacity(2, 32)).is_ok());
    }

    #[test]
    fn test_rejects_negative_fee_and_rewards() {
        let settings = TournamentSettings::default();
        assert!(settings.validate_request(&request().with_entry_fee(-1)).is_err());

        let mut rewards = RewardSchedule::default();
        rewards.third.coins = -5;
        assert!(settings.validate_request(&request().with_rewards(rewards)).is_err());
    }

    #[test]
    fn test_rejects_fee_whose_full_pool_is_out_of_range() {
        let settings = TournamentSettings::default();
        let err = settings
            .validate_request(
                &request()
                    .with_capacity(2, 4)
                    .with_entry_fee(100_000_000_000_000_000),
            )
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidConfig(_)));

        assert!(
            settings
                .validate_request(&request().with_capacity(2, 4).with_entry_fee(i64::MAX))
                .is_err()
        );
        assert!(
            settings
                .validate_request(&request().with_capacity(2, 4).with_entry_fee(MAX_PRIZE_POOL / 4))
                .is_ok()
        );
    }

    #[test]
    fn test_rejects_coin_reward_above_pool_limit() {
        let settings = TournamentSettings::default();
        let mut rewards = RewardSchedule::default();
        rewards.first.coins = MAX_PRIZE_POOL + 1;
        assert!(settings.validate_request(&request().with_rewards(rewards)).is_err());

        let generous = TournamentSettings {
            default_rewards: rewards,
            ..Default::default()
        };
        assert!(generous.validate_request(&request()).is_err());
    }

    #[test]
    fn test_rejects_empty_name_and_zero_minimum() {
        let settings = TournamentSettings::default();
        let mut blank = request();
        blank.name = "   ".to_string();
        assert!(settings.validate_request(&blank).is_err());
        assert!(settings.validate_request(&request().with_capacity(0, 4)).is_err());
    }

    #[test]
    fn test_rejects_registration_window() {
        let settings = TournamentSettings::default();
        assert!(
            settings
                .validate_request(&request().with_registration_minutes(-5))
                .is_err()
        );
        assert!(
            settings
                .validate_request(&request().with_registration_minutes(7 * 24 * 60 + 1))
                .is_err()
        );
    }

    #[test]
    #[serial]
    fn test_from_env_reads_overrides() {
        // SAFETY: serialized with every other test that touches these variables
        unsafe {
            env::set_var("TOURNAMENT_FIRST_COINS", "4000");
            env::set_var("TOURNAMENT_COMMIT_ATTEMPTS", "0");
            env::set_var("TOURNAMENT_MAX_PARTICIPANTS", "lots");
        }

        let settings = TournamentSettings::from_env();
        assert_eq!(settings.default_rewards.first.coins, 4000);
        assert_eq!(settings.default_rewards.first.experience, 500);
        assert_eq!(settings.commit_attempts, 1);
        assert_eq!(settings.max_participants_cap, 256);

        unsafe {
            env::remove_var("TOURNAMENT_FIRST_COINS");
            env::remove_var("TOURNAMENT_COMMIT_ATTEMPTS");
            env::remove_var("TOURNAMENT_MAX_PARTICIPANTS");
        }
    }
}
