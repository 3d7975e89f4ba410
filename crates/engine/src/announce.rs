//! Text of everything the engine posts.

use chrono::Duration;
use giftbot_core::game::{GameState, RewardKey};

const UNKNOWN_GAME: &str = "Unknown";

fn game_name(state: &GameState) -> &str {
    state
        .current_key()
        .map(|k| k.game_name.as_str())
        .unwrap_or(UNKNOWN_GAME)
}

fn round_details(state: &GameState, per_round: bool) -> String {
    format!(
        "🎮 Game: **{}**\n\
         🎲 Guess a number between **{}** and **{}**!\n\
         ⏱️ Time limit: **{}** minutes{}\n\
         💡 Just type any message with a number in this channel!",
        game_name(state),
        state.settings.min_number,
        state.settings.max_number,
        state.settings.timeout_minutes,
        if per_round { " per round" } else { "" },
    )
}

/// First round of a new game.
pub fn game_started(state: &GameState) -> String {
    format!(
        "🎮 **Number Guessing Game Started!**\n\
         🏆 Total rounds: **{}**\n\n\
         ▶️ **Round {}/{}**\n{}",
        state.total_rounds,
        state.current_round,
        state.total_rounds,
        round_details(state, true),
    )
}

/// A subsequent round started automatically.
pub fn round_started(state: &GameState) -> String {
    format!(
        "▶️ **Round {}/{} Starting!**\n{}",
        state.current_round,
        state.total_rounds,
        round_details(state, false),
    )
}

/// A paused round restarted.
pub fn round_resumed(state: &GameState) -> String {
    format!(
        "▶️ **Round {}/{} Resumed!**\n{}",
        state.current_round,
        state.total_rounds,
        round_details(state, false),
    )
}

pub fn round_won(state: &GameState, winner: &str, offset: u64) -> String {
    let accuracy = if offset == 0 {
        format!("The hidden number was exactly **{}**.", state.number)
    } else {
        format!(
            "The hidden number was **{}**. The user was **{offset}** off!",
            state.number
        )
    };
    format!(
        "🎉 User {winner} won round {}/{}! {accuracy}",
        state.current_round, state.total_rounds
    )
}

pub fn round_no_winner(state: &GameState) -> String {
    format!(
        "⏰ Round {}/{} ended with no winner!",
        state.current_round, state.total_rounds
    )
}

pub fn game_over() -> String {
    "🏁 All rounds completed! Game over.".into()
}

/// Private message carrying the reward.
pub fn reward(round: u32, key: &RewardKey) -> String {
    format!(
        "🎁 **Congratulations!** You won round {round}!\n\n\
         **Game:** {}\n\
         **Key:** `{}`",
        key.game_name, key.key
    )
}

pub fn reward_unreachable(winner: &str) -> String {
    format!("❌ Failed to send DM to {winner}. Please enable DMs.")
}

pub fn reward_failed(winner: &str) -> String {
    format!("❌ Failed to send message to {winner}")
}

/// `3m 7s` style rendering of a remaining duration.
pub fn remaining(left: Duration) -> String {
    let secs = left.num_seconds().max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use giftbot_core::channel::ChannelId;
    use giftbot_core::game::GameSettings;

    fn running() -> GameState {
        let mut state = GameState::new(ChannelId::new("c"), GameSettings::new(0, 10, 1).unwrap());
        state.keys = vec![RewardKey::new("Alpha", "K1"), RewardKey::new("Beta", "K2")];
        state.total_rounds = 2;
        state.begin_round(4, Utc::now());
        state
    }

    #[test]
    fn start_banner_names_game_and_range() {
        let text = game_started(&running());
        assert!(text.contains("Total rounds: **2**"));
        assert!(text.contains("Round 1/2"));
        assert!(text.contains("**Alpha**"));
        assert!(text.contains("between **0** and **10**"));
        assert!(text.contains("minutes per round"));
    }

    #[test]
    fn winner_framing_exact_vs_off_by() {
        let state = running();
        assert!(round_won(&state, "<@u>", 0).contains("exactly **4**"));
        let off = round_won(&state, "<@u>", 3);
        assert!(off.contains("**3** off"));
        assert!(off.contains("round 1/2"));
    }

    #[test]
    fn banner_without_key_says_unknown() {
        let mut state = running();
        state.keys.clear();
        assert!(round_started(&state).contains("**Unknown**"));
    }

    #[test]
    fn remaining_formats_minutes_seconds() {
        assert_eq!(remaining(Duration::seconds(187)), "3m 7s");
        assert_eq!(remaining(Duration::seconds(-5)), "0m 0s");
    }
}
