//! `giftbot status` — summarize the snapshot without starting the bot.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use giftbot_config::AppConfig;
use giftbot_core::game::{GameState, RoundPhase};
use giftbot_engine::announce;
use giftbot_engine::load_snapshot;

pub fn run(config: &AppConfig, data_file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = data_file.unwrap_or_else(|| config.data_file.clone());

    println!("🎲 giftbot Status");
    println!("================");
    println!("  Config dir:  {}", AppConfig::config_dir().display());
    println!("  Channel:     {}", config.channel);
    println!("  Tick:        {}s", config.scheduler.tick_seconds);
    println!("  Snapshot:    {}", path.display());

    let Some(mut states) = load_snapshot(&path)? else {
        println!("\n  ⚠️  No snapshot yet — nothing has been played");
        return Ok(());
    };

    states.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
    println!("  Channels:    {}\n", states.len());
    let now = Utc::now();
    for state in &states {
        println!("  {}", describe(state, now));
    }
    Ok(())
}

/// One-line summary of a channel's game.
fn describe(state: &GameState, now: DateTime<Utc>) -> String {
    let phase = match state.phase {
        RoundPhase::Idle => "idle".to_string(),
        RoundPhase::Paused => format!("paused at round {}/{}", state.current_round, state.total_rounds),
        RoundPhase::Active { .. } => {
            let left = state
                .remaining(now)
                .map(announce::remaining)
                .unwrap_or_else(|| "overdue".into());
            format!(
                "round {}/{} ({left} left)",
                state.current_round, state.total_rounds
            )
        }
    };
    format!(
        "#{:<20} {phase:<28} keys: {:<3} range: {}..={} timeout: {}m",
        state.channel_id.as_str(),
        state.keys.len(),
        state.settings.min_number,
        state.settings.max_number,
        state.settings.timeout_minutes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftbot_core::channel::ChannelId;
    use giftbot_core::game::{GameSettings, RewardKey};

    #[test]
    fn describes_each_phase() {
        let now = Utc::now();
        let mut state = GameState::new(ChannelId::new("c1"), GameSettings::default());
        state.keys.push(RewardKey::new("Alpha", "K1"));
        assert!(describe(&state, now).contains("idle"));
        assert!(describe(&state, now).contains("keys: 1"));

        state.total_rounds = 1;
        state.begin_round(3, now);
        assert!(describe(&state, now).contains("round 1/1 (10m 0s left)"));
        assert!(describe(&state, now + chrono::Duration::minutes(11)).contains("overdue"));

        state.pause();
        assert!(describe(&state, now).contains("paused at round 1/1"));
    }
}
