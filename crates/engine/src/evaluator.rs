//! Guess evaluation.
//!
//! Pure functions from message text and the current [`GameState`] to a
//! [`Verdict`]. Applying the verdict (recording the best guess, persisting,
//! finalizing) is the round controller's job.

use chrono::{DateTime, Utc};
use giftbot_core::game::GameState;

/// Why a message was not treated as a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Authored by a bot account
    BotAuthor,
    /// No round is accepting guesses (idle or paused)
    NotRunning,
    /// The message holds no digits
    NoDigits,
    /// The digits form a number outside the configured range
    OutOfRange(u64),
}

/// Outcome of evaluating one message against a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ignored(IgnoreReason),
    /// The deadline has passed; the round must be finalized as a timeout
    Expired,
    /// A valid guess that does not beat the current best
    NotImproved { offset: u64 },
    /// A new best guess; `offset == 0` is an exact match
    Improved { offset: u64, previous: Option<u64> },
}

impl Verdict {
    pub fn is_exact(&self) -> bool {
        matches!(self, Verdict::Improved { offset: 0, .. })
    }
}

/// Concatenate every ASCII digit in `text`, in order, and parse the result.
///
/// `"room 42 floor 3"` yields `423`. Returns `None` when there are no digits
/// or the digits overflow `u64` (which no configured range can contain).
pub fn extract_guess(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Evaluate `text` as a guess in `state` at time `now`.
pub fn evaluate(state: &GameState, text: &str, now: DateTime<Utc>) -> Verdict {
    if !state.is_active() {
        return Verdict::Ignored(IgnoreReason::NotRunning);
    }

    if state.is_expired(now) {
        return Verdict::Expired;
    }

    let digits_present = text.chars().any(|c| c.is_ascii_digit());
    let guess = match extract_guess(text) {
        Some(guess) => guess,
        None if digits_present => return Verdict::Ignored(IgnoreReason::OutOfRange(u64::MAX)),
        None => return Verdict::Ignored(IgnoreReason::NoDigits),
    };

    if !state.settings.contains(guess) {
        return Verdict::Ignored(IgnoreReason::OutOfRange(guess));
    }

    let offset = state.number.abs_diff(guess);
    let previous = state.best.as_ref().map(|b| b.offset);

    match previous {
        Some(best) if offset >= best => Verdict::NotImproved { offset },
        _ => Verdict::Improved { offset, previous },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use giftbot_core::channel::{ChannelId, UserId};
    use giftbot_core::game::GameSettings;

    fn active_state(number: u64, min: i64, max: i64) -> (GameState, DateTime<Utc>) {
        let now = Utc::now();
        let mut state = GameState::new(
            ChannelId::new("c1"),
            GameSettings::new(min, max, 10).unwrap(),
        );
        state.begin_round(number, now);
        (state, now)
    }

    #[test]
    fn extraction_concatenates_digits_in_order() {
        assert_eq!(extract_guess("a1b2c3"), Some(123));
        assert_eq!(extract_guess("room 42 floor 3"), Some(423));
        assert_eq!(extract_guess("007"), Some(7));
        assert_eq!(extract_guess("no numbers here"), None);
        assert_eq!(extract_guess(""), None);
    }

    #[test]
    fn extraction_ignores_non_ascii_digits() {
        // Arabic-Indic and superscript digits are not guesses
        assert_eq!(extract_guess("٤٢"), None);
        assert_eq!(extract_guess("x²5"), Some(5));
    }

    #[test]
    fn extraction_overflow_is_none() {
        assert_eq!(extract_guess("99999999999999999999999"), None);
    }

    #[test]
    fn inactive_round_ignores_everything() {
        let (mut state, now) = active_state(50, 0, 100);
        state.pause();
        assert_eq!(
            evaluate(&state, "50", now),
            Verdict::Ignored(IgnoreReason::NotRunning)
        );

        state.stop();
        assert_eq!(
            evaluate(&state, "50", now),
            Verdict::Ignored(IgnoreReason::NotRunning)
        );
    }

    #[test]
    fn expired_round_is_reported_before_parsing() {
        let (state, now) = active_state(50, 0, 100);
        let later = now + Duration::minutes(10);
        assert_eq!(evaluate(&state, "50", later), Verdict::Expired);
        assert_eq!(evaluate(&state, "hello", later), Verdict::Expired);
    }

    #[test]
    fn no_digits_and_out_of_range_are_ignored() {
        let (state, now) = active_state(50, 10, 100);
        assert_eq!(
            evaluate(&state, "hello there", now),
            Verdict::Ignored(IgnoreReason::NoDigits)
        );
        assert_eq!(
            evaluate(&state, "5", now),
            Verdict::Ignored(IgnoreReason::OutOfRange(5))
        );
        assert_eq!(
            evaluate(&state, "1 and 01", now),
            Verdict::Ignored(IgnoreReason::OutOfRange(101))
        );
    }

    #[test]
    fn first_valid_guess_always_improves() {
        let (state, now) = active_state(50, 0, 100);
        assert_eq!(
            evaluate(&state, "I think 60", now),
            Verdict::Improved {
                offset: 10,
                previous: None
            }
        );
    }

    #[test]
    fn only_strictly_smaller_offsets_improve() {
        let (mut state, now) = active_state(50, 0, 100);
        state.record_best(10, UserId::new("alice"));

        // Tie from the other side does not overwrite
        assert_eq!(
            evaluate(&state, "40", now),
            Verdict::NotImproved { offset: 10 }
        );
        assert_eq!(
            evaluate(&state, "70", now),
            Verdict::NotImproved { offset: 20 }
        );
        assert_eq!(
            evaluate(&state, "45", now),
            Verdict::Improved {
                offset: 5,
                previous: Some(10)
            }
        );
    }

    #[test]
    fn exact_match_is_flagged() {
        let (state, now) = active_state(7, 0, 10);
        let verdict = evaluate(&state, "it's 7!", now);
        assert!(verdict.is_exact());
        assert!(!evaluate(&state, "8", now).is_exact());
    }
}
