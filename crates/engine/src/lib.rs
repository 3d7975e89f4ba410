//! # giftbot Engine
//!
//! The number-guessing game itself: per-channel state and its snapshot,
//! guess evaluation, the round lifecycle, the timeout scheduler and the
//! command adapter.
//!
//! ```text
//! channel ─▶ InboundRouter (one ordered queue per channel)
//!              ├─message─▶ RoundController::handle_message ─┐
//!              └─command─▶ CommandHandler::dispatch ────────┤──▶ GameRegistry ──▶ snapshot file
//! RoundScheduler::tick ──▶ RoundController::finalize ───────┘
//! ```

pub mod announce;
pub mod commands;
pub mod evaluator;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod scheduler;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use commands::{CommandHandler, GameCommand};
pub use evaluator::{IgnoreReason, Verdict};
pub use lifecycle::{NextStep, RoundController, RoundOutcome};
pub use registry::{GameHandle, GameRegistry, load_snapshot};
pub use router::InboundRouter;
pub use scheduler::RoundScheduler;
pub use snapshot::GameRecord;
