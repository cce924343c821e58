//! chasebeat — a chase-themed rhythm game engine.
//!
//! Charts play back against an audio-derived clock; player inputs are
//! judged into timing grades that feed a score/combo tracker and a
//! pursuit meter. A solo session runs the chase locally; a versus session
//! reconciles score and terminal state with a remote lobby authority.

pub mod audio;
pub mod chart;
pub mod clock;
pub mod config;
pub mod engine;
pub mod lobby;
pub mod util;

#[cfg(test)]
mod test_utils;
