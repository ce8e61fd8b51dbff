//! Elimination bracket generation.
//!
//! Generation is pure: no storage, no clock. The lifecycle manager feeds it
//! tournament team ids in seed order and persists the result.
//!
//! ## Example
//!
//! ```
//! use league_brackets::bracket::{BracketOptions, generate_bracket};
//!
//! let bracket = generate_bracket(&[1, 2, 3], &BracketOptions::single_elimination()).unwrap();
//! assert_eq!(bracket.bracket_size, 4);
//! assert_eq!(bracket.byes, 1);
//! assert_eq!(bracket.total_matches, 2);
//!
//! // Seed 1 has the bye and already waits in the final
//! assert_eq!(bracket.rounds[1].matches[0].home, Some(1));
//! ```

pub mod generator;
pub mod models;
pub mod seeding;

pub use generator::{GeneratorError, generate_bracket, generate_bracket_with_rng};
pub use models::{
    BracketFormat, BracketKind, BracketOptions, BracketStructure, EntrantId, GeneratedMatch,
    GeneratedRound, MatchLink, MatchStatus, ParseEnumError, Slot,
};
pub use seeding::{place_entrants, seed_order};
