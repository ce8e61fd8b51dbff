//! # League Brackets
//!
//! Elimination bracket engine for league tournaments.
//!
//! The crate generates single, double and triple elimination brackets,
//! persists them as linked rounds and matches, and advances teams as results
//! are recorded until a final placement is decided.
//!
//! ## Core Modules
//!
//! - [`bracket`]: pure bracket generation (seeding, byes, losers ladders)
//! - [`tournament`]: lifecycle manager, result processor, events, errors
//! - [`db`]: repository traits with PostgreSQL and in-memory stores
//!
//! ## Example
//!
//! ```
//! use league_brackets::bracket::{BracketFormat, BracketOptions, generate_bracket};
//!
//! let options = BracketOptions::single_elimination().with_format(BracketFormat::DoubleElimination);
//! let bracket = generate_bracket(&[1, 2, 3, 4], &options).unwrap();
//! assert_eq!(bracket.total_matches, 6);
//! ```

/// Bracket structure generation.
pub mod bracket;

/// Persistence layer.
pub mod db;

/// Tournament lifecycle and match results.
pub mod tournament;

pub use bracket::{BracketFormat, BracketKind, BracketOptions, BracketStructure, generate_bracket};
pub use tournament::{
    BracketError, BracketResult, MatchResultProcessor, TournamentLifecycleManager,
};
