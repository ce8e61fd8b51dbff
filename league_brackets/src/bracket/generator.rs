//! Bracket generation.
//!
//! The generator is pure: it takes entrants in seed order plus options and
//! returns the round/match topology with every forward edge resolved. It
//! builds an arena of draft matches first, then numbers matches in creation
//! order and fixes the home/away slot of every edge from those numbers.
//!
//! Losers of bye matches do not exist, so ladder pairings involving them are
//! folded away at generation time: the present side passes straight through
//! and no match is created. Bye matches come out COMPLETED, with their team
//! already written into the slot the winner edge points at.

use super::models::{
    BracketFormat, BracketKind, BracketOptions, BracketStructure, EntrantId, GeneratedMatch,
    GeneratedRound, MatchLink, MatchStatus, Slot,
};
use super::seeding::{place_entrants, seed_order};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Generator errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("Need at least 2 teams to build a bracket, got {0}")]
    TooFewEntrants(usize),

    #[error("Team {0} appears more than once")]
    DuplicateEntrant(EntrantId),

    #[error("Consolation bracket is only available for single elimination")]
    ConsolationRequiresSingleElimination,
}

/// Where a slot gets its team from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Winner(usize),
    Loser(usize),
}

#[derive(Debug)]
struct DraftMatch {
    home: Option<EntrantId>,
    away: Option<EntrantId>,
    is_bye: bool,
    winner: Option<EntrantId>,
    winner_to: Option<usize>,
    loser_to: Option<usize>,
}

#[derive(Debug)]
enum RoundTitle {
    Fixed(String),
    /// Numbered after empty rounds are dropped
    Ladder(&'static str),
}

#[derive(Debug)]
struct DraftRound {
    bracket: BracketKind,
    title: RoundTitle,
    matches: Vec<usize>,
}

/// Sources leaving a round: winners, then losers
type RoundOutputs = (Vec<Option<Source>>, Vec<Option<Source>>);

#[derive(Debug, Default)]
struct Draft {
    rounds: Vec<DraftRound>,
    matches: Vec<DraftMatch>,
}

impl Draft {
    fn open_round(&mut self, bracket: BracketKind, title: RoundTitle) -> usize {
        self.rounds.push(DraftRound {
            bracket,
            title,
            matches: Vec::new(),
        });
        self.rounds.len() - 1
    }

    fn add_match(&mut self, round: usize, home: Option<EntrantId>, away: Option<EntrantId>) -> usize {
        self.matches.push(DraftMatch {
            home,
            away,
            is_bye: home.is_some() != away.is_some(),
            winner: None,
            winner_to: None,
            loser_to: None,
        });
        let index = self.matches.len() - 1;
        self.rounds[round].matches.push(index);
        index
    }

    fn link(&mut self, source: Source, target: usize) {
        match source {
            Source::Winner(m) => self.matches[m].winner_to = Some(target),
            Source::Loser(m) => self.matches[m].loser_to = Some(target),
        }
    }

    fn loser_of(&self, m: usize) -> Option<Source> {
        (!self.matches[m].is_bye).then_some(Source::Loser(m))
    }

    /// Pair two sources in `round`, returning the (winner, loser) sources.
    fn pair(
        &mut self,
        round: usize,
        a: Option<Source>,
        b: Option<Source>,
    ) -> (Option<Source>, Option<Source>) {
        match (a, b) {
            (Some(a), Some(b)) => {
                let m = self.add_match(round, None, None);
                self.link(a, m);
                self.link(b, m);
                (Some(Source::Winner(m)), Some(Source::Loser(m)))
            }
            (Some(only), None) | (None, Some(only)) => (Some(only), None),
            (None, None) => (None, None),
        }
    }

    fn build_main(
        &mut self,
        placement: &[EntrantId],
        size: usize,
        format: BracketFormat,
    ) -> Vec<Vec<usize>> {
        let total_rounds = size.trailing_zeros() as usize;
        let mut rounds: Vec<Vec<usize>> = Vec::with_capacity(total_rounds);

        let first = self.open_round(
            BracketKind::Main,
            RoundTitle::Fixed(main_round_name(1, total_rounds, format)),
        );
        let opening = seed_order(size)
            .chunks(2)
            .map(|pair| {
                let home = placement.get(pair[0] - 1).copied();
                let away = placement.get(pair[1] - 1).copied();
                self.add_match(first, home, away)
            })
            .collect();
        rounds.push(opening);

        for number in 2..=total_rounds {
            let round = self.open_round(
                BracketKind::Main,
                RoundTitle::Fixed(main_round_name(number, total_rounds, format)),
            );
            let previous = rounds.last().cloned().unwrap_or_default();
            let current = previous
                .chunks(2)
                .map(|feeders| {
                    let m = self.add_match(round, None, None);
                    for &feeder in feeders {
                        self.link(Source::Winner(feeder), m);
                    }
                    m
                })
                .collect();
            rounds.push(current);
        }

        rounds
    }

    fn loser_groups(&self, rounds: &[Vec<usize>]) -> Vec<Vec<Option<Source>>> {
        rounds
            .iter()
            .map(|round| round.iter().map(|&m| self.loser_of(m)).collect())
            .collect()
    }

    /// Pair neighbours; an odd survivor moves on without playing.
    fn reduce(&mut self, prefix: &'static str, survivors: &[Option<Source>]) -> RoundOutputs {
        let round = self.open_round(BracketKind::Losers, RoundTitle::Ladder(prefix));
        let mut winners = Vec::with_capacity(survivors.len().div_ceil(2));
        let mut losers = Vec::with_capacity(survivors.len().div_ceil(2));

        for chunk in survivors.chunks(2) {
            let partner = chunk.get(1).copied().flatten();
            let (winner, loser) = self.pair(round, chunk[0], partner);
            winners.push(winner);
            losers.push(loser);
        }

        (winners, losers)
    }

    /// Build one losers ladder fed by `groups` of dropped teams, in order.
    ///
    /// Survivors are halved until they match the size of the incoming group,
    /// then each survivor meets one dropped team (drops enter in reverse
    /// order to push rematches back). Returns the ladder winner and, per
    /// ladder round, the sources eliminated in it.
    fn build_ladder(
        &mut self,
        prefix: &'static str,
        groups: Vec<Vec<Option<Source>>>,
    ) -> (Option<Source>, Vec<Vec<Option<Source>>>) {
        let mut survivors: Vec<Option<Source>> = Vec::new();
        let mut eliminated = Vec::new();

        for mut group in groups {
            if group.is_empty() {
                continue;
            }
            if survivors.is_empty() {
                survivors = group;
                continue;
            }

            while survivors.len() > group.len() {
                let (next, losers) = self.reduce(prefix, &survivors);
                survivors = next;
                eliminated.push(losers);
            }

            let extra = if group.len() > survivors.len() {
                group.split_off(survivors.len())
            } else {
                Vec::new()
            };
            group.reverse();

            let round = self.open_round(BracketKind::Losers, RoundTitle::Ladder(prefix));
            let mut next = Vec::with_capacity(survivors.len() + extra.len());
            let mut losers = Vec::with_capacity(survivors.len());
            for (survivor, dropped) in survivors.iter().zip(group) {
                let (winner, loser) = self.pair(round, dropped, *survivor);
                next.push(winner);
                losers.push(loser);
            }
            next.extend(extra);
            survivors = next;
            eliminated.push(losers);
        }

        while survivors.len() > 1 {
            let (next, losers) = self.reduce(prefix, &survivors);
            survivors = next;
            eliminated.push(losers);
        }

        (survivors.into_iter().next().flatten(), eliminated)
    }

    fn build_consolation(&mut self, main: &[Vec<usize>]) {
        let Some(semifinals) = main.len().checked_sub(2).map(|i| &main[i]) else {
            return;
        };
        let losers: Vec<Option<Source>> = semifinals.iter().map(|&m| self.loser_of(m)).collect();

        // A semifinal bye leaves nobody to play for third
        if let [Some(a), Some(b)] = losers[..] {
            let round = self.open_round(
                BracketKind::Consolation,
                RoundTitle::Fixed("Third Place".to_string()),
            );
            self.pair(round, Some(a), Some(b));
        }
    }

    fn build_grand_final(&mut self, champion: Option<Source>, challenger: Option<Source>) {
        let round = self.open_round(
            BracketKind::Main,
            RoundTitle::Fixed("Grand Final".to_string()),
        );
        self.pair(round, champion, challenger);
    }

    /// Complete every bye and write its team into the slot its winner edge
    /// targets. Repeats until a pass changes nothing, so a bye whose team only
    /// arrives through another bye resolves too.
    fn resolve_byes(&mut self, winner_slots: &HashMap<usize, Slot>) -> usize {
        let mut resolved = 0;
        loop {
            let mut progressed = false;
            for index in 0..self.matches.len() {
                let m = &self.matches[index];
                if !m.is_bye || m.winner.is_some() {
                    continue;
                }
                let Some(team) = m.home.or(m.away) else {
                    continue;
                };
                let target = m.winner_to.zip(winner_slots.get(&index).copied());

                self.matches[index].winner = Some(team);
                if let Some((target, slot)) = target {
                    let next = &mut self.matches[target];
                    match slot {
                        Slot::Home => next.home = Some(team),
                        Slot::Away => next.away = Some(team),
                    }
                }
                resolved += 1;
                progressed = true;
            }
            if !progressed {
                return resolved;
            }
        }
    }

    fn finish(mut self, format: BracketFormat, bracket_size: usize, byes: usize) -> BracketStructure {
        // Feeders of each target, ordered by (match number, winner before loser)
        let mut incoming: HashMap<usize, Vec<(usize, bool)>> = HashMap::new();
        for (index, m) in self.matches.iter().enumerate() {
            if let Some(target) = m.winner_to {
                incoming.entry(target).or_default().push((index, false));
            }
            if let Some(target) = m.loser_to {
                incoming.entry(target).or_default().push((index, true));
            }
        }

        let mut winner_slots: HashMap<usize, Slot> = HashMap::new();
        let mut loser_slots: HashMap<usize, Slot> = HashMap::new();
        for feeders in incoming.values_mut() {
            feeders.sort_unstable();
            for (position, &(source, is_loser)) in feeders.iter().enumerate() {
                let slot = if position == 0 { Slot::Home } else { Slot::Away };
                if is_loser {
                    loser_slots.insert(source, slot);
                } else {
                    winner_slots.insert(source, slot);
                }
            }
        }

        let resolved = self.resolve_byes(&winner_slots);
        if resolved > 0 {
            log::trace!("Advanced {} bye winners", resolved);
        }

        let number = |index: usize| index as u32 + 1;
        let mut round_counters: HashMap<BracketKind, u32> = HashMap::new();
        let mut ladder_counters: HashMap<&'static str, u32> = HashMap::new();
        let mut rounds = Vec::with_capacity(self.rounds.len());

        for round in self.rounds.iter().filter(|r| !r.matches.is_empty()) {
            let counter = round_counters.entry(round.bracket).or_insert(0);
            *counter += 1;

            let name = match &round.title {
                RoundTitle::Fixed(name) => name.clone(),
                RoundTitle::Ladder(prefix) => {
                    let n = ladder_counters.entry(*prefix).or_insert(0);
                    *n += 1;
                    format!("{prefix} {n}")
                }
            };

            let matches = round
                .matches
                .iter()
                .map(|&index| {
                    let m = &self.matches[index];
                    let status = if m.winner.is_some() {
                        MatchStatus::Completed
                    } else if m.home.is_some() && m.away.is_some() {
                        MatchStatus::Scheduled
                    } else {
                        MatchStatus::Pending
                    };
                    GeneratedMatch {
                        match_number: number(index),
                        bracket: round.bracket,
                        home: m.home,
                        away: m.away,
                        is_bye: m.is_bye,
                        status,
                        winner: m.winner,
                        winner_to: m
                            .winner_to
                            .zip(winner_slots.get(&index).copied())
                            .map(|(target, slot)| MatchLink {
                                match_number: number(target),
                                slot,
                            }),
                        loser_to: m
                            .loser_to
                            .zip(loser_slots.get(&index).copied())
                            .map(|(target, slot)| MatchLink {
                                match_number: number(target),
                                slot,
                            }),
                    }
                })
                .collect();

            rounds.push(GeneratedRound {
                bracket: round.bracket,
                round_number: *counter,
                name,
                matches,
            });
        }
        rounds.sort_by_key(|r| (r.bracket, r.round_number));

        let total_matches = self.matches.iter().filter(|m| !m.is_bye).count();

        BracketStructure {
            format,
            bracket_size,
            byes,
            rounds,
            total_matches,
        }
    }
}

fn main_round_name(number: usize, total_rounds: usize, format: BracketFormat) -> String {
    let prefix = match format {
        BracketFormat::SingleElimination => "",
        _ => "Winners ",
    };
    match total_rounds - number {
        0 => format!("{prefix}Final"),
        1 => format!("{prefix}Semifinals"),
        2 => format!("{prefix}Quarterfinals"),
        _ => format!("Round {number}"),
    }
}

fn validate(entrants: &[EntrantId], options: &BracketOptions) -> Result<(), GeneratorError> {
    if entrants.len() < 2 {
        return Err(GeneratorError::TooFewEntrants(entrants.len()));
    }

    let mut seen = HashSet::with_capacity(entrants.len());
    if let Some(&duplicate) = entrants.iter().find(|id| !seen.insert(**id)) {
        return Err(GeneratorError::DuplicateEntrant(duplicate));
    }

    if options.has_consolation_bracket && options.format != BracketFormat::SingleElimination {
        return Err(GeneratorError::ConsolationRequiresSingleElimination);
    }

    Ok(())
}

/// Generate a bracket for `entrants` (ordered by seed) using the thread RNG
/// for random byes.
pub fn generate_bracket(
    entrants: &[EntrantId],
    options: &BracketOptions,
) -> Result<BracketStructure, GeneratorError> {
    generate_bracket_with_rng(entrants, options, &mut rand::rng())
}

/// Generate a bracket with a caller-supplied RNG
///
/// # Errors
///
/// * `GeneratorError::TooFewEntrants` - fewer than two entrants
/// * `GeneratorError::DuplicateEntrant` - an entrant is listed twice
/// * `GeneratorError::ConsolationRequiresSingleElimination` - consolation
///   requested for double or triple elimination
pub fn generate_bracket_with_rng<R: Rng + ?Sized>(
    entrants: &[EntrantId],
    options: &BracketOptions,
    rng: &mut R,
) -> Result<BracketStructure, GeneratorError> {
    validate(entrants, options)?;

    let size = entrants.len().next_power_of_two();
    let byes = size - entrants.len();
    let placement = place_entrants(entrants, byes, options.random_byes, rng);

    let mut draft = Draft::default();
    let main = draft.build_main(&placement, size, options.format);
    let champion = main
        .last()
        .and_then(|round| round.first())
        .map(|&m| Source::Winner(m));

    match options.format {
        BracketFormat::SingleElimination => {
            if options.has_consolation_bracket {
                draft.build_consolation(&main);
            }
        }
        BracketFormat::DoubleElimination => {
            let groups = draft.loser_groups(&main);
            let (challenger, _) = draft.build_ladder("Losers Round", groups);
            draft.build_grand_final(champion, challenger);
        }
        BracketFormat::TripleElimination => {
            let groups = draft.loser_groups(&main);
            let (first_ladder, dropped) = draft.build_ladder("Losers A Round", groups);
            let (second_ladder, _) = draft.build_ladder("Losers B Round", dropped);
            let round = draft.open_round(
                BracketKind::Losers,
                RoundTitle::Fixed("Losers Final".to_string()),
            );
            let (challenger, _) = draft.pair(round, first_ladder, second_ladder);
            draft.build_grand_final(champion, challenger);
        }
    }

    let structure = draft.finish(options.format, size, byes);
    log::debug!(
        "Generated {} bracket: {} teams, size {}, {} byes, {} rounds, {} matches",
        options.format.as_str(),
        entrants.len(),
        size,
        byes,
        structure.rounds.len(),
        structure.total_matches
    );

    Ok(structure)
}
