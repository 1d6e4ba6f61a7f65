use std::fmt::{Display, Formatter};
use std::thread;
use std::time::Instant;

use chrono::Local;
use colored::Colorize;
use crossbeam_channel::unbounded;

use crate::games::rules::RulesBoard;
use crate::games::{BoardView, Color, Finish, NUM_COLORS};
use crate::play::AnyAgent;

#[derive(Copy, Clone, Eq, PartialEq, Debug, derive_more::Display)]
pub struct GameId(pub u64);

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum EndReason {
    KingCaptured,
    TimeForfeit(Color),
    IllegalMove(Color),
    AgentError(Color),
    NoMoves,
    TurnCap,
}

impl Display for EndReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::KingCaptured => write!(f, "king captured"),
            EndReason::TimeForfeit(color) => write!(f, "{color} ran out of time"),
            EndReason::IllegalMove(color) => write!(f, "{color} answered an illegal move"),
            EndReason::AgentError(color) => write!(f, "{color} failed to answer"),
            EndReason::NoMoves => write!(f, "no legal reply, drawn"),
            EndReason::TurnCap => write!(f, "turn cap reached, drawn"),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct GameOutcome {
    pub id: GameId,
    pub finish: Option<Finish>,
    pub reason: EndReason,
    pub turns: u32,
}

impl Display for GameOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.finish {
            Some(finish) => write!(f, "{0} after {1} moves", finish, self.turns),
            None => write!(f, "{0} after {1} moves", self.reason, self.turns),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MatchSettings {
    pub clock_millis: u64,
    pub turn_cap: u32,
    pub verbose: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            clock_millis: 60_000,
            turn_cap: 300,
            verbose: false,
        }
    }
}

/// Plays one full game between three agents, charging thinking time against
/// the board's clocks and adjudicating bad replies.
pub fn run_game(id: GameId, agents: &mut [AnyAgent; NUM_COLORS], settings: &MatchSettings) -> GameOutcome {
    let mut board = RulesBoard::startpos(settings.clock_millis);
    let outcome = |board: &RulesBoard, reason| GameOutcome {
        id,
        finish: board.finish(),
        reason,
        turns: board.move_count(),
    };
    loop {
        if board.finish().is_some() {
            return outcome(&board, EndReason::KingCaptured);
        }
        if board.move_count() >= settings.turn_cap {
            return outcome(&board, EndReason::TurnCap);
        }
        if board.legal_moves().is_empty() {
            return outcome(&board, EndReason::NoMoves);
        }
        let color = board.turn();
        let start = Instant::now();
        let reply = agents[color.index()].select(&board);
        let spent = (start.elapsed().as_millis() as u64).max(1);
        if !board.consume_time(color, spent) {
            return outcome(&board, EndReason::TimeForfeit(color));
        }
        match reply {
            Err(message) => {
                if settings.verbose {
                    println!("{0}: {message}", "agent error".red());
                }
                return outcome(&board, EndReason::AgentError(color));
            }
            Ok((from, to)) => {
                if !board.try_move(from, to) {
                    return outcome(&board, EndReason::IllegalMove(color));
                }
                if settings.verbose {
                    println!(
                        "{0} plays {from}{to} ({spent} ms)",
                        color.to_string().bold()
                    );
                    println!("{board}");
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SeatStats {
    pub wins: u32,
    pub losses: u32,
    pub thirds: u32,
    pub draws: u32,
}

pub fn tally(stats: &mut [SeatStats; NUM_COLORS], outcome: &GameOutcome) {
    match outcome.finish {
        Some(finish) => {
            stats[finish.winner.index()].wins += 1;
            stats[finish.loser.index()].losses += 1;
            stats[finish.bystander().index()].thirds += 1;
        }
        None => match outcome.reason {
            EndReason::TimeForfeit(color)
            | EndReason::IllegalMove(color)
            | EndReason::AgentError(color) => {
                stats[color.index()].losses += 1;
                for other in color.others() {
                    stats[other.index()].draws += 1;
                }
            }
            _ => {
                for seat in stats.iter_mut() {
                    seat.draws += 1;
                }
            }
        },
    }
}

pub fn format_stats(agents: &[AnyAgent; NUM_COLORS], stats: &[SeatStats; NUM_COLORS]) -> String {
    let mut lines = Vec::new();
    for (seat, agent) in agents.iter().enumerate() {
        let s = stats[seat];
        lines.push(format!(
            "{0:<22} {1} / {2} / {3} / {4}",
            format!("{0} ({1})", Color::from_repr(seat as u8).unwrap(), agent.name()),
            s.wins.to_string().green(),
            s.losses.to_string().red(),
            s.thirds,
            s.draws,
        ));
    }
    format!("seat (engine)          wins / losses / thirds / draws\n{0}", lines.join("\n"))
}

/// Runs `games` independent games spread over worker threads. Each worker
/// owns cloned agents, so nothing mutable is shared; outcomes are collected
/// over a channel and tallied per seat.
pub fn run_tournament(
    agents: &[AnyAgent; NUM_COLORS],
    games: u64,
    threads: usize,
    settings: MatchSettings,
) -> [SeatStats; NUM_COLORS] {
    let threads = threads.max(1);
    let (sender, receiver) = unbounded();
    let mut stats = [SeatStats::default(); NUM_COLORS];
    thread::scope(|scope| {
        for worker in 0..threads {
            let sender = sender.clone();
            let mut seats: [AnyAgent; NUM_COLORS] = [
                agents[0].clone_agent(),
                agents[1].clone_agent(),
                agents[2].clone_agent(),
            ];
            let _worker = scope.spawn(move || {
                let mut id = worker as u64;
                while id < games {
                    let outcome = run_game(GameId(id), &mut seats, &settings);
                    if sender.send(outcome).is_err() {
                        return;
                    }
                    id += threads as u64;
                }
            });
        }
        drop(sender);
        for outcome in receiver.iter() {
            println!(
                "[{0}] game {1}: {outcome}",
                Local::now().format("%H:%M:%S"),
                outcome.id
            );
            tally(&mut stats, &outcome);
        }
    });
    stats
}
