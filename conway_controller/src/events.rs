// events.rs - Events the controller reports to whoever renders the run

use std::fmt;

use conway::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Executing,
    Paused,
    Quitting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Executing => "Executing",
            State::Paused => "Paused",
            State::Quitting => "Quitting",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StateChange { turn: u32, state: State },
    AliveCellsCount { turn: u32, count: usize },
    /// Sent once, after the run returned.
    FinalTurnComplete { turn: u32, alive_cells: Vec<Cell> },
    ImageOutputComplete { turn: u32, filename: String },
}

impl Event {
    pub fn turn(&self) -> u32 {
        match self {
            Event::StateChange { turn, .. }
            | Event::AliveCellsCount { turn, .. }
            | Event::FinalTurnComplete { turn, .. }
            | Event::ImageOutputComplete { turn, .. } => *turn,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::StateChange { turn, state } => write!(f, "turn {turn}: {state}"),
            Event::AliveCellsCount { turn, count } => write!(f, "turn {turn}: {count} cells alive"),
            Event::FinalTurnComplete { turn, alive_cells } => {
                write!(f, "turn {turn}: finished with {} cells alive", alive_cells.len())
            }
            Event::ImageOutputComplete { turn, filename } => write!(f, "turn {turn}: wrote {filename}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_turn_and_payload() {
        let event = Event::StateChange { turn: 4, state: State::Paused };
        assert_eq!(event.to_string(), "turn 4: Paused");
        assert_eq!(event.turn(), 4);

        let event = Event::FinalTurnComplete {
            turn: 9,
            alive_cells: vec![Cell::new(0, 0), Cell::new(1, 0)],
        };
        assert_eq!(event.to_string(), "turn 9: finished with 2 cells alive");
    }
}
