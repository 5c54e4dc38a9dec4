// keys.rs - Single-key control commands

/// What a key press asks the broker to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `s`: save the current world as an image.
    Snapshot,
    /// `q`: stop the run after the turn in flight.
    Quit,
    /// `k`: stop the run and shut the broker down.
    Close,
    /// `p`: toggle pause.
    Pause,
}

impl Command {
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            's' => Some(Command::Snapshot),
            'q' => Some(Command::Quit),
            'k' => Some(Command::Close),
            'p' => Some(Command::Pause),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_map_one_to_one() {
        assert_eq!(Command::from_key('s'), Some(Command::Snapshot));
        assert_eq!(Command::from_key('q'), Some(Command::Quit));
        assert_eq!(Command::from_key('k'), Some(Command::Close));
        assert_eq!(Command::from_key('p'), Some(Command::Pause));
        assert_eq!(Command::from_key('P'), None);
        assert_eq!(Command::from_key('\n'), None);
    }
}
