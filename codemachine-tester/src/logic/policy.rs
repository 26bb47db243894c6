use std::fmt;

use codemachine_game::{Code, PuzzleInstance, SearchKind, SolutionState};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// One input a simulated subject gives the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectMove {
    /// Press a next-code button and wait for the animation.
    Press(SearchKind),
    /// Turn one dial to a digit.
    Turn { index: usize, digit: u8 },
    /// Type a whole code at once.
    Enter(Code),
}

/// Policy interface for simulated subjects.
pub trait SubjectPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Choose the next input for an unsolved puzzle.
    fn next_move(&mut self, puzzle: &PuzzleInstance) -> SubjectMove;
}

/// Built-in subject behaviours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubjectStrategy {
    ButtonMasher,
    DialExplorer,
    ManualReader,
}

impl SubjectStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ButtonMasher => "button-masher",
            Self::DialExplorer => "dial-explorer",
            Self::ManualReader => "manual-reader",
        }
    }

    /// Build a policy for one puzzle of `task`.
    #[must_use]
    pub fn create_policy(self, seed: u64, task: &str) -> Box<dyn SubjectPolicy> {
        match self {
            Self::ButtonMasher => Box::new(ButtonMasher),
            Self::DialExplorer => Box::new(DialExplorer::new(seed)),
            Self::ManualReader => Box::new(ManualReader::new(task)),
        }
    }
}

impl fmt::Display for SubjectStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Works the halves with the partial buttons, alternating sides, or the
/// bespoke button when no compositional code is registered.
struct ButtonMasher;

impl ButtonMasher {
    fn pick(puzzle: &PuzzleInstance) -> SearchKind {
        if puzzle.registry().compositional_code().is_none() {
            return SearchKind::Bespoke;
        }
        match puzzle.state() {
            SolutionState::Left => SearchKind::Right,
            _ => SearchKind::Left,
        }
    }
}

impl SubjectPolicy for ButtonMasher {
    fn name(&self) -> &'static str {
        "button-masher"
    }

    fn next_move(&mut self, puzzle: &PuzzleInstance) -> SubjectMove {
        SubjectMove::Press(Self::pick(puzzle))
    }
}

/// Turns random dials to random digits.
struct DialExplorer {
    rng: ChaCha20Rng,
}

impl DialExplorer {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl SubjectPolicy for DialExplorer {
    fn name(&self) -> &'static str {
        "dial-explorer"
    }

    fn next_move(&mut self, puzzle: &PuzzleInstance) -> SubjectMove {
        let config = puzzle.config();
        SubjectMove::Turn {
            index: self.rng.gen_range(0..config.code_length),
            digit: self.rng.gen_range(1..=config.max_digit),
        }
    }
}

/// Looks the task up in the manual before touching any button.
///
/// An exact entry is typed in directly. Otherwise a compositional entry that
/// shares the left (or right) part with this task lends its half; with nothing
/// usable the reader falls back to the buttons.
struct ManualReader {
    task: String,
}

impl ManualReader {
    fn new(task: &str) -> Self {
        Self {
            task: task.to_string(),
        }
    }

    fn borrowed_half(&self, puzzle: &PuzzleInstance) -> Option<Code> {
        let half = puzzle.registry().half_len();
        let current = puzzle.current_code();
        let manual = puzzle.manual();
        let ledger = manual.borrow();
        let mut parts = self.task.chars();
        let (left_part, right_part) = (parts.next()?, parts.next()?);
        ledger
            .entries()
            .iter()
            .filter(|entry| entry.compositional)
            .find_map(|entry| {
                let mut other = entry.task.chars();
                let (other_left, other_right) = (other.next()?, other.next()?);
                let left = entry.code.prefix(half);
                let right = entry.code.suffix(half);
                if other_left == left_part && !current.starts_with(&left) {
                    Some(Code::splice(&left, &current.suffix(half)))
                } else if other_right == right_part && !current.ends_with(&right) {
                    Some(Code::splice(&current.prefix(half), &right))
                } else {
                    None
                }
            })
    }
}

impl SubjectPolicy for ManualReader {
    fn name(&self) -> &'static str {
        "manual-reader"
    }

    fn next_move(&mut self, puzzle: &PuzzleInstance) -> SubjectMove {
        let exact = puzzle
            .manual()
            .borrow()
            .entries()
            .iter()
            .find(|entry| entry.task == self.task)
            .map(|entry| entry.code.clone());
        if let Some(code) = exact.filter(|code| code != puzzle.current_code()) {
            return SubjectMove::Enter(code);
        }
        if let Some(code) = self.borrowed_half(puzzle) {
            return SubjectMove::Enter(code);
        }
        SubjectMove::Press(ButtonMasher::pick(puzzle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codemachine_game::{InitialCode, PuzzleConfig, SolutionEntry, SolutionKind, TaskCatalog};

    fn code(s: &str) -> Code {
        Code::parse(s).unwrap()
    }

    fn puzzle(solutions: Vec<SolutionEntry>) -> PuzzleInstance {
        let mut cfg = PuzzleConfig::new(4, 3, solutions);
        cfg.initial_code = InitialCode::Fixed(code("3333"));
        PuzzleInstance::new(cfg).unwrap()
    }

    #[test]
    fn labels_round_trip_through_display() {
        assert_eq!(SubjectStrategy::ManualReader.to_string(), "manual-reader");
        let policy = SubjectStrategy::DialExplorer.create_policy(1, "11");
        assert_eq!(policy.name(), "dial-explorer");
    }

    #[test]
    fn masher_uses_bespoke_without_compositional_code() {
        let bespoke_only = puzzle(vec![SolutionEntry::bespoke(code("1221"))]);
        let mut masher = SubjectStrategy::ButtonMasher.create_policy(0, "11");
        assert_eq!(
            masher.next_move(&bespoke_only),
            SubjectMove::Press(SearchKind::Bespoke)
        );
        let both = puzzle(vec![
            SolutionEntry::compositional(code("1122")),
            SolutionEntry::bespoke(code("2211")),
        ]);
        assert_eq!(masher.next_move(&both), SubjectMove::Press(SearchKind::Left));
    }

    #[test]
    fn explorer_stays_on_the_dials() {
        let p = puzzle(vec![SolutionEntry::compositional(code("1122"))]);
        let mut explorer = SubjectStrategy::DialExplorer.create_policy(9, "11");
        for _ in 0..50 {
            match explorer.next_move(&p) {
                SubjectMove::Turn { index, digit } => {
                    assert!(index < 4);
                    assert!((1..=3).contains(&digit));
                }
                other => panic!("unexpected move {other:?}"),
            }
        }
    }

    #[test]
    fn reader_borrows_left_half_from_sibling_task() {
        let catalog = TaskCatalog::from_json(
            r#"{
                "params": {"maxDigit": 3, "codeLength": 4},
                "shapes": {"11": "1_\n_2", "12": "1_\n2_"},
                "codes": {
                    "11": {"compositional": "1122", "bespoke": "3131"},
                    "12": {"compositional": "1123", "bespoke": "3232"}
                }
            }"#,
        )
        .unwrap();
        let ledger = catalog
            .build_manual([("11", SolutionKind::Compositional)])
            .unwrap();
        let p = puzzle(vec![SolutionEntry::compositional(code("1123"))]);
        *p.manual().borrow_mut() = ledger;

        let mut reader = SubjectStrategy::ManualReader.create_policy(0, "12");
        assert_eq!(reader.next_move(&p), SubjectMove::Enter(code("1133")));
    }
}
