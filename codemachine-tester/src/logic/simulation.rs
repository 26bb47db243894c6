use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use anyhow::{Context, Result};
use codemachine_game::events::{EVENT_DONE, EVENT_FATAL, EVENT_NEXT_CODE_FAILURE};
use codemachine_game::{
    Completion, EventSink, InputAction, LogSink, MachineSession, PuzzleConfig, PuzzleError,
    PuzzleEvent, PuzzleInstance, PuzzleOptions, RecordingSink, SolutionKind, TaskCatalog,
    TaskCodeGenerator, compose_block_strings,
};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use twox_hash::XxHash64;

use super::policy::{SubjectMove, SubjectStrategy};

/// Catalog settings for simulated sessions: 3x3 tasks on a 4-dial machine.
const DEMO_MAX_DIGIT: u8 = 4;
const DEMO_PARTS: usize = 3;

pub type SimulationExpectationFn = Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync>;

/// Tunes the catalog parameters before any puzzle is built.
pub type ConfigTweak = fn(&mut PuzzleConfig);

/// Everything needed to run one simulated puzzle.
#[derive(Clone)]
pub struct SimulationPlan {
    pub strategy: SubjectStrategy,
    pub max_steps: usize,
    pub solution_kind: Option<SolutionKind>,
    pub tweak: Option<ConfigTweak>,
    /// Put the played task's compositional solution in the manual first.
    pub seed_manual: bool,
    /// Play the same seed twice and record the second fingerprint.
    pub replay_check: bool,
    pub expectations: Vec<SimulationExpectationFn>,
}

impl fmt::Debug for SimulationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationPlan")
            .field("strategy", &self.strategy)
            .field("max_steps", &self.max_steps)
            .field("solution_kind", &self.solution_kind)
            .field("seed_manual", &self.seed_manual)
            .field("replay_check", &self.replay_check)
            .field("expectations", &self.expectations.len())
            .finish_non_exhaustive()
    }
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: SubjectStrategy) -> Self {
        Self {
            strategy,
            max_steps: 500,
            solution_kind: None,
            tweak: None,
            seed_manual: false,
            replay_check: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_solution_kind(mut self, kind: SolutionKind) -> Self {
        self.solution_kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_tweak(mut self, tweak: ConfigTweak) -> Self {
        self.tweak = Some(tweak);
        self
    }

    #[must_use]
    pub fn with_seeded_manual(mut self) -> Self {
        self.seed_manual = true;
        self
    }

    #[must_use]
    pub fn with_replay_check(mut self) -> Self {
        self.replay_check = true;
        self
    }

    #[must_use]
    pub fn with_expectation<F>(mut self, expectation: F) -> Self
    where
        F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
    {
        self.expectations.push(Arc::new(expectation));
        self
    }
}

/// How a simulated puzzle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Solved(SolutionKind),
    Abandoned,
    /// The step limit ran out first.
    Halted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solved(kind) => write!(f, "solved ({})", kind.as_str()),
            Self::Abandoned => f.write_str("abandoned"),
            Self::Halted => f.write_str("halted"),
        }
    }
}

/// Complete record of a simulated puzzle.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: SubjectStrategy,
    pub task: String,
    pub trial_id: String,
    pub outcome: Outcome,
    pub n_try: u32,
    pub max_tries: u32,
    pub presses: usize,
    pub dial_turns: usize,
    pub steps: usize,
    pub events: Vec<PuzzleEvent>,
    pub manual_len: usize,
    pub fingerprint: u64,
    pub replay_fingerprint: Option<u64>,
    /// Whether input after abandonment was refused; `None` unless abandoned.
    pub rejected_after_fatal: Option<bool>,
}

impl SimulationSummary {
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.name == name).count()
    }

    #[must_use]
    pub fn done_events(&self) -> usize {
        self.count(EVENT_DONE)
    }

    #[must_use]
    pub fn fatal_events(&self) -> usize {
        self.count(EVENT_FATAL)
    }

    #[must_use]
    pub fn fallback_warnings(&self) -> usize {
        self.count(EVENT_NEXT_CODE_FAILURE)
    }
}

/// Records the transcript and mirrors it to the log.
#[derive(Clone, Default)]
struct TranscriptSink {
    recording: RecordingSink,
    log: LogSink,
}

impl EventSink for TranscriptSink {
    fn log_event(&mut self, event: &PuzzleEvent) {
        self.recording.log_event(event);
        self.log.log_event(event);
    }
}

/// Generate a fresh catalog of `DEMO_PARTS`^2 tasks from `rng`.
pub fn demo_catalog(rng: &mut ChaCha20Rng) -> Result<TaskCatalog> {
    let generator = TaskCodeGenerator {
        max_digit: DEMO_MAX_DIGIT,
        code_length: 4,
        n_part: DEMO_PARTS,
        solutions_per_task: 2,
    };
    let code_sets = generator.generate(rng).context("generating task codes")?;

    let mut shapes = BTreeMap::new();
    for task in generator.task_names() {
        let mut parts = task.chars().filter_map(|c| c.to_digit(10));
        let (Some(i), Some(j)) = (parts.next(), parts.next()) else {
            continue;
        };
        let left = part_shape('1', i as usize, true);
        let right = part_shape('2', j as usize, false);
        let block = compose_block_strings(&left, &right)
            .with_context(|| format!("composing shape for task {task}"))?;
        shapes.insert(task, block);
    }

    let params = PuzzleConfig {
        max_digit: DEMO_MAX_DIGIT,
        code_length: 4,
        n_click_bespoke: 6,
        n_click_partial: 4,
        button_delay_ms: 0,
        solution_delay_ms: 0,
        ..PuzzleConfig::default()
    };
    Ok(TaskCatalog::from_code_sets(params, shapes, &code_sets))
}

/// Two rows; the part occupies one cell of the top or bottom row.
fn part_shape(cell: char, column: usize, top: bool) -> String {
    let row: String = (1..=DEMO_PARTS)
        .map(|c| if c == column { cell } else { '_' })
        .collect();
    let blank = "_".repeat(DEMO_PARTS);
    if top {
        format!("{row}\n{blank}")
    } else {
        format!("{blank}\n{row}")
    }
}

/// Run `plan` for one seed, replaying it when the plan asks for it.
pub async fn run_plan(plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
    let mut summary = run_once(plan, seed).await?;
    if plan.replay_check {
        let replay = run_once(plan, seed).await?;
        summary.replay_fingerprint = Some(replay.fingerprint);
    }
    Ok(summary)
}

async fn run_once(plan: &SimulationPlan, seed: u64) -> Result<SimulationSummary> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut catalog = demo_catalog(&mut rng)?;
    if let Some(tweak) = plan.tweak {
        tweak(&mut catalog.params);
    }
    let tasks: Vec<String> = catalog.tasks().map(str::to_string).collect();
    let task = tasks
        .choose(&mut rng)
        .cloned()
        .context("catalog has no tasks")?;

    let mut session = MachineSession::new(catalog);
    if plan.seed_manual {
        session.seed_manual([(task.as_str(), SolutionKind::Compositional)])?;
    }
    let options = PuzzleOptions {
        solution_kind: plan.solution_kind,
        seed: Some(seed),
        trial_id: Some(format!("sim-{seed:016x}")),
    };
    let sink = TranscriptSink::default();
    let mut puzzle = session
        .puzzle(&task, &options)?
        .sink(sink.clone())
        .build()
        .with_context(|| format!("building puzzle for task {task}"))?;
    puzzle.start();

    let mut policy = plan.strategy.create_policy(seed, &task);
    let (mut presses, mut dial_turns, mut steps) = (0, 0, 0);
    while steps < plan.max_steps && !puzzle.is_solved() && !puzzle.is_abandoned() {
        steps += 1;
        let chosen = policy.next_move(&puzzle);
        log::trace!("{} step {steps}: {chosen:?}", policy.name());
        match chosen {
            SubjectMove::Press(kind) => {
                presses += 1;
                puzzle.press_button(kind).await?;
            }
            SubjectMove::Turn { index, digit } => {
                dial_turns += 1;
                puzzle.set_dial(index, digit)?;
            }
            SubjectMove::Enter(code) => {
                puzzle.submit(code, InputAction::External)?;
            }
        }
    }

    let outcome = outcome_of(&puzzle);
    let rejected_after_fatal = (outcome == Outcome::Abandoned).then(|| {
        matches!(
            puzzle.submit(puzzle.current_code().clone(), InputAction::External),
            Err(PuzzleError::Abandoned)
        )
    });

    let events = sink.recording.events();
    let manual_len = session.manual().borrow().len();
    Ok(SimulationSummary {
        seed,
        strategy: plan.strategy,
        task,
        trial_id: puzzle.trial_id().to_string(),
        outcome,
        n_try: puzzle.n_try(),
        max_tries: puzzle.config().max_tries,
        presses,
        dial_turns,
        steps,
        fingerprint: fingerprint(&events)?,
        events,
        manual_len,
        replay_fingerprint: None,
        rejected_after_fatal,
    })
}

fn outcome_of(puzzle: &PuzzleInstance) -> Outcome {
    match puzzle.completion() {
        Completion::Solved(kind) => Outcome::Solved(kind),
        Completion::Pending if puzzle.is_abandoned() => Outcome::Abandoned,
        Completion::Pending => Outcome::Halted,
    }
}

/// xxHash64 of the serialized transcript.
pub fn fingerprint(events: &[PuzzleEvent]) -> Result<u64> {
    let bytes = serde_json::to_vec(events).context("serializing transcript")?;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(&bytes);
    Ok(hasher.finish())
}
