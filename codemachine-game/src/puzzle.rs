//! The puzzle state machine.
//!
//! A [`PuzzleInstance`] owns the live dial code, the solution registry, the
//! click budget and the tried-code set for one trial. Hosts feed it dial edits
//! and search-button presses; it classifies every entered code, reports state
//! changes to a [`PuzzleObserver`] and writes a transcript to an
//! [`EventSink`].

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

use crate::budget::ClickBudget;
use crate::code::{Code, CodeError};
use crate::config::{ConfigError, InitialCode, PuzzleConfig};
use crate::events::{
    EVENT_DONE, EVENT_ENTER, EVENT_FATAL, EVENT_INITIALIZE, EVENT_MANUAL_UPDATE,
    EVENT_NEXT_CODE_FAILURE, EVENT_RUN, EVENT_UNDO_PARTIAL, EventSeverity, EventSink, NullSink,
    PuzzleEvent, button_event, select_event, solution_event,
};
use crate::generator::{CodeGenerator, GenerateMode, GeneratorError, MAX_DRAW_ATTEMPTS, SearchKind, draw_code};
use crate::lock::{InputLock, LOCK_SEARCH};
use crate::manual::{ManualEntry, ManualLedger, SharedManual};
use crate::rng::RngBundle;
use crate::search::{Resolution, SearchController, TriedCodes};
use crate::solutions::{SolutionKind, SolutionRegistry, SolutionState};

/// Whether the target has been solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "kind", rename_all = "snake_case")]
pub enum Completion {
    #[default]
    Pending,
    Solved(SolutionKind),
}

/// Why a puzzle was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FatalReason {
    #[serde(rename_all = "camelCase")]
    TryLimit { n_try: u32, clicks_left: ClickBudget },
}

impl fmt::Display for FatalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TryLimit { n_try, .. } => write!(f, "try limit reached after {n_try} entries"),
        }
    }
}

/// Outcome of one entered code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Unchanged(SolutionState),
    Changed {
        from: SolutionState,
        to: SolutionState,
    },
    Solved {
        kind: SolutionKind,
    },
    Abandoned(FatalReason),
}

impl Transition {
    /// State the dials are in after the transition, if still live.
    #[must_use]
    pub const fn state(&self) -> Option<SolutionState> {
        match self {
            Self::Unchanged(state) | Self::Changed { to: state, .. } => Some(*state),
            Self::Solved { kind } => Some(match kind {
                SolutionKind::Bespoke => SolutionState::Bespoke,
                SolutionKind::Compositional => SolutionState::Compositional,
            }),
            Self::Abandoned(_) => None,
        }
    }

    /// Whether the host should play a reveal for this transition.
    #[must_use]
    pub const fn reveals(&self) -> bool {
        match self {
            Self::Solved { .. } => true,
            Self::Changed { to, .. } => !matches!(to, SolutionState::None),
            Self::Unchanged(_) | Self::Abandoned(_) => false,
        }
    }
}

/// What produced an entered code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    /// The subject turned one dial.
    Dial(usize),
    /// A search button suggestion was accepted.
    NextCode(SearchKind),
    /// The host set the dials directly.
    External,
}

impl fmt::Display for InputAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dial(index) => write!(f, "select.{index}"),
            Self::NextCode(kind) => write!(f, "nextCode.{kind}"),
            Self::External => f.write_str("external"),
        }
    }
}

/// Render-side hooks. Every method defaults to a no-op.
pub trait PuzzleObserver {
    fn on_state_change(&mut self, _from: SolutionState, _to: SolutionState, _code: &Code) {}
    fn on_solved(&mut self, _kind: SolutionKind, _code: &Code) {}
    fn on_manual_updated(&mut self, _entries: &[ManualEntry]) {}
    fn on_fatal(&mut self, _reason: &FatalReason) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PuzzleObserver for NoopObserver {}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("input is locked ({reason})")]
    Locked { reason: String },
    #[error("puzzle already solved")]
    Finished,
    #[error("puzzle was abandoned")]
    Abandoned,
    #[error(transparent)]
    Code(#[from] CodeError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

/// Assembles a [`PuzzleInstance`] with optional collaborators.
pub struct PuzzleBuilder {
    config: PuzzleConfig,
    sink: Box<dyn EventSink>,
    observer: Box<dyn PuzzleObserver>,
    manual: Option<SharedManual>,
}

impl PuzzleBuilder {
    #[must_use]
    pub fn new(config: PuzzleConfig) -> Self {
        Self {
            config,
            sink: Box::new(NullSink),
            observer: Box::new(NoopObserver),
            manual: None,
        }
    }

    #[must_use]
    pub fn sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: impl PuzzleObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Share a manual with other instances of the same session.
    #[must_use]
    pub fn manual(mut self, manual: SharedManual) -> Self {
        self.manual = Some(manual);
        self
    }

    /// Validate the configuration and build the instance. Emits
    /// `machine.initialize`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is invalid or no
    /// non-solution starting code can be drawn.
    pub fn build(self) -> Result<PuzzleInstance, ConfigError> {
        let registry = self.config.registry()?;
        let mut rngs = RngBundle::from_user_seed(self.config.seed);
        let trial_id = self
            .config
            .trial_id
            .clone()
            .unwrap_or_else(|| rngs.trial_id());
        let budget = ClickBudget::with_noise(
            self.config.n_click_bespoke,
            self.config.n_click_partial,
            self.config.click_noise,
            rngs.budget(),
        );
        let current = match &self.config.initial_code {
            InitialCode::Fixed(code) => code.clone(),
            InitialCode::Random => draw_code(
                rngs.initial(),
                self.config.max_digit,
                self.config.code_length,
                |candidate| registry.classify(candidate) != SolutionState::None,
            )
            .ok_or(ConfigError::InitialCodeExhausted {
                attempts: MAX_DRAW_ATTEMPTS,
            })?,
        };

        let mut instance = PuzzleInstance {
            config: self.config,
            registry,
            rngs,
            budget,
            tried: TriedCodes::new(),
            current,
            state: SolutionState::None,
            completion: Completion::Pending,
            fatal: None,
            lock: InputLock::new(),
            n_try: 0,
            trial_id,
            seq: 0,
            manual: self
                .manual
                .unwrap_or_else(|| ManualLedger::new().into_shared()),
            sink: self.sink,
            observer: self.observer,
        };
        let payload = json!({
            "solutions": instance.registry.entries(),
            "initialCode": instance.current,
            "clicks": instance.budget,
            "maxTries": instance.config.max_tries,
            "task": instance.config.task,
        });
        instance.emit(EVENT_INITIALIZE, EventSeverity::Info, payload);
        Ok(instance)
    }
}

/// One live puzzle trial.
pub struct PuzzleInstance {
    config: PuzzleConfig,
    registry: SolutionRegistry,
    rngs: RngBundle,
    budget: ClickBudget,
    tried: TriedCodes,
    current: Code,
    state: SolutionState,
    completion: Completion,
    fatal: Option<FatalReason>,
    lock: InputLock,
    n_try: u32,
    trial_id: String,
    seq: u32,
    manual: SharedManual,
    sink: Box<dyn EventSink>,
    observer: Box<dyn PuzzleObserver>,
}

impl fmt::Debug for PuzzleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PuzzleInstance")
            .field("trial_id", &self.trial_id)
            .field("current", &self.current)
            .field("state", &self.state)
            .field("completion", &self.completion)
            .field("budget", &self.budget)
            .field("n_try", &self.n_try)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl PuzzleInstance {
    /// Build an instance with no sink, observer or shared manual.
    ///
    /// # Errors
    ///
    /// See [`PuzzleBuilder::build`].
    pub fn new(config: PuzzleConfig) -> Result<Self, ConfigError> {
        PuzzleBuilder::new(config).build()
    }

    #[must_use]
    pub fn builder(config: PuzzleConfig) -> PuzzleBuilder {
        PuzzleBuilder::new(config)
    }

    /// Mark the trial as running.
    pub fn start(&mut self) {
        let payload = json!({ "code": self.current });
        self.emit(EVENT_RUN, EventSeverity::Info, payload);
    }

    /// Enter a code on the machine and classify it.
    ///
    /// # Errors
    ///
    /// Rejects input while locked, after completion or abandonment, and for
    /// codes with the wrong number of digits. Digits outside the dial
    /// alphabet are accepted and simply never match a solution.
    pub fn submit(&mut self, code: Code, action: InputAction) -> Result<Transition, PuzzleError> {
        self.ensure_accepting()?;
        if code.len() != self.config.code_length {
            return Err(CodeError::WrongLength {
                expected: self.config.code_length,
                actual: code.len(),
            }
            .into());
        }

        self.n_try = self.n_try.saturating_add(1);
        self.tried.insert(code.clone());
        self.current = code;
        let payload = json!({ "code": self.current, "action": action.to_string() });
        self.emit(EVENT_ENTER, EventSeverity::Info, payload);

        let next = self.registry.classify(&self.current);
        if next == SolutionState::None && self.n_try > self.config.max_tries {
            return Ok(self.abandon());
        }
        if next == self.state {
            return Ok(Transition::Unchanged(next));
        }

        let from = std::mem::replace(&mut self.state, next);
        self.observer.on_state_change(from, next, &self.current);
        if next == SolutionState::None {
            let payload = json!({ "code": self.current, "previous": from });
            self.emit(EVENT_UNDO_PARTIAL, EventSeverity::Info, payload);
            return Ok(Transition::Changed { from, to: next });
        }

        let payload = json!({ "code": self.current });
        self.emit(solution_event(next), EventSeverity::Info, payload);
        match next.solution_kind() {
            Some(kind) => Ok(self.complete(kind)),
            None => Ok(Transition::Changed { from, to: next }),
        }
    }

    /// Turn one dial and submit the resulting code.
    ///
    /// # Errors
    ///
    /// Same as [`PuzzleInstance::submit`], plus dial index and digit checks.
    pub fn set_dial(&mut self, index: usize, digit: u8) -> Result<Transition, PuzzleError> {
        self.ensure_accepting()?;
        let code = self.current.with_digit(index, digit)?;
        code.validate(self.config.code_length, self.config.max_digit)?;
        let payload = json!({ "value": digit });
        self.emit(select_event(index), EventSeverity::Info, payload);
        self.submit(code, InputAction::Dial(index))
    }

    /// Spend one click of `kind` and return the next suggested code. The
    /// suggestion is not entered; pass it to [`PuzzleInstance::submit`].
    ///
    /// # Errors
    ///
    /// Rejects requests while locked or finished, and half requests on a
    /// puzzle without a compositional solution.
    pub fn request_next(&mut self, kind: SearchKind) -> Result<Code, PuzzleError> {
        self.ensure_accepting()?;
        let controller = SearchController::new(
            CodeGenerator::new(&self.registry, self.config.max_digit),
            self.config.allow_accidental_solution,
        );
        let result = controller.next_code(
            kind,
            &mut self.budget,
            &self.tried,
            &self.current,
            self.rngs.search(),
        )?;
        if result.resolution == Resolution::Fallback {
            let payload = json!({ "kind": kind, "attempts": MAX_DRAW_ATTEMPTS });
            self.emit(EVENT_NEXT_CODE_FAILURE, EventSeverity::Warning, payload);
        }
        Ok(result.code)
    }

    /// First half of a search-button press: lock input and log the press.
    ///
    /// # Errors
    ///
    /// Rejects presses while locked or finished.
    pub fn begin_search(&mut self, kind: SearchKind) -> Result<(), PuzzleError> {
        self.ensure_accepting()?;
        self.lock.acquire(LOCK_SEARCH);
        let payload = json!({ "code": self.current, "clicksLeft": self.budget.remaining(kind) });
        self.emit(button_event(kind), EventSeverity::Info, payload);
        Ok(())
    }

    /// Throwaway code to flicker on the dials while a search animates. Uses
    /// its own RNG stream and spends no budget. Frames avoid the solution
    /// unless no other code exists.
    ///
    /// # Errors
    ///
    /// Returns [`PuzzleError::Generator`] for half kinds without a
    /// compositional solution.
    pub fn search_frame(&mut self, kind: SearchKind) -> Result<Code, PuzzleError> {
        let generator = CodeGenerator::new(&self.registry, self.config.max_digit);
        let rng = self.rngs.animation();
        match generator.generate(kind, GenerateMode::Incorrect, &self.current, &mut *rng) {
            Err(GeneratorError::Exhausted { .. }) => {
                Ok(generator.generate(kind, GenerateMode::Rand, &self.current, rng)?)
            }
            frame => Ok(frame?),
        }
    }

    /// Second half of a search-button press: release the search lock, draw
    /// the suggestion and enter it.
    ///
    /// # Errors
    ///
    /// Same as [`PuzzleInstance::request_next`] and [`PuzzleInstance::submit`].
    pub fn finish_search(&mut self, kind: SearchKind) -> Result<Transition, PuzzleError> {
        self.lock.release(LOCK_SEARCH);
        let code = self.request_next(kind)?;
        self.submit(code, InputAction::NextCode(kind))
    }

    /// Full search-button press with the configured animation delays.
    ///
    /// # Errors
    ///
    /// Same as [`PuzzleInstance::finish_search`].
    #[cfg(feature = "async")]
    pub async fn press_button(&mut self, kind: SearchKind) -> Result<Transition, PuzzleError> {
        self.begin_search(kind)?;
        tokio::time::sleep(self.config.button_delay()).await;
        let transition = self.finish_search(kind)?;
        if transition.reveals() {
            self.lock.acquire(crate::lock::LOCK_REVEAL);
            tokio::time::sleep(self.config.solution_delay()).await;
            self.lock.release(crate::lock::LOCK_REVEAL);
        }
        Ok(transition)
    }

    pub fn lock_input(&mut self, reason: impl Into<String>) {
        self.lock.acquire(reason);
    }

    /// Returns whether the lock was released.
    pub fn unlock_input(&mut self, reason: &str) -> bool {
        self.lock.release(reason)
    }

    #[must_use]
    pub const fn current_code(&self) -> &Code {
        &self.current
    }

    #[must_use]
    pub const fn state(&self) -> SolutionState {
        self.state
    }

    #[must_use]
    pub const fn completion(&self) -> Completion {
        self.completion
    }

    #[must_use]
    pub const fn is_solved(&self) -> bool {
        matches!(self.completion, Completion::Solved(_))
    }

    #[must_use]
    pub const fn fatal_reason(&self) -> Option<&FatalReason> {
        self.fatal.as_ref()
    }

    #[must_use]
    pub const fn is_abandoned(&self) -> bool {
        self.fatal.is_some()
    }

    #[must_use]
    pub const fn n_try(&self) -> u32 {
        self.n_try
    }

    #[must_use]
    pub const fn tried(&self) -> &TriedCodes {
        &self.tried
    }

    #[must_use]
    pub const fn budget(&self) -> &ClickBudget {
        &self.budget
    }

    #[must_use]
    pub fn trial_id(&self) -> &str {
        &self.trial_id
    }

    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    #[must_use]
    pub fn lock_reason(&self) -> Option<&str> {
        self.lock.reason()
    }

    #[must_use]
    pub const fn config(&self) -> &PuzzleConfig {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &SolutionRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn rng_bundle(&self) -> &RngBundle {
        &self.rngs
    }

    /// Handle to the manual this instance records into.
    #[must_use]
    pub fn manual(&self) -> SharedManual {
        Rc::clone(&self.manual)
    }

    fn ensure_accepting(&self) -> Result<(), PuzzleError> {
        if self.is_solved() {
            return Err(PuzzleError::Finished);
        }
        if self.is_abandoned() {
            return Err(PuzzleError::Abandoned);
        }
        if let Some(reason) = self.lock.reason() {
            return Err(PuzzleError::Locked {
                reason: reason.to_string(),
            });
        }
        Ok(())
    }

    fn abandon(&mut self) -> Transition {
        let reason = FatalReason::TryLimit {
            n_try: self.n_try,
            clicks_left: self.budget,
        };
        log::warn!("trial {} abandoned: {reason}", self.trial_id);
        let payload = serde_json::to_value(&reason).unwrap_or(Value::Null);
        self.emit(EVENT_FATAL, EventSeverity::Critical, payload);
        self.observer.on_fatal(&reason);
        self.fatal = Some(reason.clone());
        Transition::Abandoned(reason)
    }

    fn complete(&mut self, kind: SolutionKind) -> Transition {
        if self.config.record_solutions {
            self.record_manual(kind);
        }
        self.completion = Completion::Solved(kind);
        self.observer.on_solved(kind, &self.current);
        let payload = json!({ "code": self.current, "solutionType": kind });
        self.emit(EVENT_DONE, EventSeverity::Info, payload);
        Transition::Solved { kind }
    }

    fn record_manual(&mut self, kind: SolutionKind) {
        let (Some(task), Some(block_string)) = (&self.config.task, &self.config.block_string)
        else {
            log::debug!("trial {} has no task shape; manual unchanged", self.trial_id);
            return;
        };
        let entry = ManualEntry {
            task: task.clone(),
            block_string: block_string.clone(),
            compositional: kind == SolutionKind::Compositional,
            code: self.current.clone(),
        };
        let payload = json!({
            "task": entry.task,
            "compositional": entry.compositional,
            "code": entry.code,
        });
        let manual = Rc::clone(&self.manual);
        let added = manual.borrow_mut().record(entry);
        match added {
            Ok(true) => {
                self.observer.on_manual_updated(manual.borrow().entries());
                self.emit(EVENT_MANUAL_UPDATE, EventSeverity::Info, payload);
            }
            Ok(false) => {}
            Err(err) => log::warn!("manual entry skipped: {err}"),
        }
    }

    fn emit(&mut self, name: impl Into<String>, severity: EventSeverity, payload: Value) {
        let event = PuzzleEvent::new(self.seq, self.trial_id.as_str(), name)
            .with_severity(severity)
            .with_payload(payload);
        self.seq = self.seq.saturating_add(1);
        self.sink.log_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::solutions::SolutionEntry;
    use std::cell::RefCell;

    fn code(s: &str) -> Code {
        Code::parse(s).unwrap()
    }

    fn config() -> PuzzleConfig {
        let mut cfg = PuzzleConfig::new(
            4,
            2,
            vec![
                SolutionEntry::compositional(code("1112")),
                SolutionEntry::bespoke(code("1121")),
            ],
        );
        cfg.initial_code = InitialCode::Fixed(code("2222"));
        cfg.seed = 42;
        cfg
    }

    #[derive(Default, Clone)]
    struct Calls(Rc<RefCell<Vec<String>>>);

    impl PuzzleObserver for Calls {
        fn on_state_change(&mut self, from: SolutionState, to: SolutionState, _code: &Code) {
            self.0.borrow_mut().push(format!("{from}->{to}"));
        }
        fn on_solved(&mut self, kind: SolutionKind, _code: &Code) {
            self.0.borrow_mut().push(format!("solved:{kind}"));
        }
        fn on_manual_updated(&mut self, entries: &[ManualEntry]) {
            self.0.borrow_mut().push(format!("manual:{}", entries.len()));
        }
        fn on_fatal(&mut self, _reason: &FatalReason) {
            self.0.borrow_mut().push("fatal".to_string());
        }
    }

    #[test]
    fn initialize_event_carries_trial_id() {
        let sink = RecordingSink::new();
        let mut cfg = config();
        cfg.trial_id = Some("T-1".to_string());
        let mut puzzle = PuzzleInstance::builder(cfg)
            .sink(sink.clone())
            .build()
            .unwrap();
        puzzle.start();
        let events = sink.events();
        assert_eq!(events[0].name, EVENT_INITIALIZE);
        assert_eq!(events[1].name, EVENT_RUN);
        assert!(events.iter().all(|e| e.trial_id == "T-1"));
        assert_eq!(events[1].seq, 1);
    }

    #[test]
    fn random_initial_code_is_not_a_solution() {
        for seed in 0..50 {
            let mut cfg = config();
            cfg.initial_code = InitialCode::Random;
            cfg.seed = seed;
            let puzzle = PuzzleInstance::new(cfg).unwrap();
            assert_eq!(
                puzzle.registry().classify(puzzle.current_code()),
                SolutionState::None
            );
        }
    }

    #[test]
    fn impossible_random_initial_code_is_a_config_error() {
        let cfg = PuzzleConfig::new(2, 1, vec![SolutionEntry::bespoke(code("11"))]);
        assert_eq!(
            PuzzleInstance::new(cfg).unwrap_err(),
            ConfigError::InitialCodeExhausted {
                attempts: MAX_DRAW_ATTEMPTS
            }
        );
    }

    #[test]
    fn set_dial_logs_select_and_enter() {
        let sink = RecordingSink::new();
        let mut puzzle = PuzzleInstance::builder(config())
            .sink(sink.clone())
            .build()
            .unwrap();
        let transition = puzzle.set_dial(0, 1).unwrap();
        assert_eq!(transition, Transition::Unchanged(SolutionState::None));
        assert_eq!(puzzle.current_code(), &code("1222"));
        let names = sink.names();
        assert_eq!(names[1..], ["machine.select.0", EVENT_ENTER]);
        assert_eq!(
            sink.last().map(|e| e.payload["action"].clone()),
            Some(json!("select.0"))
        );
        assert!(matches!(
            puzzle.set_dial(4, 1),
            Err(PuzzleError::Code(CodeError::DialOutOfRange { .. }))
        ));
        assert!(matches!(
            puzzle.set_dial(0, 3),
            Err(PuzzleError::Code(CodeError::DigitOutOfRange { .. }))
        ));
    }

    #[test]
    fn observer_sees_every_change_and_single_completion() {
        let calls = Calls::default();
        let mut cfg = config();
        cfg.task = Some("12".to_string());
        cfg.block_string = Some("11_22".to_string());
        let mut puzzle = PuzzleInstance::builder(cfg)
            .observer(calls.clone())
            .build()
            .unwrap();
        puzzle.submit(code("1122"), InputAction::External).unwrap();
        puzzle.submit(code("2222"), InputAction::External).unwrap();
        puzzle.submit(code("2212"), InputAction::External).unwrap();
        let done = puzzle.submit(code("1112"), InputAction::External).unwrap();
        assert_eq!(
            done,
            Transition::Solved {
                kind: SolutionKind::Compositional
            }
        );
        assert_eq!(
            puzzle.submit(code("1112"), InputAction::External),
            Err(PuzzleError::Finished)
        );
        assert_eq!(
            *calls.0.borrow(),
            [
                "none->left",
                "left->none",
                "none->right",
                "right->compositional",
                "manual:1",
                "solved:compositional",
            ]
        );
    }

    #[test]
    fn locked_input_is_rejected_and_mismatched_unlock_is_ignored() {
        let mut puzzle = PuzzleInstance::new(config()).unwrap();
        puzzle.lock_input("showSolution");
        assert!(!puzzle.unlock_input("delay"));
        assert_eq!(
            puzzle.submit(code("1121"), InputAction::External),
            Err(PuzzleError::Locked {
                reason: "showSolution".to_string()
            })
        );
        assert_eq!(puzzle.n_try(), 0);
        assert!(puzzle.unlock_input("showSolution"));
        assert!(puzzle.submit(code("1121"), InputAction::External).is_ok());
    }

    #[test]
    fn search_frames_spend_no_budget() {
        let mut puzzle = PuzzleInstance::new(config()).unwrap();
        for _ in 0..10 {
            let frame = puzzle.search_frame(SearchKind::Right).unwrap();
            assert_eq!(frame.prefix(2), code("22"));
        }
        assert_eq!(puzzle.budget().remaining(SearchKind::Right), 15);
        assert!(puzzle.tried().is_empty());
    }

    #[test]
    fn bespoke_frames_never_show_a_solution() {
        let mut puzzle = PuzzleInstance::new(config()).unwrap();
        for _ in 0..200 {
            let frame = puzzle.search_frame(SearchKind::Bespoke).unwrap();
            assert_eq!(puzzle.registry().classify(&frame), SolutionState::None);
        }
        assert_eq!(puzzle.current_code(), &code("2222"));
    }

    #[test]
    fn exhausted_search_warns_once_and_reveals() {
        let sink = RecordingSink::new();
        let mut puzzle = PuzzleInstance::builder(config())
            .sink(sink.clone())
            .build()
            .unwrap();
        // Every right half except the solution's "12", ending back on "2222".
        for c in ["2211", "2221", "2222"] {
            puzzle.submit(code(c), InputAction::External).unwrap();
        }
        let clicks = puzzle.budget().remaining(SearchKind::Right);
        assert!(clicks > 1);
        assert_eq!(sink.count(EVENT_NEXT_CODE_FAILURE), 0);

        let revealed = puzzle.request_next(SearchKind::Right).unwrap();
        assert_eq!(revealed, code("2212"));
        assert_eq!(sink.count(EVENT_NEXT_CODE_FAILURE), 1);
        let warning = sink.last().unwrap();
        assert_eq!(warning.name, EVENT_NEXT_CODE_FAILURE);
        assert_eq!(warning.severity, EventSeverity::Warning);
        assert_eq!(warning.payload["kind"], json!("right"));
        assert_eq!(puzzle.budget().remaining(SearchKind::Right), clicks - 1);
    }

    #[test]
    fn begin_search_locks_until_finish() {
        let sink = RecordingSink::new();
        let mut puzzle = PuzzleInstance::builder(config())
            .sink(sink.clone())
            .build()
            .unwrap();
        puzzle.begin_search(SearchKind::Left).unwrap();
        assert_eq!(puzzle.lock_reason(), Some(LOCK_SEARCH));
        assert!(matches!(
            puzzle.set_dial(0, 1),
            Err(PuzzleError::Locked { .. })
        ));
        puzzle.finish_search(SearchKind::Left).unwrap();
        assert!(!puzzle.is_locked());
        assert_eq!(puzzle.n_try(), 1);
        assert_eq!(sink.count("machine.button.left"), 1);
        assert_eq!(
            sink.last().map(|e| e.payload["action"].clone()),
            Some(json!("nextCode.left"))
        );
    }

    #[test]
    fn transition_reveal_flags() {
        assert!(
            Transition::Solved {
                kind: SolutionKind::Bespoke
            }
            .reveals()
        );
        assert!(
            Transition::Changed {
                from: SolutionState::None,
                to: SolutionState::Left
            }
            .reveals()
        );
        assert!(
            !Transition::Changed {
                from: SolutionState::Left,
                to: SolutionState::None
            }
            .reveals()
        );
        assert_eq!(
            Transition::Solved {
                kind: SolutionKind::Bespoke
            }
            .state(),
            Some(SolutionState::Bespoke)
        );
    }

    #[test]
    fn action_labels() {
        assert_eq!(InputAction::Dial(3).to_string(), "select.3");
        assert_eq!(
            InputAction::NextCode(SearchKind::Bespoke).to_string(),
            "nextCode.bespoke"
        );
    }
}
