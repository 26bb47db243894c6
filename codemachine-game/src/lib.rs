//! Code Machine Engine
//!
//! Platform-agnostic core of the code-breaking machine puzzle: solution
//! classification, budgeted next-code search and the puzzle state machine.
//! Rendering, animation and experiment flow live in the host.

pub mod budget;
pub mod catalog;
pub mod code;
pub mod config;
pub mod events;
pub mod generator;
pub mod lock;
pub mod manual;
pub mod puzzle;
pub mod rng;
pub mod search;
pub mod session;
pub mod solutions;
pub mod stimuli;

// Re-export commonly used types
pub use budget::ClickBudget;
pub use catalog::{CatalogError, PuzzleOptions, TaskCatalog, TaskCodes};
pub use code::{Code, CodeError, Digits};
pub use config::{ConfigError, InitialCode, PuzzleConfig};
pub use events::{
    EventSeverity, EventSink, LogSink, NullSink, PuzzleEvent, RecordingSink,
};
pub use generator::{
    CodeGenerator, GenerateMode, GeneratorError, MAX_DRAW_ATTEMPTS, SearchKind, UnknownSearchKind,
};
pub use lock::InputLock;
pub use manual::{ManualEntry, ManualError, ManualLedger, SharedManual};
pub use puzzle::{
    Completion, FatalReason, InputAction, NoopObserver, PuzzleBuilder, PuzzleError,
    PuzzleInstance, PuzzleObserver, Transition,
};
pub use rng::{RngBundle, derive_puzzle_seed};
pub use search::{Resolution, SearchController, SearchResult, TriedCodes};
pub use session::MachineSession;
pub use solutions::{
    RegistryError, SolutionEntry, SolutionKind, SolutionRegistry, SolutionState, UnknownSolutionKind,
};
pub use stimuli::{StimulusError, TaskCodeGenerator, TaskCodeSet, compose_block_strings, make_bespoke};

/// Source of task catalogs. Hosts implement this over whatever storage they use.
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the catalog for an experiment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read or parsed.
    fn load_catalog(&self, name: &str) -> Result<TaskCatalog, Self::Error>;
}

/// Convenience alias for the engine's most common fallible result.
pub type PuzzleResult<T> = Result<T, PuzzleError>;
