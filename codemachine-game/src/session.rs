//! Session wrapper binding a task catalog to one shared manual.
use std::rc::Rc;

use crate::catalog::{CatalogError, PuzzleOptions, TaskCatalog};
use crate::config::PuzzleConfig;
use crate::manual::{ManualLedger, SharedManual};
use crate::puzzle::PuzzleBuilder;
use crate::rng::derive_puzzle_seed;
use crate::solutions::SolutionKind;
use crate::CatalogLoader;

/// All puzzles of one participant session. Every puzzle built here records
/// into the same manual.
///
/// Puzzles requested without an explicit seed draw one from the session seed
/// and their position in the session, so each gets its own initial code and
/// trial id while the whole sequence stays reproducible.
#[derive(Debug, Clone)]
pub struct MachineSession {
    catalog: TaskCatalog,
    manual: SharedManual,
    seed: u64,
    puzzles_built: u32,
}

impl MachineSession {
    #[must_use]
    pub fn new(catalog: TaskCatalog) -> Self {
        let seed = catalog.params.seed;
        Self {
            catalog,
            manual: ManualLedger::new().into_shared(),
            seed,
            puzzles_built: 0,
        }
    }

    /// Session seed used for puzzles without an explicit seed. Defaults to
    /// the catalog's `seed` parameter.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Load the catalog through `loader`.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub fn from_loader<L: CatalogLoader>(loader: &L, name: &str) -> Result<Self, L::Error> {
        loader.load_catalog(name).map(Self::new)
    }

    /// Replace the manual with the given `(task, kind)` examples.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] for unknown tasks.
    pub fn seed_manual<'a, I>(&mut self, pairs: I) -> Result<(), CatalogError>
    where
        I: IntoIterator<Item = (&'a str, SolutionKind)>,
    {
        let ledger = self.catalog.build_manual(pairs)?;
        *self.manual.borrow_mut() = ledger;
        Ok(())
    }

    /// Builder for the next puzzle of `task`, already wired to the shared
    /// manual. Without `options.seed` the puzzle seed is derived from the
    /// session seed and the number of puzzles built so far.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the task is unknown or its configuration
    /// is invalid.
    pub fn puzzle(
        &mut self,
        task: &str,
        options: &PuzzleOptions,
    ) -> Result<PuzzleBuilder, CatalogError> {
        let config: PuzzleConfig = if options.seed.is_some() {
            self.catalog.puzzle_config(task, options)?
        } else {
            let seeded = PuzzleOptions {
                seed: Some(derive_puzzle_seed(self.seed, self.puzzles_built)),
                ..options.clone()
            };
            self.catalog.puzzle_config(task, &seeded)?
        };
        self.puzzles_built = self.puzzles_built.saturating_add(1);
        Ok(PuzzleBuilder::new(config).manual(Rc::clone(&self.manual)))
    }

    #[must_use]
    pub const fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn manual(&self) -> SharedManual {
        Rc::clone(&self.manual)
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub const fn puzzles_built(&self) -> u32 {
        self.puzzles_built
    }
}
