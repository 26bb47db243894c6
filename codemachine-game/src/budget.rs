//! Per-button click budgets that decay toward a forced reveal.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::generator::SearchKind;

/// Remaining random suggestions per search button before the solution is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickBudget {
    pub bespoke: u32,
    pub left: u32,
    pub right: u32,
}

impl ClickBudget {
    #[must_use]
    pub const fn new(n_click_bespoke: u32, n_click_partial: u32) -> Self {
        Self {
            bespoke: n_click_bespoke,
            left: n_click_partial,
            right: n_click_partial,
        }
    }

    /// Budgets perturbed independently by a uniform integer in `[-noise, noise]`,
    /// clamped at zero.
    pub fn with_noise<R: Rng + ?Sized>(
        n_click_bespoke: u32,
        n_click_partial: u32,
        noise: u32,
        rng: &mut R,
    ) -> Self {
        let mut jitter = |base: u32| {
            if noise == 0 {
                return base;
            }
            let delta = rng.gen_range(-i64::from(noise)..=i64::from(noise));
            u32::try_from((i64::from(base) + delta).max(0)).unwrap_or(u32::MAX)
        };
        Self {
            bespoke: jitter(n_click_bespoke),
            left: jitter(n_click_partial),
            right: jitter(n_click_partial),
        }
    }

    #[must_use]
    pub const fn remaining(&self, kind: SearchKind) -> u32 {
        match kind {
            SearchKind::Bespoke => self.bespoke,
            SearchKind::Left => self.left,
            SearchKind::Right => self.right,
        }
    }

    /// Whether the next request for `kind` must reveal the solution.
    #[must_use]
    pub const fn is_exhausted(&self, kind: SearchKind) -> bool {
        self.remaining(kind) == 0
    }

    /// Spend one click for `kind`, saturating at zero. Returns what is left.
    pub fn spend(&mut self, kind: SearchKind) -> u32 {
        let slot = match kind {
            SearchKind::Bespoke => &mut self.bespoke,
            SearchKind::Left => &mut self.left,
            SearchKind::Right => &mut self.right,
        };
        *slot = slot.saturating_sub(1);
        *slot
    }
}
