//! Model families and their variants.
//!
//! A family is an immutable value handed to the collector and the frame
//! builder. Nothing here is process-global, so tests can build tiny synthetic
//! families.

use crate::checkpoint::StepSchedule;
use crate::error::{Result, TrajectoryError};
use serde::{Deserialize, Serialize};

/// One model size within a family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    /// Short id, e.g. `70m`.
    pub id: String,
    /// Trained on the de-duplicated dataset.
    pub deduped: bool,
}

impl Variant {
    #[must_use]
    pub fn new(id: impl Into<String>, deduped: bool) -> Self {
        Self {
            id: id.into(),
            deduped,
        }
    }
}

/// Variants of the Pythia suite trained on the standard dataset only.
pub const PYTHIA_STANDARD: &[&str] = &["14m", "31m"];

/// Variants of the Pythia suite loaded from their de-duplicated runs.
pub const PYTHIA_DEDUPED: &[&str] = &["70m", "160m", "410m", "1b", "1.4b", "2.8b", "6.9b", "12b"];

/// A named family of checkpointed models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFamily {
    /// Hub organisation, e.g. `EleutherAI`.
    pub org: String,
    /// Family name used as repo prefix, e.g. `pythia`.
    pub name: String,
    pub variants: Vec<Variant>,
    pub schedule: StepSchedule,
}

impl ModelFamily {
    /// The Pythia suite: `14m` and `31m` from their standard runs, every
    /// larger size from its de-duplicated run.
    #[must_use]
    pub fn pythia() -> Self {
        let variants = PYTHIA_STANDARD
            .iter()
            .map(|id| Variant::new(*id, false))
            .chain(PYTHIA_DEDUPED.iter().map(|id| Variant::new(*id, true)))
            .collect();
        Self {
            org: "EleutherAI".to_string(),
            name: "pythia".to_string(),
            variants,
            schedule: StepSchedule::default(),
        }
    }

    /// Replace the step schedule.
    #[must_use]
    pub fn with_schedule(mut self, schedule: StepSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Look up a variant by id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` naming the known variants if `id` is unknown.
    pub fn variant(&self, id: &str) -> Result<&Variant> {
        self.variants.iter().find(|v| v.id == id).ok_or_else(|| {
            let known: Vec<&str> = self.variants.iter().map(|v| v.id.as_str()).collect();
            TrajectoryError::invalid_input(format!(
                "unknown {} variant '{id}' (known: {})",
                self.name,
                known.join(", ")
            ))
        })
    }

    /// Resolve a list of ids, or every variant when `ids` is empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` on the first unknown id.
    pub fn select(&self, ids: &[String]) -> Result<Vec<Variant>> {
        if ids.is_empty() {
            return Ok(self.variants.clone());
        }
        ids.iter().map(|id| self.variant(id).cloned()).collect()
    }

    /// Hub repository name, e.g. `EleutherAI/pythia-70m-deduped`.
    #[must_use]
    pub fn repo_name(&self, variant: &Variant) -> String {
        if variant.deduped {
            format!("{}/{}-{}-deduped", self.org, self.name, variant.id)
        } else {
            format!("{}/{}-{}", self.org, self.name, variant.id)
        }
    }
}

impl Default for ModelFamily {
    fn default() -> Self {
        Self::pythia()
    }
}
