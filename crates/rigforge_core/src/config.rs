//! Compile options.

use serde::Deserialize;

use crate::advisory::AdvisoryCode;
use crate::scene::Solver;

/// The only tessellation profile this build knows how to emit.
pub const DEFAULT_PROFILE: &str = "v0_1_default";

/// How a mesh's primitives map onto output accessor sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveSplit {
    /// One accessor set for the whole mesh.
    Merged,
    /// Split only when primitives reference more than one distinct material.
    #[default]
    ByMaterial,
    /// One accessor set per primitive.
    Always,
}

/// Options controlling a compilation run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub tessellation_profile: String,
    pub default_solver: Solver,
    pub primitive_split: PrimitiveSplit,
    /// Run per-primitive and per-mesh work on the rayon pool.
    pub parallel: bool,
    /// Upper bound on marching-cubes cells per implicit primitive.
    pub max_implicit_cells: usize,
    /// Advisory codes that are not logged. They are still reported.
    pub suppress_advisories: Vec<AdvisoryCode>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            tessellation_profile: DEFAULT_PROFILE.to_string(),
            default_solver: Solver::LinearBlend,
            primitive_split: PrimitiveSplit::ByMaterial,
            parallel: true,
            max_implicit_cells: 64 * 64 * 64,
            suppress_advisories: Vec::new(),
        }
    }
}

impl CompileOptions {
    /// Sequential variant, mostly for determinism checks.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.default_solver = solver;
        self
    }

    pub fn with_split(mut self, split: PrimitiveSplit) -> Self {
        self.primitive_split = split;
        self
    }

    pub fn is_suppressed(&self, code: AdvisoryCode) -> bool {
        self.suppress_advisories.contains(&code)
    }
}
