//! Non-fatal advisories.
//!
//! Advisories never change the compiled output. They are collected into the
//! compile report and logged through `log::warn!` unless suppressed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CompileOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdvisoryCode {
    /// A vertex had more than four nonzero influence candidates.
    W01,
    /// An implicit surface produced no triangles.
    W02,
    /// A vertex's capped influences summed to zero and fell back to the root bone.
    W03,
}

impl fmt::Display for AdvisoryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            AdvisoryCode::W01 => "W01",
            AdvisoryCode::W02 => "W02",
            AdvisoryCode::W03 => "W03",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub code: AdvisoryCode,
    pub mesh: String,
    pub message: String,
}

impl Advisory {
    pub fn new(code: AdvisoryCode, mesh: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            mesh: mesh.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.mesh, self.message)
    }
}

/// Log advisories in order, skipping suppressed codes. Returns how many were logged.
pub fn emit(advisories: &[Advisory], options: &CompileOptions) -> usize {
    let mut logged = 0;
    for advisory in advisories {
        if !options.is_suppressed(advisory.code) {
            log::warn!("{}", advisory);
            logged += 1;
        }
    }
    logged
}
