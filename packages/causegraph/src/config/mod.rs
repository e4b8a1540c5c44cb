//! Tracer configuration
//!
//! The granularity level is frozen process-wide on first activation; asking
//! for a different level afterwards is a fatal misconfiguration (see
//! `features::strategy`). Reconfiguring an analysis-wide instrumentation mode
//! after worker threads have begun recording would race.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Recording granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceLevel {
    /// Every hook is a no-op; export is unsupported
    Disabled,

    /// Method-level recording: virtual-call resolution only
    Coarse,

    /// Per-typeflow recording: full typeflow subgraph
    Fine,
}

impl Default for TraceLevel {
    fn default() -> Self {
        TraceLevel::Disabled
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceLevel::Disabled => write!(f, "disabled"),
            TraceLevel::Coarse => write!(f, "coarse"),
            TraceLevel::Fine => write!(f, "fine"),
        }
    }
}

/// Options controlling the binary export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Also write the human-readable `methods.txt` / `typeflows.txt` dumps
    pub emit_text_dumps: bool,
}

/// Tracer configuration, fixed at activation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracerConfig {
    pub level: TraceLevel,
    pub export: ExportOptions,
}

impl TracerConfig {
    pub fn new(level: TraceLevel) -> Self {
        Self {
            level,
            export: ExportOptions::default(),
        }
    }

    pub fn with_text_dumps(mut self, emit: bool) -> Self {
        self.export.emit_text_dumps = emit;
        self
    }
}
