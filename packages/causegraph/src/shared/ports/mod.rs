//! Ports consumed from the surrounding analysis

pub mod universe;

pub use universe::AnalysisUniverse;
