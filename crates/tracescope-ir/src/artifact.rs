//! Generated artifact text.

/// The module text and its companion config text produced by one synthesis
/// pass. The pair is regenerated as a whole once per phase and written
/// atomically; callers never patch artifact text in place.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct GeneratedArtifact {
    pub module: String,
    pub config: String,
}
