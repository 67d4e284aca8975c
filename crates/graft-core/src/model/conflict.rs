use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GraftError;

/// How an added facet is reconciled with facets of the same kind that the
/// remap target already carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ConflictMode {
    /// Add clones from the source, leave destination facets unmodified
    KeepBoth,
    /// Destroy destination facets of the kind once, then clone from the source
    KeepSrc,
    /// Leave the destination alone; the source facet is not copied
    KeepDest,
    /// Overwrite destination facets in order, appending once they run out
    ModifyDest,
}

impl ConflictMode {
    pub const ALL: [ConflictMode; 4] = [
        ConflictMode::KeepBoth,
        ConflictMode::KeepSrc,
        ConflictMode::KeepDest,
        ConflictMode::ModifyDest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictMode::KeepBoth => "keep_both",
            ConflictMode::KeepSrc => "keep_src",
            ConflictMode::KeepDest => "keep_dest",
            ConflictMode::ModifyDest => "modify_dest",
        }
    }
}

impl fmt::Display for ConflictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts `keep_both`, `keep-both`, `KeepBoth` and so on.
///
/// # Errors
///
/// Returns `UnknownConflictMode` for anything outside the four modes.
impl FromStr for ConflictMode {
    type Err = GraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "keepboth" => Ok(ConflictMode::KeepBoth),
            "keepsrc" => Ok(ConflictMode::KeepSrc),
            "keepdest" => Ok(ConflictMode::KeepDest),
            "modifydest" => Ok(ConflictMode::ModifyDest),
            _ => Err(GraftError::UnknownConflictMode {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ConflictMode {
    type Error = GraftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConflictMode> for String {
    fn from(mode: ConflictMode) -> Self {
        mode.as_str().to_string()
    }
}
