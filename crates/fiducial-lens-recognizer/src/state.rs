use crate::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a surface's recognition cycle currently is.
///
/// `Succeeded` and `Failed` are visible only between the end of
/// classification and delivery of the result; the surface is back to `Idle`
/// by the time the completion runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    #[default]
    Idle,
    Capturing,
    Rectifying,
    Classifying,
    Succeeded,
    Failed(ErrorKind),
}

impl CycleState {
    /// `true` while a cycle owns the surface.
    pub fn is_busy(self) -> bool {
        self != CycleState::Idle
    }
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleState::Idle => f.write_str("idle"),
            CycleState::Capturing => f.write_str("capturing"),
            CycleState::Rectifying => f.write_str("rectifying"),
            CycleState::Classifying => f.write_str("classifying"),
            CycleState::Succeeded => f.write_str("succeeded"),
            CycleState::Failed(kind) => write!(f, "failed({kind:?})"),
        }
    }
}
