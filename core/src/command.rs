use serde::{Deserialize, Serialize};
use crate::types::AreaKey;

/// Commands a UI shell can issue against a mounted view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ViewCommand {
    SelectArea { area: AreaKey },
    Pause,
    Resume,
}
