//! # Configuration
//!
//! This module defines the configuration struct for the editing buffer.

use serde::{Deserialize, Serialize};

/// Configuration parameters for the editor.
///
/// These settings allow the host application to tune how edits are recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo snapshots kept. Default: 50.
    pub history_limit: usize,
    /// Snap dragged nodes to the grid when the drag ends. Default: false.
    pub snap_to_grid: bool,
    /// Grid spacing in world units. Default: 15.0.
    pub grid_size: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            snap_to_grid: false,
            grid_size: 15.0,
        }
    }
}
