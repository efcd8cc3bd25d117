//! Dataset class (category) model.

use serde::{Deserialize, Serialize};

use super::annotation::ClassId;
use crate::color_utils::{ClassColor, class_color};

/// A class defined at the dataset level. Boxes reference it by id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier for the class
    pub id: ClassId,
    /// Display name of the class
    pub name: String,
}

impl Category {
    /// Create a new class with the given ID and name.
    pub fn new(id: ClassId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }

    /// Render color, derived from the id alone.
    pub fn color(&self) -> ClassColor {
        class_color(self.id)
    }
}
