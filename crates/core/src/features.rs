//! Visual features extracted from an approved front view.
//!
//! Features are computed once per approval and cached on the approval row so
//! remaining views reuse the same color and material truth.

use serde::{Deserialize, Serialize};

/// Description used when extraction failed and defaults were substituted.
pub const FALLBACK_DESCRIPTION: &str = "Product features unavailable; follow the front view.";

/// Approximate physical size of the product, in centimetres.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatedDimensions {
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub depth_cm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFeatures {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub estimated_dimensions: EstimatedDimensions,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub key_elements: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl Default for ExtractedFeatures {
    /// A structurally valid empty feature set.
    fn default() -> Self {
        Self {
            colors: Vec::new(),
            estimated_dimensions: EstimatedDimensions::default(),
            materials: Vec::new(),
            key_elements: Vec::new(),
            description: FALLBACK_DESCRIPTION.to_string(),
        }
    }
}

impl ExtractedFeatures {
    /// Whether this set carries nothing a prompt could use.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
            && self.materials.is_empty()
            && self.key_elements.is_empty()
            && (self.description.is_empty() || self.description == FALLBACK_DESCRIPTION)
    }

    /// Parse a cached JSON value, tolerating missing fields.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
