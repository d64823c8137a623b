//! The five coordinated product views and the URL sets built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One camera angle of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Front,
    Back,
    Side,
    Top,
    Bottom,
}

impl ViewType {
    /// Every view in commit order.
    pub const ALL: [ViewType; 5] = [
        ViewType::Front,
        ViewType::Back,
        ViewType::Side,
        ViewType::Top,
        ViewType::Bottom,
    ];

    /// Views produced after the front view is approved.
    pub const REMAINING: [ViewType; 4] =
        [ViewType::Back, ViewType::Side, ViewType::Top, ViewType::Bottom];

    /// Views generated concurrently once the back view exists.
    pub const DEPENDENT: [ViewType; 3] = [ViewType::Side, ViewType::Top, ViewType::Bottom];

    pub fn as_str(self) -> &'static str {
        match self {
            ViewType::Front => "front",
            ViewType::Back => "back",
            ViewType::Side => "side",
            ViewType::Top => "top",
            ViewType::Bottom => "bottom",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViewType::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid view type '{s}'. Must be one of: front, back, side, top, bottom"
                ))
            })
    }
}

/// The five URLs submitted when committing a revision batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllViews {
    pub front: String,
    pub back: String,
    pub side: String,
    pub top: String,
    pub bottom: String,
}

impl AllViews {
    pub fn get(&self, view: ViewType) -> &str {
        match view {
            ViewType::Front => &self.front,
            ViewType::Back => &self.back,
            ViewType::Side => &self.side,
            ViewType::Top => &self.top,
            ViewType::Bottom => &self.bottom,
        }
    }

    /// Iterate `(view, url)` pairs in commit order.
    pub fn iter(&self) -> impl Iterator<Item = (ViewType, &str)> {
        ViewType::ALL.into_iter().map(move |v| (v, self.get(v)))
    }

    /// Views whose URL is empty or whitespace.
    pub fn missing(&self) -> Vec<ViewType> {
        self.iter()
            .filter(|(_, url)| url.trim().is_empty())
            .map(|(v, _)| v)
            .collect()
    }
}

/// URLs for the four non-front views. A failed view is an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingViewUrls {
    pub back: String,
    pub side: String,
    pub top: String,
    pub bottom: String,
}

impl RemainingViewUrls {
    pub fn get(&self, view: ViewType) -> Option<&str> {
        match view {
            ViewType::Front => None,
            ViewType::Back => Some(&self.back),
            ViewType::Side => Some(&self.side),
            ViewType::Top => Some(&self.top),
            ViewType::Bottom => Some(&self.bottom),
        }
    }

    /// Set the URL for `view`. The front view is ignored.
    pub fn set(&mut self, view: ViewType, url: String) {
        match view {
            ViewType::Front => {}
            ViewType::Back => self.back = url,
            ViewType::Side => self.side = url,
            ViewType::Top => self.top = url,
            ViewType::Bottom => self.bottom = url,
        }
    }

    /// Number of views that resolved to a non-empty URL.
    pub fn populated(&self) -> usize {
        ViewType::REMAINING
            .into_iter()
            .filter_map(|v| self.get(v))
            .filter(|url| !url.is_empty())
            .count()
    }

    pub fn with_front(self, front: impl Into<String>) -> AllViews {
        AllViews {
            front: front.into(),
            back: self.back,
            side: self.side,
            top: self.top,
            bottom: self.bottom,
        }
    }
}
