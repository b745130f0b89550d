//! Map search state: whether the map is showing the whole election or the
//! results of an address search.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::MapSearchResult;

/// What the map is currently focused on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MapMode {
    /// The whole election area.
    #[default]
    ShowElection,
    /// The area around the last search.
    ShowSearchResults,
}

/// State the host keeps for the map and hands to the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapModule {
    /// Current focus.
    pub mode: MapMode,
    /// Last search, `None` once cleared.
    pub search: Option<MapSearchResult>,
}

/// Transitions of [`MapModule`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapAction {
    /// A search (address lookup or geolocation) completed.
    SearchMap(MapSearchResult),
    /// The user cleared their search.
    ClearMapSearch,
}

impl MapModule {
    /// Applies `action`, returning the next state.
    #[must_use]
    pub fn reduce(self, action: MapAction) -> Self {
        match action {
            MapAction::SearchMap(search) => Self {
                mode: MapMode::ShowSearchResults,
                search: Some(search),
            },
            MapAction::ClearMapSearch => Self {
                mode: MapMode::ShowElection,
                search: None,
            },
        }
    }
}
