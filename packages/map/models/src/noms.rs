//! Amenity flags ("noms") and the filter toggles that select on them.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// What a polling place's stall is offering.
///
/// Every flag is tri-state on the wire: `true`, `false`, or absent. The
/// style resolver distinguishes an explicit `false` from an absent flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Noms {
    /// Sausage sizzle.
    #[serde(default)]
    pub bbq: Option<bool>,
    /// Cake stall.
    #[serde(default)]
    pub cake: Option<bool>,
    /// The stall has sold out.
    #[serde(default)]
    pub run_out: Option<bool>,
    /// Reported as having nothing on offer.
    #[serde(default)]
    pub nothing: Option<bool>,
    /// Something other than a sausage or cake.
    #[serde(default)]
    pub other: Option<bool>,
    /// Coffee.
    #[serde(default)]
    pub coffee: Option<bool>,
    /// Vegetarian options.
    #[serde(default)]
    pub vego: Option<bool>,
    /// Halal options.
    #[serde(default)]
    pub halal: Option<bool>,
    /// Bacon and egg burgers.
    #[serde(default)]
    pub bacon_and_eggs: Option<bool>,
    /// Anything else the stall holder wrote in.
    #[serde(default)]
    pub free_text: Option<String>,
}

impl Noms {
    /// Returns `true` only when `flag` is explicitly `true`.
    #[must_use]
    pub const fn is(flag: Option<bool>) -> bool {
        matches!(flag, Some(true))
    }

    /// Whether the stall offers the given filterable option.
    #[must_use]
    pub fn offers(&self, option: FilterOption) -> bool {
        Self::is(match option {
            FilterOption::Vego => self.vego,
            FilterOption::Halal => self.halal,
            FilterOption::Coffee => self.coffee,
            FilterOption::BaconAndEggs => self.bacon_and_eggs,
        })
    }

    /// Human readable list of what's on offer, e.g.
    /// `"sausage sizzle, cake stall, and additional options: scones"`.
    ///
    /// Returns an empty string when nothing is flagged.
    #[must_use]
    pub fn food_description(&self) -> String {
        let descriptors = [
            (self.bbq, "sausage sizzle"),
            (self.cake, "cake stall"),
            (self.coffee, "coffee"),
            (self.vego, "vegetarian options"),
            (self.halal, "halal options"),
            (self.bacon_and_eggs, "bacon and egg burgers"),
        ];

        let mut parts: Vec<String> = descriptors
            .into_iter()
            .filter(|(flag, _)| Self::is(*flag))
            .map(|(_, descriptor)| descriptor.to_string())
            .collect();

        if let Some(free_text) = self.free_text.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("and additional options: {free_text}"));
        }

        parts.join(", ")
    }
}

/// A filter the user can switch on to only see matching stalls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FilterOption {
    /// Vegetarian options.
    Vego,
    /// Halal options.
    Halal,
    /// Coffee.
    Coffee,
    /// Bacon and egg burgers.
    BaconAndEggs,
}

impl FilterOption {
    /// All filter options.
    pub const ALL: &[Self] = &[Self::Vego, Self::Halal, Self::Coffee, Self::BaconAndEggs];
}

/// Filter toggles applied to the data layer's markers.
///
/// Compared by value: two option sets with the same toggles are the same
/// filter regardless of where they came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapFilterOptions {
    /// Only show stalls with vegetarian options.
    #[serde(default)]
    pub vego: bool,
    /// Only show stalls with halal options.
    #[serde(default)]
    pub halal: bool,
    /// Only show stalls with coffee.
    #[serde(default)]
    pub coffee: bool,
    /// Only show stalls with bacon and egg burgers.
    #[serde(default)]
    pub bacon_and_eggs: bool,
}

impl MapFilterOptions {
    /// Whether `option` is switched on.
    #[must_use]
    pub const fn is_enabled(&self, option: FilterOption) -> bool {
        match option {
            FilterOption::Vego => self.vego,
            FilterOption::Halal => self.halal,
            FilterOption::Coffee => self.coffee,
            FilterOption::BaconAndEggs => self.bacon_and_eggs,
        }
    }

    /// Switches `option` on or off.
    pub const fn set(&mut self, option: FilterOption, enabled: bool) {
        match option {
            FilterOption::Vego => self.vego = enabled,
            FilterOption::Halal => self.halal = enabled,
            FilterOption::Coffee => self.coffee = enabled,
            FilterOption::BaconAndEggs => self.bacon_and_eggs = enabled,
        }
    }

    /// Whether any toggle is on.
    #[must_use]
    pub fn is_active(&self) -> bool {
        FilterOption::ALL.iter().any(|o| self.is_enabled(*o))
    }

    /// Whether a stall with `noms` passes every enabled toggle.
    ///
    /// With no toggles on everything passes, including stalls with no
    /// noms at all.
    #[must_use]
    pub fn matches(&self, noms: Option<&Noms>) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(noms) = noms else {
            return false;
        };
        FilterOption::ALL
            .iter()
            .filter(|o| self.is_enabled(**o))
            .all(|o| noms.offers(*o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_description_lists_flags_in_order() {
        let noms = Noms {
            cake: Some(true),
            bbq: Some(true),
            halal: Some(false),
            coffee: Some(true),
            free_text: Some("scones".to_string()),
            ..Noms::default()
        };
        assert_eq!(
            noms.food_description(),
            "sausage sizzle, cake stall, coffee, and additional options: scones"
        );
    }

    #[test]
    fn food_description_ignores_empty_free_text() {
        let noms = Noms {
            vego: Some(true),
            free_text: Some(String::new()),
            ..Noms::default()
        };
        assert_eq!(noms.food_description(), "vegetarian options");
        assert_eq!(Noms::default().food_description(), "");
    }

    #[test]
    fn absent_flags_deserialize_as_none() {
        let noms: Noms = serde_json::from_str(r#"{"bbq": true}"#).unwrap();
        assert_eq!(noms.bbq, Some(true));
        assert_eq!(noms.cake, None);
    }

    #[test]
    fn inactive_filter_matches_everything() {
        let filter = MapFilterOptions::default();
        assert!(!filter.is_active());
        assert!(filter.matches(None));
        assert!(filter.matches(Some(&Noms::default())));
    }

    #[test]
    fn active_filter_requires_every_enabled_option() {
        let mut filter = MapFilterOptions::default();
        filter.set(FilterOption::Vego, true);
        filter.set(FilterOption::Coffee, true);

        let both = Noms {
            vego: Some(true),
            coffee: Some(true),
            ..Noms::default()
        };
        let vego_only = Noms {
            vego: Some(true),
            ..Noms::default()
        };

        assert!(filter.matches(Some(&both)));
        assert!(!filter.matches(Some(&vego_only)));
        assert!(!filter.matches(None));
    }

    #[test]
    fn filter_option_parses_from_snake_case() {
        let option: FilterOption = "bacon_and_eggs".parse().unwrap();
        assert_eq!(option, FilterOption::BaconAndEggs);
    }
}
