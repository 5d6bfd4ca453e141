//! Houses and allied sub-houses.
//!
//! Rules entries are named with a two-letter house prefix (`ATTrike`,
//! `HKSmWindtrap`, `IXProjector`). The prefix is resolved into [`House`]
//! once, when a roster is built, and never string-matched again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum House {
    Atreides,
    Harkonnen,
    Ordos,
    Fremen,
    Sardaukar,
    Ix,
    Tleilaxu,
    Guild,
}

impl House {
    pub const ALL: [House; 8] = [
        House::Atreides,
        House::Harkonnen,
        House::Ordos,
        House::Fremen,
        House::Sardaukar,
        House::Ix,
        House::Tleilaxu,
        House::Guild,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            House::Atreides => "AT",
            House::Harkonnen => "HK",
            House::Ordos => "OR",
            House::Fremen => "FR",
            House::Sardaukar => "IM",
            House::Ix => "IX",
            House::Tleilaxu => "TL",
            House::Guild => "GU",
        }
    }

    /// Resolves the house from a prefixed rules name.
    pub fn from_type_name(name: &str) -> Option<House> {
        let prefix = name.get(..2)?;
        House::ALL.into_iter().find(|h| h.prefix() == prefix)
    }

    /// Atreides, Harkonnen and Ordos; everyone else is a sub-house.
    pub fn is_great_house(self) -> bool {
        matches!(self, House::Atreides | House::Harkonnen | House::Ordos)
    }

    /// Rules name for a house-specific variant of `base` (e.g. `Refinery`).
    pub fn type_name(self, base: &str) -> String {
        format!("{}{}", self.prefix(), base)
    }
}

impl fmt::Display for House {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            House::Atreides => "atreides",
            House::Harkonnen => "harkonnen",
            House::Ordos => "ordos",
            House::Fremen => "fremen",
            House::Sardaukar => "sardaukar",
            House::Ix => "ix",
            House::Tleilaxu => "tleilaxu",
            House::Guild => "guild",
        };
        write!(f, "{}", name)
    }
}

/// Error for unrecognized house names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown house: '{0}'")]
pub struct UnknownHouse(pub String);

impl FromStr for House {
    type Err = UnknownHouse;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        House::ALL
            .into_iter()
            .find(|h| h.to_string() == s.to_lowercase())
            .ok_or_else(|| UnknownHouse(s.to_string()))
    }
}
