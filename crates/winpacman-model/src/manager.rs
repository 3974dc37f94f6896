use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A package ecosystem, or the attribution of an installed app to one.
///
/// `Manager` is a closed set (spec §3 "Manager enum"). `Msstore` and
/// `Unknown` only ever appear as installed-record attribution; they never
/// back a [`Provider`](https://docs.rs/winpacman-provider) that supplies a
/// catalog (see [`Manager::is_catalog_provider`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manager {
    Winget,
    Chocolatey,
    Scoop,
    Npm,
    Cargo,
    Msstore,
    Unknown,
}

impl Manager {
    pub const ALL: [Manager; 7] = [
        Manager::Winget,
        Manager::Chocolatey,
        Manager::Scoop,
        Manager::Npm,
        Manager::Cargo,
        Manager::Msstore,
        Manager::Unknown,
    ];

    /// Managers that back a catalog-fetching [`Provider`]. `Msstore` and
    /// `Unknown` are attribution-only values and never appear here.
    pub const CATALOG_PROVIDERS: [Manager; 5] = [
        Manager::Winget,
        Manager::Chocolatey,
        Manager::Scoop,
        Manager::Npm,
        Manager::Cargo,
    ];

    pub fn is_catalog_provider(self) -> bool {
        Self::CATALOG_PROVIDERS.contains(&self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Manager::Winget => "winget",
            Manager::Chocolatey => "chocolatey",
            Manager::Scoop => "scoop",
            Manager::Npm => "npm",
            Manager::Cargo => "cargo",
            Manager::Msstore => "msstore",
            Manager::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized manager: {0}")]
pub struct ParseManagerError(String);

impl FromStr for Manager {
    type Err = ParseManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "winget" => Ok(Manager::Winget),
            "chocolatey" | "choco" => Ok(Manager::Chocolatey),
            "scoop" => Ok(Manager::Scoop),
            "npm" => Ok(Manager::Npm),
            "cargo" => Ok(Manager::Cargo),
            "msstore" | "microsoft store" => Ok(Manager::Msstore),
            "unknown" => Ok(Manager::Unknown),
            other => Err(ParseManagerError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for m in Manager::ALL {
            assert_eq!(m.as_str().parse::<Manager>().unwrap(), m);
        }
    }

    #[test]
    fn choco_alias_parses() {
        assert_eq!("choco".parse::<Manager>().unwrap(), Manager::Chocolatey);
    }

    #[test]
    fn only_five_catalog_providers() {
        assert!(!Manager::Msstore.is_catalog_provider());
        assert!(!Manager::Unknown.is_catalog_provider());
        assert!(Manager::Winget.is_catalog_provider());
    }

    #[test]
    fn serde_round_trip_is_lowercase() {
        let json = serde_json::to_string(&Manager::Chocolatey).unwrap();
        assert_eq!(json, "\"chocolatey\"");
    }
}
