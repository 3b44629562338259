//! # StorageTier - Where an Asset Can Come From
//!
//! Tiers are tried in a fixed order until one succeeds. `TryAll` is a
//! selector rather than a location: it expands to every concrete tier.

use serde::{Deserialize, Serialize};

/// A storage tier, or `TryAll` to walk every tier in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageTier {
    /// Bundled → EmbeddedResources → AppPrivate → Web
    #[default]
    TryAll,
    /// Read-only assets shipped with the application
    Bundled,
    /// Application-private read/write storage (also holds the web cache)
    AppPrivate,
    /// Resources registered in-process at start-up
    EmbeddedResources,
    /// Network URL
    Web,
}

/// Dispatch order used by [`StorageTier::TryAll`]
pub const TRY_ALL_ORDER: [StorageTier; 4] = [
    StorageTier::Bundled,
    StorageTier::EmbeddedResources,
    StorageTier::AppPrivate,
    StorageTier::Web,
];

impl StorageTier {
    /// Expand into the concrete tiers to attempt, in order
    pub fn expand(self) -> Vec<StorageTier> {
        match self {
            Self::TryAll => TRY_ALL_ORDER.to_vec(),
            tier => vec![tier],
        }
    }
}

impl std::fmt::Display for StorageTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::TryAll => "try-all",
            Self::Bundled => "bundled",
            Self::AppPrivate => "app-private",
            Self::EmbeddedResources => "embedded-resources",
            Self::Web => "web",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for StorageTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "try-all" | "all" => Ok(Self::TryAll),
            "bundled" => Ok(Self::Bundled),
            "app-private" | "persistent" => Ok(Self::AppPrivate),
            "embedded-resources" | "embedded" | "resources" => Ok(Self::EmbeddedResources),
            "web" => Ok(Self::Web),
            other => Err(format!("unknown storage tier: {}", other)),
        }
    }
}

/// Flatten a caller-supplied tier list, expanding `TryAll` and dropping
/// repeats so no tier is attempted twice for one request.
pub fn dispatch_order(tiers: &[StorageTier]) -> Vec<StorageTier> {
    let mut order = Vec::with_capacity(TRY_ALL_ORDER.len());
    for tier in tiers.iter().flat_map(|t| t.expand()) {
        if !order.contains(&tier) {
            order.push(tier);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_all_order() {
        assert_eq!(
            StorageTier::TryAll.expand(),
            vec![
                StorageTier::Bundled,
                StorageTier::EmbeddedResources,
                StorageTier::AppPrivate,
                StorageTier::Web
            ]
        );
        assert_eq!(StorageTier::Web.expand(), vec![StorageTier::Web]);
    }

    #[test]
    fn test_dispatch_order_never_repeats() {
        let order = dispatch_order(&[StorageTier::Web, StorageTier::TryAll, StorageTier::Web]);
        assert_eq!(
            order,
            vec![
                StorageTier::Web,
                StorageTier::Bundled,
                StorageTier::EmbeddedResources,
                StorageTier::AppPrivate
            ]
        );
    }

    #[test]
    fn test_parse_round_trips_display() {
        for tier in [
            StorageTier::TryAll,
            StorageTier::Bundled,
            StorageTier::AppPrivate,
            StorageTier::EmbeddedResources,
            StorageTier::Web,
        ] {
            assert_eq!(tier.to_string().parse::<StorageTier>(), Ok(tier));
        }
        assert!("floppy".parse::<StorageTier>().is_err());
    }
}
