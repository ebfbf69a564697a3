//! Replacement modes and the per-token decision table.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::error::ReplaceError;

/// How tag token lists are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplaceMode {
    /// Replace mapped tokens, keep everything else as is.
    #[default]
    Mapping,
    /// Replace the whole token list with the default value.
    UseDefault,
    /// Replace mapped tokens, fold the rest into a single default value.
    MapOrDefault,
    /// Replace mapped tokens, keep unknown tokens and malformed lists.
    MapOrIgnore,
    /// Replace mapped tokens, fail on anything else.
    MapOrFail,
    /// Drop the token list, leaving `TAG:`.
    ScrubNames,
}

impl ReplaceMode {
    pub const ALL: [ReplaceMode; 6] = [
        ReplaceMode::Mapping,
        ReplaceMode::UseDefault,
        ReplaceMode::MapOrDefault,
        ReplaceMode::MapOrIgnore,
        ReplaceMode::MapOrFail,
        ReplaceMode::ScrubNames,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReplaceMode::Mapping => "MAPPING",
            ReplaceMode::UseDefault => "USE_DEFAULT",
            ReplaceMode::MapOrDefault => "MAP_OR_DEFAULT",
            ReplaceMode::MapOrIgnore => "MAP_OR_IGNORE",
            ReplaceMode::MapOrFail => "MAP_OR_FAIL",
            ReplaceMode::ScrubNames => "SCRUB_NAMES",
        }
    }

    /// Modes that need a `default` value.
    pub fn requires_default(self) -> bool {
        matches!(self, ReplaceMode::UseDefault | ReplaceMode::MapOrDefault)
    }

    /// Modes that consult the mapping at all.
    pub fn uses_mapping(self) -> bool {
        !matches!(self, ReplaceMode::UseDefault | ReplaceMode::ScrubNames)
    }

    /// Modes whose output can be turned back into the input by inverting the
    /// mapping.
    pub fn is_reversible(self) -> bool {
        self.uses_mapping()
    }
}

impl fmt::Display for ReplaceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplaceMode {
    type Err = ReplaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReplaceMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ReplaceError::Config(format!(
                    "unknown mode '{s}', expected one of: {}",
                    ReplaceMode::ALL.map(ReplaceMode::as_str).join(", ")
                ))
            })
    }
}

/// What to do with a single well-formed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<'a> {
    /// Substitute the mapped value.
    Replace(&'a str),
    /// Leave the token as written.
    Keep,
    /// Fold the token into the default value.
    UseDefault,
    /// The token has no mapping and the mode does not allow that.
    Unmapped,
    /// The mode discards the whole token list; tokens are never looked at.
    Discard,
}

/// Decide how `token` is rewritten under `mode`.
pub fn decide<'a>(mode: ReplaceMode, token: &str, mapping: &'a IndexMap<String, String>) -> Decision<'a> {
    let mapped = mapping.get(token).map(String::as_str);
    match (mode, mapped) {
        (ReplaceMode::UseDefault | ReplaceMode::ScrubNames, _) => Decision::Discard,
        (_, Some(value)) => Decision::Replace(value),
        (ReplaceMode::Mapping | ReplaceMode::MapOrIgnore, None) => Decision::Keep,
        (ReplaceMode::MapOrDefault, None) => Decision::UseDefault,
        (ReplaceMode::MapOrFail, None) => Decision::Unmapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> IndexMap<String, String> {
        IndexMap::from([("aaa".to_string(), "foo".to_string())])
    }

    #[test]
    fn mapped_tokens_are_replaced_in_every_mapping_mode() {
        let mapping = mapping();
        for mode in ReplaceMode::ALL.into_iter().filter(|m| m.uses_mapping()) {
            assert_eq!(decide(mode, "aaa", &mapping), Decision::Replace("foo"), "{mode}");
        }
    }

    #[test]
    fn unknown_token_per_mode() {
        let mapping = mapping();
        assert_eq!(decide(ReplaceMode::Mapping, "zzz", &mapping), Decision::Keep);
        assert_eq!(decide(ReplaceMode::MapOrIgnore, "zzz", &mapping), Decision::Keep);
        assert_eq!(decide(ReplaceMode::MapOrDefault, "zzz", &mapping), Decision::UseDefault);
        assert_eq!(decide(ReplaceMode::MapOrFail, "zzz", &mapping), Decision::Unmapped);
        assert_eq!(decide(ReplaceMode::UseDefault, "aaa", &mapping), Decision::Discard);
        assert_eq!(decide(ReplaceMode::ScrubNames, "aaa", &mapping), Decision::Discard);
    }

    #[test]
    fn mode_names_round_trip_through_from_str() {
        for mode in ReplaceMode::ALL {
            assert_eq!(mode.to_string().parse::<ReplaceMode>().unwrap(), mode);
        }
        assert_eq!("map_or_fail".parse::<ReplaceMode>().unwrap(), ReplaceMode::MapOrFail);
    }

    #[test]
    fn unknown_mode_lists_choices() {
        let err = "REPLACE_ALL".parse::<ReplaceMode>().unwrap_err();
        assert!(err.to_string().contains("SCRUB_NAMES"));
    }

    #[test]
    fn only_lossy_modes_are_irreversible() {
        assert!(!ReplaceMode::UseDefault.is_reversible());
        assert!(!ReplaceMode::ScrubNames.is_reversible());
        assert!(ReplaceMode::Mapping.is_reversible());
        assert!(ReplaceMode::MapOrDefault.is_reversible());
    }
}
