// src/kind.rs

//! Record kinds and their repository subdirectories

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A fixed category of repository content, one subdirectory each
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Manifests,
    Pkgsinfo,
    Catalogs,
    Icons,
    Pkgs,
}

impl RecordKind {
    /// Subdirectory name under the repository root
    pub fn dir_name(self) -> &'static str {
        match self {
            RecordKind::Manifests => "manifests",
            RecordKind::Pkgsinfo => "pkgsinfo",
            RecordKind::Catalogs => "catalogs",
            RecordKind::Icons => "icons",
            RecordKind::Pkgs => "pkgs",
        }
    }

    /// True for kinds whose files are property lists
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            RecordKind::Manifests | RecordKind::Pkgsinfo | RecordKind::Catalogs
        )
    }

    /// Status tag used while listing this kind
    pub fn list_status_tag(self) -> String {
        format!("{}_list_process", self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_kind_round_trip_names() {
        for kind in RecordKind::iter() {
            assert_eq!(kind.to_string(), kind.dir_name());
            assert_eq!(RecordKind::from_str(kind.dir_name()).unwrap(), kind);
        }
        assert!(RecordKind::from_str("packages").is_err());
    }

    #[test]
    fn test_structured_kinds() {
        assert!(RecordKind::Manifests.is_structured());
        assert!(RecordKind::Catalogs.is_structured());
        assert!(!RecordKind::Icons.is_structured());
        assert!(!RecordKind::Pkgs.is_structured());
    }

    #[test]
    fn test_list_status_tag() {
        assert_eq!(RecordKind::Pkgsinfo.list_status_tag(), "pkgsinfo_list_process");
    }
}
