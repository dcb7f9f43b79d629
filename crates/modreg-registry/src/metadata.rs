//! `modules/<name>/metadata.json`.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    document::{read_json, write_json},
    error::Result,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maintainer {
    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

/// Per-module registry metadata.
///
/// `versions` is kept in the order versions were added, so the last entry
/// is the most recent one. Fields this type does not model are preserved in
/// `extras` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default)]
    pub homepage: String,

    #[serde(default)]
    pub maintainers: Vec<Maintainer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<Vec<String>>,

    #[serde(default)]
    pub versions: Vec<String>,

    #[serde(default)]
    pub yanked_versions: BTreeMap<String, String>,

    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl MetadataConfig {
    pub fn load(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    /// The most recently added version, ignoring empty entries.
    pub fn latest_version(&self) -> Option<&str> {
        self.versions
            .last()
            .map(String::as_str)
            .filter(|version| !version.is_empty())
    }

    pub fn has_version(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v == version)
    }

    /// Reason the version was yanked, if it was.
    pub fn is_yanked(&self, version: &str) -> Option<&str> {
        self.yanked_versions.get(version).map(String::as_str)
    }

    pub fn has_repository(&self) -> bool {
        self.repository
            .as_ref()
            .is_some_and(|repos| !repos.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const BCR_METADATA: &str = r#"{
    "homepage": "https://github.com/bazelbuild/rules_cc",
    "maintainers": [
        {
            "email": "someone@example.com",
            "github": "someone",
            "name": "Some One",
            "github_user_id": 12345
        }
    ],
    "repository": [
        "github:bazelbuild/rules_cc"
    ],
    "versions": [
        "0.0.1",
        "0.0.2",
        "0.1.0"
    ],
    "yanked_versions": {
        "0.0.2": "broken release"
    },
    "deprecated": "use something else"
}
"#;

    #[test]
    fn test_parse_metadata() {
        let metadata: MetadataConfig = serde_json::from_str(BCR_METADATA).unwrap();

        assert_eq!(metadata.latest_version(), Some("0.1.0"));
        assert!(metadata.has_version("0.0.1"));
        assert!(!metadata.has_version("9.9.9"));
        assert_eq!(metadata.is_yanked("0.0.2"), Some("broken release"));
        assert_eq!(metadata.is_yanked("0.1.0"), None);
        assert!(metadata.has_repository());
        assert_eq!(metadata.maintainers[0].github.as_deref(), Some("someone"));
        assert!(metadata.maintainers[0].extras.contains_key("github_user_id"));
        assert!(metadata.extras.contains_key("deprecated"));
    }

    #[test]
    fn test_minimal_metadata() {
        let metadata: MetadataConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(metadata.latest_version(), None);
        assert!(!metadata.has_repository());
    }

    #[test]
    fn test_empty_latest_version_is_none() {
        let metadata: MetadataConfig =
            serde_json::from_str(r#"{"versions": ["1.0.0", ""]}"#).unwrap();
        assert_eq!(metadata.latest_version(), None);
    }

    #[test]
    fn test_save_preserves_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, BCR_METADATA).unwrap();

        let mut metadata = MetadataConfig::load(&path).unwrap();
        metadata.versions.push("0.2.0".to_string());
        metadata.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
        assert!(written.contains("\n    \"homepage\""));

        let reloaded = MetadataConfig::load(&path).unwrap();
        assert_eq!(reloaded.latest_version(), Some("0.2.0"));
        assert_eq!(
            reloaded.extras.get("deprecated"),
            Some(&Value::from("use something else"))
        );
        assert_eq!(
            reloaded.maintainers[0].extras.get("github_user_id"),
            Some(&Value::from(12345))
        );
    }
}
