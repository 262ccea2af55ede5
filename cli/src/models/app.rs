//! App manifest models

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Repository prefix shared by every image the CLI builds
pub const IMAGE_NAMESPACE: &str = "localapps/apps";

/// An application descriptor, usually read from `app.yml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppManifest {
    /// Human readable app name
    pub name: String,

    /// Stable app identity; derived from the name when empty
    #[serde(default)]
    pub id: String,

    /// Path to an icon file uploaded alongside the manifest
    #[serde(default)]
    pub icon: String,

    /// Buildable parts keyed by part name
    #[serde(default)]
    pub parts: BTreeMap<String, AppPart>,
}

/// One buildable sub-image of an app
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppPart {
    /// Build context directory
    pub src: String,
}

impl AppManifest {
    /// The app's identity: `id` verbatim, or the lowercased name with spaces
    /// replaced by hyphens.
    pub fn app_id(&self) -> String {
        if !self.id.is_empty() {
            return self.id.clone();
        }
        self.name.replace(' ', "-").to_lowercase()
    }

    /// Local image tag for a part: `localapps/apps/<id>/<part>`
    pub fn image_tag(&self, part_name: &str) -> String {
        image_tag(&self.app_id(), part_name)
    }

    pub fn has_icon(&self) -> bool {
        !self.icon.is_empty()
    }
}

/// Local image tag for a part of the app identified by `app_id`
pub fn image_tag(app_id: &str, part_name: &str) -> String {
    format!("{}/{}/{}", IMAGE_NAMESPACE, app_id, part_name)
}

/// Resolve a manifest-relative path against the manifest's directory
pub fn resolve_relative(manifest_path: &Path, value: &str) -> PathBuf {
    let value = Path::new(value);
    if value.is_absolute() {
        return value.to_path_buf();
    }
    match manifest_path.parent() {
        Some(dir) => dir.join(value),
        None => value.to_path_buf(),
    }
}
