use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

/// One registered Visual Studio installation.
///
/// Every field is an owned copy; nothing here refers back to the setup API.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "camelCase"))]
pub struct InstanceRecord {
    pub instance_id: String,
    pub display_name: String,
    /// The installation version as reported, e.g. `17.9.34607.119`.
    pub version: String,
    #[cfg_attr(feature = "serde", serde(serialize_with = "lossy_path"))]
    pub install_path: PathBuf,
    #[cfg_attr(feature = "serde", serde(serialize_with = "lossy_path"))]
    pub engine_path: PathBuf,
    pub packages: Vec<PackageRecord>,
}

/// A workload, component or other package installed into an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PackageRecord {
    pub id: String,
    pub version: String,
    /// The package type, e.g. `Product`, `Workload` or `Component`.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
}

/// Paths may hold unpaired surrogates, which serde's own `Path` impl rejects.
#[cfg(feature = "serde")]
fn lossy_path<S: Serializer>(path: &std::path::Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

impl InstanceRecord {
    /// The leading numeric components of [`version`](Self::version).
    ///
    /// Parsing stops at the first component that isn't a plain unsigned integer,
    /// so `17.0.0-pre.1` gives `[17, 0]`.
    pub fn version_info(&self) -> Vec<u64> {
        self.version
            .split('.')
            .map_while(|part| {
                if part.bytes().all(|b| b.is_ascii_digit()) {
                    part.parse().ok()
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn has_package(&self, id: &str) -> bool {
        self.packages.iter().any(|package| package.id == id)
    }

    /// `true` if every id is installed. Vacuously `true` for no ids.
    pub fn has_all_packages<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        ids.iter().all(|id| self.has_package(id.as_ref()))
    }

    /// `true` if at least one id is installed.
    pub fn has_any_package<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        ids.iter().any(|id| self.has_package(id.as_ref()))
    }
}
