//! `datapackage.json` and `datapackage-digest.json`.

use serde::{Deserialize, Serialize};

use crate::format::MANIFEST_FILE;
use crate::warc::digest::sha256_digest;
use crate::Result;

/// WACZ format version written to the manifest.
pub const WACZ_VERSION: &str = "1.1.1";

/// Name of the file holding the manifest digest.
pub const DIGEST_FILE: &str = "datapackage-digest.json";

/// One file listed in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// File name without directories.
    pub name: String,
    /// Path inside the package.
    pub path: String,
    /// `sha256:<hex>` of the file bytes.
    pub hash: String,
    /// File size.
    pub bytes: u64,
}

/// The package manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPackage {
    /// Always `data-package`.
    pub profile: String,
    /// WACZ format version.
    pub wacz_version: String,
    /// Producing software and version.
    pub software: String,
    /// Creation time, RFC 3339.
    pub created: String,
    /// Listed files.
    pub resources: Vec<Resource>,
}

impl DataPackage {
    /// Creates an empty manifest stamped with `created`.
    pub fn new(created: impl Into<String>) -> Self {
        Self {
            profile: "data-package".to_string(),
            wacz_version: WACZ_VERSION.to_string(),
            software: format!("waczfold {}", env!("CARGO_PKG_VERSION")),
            created: created.into(),
            resources: Vec::new(),
        }
    }

    /// Lists a file.
    pub fn add(&mut self, path: &str, hash: String, bytes: u64) {
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.resources.push(Resource {
            name,
            path: path.to_string(),
            hash,
            bytes,
        });
    }

    /// Renders the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

#[derive(Serialize)]
struct DigestFile<'a> {
    path: &'a str,
    hash: String,
}

/// Renders `datapackage-digest.json` for the given manifest bytes.
pub fn digest_json(manifest: &[u8]) -> Result<Vec<u8>> {
    let file = DigestFile {
        path: MANIFEST_FILE,
        hash: sha256_digest(manifest),
    };
    Ok(serde_json::to_vec_pretty(&file)?)
}
