use std::collections::HashMap;

/// Image labels, as reported by an image source.
pub type Labels = HashMap<String, String>;

pub const OCI_SOURCE: &str = "org.opencontainers.image.source";
pub const OCI_REVISION: &str = "org.opencontainers.image.revision";
pub const LABEL_SCHEMA_VCS_URL: &str = "org.label-schema.vcs-url";
pub const LABEL_SCHEMA_VCS_REF: &str = "org.label-schema.vcs-ref";

// Highest priority first.
const URL_KEYS: [&str; 2] = [LABEL_SCHEMA_VCS_URL, OCI_SOURCE];
const REVISION_KEYS: [&str; 2] = [LABEL_SCHEMA_VCS_REF, OCI_REVISION];

/// Where an image's code came from, according to its labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub vcs_url: Option<String>,
    pub revision: Option<String>,
}

impl Provenance {
    /// Reads the VCS URL and revision from well-known labels.
    ///
    /// When an image carries both label-schema and OCI keys, the label-schema
    /// value wins. Blank values are treated as absent.
    pub fn from_labels(labels: &Labels) -> Self {
        Self {
            vcs_url: first_present(labels, &URL_KEYS),
            revision: first_present(labels, &REVISION_KEYS),
        }
    }
}

fn first_present(labels: &Labels, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| labels.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
