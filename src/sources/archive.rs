use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar_rs as tar;

use super::{labels_from_config, Source};
use crate::notifier::Notifier;
use crate::provenance::Labels;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "Config")]
    config: String,
}

/// Archive implementation of the Source trait for `docker save` tarballs,
/// plain or gzipped. Only `manifest.json` and the image configuration are
/// read; layers are skipped.
pub struct ArchiveSource;

impl ArchiveSource {
    pub fn new() -> Result<Self> {
        Ok(Self)
    }

    /// Streams the archive once per lookup and returns the named entry.
    fn read_entry(archive_path: &Path, wanted: &str) -> Result<Option<Vec<u8>>> {
        let wanted = normalize_entry_path(Path::new(wanted));
        let mut archive = open_archive(archive_path)?;

        for entry in archive
            .entries()
            .context(format!("Failed to read archive: {}", archive_path.display()))?
        {
            let mut entry = entry?;
            if normalize_entry_path(&entry.path()?) != wanted {
                continue;
            }
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .context(format!("Failed to read {} from archive", wanted.display()))?;
            return Ok(Some(contents));
        }

        Ok(None)
    }
}

fn open_archive(path: &Path) -> Result<tar::Archive<Box<dyn Read>>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open archive: {}", path.display()))?;

    let mut magic = [0u8; 2];
    let gzipped = file.read_exact(&mut magic).is_ok() && magic == GZIP_MAGIC;

    let file = File::open(path)?;
    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(tar::Archive::new(reader))
}

/// Drops `.` components and leading separators so `./manifest.json` and
/// `manifest.json` compare equal.
fn normalize_entry_path(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

impl Source for ArchiveSource {
    fn name(&self) -> &str {
        "archive"
    }

    fn image_labels(&self, image_path: &str, notifier: &Notifier) -> Result<Labels> {
        let archive_path = Path::new(image_path);

        if !archive_path.is_file() {
            return Err(anyhow!(
                "Archive file does not exist: {}",
                archive_path.display()
            ));
        }

        notifier.info(&format!("Reading image archive {}...", archive_path.display()));

        let manifest = Self::read_entry(archive_path, "manifest.json")?.ok_or_else(|| {
            anyhow!(
                "Invalid image archive: manifest.json not found. This does not appear to be a docker save tarball."
            )
        })?;
        let manifest: Vec<ManifestEntry> =
            serde_json::from_slice(&manifest).context("Failed to parse manifest.json")?;
        let config_path = &manifest
            .first()
            .ok_or_else(|| anyhow!("Empty manifest.json"))?
            .config;

        notifier.debug(&format!("Image configuration is {}", config_path));
        let config = Self::read_entry(archive_path, config_path)?
            .ok_or_else(|| anyhow!("Config file {} missing from archive", config_path))?;

        labels_from_config(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::tests::image_config;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn append(builder: &mut tar::Builder<impl Write>, path: &str, data: &[u8]) {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }

    fn write_image(writer: impl Write, labels: &[(&str, &str)]) {
        let mut builder = tar::Builder::new(writer);
        let config_name = "blobs/sha256/0123abcd";
        append(&mut builder, "blobs/sha256/layer", b"not really a layer");
        append(&mut builder, config_name, image_config(labels).as_bytes());
        let manifest = serde_json::json!([{
            "Config": config_name,
            "RepoTags": ["app:1.0"],
            "Layers": ["blobs/sha256/layer"]
        }]);
        append(&mut builder, "manifest.json", manifest.to_string().as_bytes());
        builder.into_inner().unwrap().flush().unwrap();
    }

    const LABELS: &[(&str, &str)] = &[
        ("org.opencontainers.image.source", "https://github.com/foo/bar"),
        ("org.opencontainers.image.revision", "abc1234"),
    ];

    #[test]
    fn test_labels_from_plain_archive() {
        let file = NamedTempFile::new().unwrap();
        write_image(File::create(file.path()).unwrap(), LABELS);

        let labels = ArchiveSource::new()
            .unwrap()
            .image_labels(file.path().to_str().unwrap(), &Notifier::new(0))
            .unwrap();
        assert_eq!(
            labels.get("org.opencontainers.image.revision").map(String::as_str),
            Some("abc1234")
        );
    }

    #[test]
    fn test_labels_from_gzipped_archive() {
        let file = NamedTempFile::new().unwrap();
        let encoder = GzEncoder::new(File::create(file.path()).unwrap(), Compression::default());
        write_image(encoder, LABELS);

        let labels = ArchiveSource::new()
            .unwrap()
            .image_labels(file.path().to_str().unwrap(), &Notifier::new(0))
            .unwrap();
        assert_eq!(
            labels.get("org.opencontainers.image.source").map(String::as_str),
            Some("https://github.com/foo/bar")
        );
    }

    #[test]
    fn test_archive_without_manifest() {
        let file = NamedTempFile::new().unwrap();
        {
            let mut builder = tar::Builder::new(File::create(file.path()).unwrap());
            append(&mut builder, "hello.txt", b"hello");
            builder.finish().unwrap();
        }

        let err = ArchiveSource::new()
            .unwrap()
            .image_labels(file.path().to_str().unwrap(), &Notifier::new(0))
            .unwrap_err();
        assert!(err.to_string().contains("manifest.json not found"));
    }

    #[test]
    fn test_missing_archive() {
        let err = ArchiveSource::new()
            .unwrap()
            .image_labels("/definitely/not/here.tar", &Notifier::new(0))
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(
            normalize_entry_path(Path::new("./manifest.json")),
            PathBuf::from("manifest.json")
        );
        assert_eq!(
            normalize_entry_path(Path::new("/blobs/sha256/abc")),
            PathBuf::from("blobs/sha256/abc")
        );
    }
}
