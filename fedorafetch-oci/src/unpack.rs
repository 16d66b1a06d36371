use crate::error::{OciError, Result};
use crate::layout::{ImageLayout, INDEX_FILE};
use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};
use xz2::read::XzDecoder;

/// How many archive-inside-archive rounds are followed before giving up.
pub const MAX_NESTING_DEPTH: usize = 4;

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Single-stream compression formats recognised by file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Xz,
    Gzip,
    Zstd,
}

impl Compression {
    /// Detect the compression from the last extension of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(OsStr::to_str) {
            Some("xz") => Some(Self::Xz),
            Some("gz") | Some("tgz") => Some(Self::Gzip),
            Some("zst") => Some(Self::Zstd),
            _ => None,
        }
    }

    fn reader<'a, R: Read + 'a>(self, inner: R) -> Result<Box<dyn Read + 'a>> {
        match self {
            Self::Xz => Ok(Box::new(XzDecoder::new(inner))),
            Self::Gzip => Ok(Box::new(GzDecoder::new(inner))),
            Self::Zstd => {
                let decoder = zstd::Decoder::new(inner)
                    .map_err(|e| OciError::MalformedArchive(format!("zstd init: {}", e)))?;
                Ok(Box::new(decoder))
            }
        }
    }
}

/// Returns `true` when `path` names a compressed tar archive
/// (`.tar.xz`, `.tar.gz`, `.tgz`, `.tar.zst`).
pub fn is_compressed_archive(path: &Path) -> bool {
    let name = match path.file_name().and_then(OsStr::to_str) {
        Some(n) => n,
        None => return false,
    };
    [".tar.xz", ".tar.gz", ".tgz", ".tar.zst"]
        .iter()
        .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Unwrap a downloaded artifact in place until an image layout appears.
///
/// Each round decompresses the archive next to itself, removes the
/// compressed file, extracts the tar into the same directory and removes
/// the tar.  When the extracted entries contain `index.json` the directory
/// is returned as the layout root; when they instead contain another
/// compressed archive, that archive is unwrapped in the next round.
pub fn unpack_artifact(artifact: &Path) -> Result<ImageLayout> {
    let mut current = artifact.to_path_buf();

    for depth in 0..MAX_NESTING_DEPTH {
        let dest = current
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(path = %current.display(), depth, "decompressing");
        let tar_path = decompress(&current)?;
        let top_level = extract_archive(&tar_path, &dest)?;
        fs::remove_file(&tar_path)?;
        debug!(path = %tar_path.display(), "removed intermediate tar");

        if top_level.iter().any(|p| p.as_os_str() == INDEX_FILE) {
            return Ok(ImageLayout::new(dest));
        }

        if let Some(nested) = top_level.iter().find(|p| is_compressed_archive(p)) {
            current = dest.join(nested);
            continue;
        }

        // A single wrapping directory around the layout.
        if let [only] = top_level.as_slice() {
            let dir = dest.join(only);
            if ImageLayout::is_layout(&dir) {
                return Ok(ImageLayout::new(dir));
            }
        }

        return Err(OciError::Layout(format!(
            "{} contained neither {} nor a nested archive",
            current.display(),
            INDEX_FILE
        )));
    }

    Err(OciError::MalformedArchive(format!(
        "{} is nested more than {} archives deep",
        artifact.display(),
        MAX_NESTING_DEPTH
    )))
}

/// Decompress `path` to a sibling with the compression suffix removed,
/// then delete `path`.  Returns the decompressed file's path.
pub fn decompress(path: &Path) -> Result<PathBuf> {
    let compression = Compression::from_path(path)
        .ok_or_else(|| OciError::UnsupportedCompression(path.display().to_string()))?;

    let output = decompressed_path(path);
    let input = BufReader::new(File::open(path)?);
    let mut reader = compression.reader(input)?;

    if let Err(e) = write_decompressed(&mut reader, File::create(&output)?) {
        let _ = fs::remove_file(&output);
        return Err(OciError::MalformedArchive(format!(
            "decompress {}: {}",
            path.display(),
            e
        )));
    }

    fs::remove_file(path)?;
    debug!(from = %path.display(), to = %output.display(), "decompressed");
    Ok(output)
}

/// Extract every entry of the tar at `tar_path` into `dest`.  Returns the
/// distinct top-level names that were written, in sorted order.
pub fn extract_archive(tar_path: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest)?;

    let file = BufReader::new(File::open(tar_path)?);
    let mut archive = Archive::new(file);
    // Do not preserve permissions bits that could block later cleanup.
    archive.set_preserve_permissions(false);

    let malformed =
        |e: io::Error| OciError::MalformedArchive(format!("{}: {}", tar_path.display(), e));

    let mut top_level = BTreeSet::new();
    for entry_result in archive.entries().map_err(malformed)? {
        let mut entry = entry_result.map_err(malformed)?;
        let rel_path = entry.path().map_err(malformed)?.into_owned();

        let first = match first_normal_component(&rel_path) {
            Some(c) => c,
            // A root-level entry such as "./".
            None => continue,
        };

        if !entry.unpack_in(dest).map_err(malformed)? {
            return Err(OciError::MalformedArchive(format!(
                "{}: entry {} escapes the destination",
                tar_path.display(),
                rel_path.display()
            )));
        }
        top_level.insert(first);
    }

    debug!(
        archive = %tar_path.display(),
        dest = %dest.display(),
        entries = top_level.len(),
        "extracted archive",
    );
    Ok(top_level.into_iter().collect())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Copy `reader` into `output` and flush.  Only a fully flushed output
/// counts as written.
fn write_decompressed<R, W>(reader: &mut R, output: W) -> io::Result<u64>
where
    R: Read + ?Sized,
    W: Write,
{
    let mut writer = BufWriter::new(output);
    let copied = io::copy(reader, &mut writer)?;
    writer.flush()?;
    Ok(copied)
}

fn decompressed_path(path: &Path) -> PathBuf {
    match path.extension().and_then(OsStr::to_str) {
        Some("tgz") => path.with_extension("tar"),
        _ => path.with_extension(""),
    }
}

fn first_normal_component(path: &Path) -> Option<PathBuf> {
    path.components().find_map(|c| match c {
        Component::Normal(name) => Some(PathBuf::from(name)),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
