use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::foundation::error::{DailiesError, DailiesResult};

/// One member of an [`ImageSequence`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Absolute path of the frame file.
    pub path: PathBuf,
    /// Frame number parsed from the file name.
    pub number: i64,
}

/// Frames sharing a directory, basename, numbering pattern and extension, ordered by number.
///
/// Gaps in the numbering are allowed. Built once by discovery and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSequence {
    pub directory: PathBuf,
    /// File name text before the frame number, separator included (`shot.`).
    pub head: String,
    /// Zero-padded width of the frame number.
    pub padding: usize,
    /// Extension without the dot, as found on disk.
    pub extension: String,
    frames: Vec<Frame>,
}

impl ImageSequence {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn frame_numbers(&self) -> Vec<i64> {
        self.frames.iter().map(|f| f.number).collect()
    }

    /// Head without a trailing `.`, `_` or `-` separator; used to name the movie.
    pub fn basename(&self) -> String {
        let trimmed = self.head.strip_suffix(['.', '_', '-']).unwrap_or(&self.head);
        if trimmed.is_empty() {
            "sequence".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// printf-style pattern, e.g. `shot.%04d.exr`.
    pub fn pattern(&self) -> String {
        format!("{}%0{}d.{}", self.head, self.padding, self.extension)
    }

    pub fn display_name(&self) -> String {
        self.directory.join(self.pattern()).display().to_string()
    }

    pub fn is_exr(&self) -> bool {
        self.extension.eq_ignore_ascii_case("exr")
    }

    fn has_extension_in(&self, allowed: &[String]) -> bool {
        allowed
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

/// A numbered file name split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FrameName {
    pub(crate) head: String,
    pub(crate) digits: String,
    pub(crate) extension: String,
}

impl FrameName {
    pub(crate) fn parse(file_name: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^(?P<head>.*?)(?P<digits>\d+)\.(?P<ext>[^.]+)$").expect("valid regex")
        });
        let caps = re.captures(file_name)?;
        Some(Self {
            head: caps["head"].to_string(),
            digits: caps["digits"].to_string(),
            extension: caps["ext"].to_string(),
        })
    }

    fn number(&self) -> Option<i64> {
        self.digits.parse().ok()
    }
}

/// A sequence path given as `name.%05d.ext`, `name.%d.ext` or `name.####.ext`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SequencePattern {
    pub(crate) head: String,
    /// Required padding; `None` accepts any width.
    pub(crate) padding: Option<usize>,
    pub(crate) extension: String,
}

impl SequencePattern {
    pub(crate) fn parse(file_name: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^(?P<head>.*?)(?:%(?P<width>\d*)d|(?P<hashes>#+)|(?P<ats>@+))\.(?P<ext>[^.]+)$")
                .expect("valid regex")
        });
        let caps = re.captures(file_name)?;
        let padding = if let Some(w) = caps.name("width") {
            let w = w.as_str().trim_start_matches('0');
            if w.is_empty() { None } else { w.parse().ok() }
        } else {
            caps.name("hashes")
                .or_else(|| caps.name("ats"))
                .map(|m| m.as_str().len())
        };
        Some(Self {
            head: caps["head"].to_string(),
            padding,
            extension: caps["ext"].to_string(),
        })
    }

    fn matches(&self, seq: &ImageSequence) -> bool {
        seq.head == self.head
            && seq.extension == self.extension
            && self.padding.is_none_or(|p| p == seq.padding)
    }
}

/// Find the image sequences named by `input`: a directory (searched recursively), one frame of a
/// sequence, or a `%0Nd` / `#` pattern path.
///
/// Sequences whose extension is not in `allowed` are dropped; if several remain and at least one
/// is EXR, only the EXR sequences are kept. Finding nothing is a discovery error.
#[tracing::instrument(skip(allowed))]
pub fn discover_sequences(input: &Path, allowed: &[String]) -> DailiesResult<Vec<ImageSequence>> {
    let input = absolute_input(input)?;

    let found = if input.is_dir() {
        discover_in_tree(&input, allowed)?
    } else if input.is_file() {
        discover_from_frame(&input)?
    } else {
        discover_from_pattern(&input)?
    };

    let mut sequences: Vec<ImageSequence> = found
        .into_iter()
        .filter(|s| s.has_extension_in(allowed))
        .collect();
    prefer_exr(&mut sequences);

    if sequences.is_empty() {
        return Err(DailiesError::discovery(format!(
            "no image sequence found at '{}' (allowed extensions: {})",
            input.display(),
            allowed.join(", ")
        )));
    }
    for s in &sequences {
        tracing::info!(sequence = %s.display_name(), frames = s.len(), "found image sequence");
    }
    Ok(sequences)
}

/// EXR wins ties: when more than one candidate remains and any is EXR, keep only EXR.
pub fn prefer_exr(sequences: &mut Vec<ImageSequence>) {
    if sequences.len() > 1 && sequences.iter().any(ImageSequence::is_exr) {
        sequences.retain(ImageSequence::is_exr);
    }
}

fn absolute_input(input: &Path) -> DailiesResult<PathBuf> {
    if input.exists() {
        return std::fs::canonicalize(input).map_err(|e| {
            DailiesError::discovery(format!("could not resolve '{}': {e}", input.display()))
        });
    }
    std::path::absolute(input).map_err(|e| {
        DailiesError::discovery(format!("could not resolve '{}': {e}", input.display()))
    })
}

fn discover_in_tree(root: &Path, allowed: &[String]) -> DailiesResult<Vec<ImageSequence>> {
    let mut files_by_dir = BTreeMap::<PathBuf, Vec<PathBuf>>::new();
    for entry in walkdir::WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) if e.depth() == 0 => {
                return Err(DailiesError::discovery(format!(
                    "could not read directory '{}': {e}",
                    root.display()
                )));
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during discovery");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(dir) = entry.path().parent() {
            files_by_dir
                .entry(dir.to_path_buf())
                .or_default()
                .push(entry.path().to_path_buf());
        }
    }

    let mut sequences = Vec::new();
    for (dir, files) in files_by_dir {
        if dir == root {
            let images = files
                .iter()
                .filter(|f| {
                    f.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| allowed.iter().any(|a| a.eq_ignore_ascii_case(e)))
                })
                .count();
            // A single stray image at the top level is not a sequence.
            if images <= 1 {
                continue;
            }
        }
        sequences.extend(group_files(&dir, &files));
    }
    Ok(sequences)
}

fn discover_from_frame(path: &Path) -> DailiesResult<Vec<ImageSequence>> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let name = FrameName::parse(file_name).ok_or_else(|| {
        DailiesError::discovery(format!(
            "'{}' has no frame number; cannot derive a sequence",
            path.display()
        ))
    })?;
    let dir = path.parent().unwrap_or_else(|| Path::new("/"));
    Ok(scan_directory(dir)?
        .into_iter()
        .filter(|s| s.head == name.head && s.extension == name.extension)
        .collect())
}

fn discover_from_pattern(path: &Path) -> DailiesResult<Vec<ImageSequence>> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let pattern = SequencePattern::parse(file_name).ok_or_else(|| {
        DailiesError::discovery(format!(
            "'{}' is neither a file, a directory nor a sequence pattern",
            path.display()
        ))
    })?;
    let dir = path
        .parent()
        .filter(|d| d.is_dir())
        .ok_or_else(|| {
            DailiesError::discovery(format!(
                "parent directory of '{}' does not exist",
                path.display()
            ))
        })?;
    Ok(scan_directory(dir)?
        .into_iter()
        .filter(|s| pattern.matches(s))
        .collect())
}

/// Group the files directly inside `dir` into sequences.
pub fn scan_directory(dir: &Path) -> DailiesResult<Vec<ImageSequence>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        DailiesError::discovery(format!("could not read directory '{}': {e}", dir.display()))
    })?;
    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(e) if e.path().is_file() => files.push(e.path()),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, dir = %dir.display(), "skipping unreadable entry"),
        }
    }
    Ok(group_files(dir, &files))
}

/// Group numbered files by `(head, extension)`. Files without a frame number are ignored.
pub(crate) fn group_files(dir: &Path, files: &[PathBuf]) -> Vec<ImageSequence> {
    let mut groups = BTreeMap::<(String, String), Vec<(i64, usize, PathBuf)>>::new();
    for path in files {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(name) = FrameName::parse(file_name) else {
            continue;
        };
        let Some(number) = name.number() else {
            continue;
        };
        groups
            .entry((name.head, name.extension))
            .or_default()
            .push((number, name.digits.len(), path.clone()));
    }

    groups
        .into_iter()
        .map(|((head, extension), mut members)| {
            members.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(&b.2)));
            members.dedup_by(|later, earlier| {
                let dup = later.0 == earlier.0;
                if dup {
                    tracing::warn!(
                        frame = later.0,
                        path = %later.2.display(),
                        "duplicate frame number, keeping the first file"
                    );
                }
                dup
            });
            let padding = members.iter().map(|m| m.1).min().unwrap_or(1);
            ImageSequence {
                directory: dir.to_path_buf(),
                head,
                padding,
                extension,
                frames: members
                    .into_iter()
                    .map(|(number, _, path)| Frame { path, number })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/discover.rs"]
mod tests;
