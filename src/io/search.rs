use crate::types::{VerdError, VerdResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Filename filters for raster product discovery.
///
/// `resolution`, `band` and `extension` are naming-convention tags combined
/// into one wildcard pattern (in that order); `suffix` is a free-form glob
/// fragment matched independently against the end of the name. All fragments
/// are shell-style globs (`*`, `?`), not full regexes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Image extension tag ("jp2", "tif", "xml", ...)
    pub extension: Option<String>,
    /// Product/resolution tag ("SENTINEL2A", ...)
    pub resolution: Option<String>,
    /// Spectral band tag ("FRE_B4", "CLM_R1", ...)
    pub band: Option<String>,
    /// Free-form suffix fragment, matched as `*<suffix>`
    pub suffix: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    pub fn band(mut self, band: impl Into<String>) -> Self {
        self.band = Some(band.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Combined tag pattern, `*<resolution>*<band>*<extension>`, with a
    /// trailing wildcard when tags are present but no extension pins the end.
    fn tag_pattern(&self) -> Option<String> {
        if self.resolution.is_none() && self.band.is_none() && self.extension.is_none() {
            return None;
        }
        let mut pattern = String::new();
        for fragment in [&self.resolution, &self.band, &self.extension]
            .into_iter()
            .flatten()
        {
            pattern.push('*');
            pattern.push_str(fragment);
        }
        if self.extension.is_none() {
            pattern.push('*');
        }
        Some(pattern)
    }
}

/// Search a directory tree for raster products matching a filter.
///
/// Walks `directory` recursively and matches file names (never directory
/// names) against the filter's patterns. When both the tag pattern and the
/// suffix are supplied the result is their set intersection and ordering is
/// not guaranteed; with no filters at all, every file under the tree is
/// returned.
pub fn search_files<P: AsRef<Path>>(
    directory: P,
    filter: &SearchFilter,
) -> VerdResult<Vec<PathBuf>> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
        return Err(VerdError::DirectoryNotFound(directory.to_path_buf()));
    }

    let tag_regex = filter
        .tag_pattern()
        .map(|pattern| glob_to_regex(&pattern))
        .transpose()?;
    let suffix_regex = filter
        .suffix
        .as_ref()
        .map(|suffix| glob_to_regex(&format!("*{}", suffix)))
        .transpose()?;

    log::debug!(
        "Searching {} (tags: {:?}, suffix: {:?})",
        directory.display(),
        tag_regex.as_ref().map(|r| r.as_str()),
        suffix_regex.as_ref().map(|r| r.as_str())
    );

    let matches = match (&tag_regex, &suffix_regex) {
        (Some(tags), Some(suffix)) => {
            let tagged: HashSet<PathBuf> = collect_files(directory, Some(tags))?.into_iter().collect();
            let suffixed: HashSet<PathBuf> =
                collect_files(directory, Some(suffix))?.into_iter().collect();
            tagged.intersection(&suffixed).cloned().collect()
        }
        (Some(tags), None) => collect_files(directory, Some(tags))?,
        (None, Some(suffix)) => collect_files(directory, Some(suffix))?,
        (None, None) => collect_files(directory, None)?,
    };

    log::debug!("{} file(s) matched", matches.len());
    Ok(matches)
}

fn collect_files(directory: &Path, pattern: Option<&Regex>) -> VerdResult<Vec<PathBuf>> {
    let mut matches = Vec::new();
    walk(directory, pattern, &mut matches)?;
    Ok(matches)
}

fn walk(directory: &Path, pattern: Option<&Regex>, out: &mut Vec<PathBuf>) -> VerdResult<()> {
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, pattern, out)?;
        } else if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            if pattern.map_or(true, |regex| regex.is_match(name)) {
                out.push(path);
            }
        }
    }
    Ok(())
}

/// Translate a shell-style glob fragment into an anchored regex.
fn glob_to_regex(pattern: &str) -> VerdResult<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            _ => translated.push_str(&regex::escape(&ch.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated).map_err(|e| {
        VerdError::Processing(format!("Invalid search pattern '{}': {}", pattern, e))
    })
}
