use crate::config::Config;
use crate::error::ExamerError;
use ignore::{Walk, WalkBuilder};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileDiscovery {
    extensions: Vec<String>,
    ignore: Vec<IgnorePattern>,
    max_file_size: Option<u64>,
    respect_gitignore: bool,
}

enum IgnorePattern {
    Suffix(String),
    Wildcard(Regex),
    Component(String),
}

impl IgnorePattern {
    fn compile(pattern: &str) -> Option<Self> {
        if let Some(ext) = pattern.strip_prefix("*.") {
            if !ext.contains('*') {
                return Some(Self::Suffix(format!(".{}", ext)));
            }
        }
        if pattern.contains('*') {
            let regex = format!("^{}$", regex::escape(pattern).replace(r"\*", ".*"));
            return match Regex::new(&regex) {
                Ok(re) => Some(Self::Wildcard(re)),
                Err(e) => {
                    tracing::warn!("Ignoring unusable pattern {:?}: {}", pattern, e);
                    None
                }
            };
        }
        Some(Self::Component(pattern.to_string()))
    }

    fn matches(&self, relative: &Path) -> bool {
        let file_name = relative
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        match self {
            Self::Suffix(suffix) => file_name.ends_with(suffix.as_str()),
            Self::Wildcard(re) => relative
                .components()
                .any(|c| re.is_match(&c.as_os_str().to_string_lossy())),
            Self::Component(name) => relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy() == name.as_str()),
        }
    }
}

impl FileDiscovery {
    pub fn new(config: &Config) -> Self {
        Self {
            extensions: config
                .file_extensions
                .iter()
                .map(|ext| format!(".{}", ext.trim_start_matches('.')))
                .collect(),
            ignore: config
                .ignore_patterns
                .iter()
                .filter_map(|p| IgnorePattern::compile(p))
                .collect(),
            max_file_size: config.max_file_size,
            respect_gitignore: config.respect_gitignore,
        }
    }

    /// Validate `root` and return the files under it in a stable order.
    ///
    /// A directory is walked lazily, entries sorted by name at every level. A single
    /// file must carry one of the configured extensions and is yielded whatever its size.
    pub fn discover(&self, root: &Path) -> Result<DiscoveredFiles<'_>, ExamerError> {
        if root.is_file() {
            if !self.has_source_extension(root) {
                return Err(ExamerError::invalid_input(
                    root,
                    format!("expected a file ending in {}", self.extensions.join(" or ")),
                ));
            }
            return Ok(DiscoveredFiles {
                discovery: self,
                root: root.to_path_buf(),
                source: Source::Single(Some(root.to_path_buf())),
            });
        }

        if root.is_dir() {
            let mut builder = WalkBuilder::new(root);
            builder
                .standard_filters(self.respect_gitignore)
                .hidden(false)
                .require_git(false)
                .sort_by_file_name(|a, b| a.cmp(b));
            return Ok(DiscoveredFiles {
                discovery: self,
                root: root.to_path_buf(),
                source: Source::Walk(builder.build()),
            });
        }

        Err(ExamerError::invalid_input(
            root,
            "not an existing file or directory",
        ))
    }

    fn has_source_extension(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| {
                let name = name.to_string_lossy();
                self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
            })
            .unwrap_or(false)
    }

    fn should_ignore_file(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.ignore.iter().any(|pattern| pattern.matches(relative))
    }

    fn within_size_limit(&self, path: &Path) -> Result<bool, ignore::Error> {
        let Some(limit) = self.max_file_size else {
            return Ok(true);
        };
        let size = fs::metadata(path).map_err(ignore::Error::Io)?.len();
        if size > limit {
            tracing::warn!(
                "Skipping {} ({} bytes exceeds max_file_size of {})",
                path.display(),
                size,
                limit
            );
            return Ok(false);
        }
        Ok(true)
    }
}

enum Source {
    Single(Option<PathBuf>),
    Walk(Walk),
}

/// Lazy sequence of source files produced by [`FileDiscovery::discover`].
pub struct DiscoveredFiles<'a> {
    discovery: &'a FileDiscovery,
    root: PathBuf,
    source: Source,
}

impl Iterator for DiscoveredFiles<'_> {
    type Item = Result<PathBuf, ignore::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = match &mut self.source {
                Source::Single(slot) => return slot.take().map(Ok),
                Source::Walk(walk) => match walk.next()? {
                    Ok(entry) => entry.into_path(),
                    Err(e) => return Some(Err(e)),
                },
            };

            if !path.is_file()
                || !self.discovery.has_source_extension(&path)
                || self.discovery.should_ignore_file(&self.root, &path)
            {
                continue;
            }

            match self.discovery.within_size_limit(&path) {
                Ok(true) => return Some(Ok(path)),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
