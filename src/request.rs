//! Comparison requests
//!
//! Validates "open these paths" before any document is built. A request
//! resolves into a [`ComparisonTarget`] that names exactly which kind of
//! document the factory should create.

use crate::document::DocumentKind;
use crate::error::{RequestError, RequestResult};
use std::path::{Path, PathBuf};

/// Most paths a single comparison can show
pub const MAX_PANES: usize = 3;

/// What exists at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Missing,
}

/// Classifies paths; the window never touches the filesystem directly
pub trait PathProbe {
    fn probe(&self, path: &Path) -> PathKind;
}

/// [`PathProbe`] backed by `std::fs::metadata`
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl PathProbe for FsProbe {
    fn probe(&self, path: &Path) -> PathKind {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(_) => PathKind::File,
            Err(_) => PathKind::Missing,
        }
    }
}

/// A request to open one to three paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonRequest {
    pub paths: Vec<PathBuf>,
    /// Start comparing as soon as the document opens
    pub auto_compare: bool,
    /// Three-way automatic merge
    pub auto_merge: bool,
    pub merge_output: Option<PathBuf>,
    /// Focus the new tab regardless of the focus policy
    pub focus: bool,
}

impl ComparisonRequest {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Build a request from command-line arguments, expanding `~` and
    /// environment variables
    pub fn from_args<I, S>(args: I) -> RequestResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = args
            .into_iter()
            .map(|arg| expand_path(arg.as_ref()))
            .collect::<RequestResult<Vec<_>>>()?;
        Ok(Self {
            paths,
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_auto_compare(mut self, auto_compare: bool) -> Self {
        self.auto_compare = auto_compare;
        self
    }

    #[must_use]
    pub fn with_auto_merge(mut self, auto_merge: bool) -> Self {
        self.auto_merge = auto_merge;
        self
    }

    #[must_use]
    pub fn with_merge_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.merge_output = Some(output.into());
        self
    }

    #[must_use]
    pub fn with_focus(mut self, focus: bool) -> Self {
        self.focus = focus;
        self
    }

    /// Decide what to open
    ///
    /// A single directory opens a version-control browser and a single
    /// file opens without a tab. Two or three paths compare directly,
    /// as folders when they are all directories. Missing paths among
    /// several count as files so a new file can be compared against.
    pub fn resolve(&self, probe: &dyn PathProbe) -> RequestResult<ComparisonTarget> {
        let count = self.paths.len();
        match count {
            0 => Err(RequestError::NoPaths),
            1 => self.resolve_single(probe),
            2..=MAX_PANES => self.resolve_many(probe),
            _ => Err(RequestError::TooManyPaths(count)),
        }
    }

    fn resolve_single(&self, probe: &dyn PathProbe) -> RequestResult<ComparisonTarget> {
        let path = &self.paths[0];
        let kind = probe.probe(path);
        if kind == PathKind::Missing {
            return Err(RequestError::Missing(path.clone()));
        }
        if self.auto_merge {
            return Err(RequestError::MergeNeedsThree(1));
        }
        Ok(match kind {
            PathKind::Directory => ComparisonTarget::VersionControl {
                location: path.clone(),
                auto_compare: self.auto_compare,
            },
            _ => ComparisonTarget::SingleFile(path.clone()),
        })
    }

    fn resolve_many(&self, probe: &dyn PathProbe) -> RequestResult<ComparisonTarget> {
        let mut have_directories = false;
        let mut have_files = false;
        for path in &self.paths {
            match probe.probe(path) {
                PathKind::Directory => have_directories = true,
                PathKind::File | PathKind::Missing => have_files = true,
            }
        }

        if have_directories && have_files {
            return Err(RequestError::MixedKinds);
        }
        if have_directories {
            if self.auto_merge {
                return Err(RequestError::MergeDirectories);
            }
            return Ok(ComparisonTarget::Folder {
                paths: self.paths.clone(),
                auto_compare: self.auto_compare,
            });
        }
        if self.auto_merge {
            let paths: [PathBuf; MAX_PANES] = self
                .paths
                .clone()
                .try_into()
                .map_err(|paths: Vec<PathBuf>| RequestError::MergeNeedsThree(paths.len()))?;
            return Ok(ComparisonTarget::Merge {
                paths,
                merge_output: self.merge_output.clone(),
            });
        }
        Ok(ComparisonTarget::File {
            paths: self.paths.clone(),
            merge_output: self.merge_output.clone(),
        })
    }
}

/// A validated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonTarget {
    VersionControl {
        location: PathBuf,
        auto_compare: bool,
    },
    /// One file, opened through a transient queue with no tab
    SingleFile(PathBuf),
    Folder {
        paths: Vec<PathBuf>,
        auto_compare: bool,
    },
    File {
        paths: Vec<PathBuf>,
        merge_output: Option<PathBuf>,
    },
    Merge {
        paths: [PathBuf; MAX_PANES],
        merge_output: Option<PathBuf>,
    },
}

impl ComparisonTarget {
    /// Kind of document that shows this target
    pub fn kind(&self) -> DocumentKind {
        match self {
            ComparisonTarget::VersionControl { .. } | ComparisonTarget::SingleFile(_) => {
                DocumentKind::VersionControl
            }
            ComparisonTarget::Folder { .. } => DocumentKind::Folder,
            ComparisonTarget::File { .. } => DocumentKind::File,
            ComparisonTarget::Merge { .. } => DocumentKind::Merge,
        }
    }

    /// Whether the target gets a tab of its own
    pub fn has_tab(&self) -> bool {
        !matches!(self, ComparisonTarget::SingleFile(_))
    }

    pub fn paths(&self) -> Vec<&Path> {
        match self {
            ComparisonTarget::VersionControl { location, .. } => vec![location.as_path()],
            ComparisonTarget::SingleFile(path) => vec![path.as_path()],
            ComparisonTarget::Folder { paths, .. } | ComparisonTarget::File { paths, .. } => {
                paths.iter().map(PathBuf::as_path).collect()
            }
            ComparisonTarget::Merge { paths, .. } => paths.iter().map(PathBuf::as_path).collect(),
        }
    }
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(raw: &str) -> RequestResult<PathBuf> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| RequestError::Expand {
            path: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapProbe(HashMap<PathBuf, PathKind>);

    impl MapProbe {
        fn with(mut self, path: &str, kind: PathKind) -> Self {
            self.0.insert(PathBuf::from(path), kind);
            self
        }
    }

    impl PathProbe for MapProbe {
        fn probe(&self, path: &Path) -> PathKind {
            self.0.get(path).copied().unwrap_or(PathKind::Missing)
        }
    }

    fn probe() -> MapProbe {
        MapProbe::default()
            .with("a.txt", PathKind::File)
            .with("b.txt", PathKind::File)
            .with("c.txt", PathKind::File)
            .with("left", PathKind::Directory)
            .with("right", PathKind::Directory)
    }

    #[test]
    fn test_single_directory_browses_version_control() {
        let target = ComparisonRequest::new(["left"])
            .with_auto_compare(true)
            .resolve(&probe())
            .unwrap();
        assert_eq!(
            target,
            ComparisonTarget::VersionControl {
                location: PathBuf::from("left"),
                auto_compare: true,
            }
        );
        assert!(target.has_tab());
    }

    #[test]
    fn test_single_file_has_no_tab() {
        let target = ComparisonRequest::new(["a.txt"]).resolve(&probe()).unwrap();
        assert_eq!(target, ComparisonTarget::SingleFile(PathBuf::from("a.txt")));
        assert!(!target.has_tab());
    }

    #[test]
    fn test_missing_single_path_rejected() {
        let err = ComparisonRequest::new(["gone.txt"]).resolve(&probe()).unwrap_err();
        assert_eq!(err, RequestError::Missing(PathBuf::from("gone.txt")));
    }

    #[test]
    fn test_path_count_bounds() {
        assert_eq!(
            ComparisonRequest::default().resolve(&probe()),
            Err(RequestError::NoPaths)
        );
        assert_eq!(
            ComparisonRequest::new(["a.txt", "b.txt", "c.txt", "a.txt"]).resolve(&probe()),
            Err(RequestError::TooManyPaths(4))
        );
    }

    #[test]
    fn test_two_directories_compare_as_folders() {
        let target = ComparisonRequest::new(["left", "right"])
            .resolve(&probe())
            .unwrap();
        assert_eq!(target.kind(), DocumentKind::Folder);
    }

    #[test]
    fn test_mixed_kinds_rejected() {
        assert_eq!(
            ComparisonRequest::new(["left", "a.txt"]).resolve(&probe()),
            Err(RequestError::MixedKinds)
        );
    }

    #[test]
    fn test_missing_counts_as_file_among_several() {
        let target = ComparisonRequest::new(["a.txt", "new.txt"])
            .resolve(&probe())
            .unwrap();
        assert_eq!(target.kind(), DocumentKind::File);
        assert_eq!(target.paths(), vec![Path::new("a.txt"), Path::new("new.txt")]);
    }

    #[test]
    fn test_merge_needs_exactly_three_files() {
        assert_eq!(
            ComparisonRequest::new(["a.txt", "b.txt"])
                .with_auto_merge(true)
                .resolve(&probe()),
            Err(RequestError::MergeNeedsThree(2))
        );

        let target = ComparisonRequest::new(["a.txt", "b.txt", "c.txt"])
            .with_auto_merge(true)
            .with_merge_output("out.txt")
            .resolve(&probe())
            .unwrap();
        assert_eq!(
            target,
            ComparisonTarget::Merge {
                paths: [
                    PathBuf::from("a.txt"),
                    PathBuf::from("b.txt"),
                    PathBuf::from("c.txt"),
                ],
                merge_output: Some(PathBuf::from("out.txt")),
            }
        );
    }

    #[test]
    fn test_merge_of_directories_rejected() {
        assert_eq!(
            ComparisonRequest::new(["left", "right", "left"])
                .with_auto_merge(true)
                .resolve(&probe()),
            Err(RequestError::MergeDirectories)
        );
    }

    #[test]
    fn test_from_args_expands_environment() {
        std::env::set_var("DIFFDECK_TEST_DIR", "/tmp/diffdeck");
        let request = ComparisonRequest::from_args(["$DIFFDECK_TEST_DIR/a.txt", "b.txt"]).unwrap();
        assert_eq!(
            request.paths,
            vec![PathBuf::from("/tmp/diffdeck/a.txt"), PathBuf::from("b.txt")]
        );
    }

    #[test]
    fn test_from_args_reports_unknown_variable() {
        let err = ComparisonRequest::from_args(["$DIFFDECK_SURELY_UNSET_VAR/x"]).unwrap_err();
        assert!(matches!(err, RequestError::Expand { .. }));
    }

    #[test]
    fn test_fs_probe() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "a").unwrap();

        assert_eq!(FsProbe.probe(dir.path()), PathKind::Directory);
        assert_eq!(FsProbe.probe(&file), PathKind::File);
        assert_eq!(FsProbe.probe(&dir.path().join("nope")), PathKind::Missing);
    }
}
