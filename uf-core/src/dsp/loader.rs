//! DSP file loading
//!
//! Reads `.fpc` images and `.edp` containers from disk and registers them.
//! A package that fails to read or parse is logged and skipped; it never
//! prevents the rest of a directory from loading.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::index::DspIndex;
use super::package;
use super::registry::{DspId, DspRegistry};
use crate::constants::{dsp, limits};
use crate::error::{Result, UfError};
use crate::settings::DspSettings;

/// Outcome of loading a directory
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<(PathBuf, DspId)>,
    pub failed: Vec<(PathBuf, UfError)>,
}

impl LoadReport {
    fn merge(&mut self, other: LoadReport) {
        self.loaded.extend(other.loaded);
        self.failed.extend(other.failed);
    }
}

#[derive(Debug, Clone)]
pub struct DspLoader {
    extensions: Vec<String>,
    max_package_bytes: u64,
}

impl Default for DspLoader {
    fn default() -> Self {
        Self {
            extensions: dsp::PACKAGE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_package_bytes: limits::MAX_PACKAGE_SIZE,
        }
    }
}

impl DspLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &DspSettings) -> Self {
        Self {
            extensions: settings.extensions.iter().map(|e| e.to_ascii_lowercase()).collect(),
            max_package_bytes: settings.max_package_bytes,
        }
    }

    fn is_edp(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("edp"))
            .unwrap_or(false)
    }

    fn is_package(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Read and parse one package file
    pub fn load_file(&self, path: &Path) -> Result<DspIndex> {
        let metadata = fs::metadata(path).map_err(|e| UfError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        if metadata.len() > self.max_package_bytes {
            return Err(UfError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                max_size: self.max_package_bytes,
            });
        }

        let bytes = fs::read(path).map_err(|e| UfError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        if Self::is_edp(path) {
            package::parse_edp(&bytes)
        } else {
            package::parse(&bytes)
        }
    }

    /// Load and register every package in `dir`, in file-name order
    pub fn load_dir(&self, registry: &DspRegistry, dir: &Path) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        if !dir.is_dir() {
            debug!(dir = %dir.display(), "DSP directory not present");
            return Ok(report);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.is_package(p))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in files {
            match self.load_file(&path) {
                Ok(index) => {
                    let id = registry.register(index);
                    report.loaded.push((path, id));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, status = e.status_code(), "Skipping DSP");
                    report.failed.push((path, e));
                }
            }
        }

        info!(
            dir = %dir.display(),
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Loaded DSP directory"
        );
        Ok(report)
    }

    /// Load every configured search path in order
    pub fn load_paths(&self, registry: &DspRegistry, dirs: &[PathBuf]) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        for dir in dirs {
            report.merge(self.load_dir(registry, dir)?);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::builder::{DomainSpec, PackageBuilder, PrimitiveSpec};
    use tempfile::tempdir;

    fn package(code: &str) -> PackageBuilder {
        PackageBuilder::new(code).domain(DomainSpec::new("A", "D0").primitive(PrimitiveSpec::get(14, "D0", 255, 24, 6)))
    }

    #[test]
    fn test_load_dir_sorted_and_skips_bad() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b_second.fpc"), package("second").build()).unwrap();
        fs::write(dir.path().join("a_first.fpc"), package("first").build()).unwrap();
        fs::write(dir.path().join("c_edp.edp"), package("third").build_edp()).unwrap();
        fs::write(dir.path().join("broken.fpc"), [0u8; 12]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let reg = DspRegistry::new();
        let report = DspLoader::new().load_dir(&reg, dir.path()).unwrap();

        assert_eq!(report.loaded.len(), 3);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.is_parse_error());

        let codes: Vec<String> = reg.snapshot().iter().map(|(_, i)| i.code().to_string()).collect();
        assert_eq!(codes, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_size_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.fpc");
        fs::write(&path, package("big").build()).unwrap();

        let loader = DspLoader::from_settings(&DspSettings {
            max_package_bytes: 16,
            ..DspSettings::default()
        });
        assert!(matches!(loader.load_file(&path), Err(UfError::FileTooLarge { .. })));
    }

    #[test]
    fn test_missing_dir_is_empty() {
        let reg = DspRegistry::new();
        let report = DspLoader::new()
            .load_dir(&reg, Path::new("/nonexistent/ufdsp/dsp"))
            .unwrap();
        assert!(report.loaded.is_empty());
        assert!(reg.is_empty());
    }
}
