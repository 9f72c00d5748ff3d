//! Workload binding: the executable every core runs and how it is resolved into a process image.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference program run by the sweep when no workload is configured.
pub const DEFAULT_WORKLOAD: &str = "tests/test-progs/hello/bin/x86/linux/hello";

/// Executable path plus arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workload {
    pub path: PathBuf,
    pub args: Vec<String>,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_WORKLOAD),
            args: Vec::new(),
        }
    }
}

impl Workload {
    pub fn new(path: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }
}

/// A loadable process image, bound identically to every core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessImage {
    pub path: PathBuf,
    /// argv, with the executable as the first element.
    pub cmd: Vec<String>,
    pub size_bytes: u64,
}

/// Turns a workload description into a process image.
pub trait WorkloadResolver {
    fn resolve(&self, path: &Path, args: &[String]) -> Result<ProcessImage>;
}

/// Resolves workloads from the host filesystem. The path must name a regular file.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileResolver;

impl WorkloadResolver for FileResolver {
    fn resolve(&self, path: &Path, args: &[String]) -> Result<ProcessImage> {
        let metadata = std::fs::metadata(path).map_err(|err| {
            Error::InvalidTopology(format!(
                "cannot resolve workload {}: {err}",
                path.display()
            ))
        })?;
        if !metadata.is_file() {
            return Err(Error::InvalidTopology(format!(
                "workload {} is not a regular file",
                path.display()
            )));
        }
        let mut cmd = Vec::with_capacity(args.len() + 1);
        cmd.push(path.display().to_string());
        cmd.extend(args.iter().cloned());
        log::debug!("resolved workload {} ({} bytes)", path.display(), metadata.len());
        Ok(ProcessImage {
            path: path.to_path_buf(),
            cmd,
            size_bytes: metadata.len(),
        })
    }
}
