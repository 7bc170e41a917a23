//! Lab content fetching.
//!
//! Primary path: a shallow, blob-filtered git clone with a sparse
//! checkout of the requested subset. When that yields an empty
//! destination (sparse checkout support varies across hosting and git
//! versions), fall back to downloading a release tarball and extracting
//! the subset from it.

use crate::error::HostError;
use crate::exec;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ContentSpec / FetchMethod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ContentSpec {
    pub repo: String,
    pub subset: Option<String>,
    pub dest: PathBuf,
    pub archive_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Sparse,
    Archive,
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchMethod::Sparse => "sparse checkout",
            FetchMethod::Archive => "archive download",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// fetch
// ---------------------------------------------------------------------------

/// Fetch content into `spec.dest`, returning which method produced it.
pub fn fetch(spec: &ContentSpec) -> Result<FetchMethod, HostError> {
    match sparse_fetch(spec) {
        Ok(()) if !dir_is_empty(&spec.dest) => return Ok(FetchMethod::Sparse),
        Ok(()) => {
            tracing::warn!(dest = %spec.dest.display(), "sparse fetch yielded an empty result");
        }
        Err(e) => {
            tracing::warn!("sparse fetch failed: {e}");
        }
    }

    if let Some(url) = &spec.archive_url {
        archive_fetch(url, spec.subset.as_deref(), &spec.dest)?;
        if !dir_is_empty(&spec.dest) {
            return Ok(FetchMethod::Archive);
        }
    }

    Err(HostError::EmptyContent(spec.dest.display().to_string()))
}

fn sparse_fetch(spec: &ContentSpec) -> Result<(), HostError> {
    exec::binary("git")?;
    let scratch = tempfile::tempdir()?;
    let clone_dir = scratch.path().join("clone");
    let clone_str = clone_dir.to_string_lossy().into_owned();

    exec::run_checked(
        "git",
        &[
            "clone",
            "--depth",
            "1",
            "--filter=blob:none",
            "--sparse",
            &spec.repo,
            &clone_str,
        ],
    )?;

    let source = match &spec.subset {
        Some(subset) => {
            exec::run_checked("git", &["-C", &clone_str, "sparse-checkout", "set", subset])?;
            clone_dir.join(subset)
        }
        None => {
            exec::run_checked("git", &["-C", &clone_str, "sparse-checkout", "disable"])?;
            clone_dir.clone()
        }
    };

    if !source.is_dir() {
        return Ok(());
    }
    copy_tree(&source, &spec.dest)
}

fn archive_fetch(url: &str, subset: Option<&str>, dest: &Path) -> Result<(), HostError> {
    exec::binary("tar")?;

    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| HostError::Http(e.to_string()))?;
    let bytes = response
        .bytes()
        .map_err(|e| HostError::Http(e.to_string()))?;

    let scratch = tempfile::tempdir()?;
    let archive = scratch.path().join("content.tar.gz");
    let mut f = std::fs::File::create(&archive)?;
    f.write_all(&bytes)?;

    let extract_dir = scratch.path().join("extracted");
    std::fs::create_dir_all(&extract_dir)?;
    exec::run_checked(
        "tar",
        &[
            "-xzf",
            &archive.to_string_lossy(),
            "-C",
            &extract_dir.to_string_lossy(),
        ],
    )?;

    let source = find_extracted(&extract_dir, subset)
        .ok_or_else(|| HostError::EmptyContent(dest.display().to_string()))?;
    copy_tree(&source, dest)
}

/// Locate the content root inside an extracted archive. Tarballs usually
/// wrap everything in a single top-level directory; look for the subset
/// both at the root and one level down.
fn find_extracted(extract_dir: &Path, subset: Option<&str>) -> Option<PathBuf> {
    let top_entries: Vec<PathBuf> = std::fs::read_dir(extract_dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();

    match subset {
        Some(subset) => {
            let direct = extract_dir.join(subset);
            if direct.is_dir() {
                return Some(direct);
            }
            for entry in &top_entries {
                let nested = entry.join(subset);
                if nested.is_dir() {
                    return Some(nested);
                }
            }
            None
        }
        None => {
            if top_entries.len() == 1 && top_entries[0].is_dir() {
                Some(top_entries[0].clone())
            } else {
                Some(extract_dir.to_path_buf())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filesystem helpers
// ---------------------------------------------------------------------------

pub fn dir_is_empty(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Recursively copy `src` into `dest`, skipping `.git`.
fn copy_tree(src: &Path, dest: &Path) -> Result<(), HostError> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        let from = entry.path();
        let to = dest.join(&name);
        if entry.file_type()?.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dir_is_empty_cases() {
        let dir = TempDir::new().unwrap();
        assert!(dir_is_empty(dir.path()));
        assert!(dir_is_empty(&dir.path().join("missing")));
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        assert!(!dir_is_empty(dir.path()));
    }

    #[test]
    fn copy_tree_recurses_and_skips_git() {
        let src = TempDir::new().unwrap();
        std::fs::create_dir_all(src.path().join("sub/.git")).unwrap();
        std::fs::create_dir_all(src.path().join(".git")).unwrap();
        std::fs::write(src.path().join("a.ipynb"), b"{}").unwrap();
        std::fs::write(src.path().join("sub/b.py"), b"pass").unwrap();
        std::fs::write(src.path().join(".git/config"), b"nope").unwrap();

        let dest = TempDir::new().unwrap();
        copy_tree(src.path(), dest.path()).unwrap();

        assert!(dest.path().join("a.ipynb").exists());
        assert!(dest.path().join("sub/b.py").exists());
        assert!(!dest.path().join(".git").exists());
        assert!(!dest.path().join("sub/.git").exists());
    }

    #[test]
    fn find_extracted_handles_wrapper_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("repo-1.0/notebooks")).unwrap();

        let found = find_extracted(dir.path(), Some("notebooks")).unwrap();
        assert!(found.ends_with("repo-1.0/notebooks"));

        let found = find_extracted(dir.path(), None).unwrap();
        assert!(found.ends_with("repo-1.0"));

        assert!(find_extracted(dir.path(), Some("missing")).is_none());
    }

    #[test]
    fn archive_fetch_downloads_and_extracts() {
        if !exec::have("tar") {
            return;
        }

        // Build a small tarball: repo/notebooks/intro.ipynb
        let staging = TempDir::new().unwrap();
        std::fs::create_dir_all(staging.path().join("repo/notebooks")).unwrap();
        std::fs::write(staging.path().join("repo/notebooks/intro.ipynb"), b"{}").unwrap();
        let tarball = staging.path().join("content.tar.gz");
        exec::run_checked(
            "tar",
            &[
                "-czf",
                &tarball.to_string_lossy(),
                "-C",
                &staging.path().to_string_lossy(),
                "repo",
            ],
        )
        .unwrap();
        let bytes = std::fs::read(&tarball).unwrap();

        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/content.tar.gz")
            .with_status(200)
            .with_body(bytes)
            .create();

        let dest = TempDir::new().unwrap();
        let dest_path = dest.path().join("notebooks");
        archive_fetch(
            &format!("{}/content.tar.gz", server.url()),
            Some("notebooks"),
            &dest_path,
        )
        .unwrap();

        mock.assert();
        assert!(dest_path.join("intro.ipynb").exists());
    }

    #[test]
    fn archive_fetch_reports_http_failure() {
        if !exec::have("tar") {
            return;
        }
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/gone.tar.gz")
            .with_status(404)
            .create();

        let dest = TempDir::new().unwrap();
        let err = archive_fetch(
            &format!("{}/gone.tar.gz", server.url()),
            None,
            dest.path(),
        )
        .unwrap_err();
        assert!(matches!(err, HostError::Http(_)), "got {err:?}");
    }

    #[test]
    fn fetch_without_fallback_reports_empty() {
        // Repo URL that git cannot clone, no archive fallback
        let dest = TempDir::new().unwrap();
        let spec = ContentSpec {
            repo: "file:///nonexistent/repo.git".to_string(),
            subset: None,
            dest: dest.path().join("out"),
            archive_url: None,
        };
        let err = fetch(&spec).unwrap_err();
        assert!(matches!(err, HostError::EmptyContent(_)), "got {err:?}");
    }
}
