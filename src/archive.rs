//! In-process toolset: copy into staging and write the ZIP with the `zip` crate.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Check that a repository-relative path stays inside the directory it is joined to.
///
/// Rejects NUL bytes, absolute paths, drive prefixes and `..` components.
pub fn validate_relative_path(root: &Path, rel: &str) -> Result<PathBuf, String> {
    if rel.contains('\0') {
        return Err("path contains null byte".to_string());
    }
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() {
        return Err(format!("absolute path not allowed: {rel}"));
    }
    for component in rel_path.components() {
        match component {
            Component::ParentDir => {
                return Err(format!("parent directory not allowed: {rel}"));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(format!("rooted path not allowed: {rel}"));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(root.join(rel_path))
}

/// Copy `<repo>/<rel>` to `<staging>/<rel>`, creating parent directories.
///
/// `NotFound` when the source is missing or is not a regular file.
pub fn copy_into_staging(repo: &Path, rel: &str, staging: &Path) -> io::Result<u64> {
    let invalid = |m: String| io::Error::new(io::ErrorKind::InvalidInput, m);
    let src = validate_relative_path(repo, rel).map_err(invalid)?;
    let dst = validate_relative_path(staging, rel).map_err(invalid)?;

    // symlink_metadata: a symlink is not a regular file, even when it points at one.
    match fs::symlink_metadata(&src) {
        Ok(md) if md.is_file() => {}
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a regular file: {rel}"),
            ))
        }
        Err(e) => return Err(e),
    }
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(&src, &dst)
}

/// Write every regular file under `staging` into a new ZIP at `destination`.
///
/// Entry names are relative to `staging` with `/` separators, in sorted walk order; no directory
/// entries. The archive is written to a temporary file next to `destination` and renamed into
/// place, so a failed write never leaves a truncated archive behind. Returns the entry count.
pub fn write_zip(staging: &Path, destination: &Path) -> io::Result<usize> {
    let parent = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let tmp = tempfile::Builder::new()
        .prefix(".zip2commit-")
        .suffix(".zip.tmp")
        .tempfile_in(parent)?;

    let mut writer = ZipWriter::new(BufWriter::new(tmp.reopen()?));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut entries = 0usize;

    for entry in WalkDir::new(staging).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(staging)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let name = entry_name(rel)?;

        #[cfg(unix)]
        let options = {
            use std::os::unix::fs::PermissionsExt;
            let mode = entry.metadata().map_err(io::Error::other)?.permissions().mode();
            options.unix_permissions(mode & 0o777)
        };

        writer.start_file(name, options).map_err(io::Error::other)?;
        let mut src = File::open(entry.path())?;
        io::copy(&mut src, &mut writer)?;
        entries += 1;
    }

    let mut inner = writer.finish().map_err(io::Error::other)?;
    io::Write::flush(&mut inner)?;
    drop(inner);
    tmp.persist(destination).map_err(|e| e.error)?;
    tracing::debug!(archive = %destination.display(), entries, "archive written");
    Ok(entries)
}

fn entry_name(rel: &Path) -> io::Result<String> {
    let mut parts = Vec::new();
    for c in rel.components() {
        match c {
            Component::Normal(s) => parts.push(s.to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 file name: {}", rel.display()),
                )
            })?),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unexpected path component in {}", rel.display()),
                ))
            }
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_validate_relative_path_rejects_escapes() {
        let root = Path::new("/stage");
        assert!(validate_relative_path(root, "../etc/passwd").is_err());
        assert!(validate_relative_path(root, "/etc/passwd").is_err());
        assert!(validate_relative_path(root, "a\0b").is_err());
        assert_eq!(
            validate_relative_path(root, "dir/b.txt").unwrap(),
            PathBuf::from("/stage/dir/b.txt")
        );
    }

    #[test]
    fn test_copy_into_staging_missing_is_not_found() {
        let repo = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let e = copy_into_staging(repo.path(), "gone.txt", staging.path()).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_write_zip_entries_use_forward_slashes() {
        let staging = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::create_dir_all(staging.path().join("dir")).unwrap();
        fs::write(staging.path().join("a.txt"), "alpha").unwrap();
        fs::write(staging.path().join("dir").join("b.txt"), "beta").unwrap();

        let dest = out.path().join("main.zip");
        assert_eq!(write_zip(staging.path(), &dest).unwrap(), 2);

        let mut zip = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["a.txt", "dir/b.txt"]);
        let mut body = String::new();
        zip.by_name("dir/b.txt").unwrap().read_to_string(&mut body).unwrap();
        assert_eq!(body, "beta");
    }

    #[test]
    fn test_write_zip_overwrites_existing_destination() {
        let staging = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(staging.path().join("new.txt"), "n").unwrap();
        let dest = out.path().join("x.zip");
        fs::write(&dest, "stale, not a zip").unwrap();
        write_zip(staging.path(), &dest).unwrap();
        let zip = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(zip.len(), 1);
    }
}
