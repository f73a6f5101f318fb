use std::{
    fs,
    io::{self, Write as _},
    path::Path,
};

use zeroize::Zeroizing;

/// A file to be written by [`write_atomic()`].
pub(crate) struct StagedFile {
    name: String,
    contents: Zeroizing<Vec<u8>>,
    #[cfg_attr(not(unix), allow(dead_code))]
    mode: u32,
}

impl StagedFile {
    /// A file only the owner may read, mode `0600` on unix.
    pub(crate) fn private(name: impl Into<String>, contents: &[u8]) -> Self {
        Self::with_mode(name, contents, 0o600)
    }

    /// A world readable file, mode `0644` on unix.
    pub(crate) fn public(name: impl Into<String>, contents: &[u8]) -> Self {
        Self::with_mode(name, contents, 0o644)
    }

    fn with_mode(name: impl Into<String>, contents: &[u8], mode: u32) -> Self {
        StagedFile {
            name: name.into(),
            contents: Zeroizing::new(contents.to_vec()),
            mode,
        }
    }
}

/// Writes `files` into `dir`.
///
/// Every file is staged under a unique hidden name next to its destination and synced to disk.
/// Only once all of them are written are they renamed into place. Staged files are removed if any
/// step fails; files renamed before the failure stay.
pub(crate) async fn write_atomic(dir: &Path, files: Vec<StagedFile>) -> io::Result<()> {
    let dir = dir.to_owned();

    tokio::task::spawn_blocking(move || write_staged(&dir, &files))
        .await
        .map_err(io::Error::other)?
}

fn write_staged(dir: &Path, files: &[StagedFile]) -> io::Result<()> {
    let mut staged = Vec::with_capacity(files.len());

    for file in files {
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file.name))
            .suffix(".tmp")
            .tempfile_in(dir)?;

        restrict(tmp.as_file(), file)?;
        tmp.write_all(&file.contents)?;
        tmp.as_file().sync_all()?;

        staged.push((tmp, dir.join(&file.name)));
    }

    // dropping the remaining staged files on error deletes them
    for (tmp, target) in staged {
        tmp.persist(&target).map_err(|err| err.error)?;
        log::debug!("Wrote {}", target.display());
    }

    sync_dir(dir)
}

#[cfg(unix)]
fn restrict(file: &fs::File, staged: &StagedFile) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    file.set_permissions(fs::Permissions::from_mode(staged.mode))
}

#[cfg(not(unix))]
fn restrict(_file: &fs::File, _staged: &StagedFile) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
