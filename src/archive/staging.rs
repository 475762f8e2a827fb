//! Saving fetched pages into the staging directory

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Hex digits of the URL hash used to tell colliding names apart
const URL_HASH_LEN: usize = 8;

/// Longest stem kept in front of the URL hash, in bytes
const MAX_STEM_LEN: usize = 200;

/// Derives the staging file name for a page URL
///
/// The host with dots replaced by underscores, then `_port` when the URL
/// names a non-default port, then the path with slashes replaced by
/// underscores, and `.html` is appended unless the name already ends with
/// it. The result is passed through `sanitize_filename`, so it is always a
/// single safe path component.
pub fn storage_file_name(url: &str) -> String {
    let (host, path) = match Url::parse(url) {
        Ok(parsed) => {
            let mut host = parsed.host_str().unwrap_or_default().replace('.', "_");
            if let Some(port) = parsed.port() {
                host.push_str(&format!("_{}", port));
            }
            (host, parsed.path().to_string())
        }
        Err(_) => (String::new(), url.to_string()),
    };

    let mut name = format!("{}{}", host, path.replace('/', "_"));
    if !name.ends_with(".html") {
        name.push_str(".html");
    }

    sanitize_filename::sanitize(name)
}

/// File name for a URL whose plain name is already taken in staging
///
/// The first hex digits of the URL's SHA-256 go between the stem and the
/// `.html` suffix.
pub fn hashed_file_name(url: &str) -> String {
    let name = storage_file_name(url);
    let stem = name.strip_suffix(".html").unwrap_or(&name);

    let mut cut = stem.len().min(MAX_STEM_LEN);
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }

    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}_{}.html", &stem[..cut], &digest[..URL_HASH_LEN])
}

/// Writes a page body into `staging_dir` and returns the file path
///
/// Distinct URLs can map to the same plain name (`/x/y` and `/x_y`). When
/// that name is already staged the page is written under
/// [`hashed_file_name`] instead, so no staged page is overwritten.
pub fn save_page(staging_dir: &Path, url: &str, body: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(staging_dir)?;

    let mut path = staging_dir.join(storage_file_name(url));
    if path.exists() {
        let hashed = staging_dir.join(hashed_file_name(url));
        tracing::debug!(
            "Staging name {} is taken; saving {} as {}",
            path.display(),
            url,
            hashed.display()
        );
        path = hashed;
    }

    fs::write(&path, body)?;
    Ok(path)
}

/// Lists the regular files directly inside `staging_dir`, sorted by name
///
/// A missing directory has no files.
pub fn staged_files(staging_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(staging_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
