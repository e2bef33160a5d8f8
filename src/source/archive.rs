use std::{
    fs::File,
    io::{self, Read},
    path::PathBuf,
};

use zip::{ZipArchive, result::ZipError};

use super::{
    ContentKind, Fetch, LoadContext, Origin, SourceError,
    file::{file_url_to_path, mtime_token},
};

/// Entry inside a bundled zip archive, addressed as
/// `jar:file:///path/archive.zip!/entry`.
///
/// Archive contents are fixed for the life of the process, so the origin is
/// check-once.
#[derive(Debug)]
pub struct ArchiveOrigin {
    url: String,
    archive: PathBuf,
    entry: String,
    kind: ContentKind,
}

impl ArchiveOrigin {
    /// Parses an archive URL.
    ///
    /// # Errors
    /// Returns `Malformed` if the URL lacks the `jar:` scheme or `!/` separator.
    pub fn new(url: &str) -> Result<Self, SourceError> {
        let rest = url
            .strip_prefix("jar:")
            .ok_or_else(|| SourceError::malformed(url, format!("not an archive URL: {url}")))?;
        let (archive, entry) = rest
            .split_once("!/")
            .ok_or_else(|| SourceError::malformed(url, format!("missing '!/' in {url}")))?;

        Ok(Self {
            url: url.to_string(),
            archive: file_url_to_path(archive),
            entry: entry.to_string(),
            kind: ContentKind::from_url(entry),
        })
    }

    fn read_entry(&self) -> Result<Vec<u8>, SourceError> {
        let file = File::open(&self.archive).map_err(|e| SourceError::from_io(&self.url, &e))?;
        let mut archive = ZipArchive::new(file).map_err(|e| self.zip_error(e))?;
        let mut entry = archive.by_name(&self.entry).map_err(|e| self.zip_error(e))?;

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| SourceError::transient(&self.url, e.to_string()))?;

        Ok(bytes)
    }

    fn zip_error(&self, error: ZipError) -> SourceError {
        match error {
            ZipError::FileNotFound => SourceError::not_found(&self.url),
            ZipError::Io(e) if e.kind() == io::ErrorKind::NotFound => SourceError::not_found(&self.url),
            ZipError::Io(e) => SourceError::transient(&self.url, e.to_string()),
            other => SourceError::malformed(&self.url, format!("bad archive: {other}")),
        }
    }
}

impl Origin for ArchiveOrigin {
    fn url(&self) -> &str {
        &self.url
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }

    fn fetch(&mut self, last_modified: Option<&str>, _ctx: &LoadContext) -> Result<Fetch, SourceError> {
        let token = mtime_token(&self.archive, &self.url)?;
        if last_modified == Some(token.as_str()) {
            return Ok(Fetch::NotModified);
        }

        let bytes = self.read_entry()?;

        Ok(Fetch::Content {
            bytes,
            last_modified: Some(token),
        })
    }

    fn check_once(&self) -> bool {
        true
    }
}
