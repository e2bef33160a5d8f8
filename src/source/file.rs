use std::{
    fs,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use tracing::debug;

use super::{ContentKind, Fetch, LoadContext, Origin, SourceError};

/// Local file origin. Accepts plain paths and `file://` URLs.
#[derive(Debug)]
pub struct FileOrigin {
    url: String,
    path: PathBuf,
    kind: ContentKind,
}

impl FileOrigin {
    /// Creates an origin for `url`.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            path: file_url_to_path(url),
            kind: ContentKind::from_url(url),
        }
    }

    /// Path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Origin for FileOrigin {
    fn url(&self) -> &str {
        &self.url
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }

    fn fetch(&mut self, last_modified: Option<&str>, _ctx: &LoadContext) -> Result<Fetch, SourceError> {
        let token = mtime_token(&self.path, &self.url)?;

        if last_modified == Some(token.as_str()) {
            debug!(url = %self.url, "File unchanged");
            return Ok(Fetch::NotModified);
        }

        let bytes = fs::read(&self.path).map_err(|e| SourceError::from_io(&self.url, &e))?;

        Ok(Fetch::Content {
            bytes,
            last_modified: Some(token),
        })
    }

    fn local_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}

/// Strips a `file://` scheme, leaving other strings untouched.
pub(crate) fn file_url_to_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

/// Modification time in milliseconds since the epoch, as a string token.
pub(crate) fn mtime_token(path: &Path, url: &str) -> Result<String, SourceError> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| SourceError::from_io(url, &e))?;

    let millis = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    Ok(millis.to_string())
}
