use std::io::Read;

use flate2::read::GzDecoder;
use tracing::{debug, info};

use super::{ContentKind, Fetch, LoadContext, Origin, SourceError};

const USER_AGENT: &str = concat!("fleetconf/", env!("CARGO_PKG_VERSION"));

/// HTTP(S) origin using conditional GETs.
///
/// On the very first fetch a `.txt` URL is probed as its `.xml` sibling;
/// if the sibling exists the origin switches to it for good.
#[derive(Debug)]
pub struct HttpOrigin {
    url: String,
    kind: ContentKind,
    probed: bool,
}

impl HttpOrigin {
    /// Creates an origin for `url`.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: ContentKind::from_url(url),
            probed: false,
        }
    }

    fn xml_sibling(&self) -> Option<String> {
        let (path, rest) = match self.url.find(['?', '#']) {
            Some(idx) => self.url.split_at(idx),
            None => (self.url.as_str(), ""),
        };
        let stem = path.strip_suffix(".txt")?;
        Some(format!("{stem}.xml{rest}"))
    }

    fn probe_sibling(&mut self, ctx: &LoadContext) -> Option<Fetch> {
        self.probed = true;
        let sibling = self.xml_sibling()?;

        match get(&sibling, None, ctx) {
            Ok(fetch @ Fetch::Content { .. }) => {
                info!(from = %self.url, to = %sibling, "Switching to XML sibling");
                self.url = sibling;
                self.kind = ContentKind::Xml;
                Some(fetch)
            }
            Ok(Fetch::NotModified) => None,
            Err(error) => {
                debug!(url = %sibling, %error, "No XML sibling");
                None
            }
        }
    }
}

impl Origin for HttpOrigin {
    fn url(&self) -> &str {
        &self.url
    }

    fn kind(&self) -> ContentKind {
        self.kind
    }

    fn fetch(&mut self, last_modified: Option<&str>, ctx: &LoadContext) -> Result<Fetch, SourceError> {
        if !self.probed && last_modified.is_none() {
            if let Some(fetch) = self.probe_sibling(ctx) {
                return Ok(fetch);
            }
        }

        get(&self.url, last_modified, ctx)
    }
}

fn get(url: &str, last_modified: Option<&str>, ctx: &LoadContext) -> Result<Fetch, SourceError> {
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(ctx.connect_timeout)
        .timeout_read(ctx.data_timeout)
        .build();

    let mut request = agent
        .get(url)
        .set("Accept-Encoding", "gzip")
        .set("User-Agent", USER_AGENT);
    if let Some(token) = last_modified {
        request = request.set("If-Modified-Since", token);
    }

    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(404, _)) => return Err(SourceError::not_found(url)),
        Err(ureq::Error::Status(code, response)) => {
            return Err(SourceError::transient(
                url,
                format!("{code}: {}", response.status_text()),
            ));
        }
        Err(ureq::Error::Transport(transport)) => {
            return Err(SourceError::transient(url, transport.to_string()));
        }
    };

    match response.status() {
        200 => {}
        304 => {
            debug!(url, "Not modified");
            return Ok(Fetch::NotModified);
        }
        code => {
            return Err(SourceError::transient(
                url,
                format!("{code}: {}", response.status_text()),
            ));
        }
    }

    let new_token = response.header("Last-Modified").map(str::to_string);
    let gzipped = response
        .header("Content-Encoding")
        .is_some_and(|enc| enc.eq_ignore_ascii_case("gzip") || enc.eq_ignore_ascii_case("x-gzip"));

    let mut raw = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut raw)
        .map_err(|e| SourceError::transient(url, e.to_string()))?;

    let bytes = if gzipped {
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .map_err(|e| SourceError::transient(url, format!("gzip: {e}")))?;
        decoded
    } else {
        raw
    };

    Ok(Fetch::Content {
        bytes,
        last_modified: new_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_only_for_txt() {
        assert_eq!(
            HttpOrigin::new("http://h/p/props.txt?v=1").xml_sibling().as_deref(),
            Some("http://h/p/props.xml?v=1")
        );
        assert_eq!(HttpOrigin::new("http://h/p/props.xml").xml_sibling(), None);
    }
}
