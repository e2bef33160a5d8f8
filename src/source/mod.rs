//! Configuration sources and the reload/generation protocol.
//!
//! A [`Source`] wraps one [`Origin`] (file, HTTP or archive entry) and owns
//! everything the origins have in common: change tokens, parsing, key
//! filtering, catalog extraction and generation numbering.

mod archive;
mod error;
mod file;
mod filter;
mod http;
mod origin;
pub mod parse;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

pub use archive::ArchiveOrigin;
pub use error::SourceError;
pub use file::FileOrigin;
pub use filter::{FilterPolicy, KeyFilter};
pub use http::HttpOrigin;
pub use origin::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_DATA_TIMEOUT, Fetch, LoadContext, Origin};
pub use parse::{ContentKind, OPTIONAL_SUFFIX};

use crate::{
    tdb::{TITLE_ROOT, Tdb},
    tree::ValueTree,
};

/// Handle to a source shared between the registry and the coordinator.
pub type SharedSource = Arc<Source>;

/// Per-source settings fixed at creation.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Source contributes to the platform bootstrap tree
    pub platform: bool,
    /// Key filter applied after every parse
    pub filter: Option<KeyFilter>,
}

/// One successful parse of a source.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Source URL
    pub url: String,
    /// Sealed tree, with the catalog subtree removed
    pub tree: Arc<ValueTree>,
    /// Sealed catalog, if the content carried one
    pub tdb: Option<Arc<Tdb>>,
    /// Starts at 1 and grows by one per structurally different reparse
    pub number: u64,
}

#[derive(Debug)]
struct State {
    kind: ContentKind,
    last_modified: Option<String>,
    generation: Option<Generation>,
    needs_reload: bool,
    last_error: Option<SourceError>,
    last_attempt: Option<DateTime<Utc>>,
}

/// Output of one fetch and parse, not yet committed.
struct Parsed {
    tree: ValueTree,
    tdb: Option<Tdb>,
    last_modified: Option<String>,
}

/// A configuration source identified by its URL.
///
/// The origin sits behind its own lock, held only by the load in progress.
/// Status accessors touch the bookkeeping lock alone, so they never wait
/// on a slow fetch.
#[derive(Debug)]
pub struct Source {
    url: String,
    options: SourceOptions,
    check_once: bool,
    local_path: Option<PathBuf>,
    origin: Mutex<Box<dyn Origin>>,
    state: Mutex<State>,
}

impl Source {
    /// Creates a source, choosing the origin from the URL scheme:
    /// `http(s)://` is fetched over HTTP, `jar:` names an archive entry and
    /// anything else is a local file.
    ///
    /// # Errors
    /// Returns `Malformed` for an unparseable archive URL.
    pub fn new(url: &str, options: SourceOptions) -> Result<Self, SourceError> {
        let origin: Box<dyn Origin> = if url.starts_with("http://") || url.starts_with("https://") {
            Box::new(HttpOrigin::new(url))
        } else if url.starts_with("jar:") {
            Box::new(ArchiveOrigin::new(url)?)
        } else {
            Box::new(FileOrigin::new(url))
        };

        Ok(Self::with_origin(url, origin, options))
    }

    /// Creates a source around an explicit origin.
    pub fn with_origin(url: &str, origin: Box<dyn Origin>, options: SourceOptions) -> Self {
        Self {
            url: url.to_string(),
            options,
            check_once: origin.check_once(),
            local_path: origin.local_path(),
            state: Mutex::new(State {
                kind: origin.kind(),
                last_modified: None,
                generation: None,
                needs_reload: false,
                last_error: None,
                last_attempt: None,
            }),
            origin: Mutex::new(origin),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn origin(&self) -> MutexGuard<'_, Box<dyn Origin>> {
        self.origin.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// True if the source feeds the platform bootstrap.
    pub fn is_platform(&self) -> bool {
        self.options.platform
    }

    /// Content kind the origin reported after the latest load.
    pub fn kind(&self) -> ContentKind {
        self.state().kind
    }

    /// True once a parse has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.state().generation.is_some()
    }

    /// Error from the most recent load attempt, if it failed.
    pub fn last_error(&self) -> Option<SourceError> {
        self.state().last_error.clone()
    }

    /// Time of the most recent load attempt.
    pub fn last_attempt(&self) -> Option<DateTime<Utc>> {
        self.state().last_attempt
    }

    /// Change token of the installed content.
    pub fn last_modified(&self) -> Option<String> {
        self.state().last_modified.clone()
    }

    /// Forces the next load to fetch unconditionally.
    pub fn set_needs_reload(&self) {
        self.state().needs_reload = true;
    }

    /// True if the next load will ignore the change token.
    pub fn needs_reload(&self) -> bool {
        self.state().needs_reload
    }

    /// True if the content is loaded at most once.
    pub fn check_once(&self) -> bool {
        self.check_once
    }

    /// Local file backing the source, if any.
    pub fn local_path(&self) -> Option<PathBuf> {
        self.local_path.clone()
    }

    /// Latest generation without any I/O.
    pub fn current_generation(&self) -> Option<Generation> {
        self.state().generation.clone()
    }

    /// Fetches and reparses the content if it changed.
    ///
    /// Returns true when the generation was bumped. On failure the previous
    /// generation and change token are kept and the error is recorded.
    ///
    /// # Errors
    /// Any [`SourceError`] from the fetch, parse or filter steps.
    #[instrument(skip(self, ctx), fields(url = %self.url))]
    pub fn reload(&self, ctx: &LoadContext) -> Result<bool, SourceError> {
        let mut origin = self.origin();

        let token = {
            let mut state = self.state();
            state.last_attempt = Some(Utc::now());
            match (&state.generation, state.needs_reload) {
                (Some(_), false) => state.last_modified.clone(),
                _ => None,
            }
        };

        let fetched = self.fetch_and_parse(origin.as_mut(), token.as_deref(), ctx);

        let mut state = self.state();
        state.kind = origin.kind();
        let result = fetched.map(|parsed| match parsed {
            Some(parsed) => self.commit(&mut state, parsed),
            None => {
                debug!("Not modified");
                false
            }
        });

        match &result {
            Ok(_) => state.last_error = None,
            Err(error) => {
                warn!(%error, "Source load failed");
                state.last_error = Some(error.clone());
            }
        }
        result
    }

    /// Returns the current generation, reloading first unless the source is
    /// check-once and already loaded.
    ///
    /// # Errors
    /// Any error from [`reload`](Self::reload).
    pub fn generation(&self, ctx: &LoadContext) -> Result<Generation, SourceError> {
        let skip = self.check_once && self.is_loaded() && !self.needs_reload();
        if !skip {
            self.reload(ctx)?;
        }

        self.current_generation()
            .ok_or_else(|| SourceError::transient(&self.url, "no content loaded"))
    }

    /// Runs without the bookkeeping lock. `None` means not modified.
    fn fetch_and_parse(
        &self,
        origin: &mut dyn Origin,
        token: Option<&str>,
        ctx: &LoadContext,
    ) -> Result<Option<Parsed>, SourceError> {
        let Fetch::Content {
            bytes,
            last_modified,
        } = origin.fetch(token, ctx)?
        else {
            return Ok(None);
        };

        let mut tree = parse::parse(&bytes, origin.kind(), &self.url, &ctx.conditionals)?;
        if let Some(filter) = &self.options.filter {
            tree = filter.apply(&self.url, tree)?;
        }

        let tdb = self.extract_catalog(&mut tree)?;
        tree.seal();

        Ok(Some(Parsed {
            tree,
            tdb,
            last_modified,
        }))
    }

    /// Installs a parse result. Returns true if the generation was bumped.
    fn commit(&self, state: &mut State, parsed: Parsed) -> bool {
        let Parsed {
            tree,
            tdb,
            last_modified,
        } = parsed;

        state.needs_reload = false;
        state.last_modified = last_modified;

        let changed = match &state.generation {
            Some(prev) => *prev.tree != tree || prev.tdb.as_deref() != tdb.as_ref(),
            None => true,
        };
        if !changed {
            debug!("Content unchanged");
            return false;
        }

        let number = state.generation.as_ref().map_or(1, |g| g.number + 1);
        debug!(number, keys = tree.len(), "New generation");

        state.generation = Some(Generation {
            url: self.url.clone(),
            tree: Arc::new(tree),
            tdb: tdb.map(Arc::new),
            number,
        });
        true
    }

    fn extract_catalog(&self, tree: &mut ValueTree) -> Result<Option<Tdb>, SourceError> {
        let entries = tree.config_tree(TITLE_ROOT);
        if entries.is_empty() {
            return Ok(None);
        }

        tree.remove_config_tree(TITLE_ROOT)
            .map_err(|e| SourceError::malformed(&self.url, e.to_string()))?;

        let mut tdb = Tdb::from_config(&entries, &self.url);
        tdb.seal();
        Ok(Some(tdb))
    }
}
