//! Metadata resolution with single-flight and a single-slot cache
//!
//! Lifecycle per subject id: `Idle → Resolving → Resolved | Failed`.
//! - A cached result for the id is returned without touching either source
//! - Concurrent requests for an id share one underlying resolution
//! - Embedded page data is always tried before the remote API
//! - Only the most recently resolved subject is cached; failures are never cached

use super::api::MetadataApi;
use super::embedded::{EmbeddedPayload, EmbeddedSource};
use super::{IllustKind, RawMetadata, normalize};
use crate::config::Locale;
use crate::error::ResolveError;
use crate::types::IllustrationMetadata;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;

type ResolveResult = Result<Arc<IllustrationMetadata>, ResolveError>;
type SharedResolution = Shared<BoxFuture<'static, ResolveResult>>;

/// Mutable resolver state, owned by one resolver instance
#[derive(Default)]
struct ResolverState {
    /// Most recent successful resolution
    last: Option<(String, Arc<IllustrationMetadata>)>,
    /// Resolutions currently running, keyed by subject id, tagged with their ticket
    inflight: HashMap<String, (u64, SharedResolution)>,
    /// Bumped by every reset; results started under an older generation are not cached
    generation: u64,
    next_ticket: u64,
}

impl ResolverState {
    fn cached(&self, id: &str) -> Option<Arc<IllustrationMetadata>> {
        match &self.last {
            Some((last_id, metadata)) if last_id == id => Some(metadata.clone()),
            _ => None,
        }
    }

    /// Record a completed resolution; runs once per resolution, when it completes
    fn finish(&mut self, id: &str, ticket: u64, generation: u64, result: &ResolveResult) {
        if self
            .inflight
            .get(id)
            .is_some_and(|(running, _)| *running == ticket)
        {
            self.inflight.remove(id);
        }

        let Ok(metadata) = result else {
            return;
        };
        if generation == self.generation {
            self.last = Some((id.to_string(), metadata.clone()));
        } else {
            tracing::debug!(subject_id = id, "Context reset during resolution, not caching");
        }
    }
}

/// Resolves subject ids to canonical metadata
///
/// The resolver is tied to a caller context (a page session). Call
/// [`MetadataResolver::reset`] when that context changes.
#[derive(Clone)]
pub struct MetadataResolver {
    embedded: Arc<dyn EmbeddedSource>,
    api: Arc<dyn MetadataApi>,
    locale: Locale,
    state: Arc<Mutex<ResolverState>>,
}

impl MetadataResolver {
    /// Create a resolver over the two sources
    pub fn new(
        embedded: Arc<dyn EmbeddedSource>,
        api: Arc<dyn MetadataApi>,
        locale: Locale,
    ) -> Self {
        Self {
            embedded,
            api,
            locale,
            state: Arc::new(Mutex::new(ResolverState::default())),
        }
    }

    /// Resolve metadata for a subject
    ///
    /// # Errors
    ///
    /// - [`ResolveError::RemoteRequestFailed`] when the embedded source is unusable and the
    ///   API call fails
    /// - [`ResolveError::MetadataUnavailable`] / [`ResolveError::NoDownloadableAssets`] when
    ///   no source produced usable assets
    pub async fn resolve(&self, id: &str) -> ResolveResult {
        let resolution = {
            let mut state = self.state.lock().await;

            if let Some(hit) = state.cached(id) {
                tracing::debug!(subject_id = id, "Metadata cache hit");
                return Ok(hit);
            }

            match state.inflight.get(id) {
                Some((_, running)) => {
                    tracing::debug!(subject_id = id, "Joining in-flight resolution");
                    running.clone()
                }
                None => {
                    let ticket = state.next_ticket;
                    state.next_ticket += 1;
                    let resolution =
                        self.start_resolution(id.to_string(), ticket, state.generation);
                    state
                        .inflight
                        .insert(id.to_string(), (ticket, resolution.clone()));
                    resolution
                }
            }
        };

        resolution.await
    }

    fn start_resolution(&self, id: String, ticket: u64, generation: u64) -> SharedResolution {
        let work = resolve_uncached(
            self.embedded.clone(),
            self.api.clone(),
            self.locale,
            id.clone(),
        );
        // Weak, so an abandoned resolution stored in `inflight` does not keep the state alive
        let state: Weak<Mutex<ResolverState>> = Arc::downgrade(&self.state);

        async move {
            let result = work.await;
            if let Some(state) = state.upgrade() {
                state.lock().await.finish(&id, ticket, generation, &result);
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Cached metadata for `id`, without resolving
    pub async fn cached(&self, id: &str) -> Option<Arc<IllustrationMetadata>> {
        self.state.lock().await.cached(id)
    }

    /// Forget the cached subject (e.g. after navigating to another page)
    ///
    /// Running resolutions are left to finish and their callers still receive results,
    /// but those results are not cached.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.last = None;
        state.generation += 1;
    }
}

async fn resolve_uncached(
    embedded: Arc<dyn EmbeddedSource>,
    api: Arc<dyn MetadataApi>,
    locale: Locale,
    id: String,
) -> ResolveResult {
    match embedded.preload_data() {
        Some(raw) => match EmbeddedPayload::parse(&id, &raw) {
            Ok(payload) => match normalize(&id, RawMetadata::Embedded(payload), locale) {
                Ok(metadata) => {
                    tracing::info!(
                        subject_id = %id,
                        assets = metadata.assets.len(),
                        source = "embedded",
                        "Resolved metadata"
                    );
                    return Ok(Arc::new(metadata));
                }
                Err(e) => {
                    tracing::debug!(subject_id = %id, error = %e, "Embedded data unusable, trying remote API");
                }
            },
            Err(e) => {
                tracing::warn!(subject_id = %id, error = %e, "Embedded data malformed, trying remote API");
            }
        },
        None => {
            tracing::debug!(subject_id = %id, "No embedded data, trying remote API");
        }
    }

    let detail = api.illust_detail(&id).await?;
    let ugoira = if detail.illust_type == IllustKind::Ugoira {
        Some(api.ugoira_meta(&id).await?)
    } else {
        None
    };

    let metadata = normalize(&id, RawMetadata::Remote { detail, ugoira }, locale)?;
    tracing::info!(
        subject_id = %id,
        assets = metadata.assets.len(),
        source = "remote",
        "Resolved metadata"
    );
    Ok(Arc::new(metadata))
}
