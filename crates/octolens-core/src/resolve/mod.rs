//! Turns human-typed names into exactly one canonical resource.
//!
//! Resolution runs in tiers:
//!
//! 1. A value that already looks like an Id of the kind is fetched directly.
//! 2. A server-side partial-name listing narrows the candidates.
//! 3. An unfiltered listing of the whole collection is searched.
//!
//! Tiers 2 and 3 select with [`select_match`]. Nothing is ever picked by
//! similarity; an ambiguous or absent name fails with
//! [`Error::ResourceNotFound`].

mod matching;

pub use matching::{MatchKind, select_match};

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result, ensure_not_empty};
use crate::paginate::{CollectionPages, Paginator};
use crate::remote::RemoteResourceService;
use crate::transport::TAKE_ALL;
use crate::types::{Collection, ResourceRef, SpaceScope};

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    DirectId,
    PartialName,
    FullListing,
}

#[derive(Clone)]
pub struct FuzzyResolver {
    service: Arc<dyn RemoteResourceService>,
    fallback_page_size: usize,
}

impl FuzzyResolver {
    /// Resolver over `service`, falling back to a single unfiltered listing.
    pub fn new(service: Arc<dyn RemoteResourceService>) -> Self {
        Self {
            service,
            fallback_page_size: TAKE_ALL,
        }
    }

    /// Page size of the unfiltered fallback listing. Defaults to [`TAKE_ALL`].
    pub fn with_fallback_page_size(mut self, page_size: usize) -> Self {
        self.fallback_page_size = page_size.max(1);
        self
    }

    /// The service resolutions are looked up in.
    pub fn service(&self) -> &Arc<dyn RemoteResourceService> {
        &self.service
    }

    /// Resolve `queried` to exactly one resource of the collection.
    pub async fn resolve(
        &self,
        scope: &SpaceScope,
        collection: &Collection,
        queried: &str,
    ) -> Result<ResourceRef> {
        self.resolve_with_tier(scope, collection, queried)
            .await
            .map(|(resource, _)| resource)
    }

    /// Like [`resolve`](Self::resolve), also reporting the tier that matched.
    pub async fn resolve_with_tier(
        &self,
        scope: &SpaceScope,
        collection: &Collection,
        queried: &str,
    ) -> Result<(ResourceRef, ResolutionTier)> {
        let kind = collection.kind;
        ensure_not_empty(queried, &format!("{} name", kind.to_string().to_lowercase()))?;

        if kind.is_canonical_id(queried) {
            let found = self.service.get_by_id(scope, kind, queried).await?;
            return match found {
                Some(resource) => {
                    info!(%kind, id = %resource.id, "resolved by id");
                    Ok((resource, ResolutionTier::DirectId))
                }
                None => Err(Error::not_found(kind, queried)),
            };
        }

        let candidates = self
            .service
            .list_page(scope, collection, Some(queried), 0, TAKE_ALL)
            .await?;
        if let Some((resource, how)) = select_match(&candidates, queried) {
            info!(%kind, queried, id = %resource.id, ?how, "resolved by partial name");
            return Ok((resource.clone(), ResolutionTier::PartialName));
        }
        debug!(
            %kind,
            queried,
            candidates = candidates.len(),
            "partial name listing was inconclusive, listing everything"
        );

        let pages = CollectionPages::new(self.service.as_ref(), scope, collection);
        let everything = Paginator::with_page_size(pages, self.fallback_page_size)
            .collect_all()
            .await?;
        match select_match(&everything, queried) {
            Some((resource, how)) => {
                info!(%kind, queried, id = %resource.id, ?how, "resolved from full listing");
                Ok((resource.clone(), ResolutionTier::FullListing))
            }
            None => Err(Error::not_found(kind, queried)),
        }
    }
}
