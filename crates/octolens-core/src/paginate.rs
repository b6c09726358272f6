//! Lazy, pull-based pagination over skip/take listing endpoints.

use std::collections::VecDeque;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::remote::RemoteResourceService;
use crate::types::{Collection, ResourceRef, SpaceScope};

/// Page size used when the caller does not pick one.
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// One batch of items and the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub skip: usize,
    pub take: usize,
}

impl<T> Page<T> {
    /// A batch shorter than the requested size is the final one.
    pub fn is_last(&self) -> bool {
        self.items.len() < self.take
    }
}

/// Something that can produce one batch for a (skip, take) request.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, skip: usize, take: usize) -> Result<Vec<Self::Item>>;
}

/// Pulls items one at a time, fetching the next page only when the buffer runs
/// dry. Pages are requested strictly in order and never ahead of need.
///
/// Dropping the paginator mid-way issues no further requests. To start over,
/// build a new paginator.
pub struct Paginator<S: PageSource> {
    source: S,
    page_size: usize,
    next_skip: usize,
    buffer: VecDeque<S::Item>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<S: PageSource> Paginator<S> {
    /// Paginator with [`DEFAULT_PAGE_SIZE`].
    pub fn new(source: S) -> Self {
        Self::with_page_size(source, DEFAULT_PAGE_SIZE)
    }

    /// Paginator asking for `page_size` items per page. Zero is treated as one.
    pub fn with_page_size(source: S, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            next_skip: 0,
            buffer: VecDeque::new(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Number of successful page fetches so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page, or `None` once the final page has been seen.
    ///
    /// Does not touch the item buffer; mixing this with [`next`](Self::next)
    /// skips whatever is still buffered.
    pub async fn next_page(&mut self) -> Result<Option<Page<S::Item>>> {
        if self.exhausted {
            return Ok(None);
        }

        let skip = self.next_skip;
        let take = self.page_size;
        let items = self.source.fetch_page(skip, take).await?;
        self.pages_fetched += 1;
        debug!(skip, take, received = items.len(), "fetched page");

        let page = Page { items, skip, take };
        if page.is_last() {
            self.exhausted = true;
        } else {
            self.next_skip += take;
        }
        Ok(Some(page))
    }

    /// Next item, fetching a page when needed. Errors abort the sequence at the
    /// failing page; items already returned stay with the caller.
    pub async fn next(&mut self) -> Result<Option<S::Item>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some(item));
            }
            match self.next_page().await? {
                Some(page) => self.buffer.extend(page.items),
                None => return Ok(None),
            }
        }
    }

    /// Drain every remaining item.
    pub async fn collect_all(mut self) -> Result<Vec<S::Item>> {
        let mut all: Vec<S::Item> = self.buffer.drain(..).collect();
        while let Some(page) = self.next_page().await? {
            all.extend(page.items);
        }
        Ok(all)
    }
}

/// Pages through a collection of the remote service.
pub struct CollectionPages<'a> {
    service: &'a dyn RemoteResourceService,
    scope: &'a SpaceScope,
    collection: &'a Collection,
    name_filter: Option<&'a str>,
}

impl<'a> CollectionPages<'a> {
    pub fn new(
        service: &'a dyn RemoteResourceService,
        scope: &'a SpaceScope,
        collection: &'a Collection,
    ) -> Self {
        Self {
            service,
            scope,
            collection,
            name_filter: None,
        }
    }

    pub fn with_name_filter(mut self, name: &'a str) -> Self {
        self.name_filter = Some(name);
        self
    }
}

#[async_trait]
impl<'a> PageSource for CollectionPages<'a> {
    type Item = ResourceRef;

    async fn fetch_page(&self, skip: usize, take: usize) -> Result<Vec<ResourceRef>> {
        self.service
            .list_page(self.scope, self.collection, self.name_filter, skip, take)
            .await
    }
}
