//! Grouped-cost fetcher traits
//!
//! The billing API is consumed through two seams. [`PagedCostSource`] is the
//! thin per-request client that returns one page and an optional continuation
//! token. [`CostFetcher`] is what the aggregation layer depends on: the full
//! result set of a query as one logical sequence. [`Paginated`] turns any
//! source into a fetcher by following tokens until none remain.

use crate::error::{PacioliError, Result};
use crate::types::{CostQuery, CostRecordPeriod};
use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::Mutex;
use tracing::debug;

/// One page of a paginated cost response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostPage {
    pub periods: Vec<CostRecordPeriod>,
    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

/// A billing client able to return single pages of a cost query
#[async_trait]
pub trait PagedCostSource: Send + Sync {
    /// Fetch the page identified by `token`, or the first page when `None`
    async fn fetch_page(&self, query: &CostQuery, token: Option<&str>) -> Result<CostPage>;
}

/// Anything that can return the complete result set of a cost query
#[async_trait]
pub trait CostFetcher: Send + Sync {
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<CostRecordPeriod>>;
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

struct PageState {
    cursor: Cursor,
    seen: HashSet<String>,
}

async fn next_page<S: PagedCostSource + ?Sized>(
    source: &S,
    query: &CostQuery,
    mut state: PageState,
) -> Result<Option<(CostPage, PageState)>> {
    let token = match &state.cursor {
        Cursor::Done => return Ok(None),
        Cursor::Start => None,
        Cursor::Next(token) => Some(token.clone()),
    };

    let page = source.fetch_page(query, token.as_deref()).await?;
    debug!(
        "Fetched page with {} periods (next token: {})",
        page.periods.len(),
        page.next_token.is_some()
    );

    state.cursor = match page.next_token.as_deref() {
        None | Some("") => Cursor::Done,
        Some(next) => {
            if !state.seen.insert(next.to_string()) {
                return Err(PacioliError::Fetch(format!(
                    "continuation token '{next}' was returned twice"
                )));
            }
            Cursor::Next(next.to_string())
        }
    };
    Ok(Some((page, state)))
}

/// Stream every page of `query`, following continuation tokens
pub fn page_stream<'a, S: PagedCostSource + ?Sized>(
    source: &'a S,
    query: &'a CostQuery,
) -> Pin<Box<dyn Stream<Item = Result<CostPage>> + Send + 'a>> {
    let state = PageState {
        cursor: Cursor::Start,
        seen: HashSet::new(),
    };
    Box::pin(stream::try_unfold(state, move |state| {
        next_page(source, query, state)
    }))
}

/// Collect all pages of `query` into one period sequence
///
/// A token seen twice would loop forever and is reported as a fetch error.
pub async fn collect_all_pages<S: PagedCostSource + ?Sized>(
    source: &S,
    query: &CostQuery,
) -> Result<Vec<CostRecordPeriod>> {
    let pages: Vec<CostPage> = page_stream(source, query).try_collect().await?;
    let page_count = pages.len();
    let periods: Vec<CostRecordPeriod> = pages.into_iter().flat_map(|p| p.periods).collect();
    debug!(
        "Collected {} periods from {} page(s) for {}..{}",
        periods.len(),
        page_count,
        query.start(),
        query.end()
    );
    Ok(periods)
}

/// Adapter exposing a [`PagedCostSource`] as a [`CostFetcher`]
#[derive(Debug, Clone)]
pub struct Paginated<S> {
    source: S,
}

impl<S: PagedCostSource> Paginated<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: PagedCostSource> CostFetcher for Paginated<S> {
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<CostRecordPeriod>> {
        collect_all_pages(&self.source, query).await
    }
}

/// In-memory fetcher answering queries from canned periods
///
/// Responses are keyed by the query's group-by keys; only periods starting
/// inside `[start, end)` are returned. Every received query is recorded.
#[derive(Debug, Default)]
pub struct InMemoryCostFetcher {
    responses: HashMap<Vec<String>, Vec<CostRecordPeriod>>,
    queries: Mutex<Vec<CostQuery>>,
}

impl InMemoryCostFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the periods returned for queries grouped by `group_by`
    pub fn with_response(mut self, group_by: &[&str], periods: Vec<CostRecordPeriod>) -> Self {
        let key = group_by.iter().map(|k| k.to_string()).collect();
        self.responses.insert(key, periods);
        self
    }

    /// Queries received so far, in order
    pub fn queries(&self) -> Vec<CostQuery> {
        match self.queries.lock() {
            Ok(queries) => queries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl CostFetcher for InMemoryCostFetcher {
    async fn fetch(&self, query: &CostQuery) -> Result<Vec<CostRecordPeriod>> {
        match self.queries.lock() {
            Ok(mut queries) => queries.push(query.clone()),
            Err(poisoned) => poisoned.into_inner().push(query.clone()),
        }

        let key: Vec<String> = query.group_by().iter().map(|g| g.key.clone()).collect();
        let periods = self
            .responses
            .get(&key)
            .map(|periods| {
                periods
                    .iter()
                    .filter(|p| p.start >= query.start() && p.start < query.end())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(periods)
    }
}
