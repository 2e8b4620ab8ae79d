/// Query cache
///
/// Holds the last server response per query so views can render without a
/// round trip, and lets mutations rewrite it optimistically. Entries go stale
/// after `stale_time` or when invalidated; the next read refetches.
///
/// The lock is a `std::sync::RwLock` and is never held across an await.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasqar_client::{api::HttpClient, cache::QueryClient};
///
/// # async fn example(http: HttpClient) -> Result<(), tasqar_client::error::ClientError> {
/// let queries = QueryClient::new(Arc::new(http));
///
/// let tasks = queries.tasks().await?; // network
/// let again = queries.tasks().await?; // cache
/// assert_eq!(tasks, again);
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tasqar_shared::models::{
    notification::Notification,
    project::ProjectSummary,
    task::{Task, TaskFilter},
};
use tokio::sync::broadcast;
use tokio::time::Instant;
use uuid::Uuid;

use crate::api::TasqarApi;
use crate::error::ClientResult;
use crate::mutations::Toast;

/// How long a fetched query counts as fresh
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

const TOAST_CAPACITY: usize = 32;

/// Cached queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The board: every task visible to the user
    Tasks,
    Projects,
    Notifications,
}

/// A cached query result
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Tasks(Vec<Task>),
    Projects(Vec<ProjectSummary>),
    Notifications(Vec<Notification>),
}

impl QueryData {
    pub fn key(&self) -> QueryKey {
        match self {
            QueryData::Tasks(_) => QueryKey::Tasks,
            QueryData::Projects(_) => QueryKey::Projects,
            QueryData::Notifications(_) => QueryKey::Notifications,
        }
    }
}

#[derive(Debug)]
struct Entry {
    data: QueryData,
    fetched_at: Instant,
    invalidated: bool,
}

/// Shared query storage; clones see the same entries
#[derive(Debug, Clone, Default)]
pub struct QueryCache {
    entries: Arc<RwLock<HashMap<QueryKey, Entry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: QueryKey) -> Option<QueryData> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&key).map(|e| e.data.clone())
    }

    /// Stores a fresh result
    pub fn set(&self, data: QueryData) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            data.key(),
            Entry {
                data,
                fetched_at: Instant::now(),
                invalidated: false,
            },
        );
    }

    /// Puts a snapshot back, or drops the entry if there was none
    pub fn restore(&self, key: QueryKey, snapshot: Option<QueryData>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match snapshot {
            Some(data) => {
                if let Some(entry) = entries.get_mut(&key) {
                    entry.data = data;
                } else {
                    entries.insert(
                        key,
                        Entry {
                            data,
                            fetched_at: Instant::now(),
                            invalidated: false,
                        },
                    );
                }
            }
            None => {
                entries.remove(&key);
            }
        }
    }

    /// Marks an entry stale so the next read refetches
    pub fn invalidate(&self, key: QueryKey) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(&key) {
            entry.invalidated = true;
        }
    }

    pub fn is_fresh(&self, key: QueryKey, stale_time: Duration) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&key)
            .is_some_and(|e| !e.invalidated && e.fetched_at.elapsed() < stale_time)
    }

    pub fn tasks(&self) -> Option<Vec<Task>> {
        match self.get(QueryKey::Tasks) {
            Some(QueryData::Tasks(tasks)) => Some(tasks),
            _ => None,
        }
    }

    pub fn projects(&self) -> Option<Vec<ProjectSummary>> {
        match self.get(QueryKey::Projects) {
            Some(QueryData::Projects(projects)) => Some(projects),
            _ => None,
        }
    }

    pub fn notifications(&self) -> Option<Vec<Notification>> {
        match self.get(QueryKey::Notifications) {
            Some(QueryData::Notifications(notifications)) => Some(notifications),
            _ => None,
        }
    }

    /// Edits the cached task list in place; no-op when nothing is cached
    pub fn update_tasks(&self, f: impl FnOnce(&mut Vec<Task>)) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(Entry {
            data: QueryData::Tasks(tasks),
            ..
        }) = entries.get_mut(&QueryKey::Tasks)
        {
            f(tasks);
        }
    }

    /// Edits the cached notification list in place; no-op when nothing is cached
    pub fn update_notifications(&self, f: impl FnOnce(&mut Vec<Notification>)) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(Entry {
            data: QueryData::Notifications(notifications),
            ..
        }) = entries.get_mut(&QueryKey::Notifications)
        {
            f(notifications);
        }
    }
}

/// Query cache bound to an API
///
/// Reads serve fresh cache entries and fetch otherwise. Mutations (see
/// [`crate::mutations`]) update the cache optimistically and report failures
/// as [`Toast`]s.
#[derive(Clone)]
pub struct QueryClient {
    pub(crate) api: Arc<dyn TasqarApi>,
    pub(crate) cache: QueryCache,
    pub(crate) toasts: broadcast::Sender<Toast>,
    pub(crate) user_id: Option<Uuid>,
    stale_time: Duration,
}

impl QueryClient {
    pub fn new(api: Arc<dyn TasqarApi>) -> Self {
        Self::with_cache(api, QueryCache::new())
    }

    pub fn with_cache(api: Arc<dyn TasqarApi>, cache: QueryCache) -> Self {
        let (toasts, _) = broadcast::channel(TOAST_CAPACITY);
        Self {
            api,
            cache,
            toasts,
            user_id: None,
            stale_time: DEFAULT_STALE_TIME,
        }
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Signed-in user; becomes the owner of optimistically created tasks
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn subscribe_toasts(&self) -> broadcast::Receiver<Toast> {
        self.toasts.subscribe()
    }

    pub(crate) fn toast(&self, toast: Toast) {
        // No subscribers is fine
        let _ = self.toasts.send(toast);
    }

    /// Fetches a query and stores the result
    pub async fn fetch(&self, key: QueryKey) -> ClientResult<QueryData> {
        let data = match key {
            QueryKey::Tasks => QueryData::Tasks(self.api.list_tasks(&TaskFilter::default()).await?),
            QueryKey::Projects => QueryData::Projects(self.api.list_projects().await?),
            QueryKey::Notifications => {
                QueryData::Notifications(self.api.list_notifications(false).await?)
            }
        };

        tracing::debug!(?key, "Query fetched");
        self.cache.set(data.clone());
        Ok(data)
    }

    async fn read(&self, key: QueryKey) -> ClientResult<QueryData> {
        if self.cache.is_fresh(key, self.stale_time) {
            if let Some(data) = self.cache.get(key) {
                return Ok(data);
            }
        }
        self.fetch(key).await
    }

    pub async fn tasks(&self) -> ClientResult<Vec<Task>> {
        match self.read(QueryKey::Tasks).await? {
            QueryData::Tasks(tasks) => Ok(tasks),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn projects(&self) -> ClientResult<Vec<ProjectSummary>> {
        match self.read(QueryKey::Projects).await? {
            QueryData::Projects(projects) => Ok(projects),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn notifications(&self) -> ClientResult<Vec<Notification>> {
        match self.read(QueryKey::Notifications).await? {
            QueryData::Notifications(notifications) => Ok(notifications),
            _ => Ok(Vec::new()),
        }
    }

    pub fn unread_count(&self) -> usize {
        self.cache
            .notifications()
            .map_or(0, |n| n.iter().filter(|n| !n.read).count())
    }

    /// Invalidates and refetches; a failed refetch leaves the entry stale
    pub async fn settle(&self, key: QueryKey) {
        self.cache.invalidate(key);
        if let Err(e) = self.fetch(key).await {
            tracing::warn!(?key, error = %e, "Refetch after mutation failed");
        }
    }
}
