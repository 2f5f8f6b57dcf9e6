//! # Listing Controller (Pagination Coordinator)
//!
//! Drives one paginated table: which page is shown, how many rows, and what
//! happens to the page after a row is deleted.
//!
//! ## Delete Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  delete("s-25")                                                        │
//! │     │                                                                   │
//! │     ▼ DELETE /suppliers/s-25 ──► error? view unchanged, error returned │
//! │     │                                                                   │
//! │     ▼ success: store drops the row, total_count - 1                    │
//! │     │                                                                   │
//! │     ▼ page * page_size >= total ?                                      │
//! │     │      yes ──► page = 0, fetch page 0                              │
//! │     │      no  ──► fetch the current page again                        │
//! │     ▼                                                                   │
//! │  success message returned to the caller                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Once [`ListingController::unmount`] is called, completed requests no
//! longer touch the store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use stockroom_core::contract::ResourceDraft;
use stockroom_core::validation::validate_search_query;
use stockroom_core::{PageState, PaginatedCollection, RequestState};

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::request::RequestController;
use crate::store::{ResourceStore, StoreSlot};

pub struct ListingController<T: StoreSlot> {
    api: Arc<ApiClient>,
    store: Arc<ResourceStore>,
    page: Mutex<PageState>,
    mounted: AtomicBool,
    fetch: RequestController<PaginatedCollection<T>>,
    search: RequestController<Vec<T>>,
    save: RequestController<T>,
    lookup: RequestController<T>,
    remove: RequestController<String>,
}

impl<T: StoreSlot> ListingController<T> {
    pub fn new(api: Arc<ApiClient>, store: Arc<ResourceStore>, state: PageState) -> Self {
        let path = T::KIND.path();
        ListingController {
            api,
            store,
            page: Mutex::new(state),
            mounted: AtomicBool::new(true),
            fetch: RequestController::new(format!("GET /{}", path)),
            search: RequestController::new(format!("GET /{}/search", path)),
            save: RequestController::new(format!("SAVE /{}", path)),
            lookup: RequestController::new(format!("GET /{}/{{id}}", path)),
            remove: RequestController::new(format!("DELETE /{}", path)),
        }
    }

    pub fn page_state(&self) -> PageState {
        *self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_page<R>(&self, f: impl FnOnce(&mut PageState) -> R) -> R {
        f(&mut self.page.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Detaches the view. Later completions are no-ops.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
        debug!(kind = %T::KIND, "Listing unmounted");
    }

    pub fn fetch_state(&self) -> RequestState<PaginatedCollection<T>> {
        self.fetch.state()
    }

    pub fn search_state(&self) -> RequestState<Vec<T>> {
        self.search.state()
    }

    pub fn lookup_state(&self) -> RequestState<T> {
        self.lookup.state()
    }

    pub fn remove_state(&self) -> RequestState<String> {
        self.remove.state()
    }

    pub fn reset_remove(&self) {
        self.remove.reset();
    }

    // =========================================================================
    // Paging
    // =========================================================================

    /// Fetches the current page into the store.
    ///
    /// An empty page past the server-reported total is not kept: the
    /// listing rewinds to page 0 and fetches that instead, once.
    pub async fn refresh(&self) -> ClientResult<PaginatedCollection<T>> {
        let state = self.page_state();
        let seq = self.store.begin_fetch::<T>();
        let outcome = self.fetch.run(self.api.list::<T>(state)).await;

        if let Ok(page) = &outcome {
            let total = page.total_count();
            if page.is_empty()
                && state.is_out_of_range(total)
                && self.is_mounted()
                && self.update_page(|s| s.reconcile(total))
            {
                info!(kind = %T::KIND, page = state.page(), total, "Page past the last row, back to first page");
                let first = self.page_state();
                let seq = self.store.begin_fetch::<T>();
                let outcome = self.fetch.run(self.api.list::<T>(first)).await;
                return self.apply_fetch(seq, first, outcome);
            }
        }
        self.apply_fetch(seq, state, outcome)
    }

    fn apply_fetch(
        &self,
        seq: u64,
        state: PageState,
        outcome: ClientResult<PaginatedCollection<T>>,
    ) -> ClientResult<PaginatedCollection<T>> {
        if !self.is_mounted() {
            debug!(kind = %T::KIND, seq, "Ignoring page for unmounted listing");
            return outcome;
        }

        match &outcome {
            Ok(page) => {
                self.store.apply_listing(seq, page.clone());
            }
            Err(e) => {
                warn!(kind = %T::KIND, page = state.page(), error = %e, "Page fetch failed");
                self.store.apply_failed_listing::<T>(seq, state);
            }
        }
        outcome
    }

    /// Moves to `page` (zero-based) and fetches it if the position changed.
    pub async fn set_page(&self, page: usize) -> ClientResult<()> {
        if self.update_page(|s| s.set_page(page)) {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Changes the page size, rewinds to page 0, and fetches.
    pub async fn set_page_size(&self, page_size: usize) -> ClientResult<()> {
        if self.update_page(|s| s.set_page_size(page_size))? {
            self.refresh().await?;
        }
        Ok(())
    }

    /// Goes one page forward if a next page exists. Returns whether it moved.
    pub async fn next_page(&self) -> ClientResult<bool> {
        let total = self.total_count();
        let state = self.page_state();
        if !state.has_next(total) {
            return Ok(false);
        }
        self.set_page(state.page() + 1).await?;
        Ok(true)
    }

    pub async fn prev_page(&self) -> ClientResult<bool> {
        let state = self.page_state();
        if !state.has_prev() {
            return Ok(false);
        }
        self.set_page(state.page() - 1).await?;
        Ok(true)
    }

    fn total_count(&self) -> usize {
        self.store
            .listing::<T>()
            .map(|page| page.total_count())
            .unwrap_or(0)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Deletes a row, then reloads the page it leaves behind.
    pub async fn delete(&self, id: &str) -> ClientResult<String> {
        let message = self.remove.run(self.api.delete(T::KIND, id)).await?;

        if !self.is_mounted() {
            return Ok(message);
        }

        let total = self.store.remove::<T>(id).unwrap_or(0);
        if self.update_page(|s| s.reconcile(total)) {
            info!(kind = %T::KIND, total, "Page out of range after delete, back to first page");
        }
        if let Err(e) = self.refresh().await {
            warn!(kind = %T::KIND, error = %e, "Reload after delete failed");
        }
        Ok(message)
    }

    /// Validates and creates a row, then reloads the current page.
    pub async fn create<D>(&self, draft: &D) -> ClientResult<T>
    where
        D: ResourceDraft<Target = T>,
    {
        draft.validate()?;
        let created = self.save.run(self.api.create(draft)).await?;
        if self.is_mounted() {
            if let Err(e) = self.refresh().await {
                warn!(kind = %T::KIND, error = %e, "Reload after create failed");
            }
        }
        Ok(created)
    }

    /// Validates and updates a row in place.
    pub async fn update<D>(&self, id: &str, draft: &D) -> ClientResult<T>
    where
        D: ResourceDraft<Target = T>,
    {
        draft.validate()?;
        let updated = self.save.run(self.api.update(id, draft)).await?;
        if self.is_mounted() {
            self.store.upsert(updated.clone());
        }
        Ok(updated)
    }

    /// Loads one row and marks it selected.
    pub async fn show(&self, id: &str) -> ClientResult<T> {
        let item = self.lookup.run(self.api.get::<T>(id)).await?;
        if self.is_mounted() {
            self.store.upsert(item.clone());
            self.store.select::<T>(Some(item.id().to_string()));
        }
        Ok(item)
    }

    pub fn select(&self, id: Option<String>) {
        self.store.select::<T>(id);
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Runs a search. A blank query leaves search mode and returns `None`.
    ///
    /// An empty result is `Some(vec![])`, which a view renders as
    /// "no results" rather than "not loaded".
    pub async fn search(&self, query: &str) -> ClientResult<Option<Vec<T>>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            self.clear_search();
            return Ok(None);
        }

        let seq = self.store.begin_fetch::<T>();
        let rows = self.search.run(self.api.search::<T>(&query)).await?;
        if self.is_mounted() {
            self.store.apply_search(seq, rows.clone());
        }
        Ok(Some(rows))
    }

    pub fn clear_search(&self) {
        self.search.reset();
        if self.is_mounted() {
            self.store.clear_search::<T>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::transport::mock::MockTransport;
    use crate::transport::HttpMethod;
    use serde_json::{json, Value};
    use std::time::Duration;
    use stockroom_core::contract::SupplierDraft;
    use stockroom_core::Supplier;

    fn rows(range: std::ops::Range<usize>) -> Vec<Value> {
        range
            .map(|n| json!({ "id": format!("s-{}", n), "name": format!("Supplier {}", n) }))
            .collect()
    }

    fn envelope(items: Vec<Value>, total: usize, page_one_based: usize) -> Value {
        json!({ "suppliers": {
            "items": items, "totalCount": total,
            "currentPage": page_one_based, "pageSize": 10
        }})
    }

    fn setup() -> (Arc<MockTransport>, Arc<ResourceStore>, ListingController<Supplier>) {
        let mock = Arc::new(MockTransport::new());
        let api = Arc::new(ApiClient::new(mock.clone()));
        let store = Arc::new(ResourceStore::new());
        let listing = ListingController::new(api, store.clone(), PageState::first(10).unwrap());
        (mock, store, listing)
    }

    fn page_queries(mock: &MockTransport) -> Vec<String> {
        mock.requests()
            .into_iter()
            .filter(|r| r.method == HttpMethod::Get && r.path() == "/suppliers")
            .map(|r| r.query[0].1.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_three_pages_and_delete_on_last_page_returns_to_first() {
        let (mock, store, listing) = setup();
        // page 3 (one-based) holds a single row, then the first page after delete
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(20..21), 21, 3));
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(0..10), 20, 1));
        mock.on(HttpMethod::Delete, "/suppliers/s-20", 200, "Supplier deleted successfully");

        listing.set_page(2).await.unwrap();
        assert_eq!(listing.page_state().page_count(21), 3);
        assert_eq!(store.listing::<Supplier>().unwrap().len(), 1);

        let message = listing.delete("s-20").await.unwrap();
        assert_eq!(message, "Supplier deleted successfully");
        assert_eq!(listing.page_state().page(), 0);
        assert_eq!(page_queries(&mock), vec!["3", "1"]);
        assert_eq!(store.listing::<Supplier>().unwrap().total_count(), 20);
    }

    #[tokio::test]
    async fn test_delete_off_page_follows_server_total_back_to_first() {
        let (mock, store, listing) = setup();
        // the deleted row sits on page 1; the server's refetch of page 3 is
        // empty because its total dropped to 20
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(20..21), 21, 3));
        mock.on(HttpMethod::Delete, "/suppliers/s-5", 200, "Supplier deleted successfully");

        listing.set_page(2).await.unwrap();
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(vec![], 20, 3));
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(0..10), 20, 1));
        listing.delete("s-5").await.unwrap();

        assert_eq!(listing.page_state().page(), 0);
        assert_eq!(page_queries(&mock), vec!["3", "3", "1"]);
        let page = store.listing::<Supplier>().unwrap();
        assert_eq!(page.page(), 0);
        assert_eq!(page.len(), 10);
        assert_eq!(page.total_count(), 20);
    }

    #[tokio::test]
    async fn test_page_past_the_end_rewinds() {
        let (mock, store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(vec![], 12, 99));
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(0..10), 12, 1));

        listing.set_page(98).await.unwrap();

        assert_eq!(listing.page_state().page(), 0);
        assert_eq!(page_queries(&mock), vec!["99", "1"]);
        assert_eq!(store.listing::<Supplier>().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_empty_first_page_is_kept() {
        let (mock, store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(vec![], 0, 1));

        listing.refresh().await.unwrap();
        assert_eq!(page_queries(&mock), vec!["1"]);
        assert!(store.listing::<Supplier>().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_show_tracks_its_own_state() {
        let (mock, store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers/s-3", 200, json!({ "id": "s-3", "name": "Northwind" }));

        let item = listing.show("s-3").await.unwrap();
        assert_eq!(item.id, "s-3");
        assert_eq!(listing.lookup_state().data.map(|s| s.id), Some("s-3".to_string()));
        assert_eq!(store.selected::<Supplier>().map(|s| s.id), Some("s-3".to_string()));
    }

    #[tokio::test]
    async fn test_delete_in_range_refetches_current_page() {
        let (mock, _store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(10..20), 25, 2));
        mock.on(HttpMethod::Delete, "/suppliers/s-12", 200, "\"Supplier deleted successfully\"");

        listing.set_page(1).await.unwrap();
        listing.delete("s-12").await.unwrap();

        assert_eq!(listing.page_state().page(), 1);
        assert_eq!(page_queries(&mock), vec!["2", "2"]);
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_view_untouched() {
        let (mock, store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(0..3), 3, 1));
        mock.on_json(HttpMethod::Delete, "/suppliers/s-1", 409, json!({ "error": "Supplier has open orders" }));

        listing.refresh().await.unwrap();
        let err = listing.delete("s-1").await.unwrap_err();
        assert_eq!(err.user_message(), "Supplier has open orders");
        assert_eq!(store.listing::<Supplier>().unwrap().len(), 3);
        assert_eq!(
            listing.remove_state().error.as_deref(),
            Some("Supplier has open orders")
        );
    }

    #[tokio::test]
    async fn test_page_size_change_rewinds_and_fetches() {
        let (mock, _store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(0..10), 40, 1));

        listing.set_page(3).await.unwrap();
        listing.set_page_size(25).await.unwrap();
        assert_eq!(listing.page_state().page(), 0);
        assert_eq!(listing.page_state().page_size(), 25);

        let last = mock.requests().pop().unwrap();
        assert_eq!(last.query[0], ("page".to_string(), "1".to_string()));
        assert_eq!(last.query[1], ("pageSize".to_string(), "25".to_string()));

        assert!(listing.set_page_size(0).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_fetch_error_without_data_shows_empty_page() {
        let (mock, store, listing) = setup();
        mock.on_unreachable(HttpMethod::Get, "/suppliers");

        assert!(matches!(
            listing.refresh().await.unwrap_err(),
            ClientError::Network(_)
        ));
        let page = store.listing::<Supplier>().unwrap();
        assert!(page.is_empty());
        assert!(listing.fetch_state().error.is_some());
    }

    #[tokio::test]
    async fn test_search_empty_result_is_some_empty() {
        let (mock, store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers/search", 200, json!([]));

        let found = listing.search("acme").await.unwrap();
        assert_eq!(found, Some(vec![]));
        assert_eq!(store.search_results::<Supplier>(), Some(vec![]));

        assert_eq!(listing.search("   ").await.unwrap(), None);
        assert_eq!(store.search_results::<Supplier>(), None);
    }

    #[tokio::test]
    async fn test_out_of_order_pages_keep_the_newest() {
        let (mock, store, listing) = setup();
        let listing = Arc::new(listing);
        mock.on_delayed(
            HttpMethod::Get,
            "/suppliers",
            Duration::from_millis(50),
            200,
            envelope(rows(0..10), 30, 1),
        );
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(10..20), 30, 2));

        let slow = {
            let l = listing.clone();
            tokio::spawn(async move { l.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        listing.set_page(1).await.unwrap();
        slow.await.unwrap().unwrap();

        let page = store.listing::<Supplier>().unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.items()[0].id, "s-10");
    }

    #[tokio::test]
    async fn test_unmounted_listing_ignores_completions() {
        let (mock, store, listing) = setup();
        let listing = Arc::new(listing);
        mock.on_delayed(
            HttpMethod::Get,
            "/suppliers",
            Duration::from_millis(30),
            200,
            envelope(rows(0..10), 10, 1),
        );

        let pending = {
            let l = listing.clone();
            tokio::spawn(async move { l.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        listing.unmount();
        pending.await.unwrap().unwrap();

        assert!(store.listing::<Supplier>().is_none());
    }

    #[tokio::test]
    async fn test_create_validates_before_sending() {
        let (mock, _store, listing) = setup();
        let err = listing
            .create(&SupplierDraft::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_next_and_prev() {
        let (mock, _store, listing) = setup();
        mock.on_json(HttpMethod::Get, "/suppliers", 200, envelope(rows(0..10), 15, 1));

        listing.refresh().await.unwrap();
        assert!(!listing.prev_page().await.unwrap());
        assert!(listing.next_page().await.unwrap());
        assert_eq!(listing.page_state().page(), 1);
        assert!(!listing.next_page().await.unwrap());
        assert!(listing.prev_page().await.unwrap());
        assert_eq!(listing.page_state().page(), 0);
    }
}
