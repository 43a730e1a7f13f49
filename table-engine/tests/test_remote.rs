//! FILENAME: tests/test_remote.rs
//! Integration tests for server-delegated sorting, filtering and paging.

mod common;

use common::{PeopleFixture, TestHarness};
use engine::{FilterMode, LoadOutcome, Row, SortDirection, SortSpec};
use table_engine::{
    LoadError, PageRequest, PageResponse, PageTicket, RefreshAction, ServerCapabilities, TableOptions,
};

fn server(pagination: bool, sorting: bool, filtering: bool) -> TableOptions {
    TableOptions::default().with_server(ServerCapabilities {
        pagination,
        sorting,
        filtering,
    })
}

fn remote_harness(options: TableOptions) -> TestHarness {
    TestHarness::new(PeopleFixture::columns(), Vec::new(), options)
}

fn ticket(action: RefreshAction) -> PageTicket {
    match action {
        RefreshAction::Remote(ticket) => ticket,
        other => panic!("expected a remote load, got {:?}", other),
    }
}

fn page_of(names: &[&str]) -> Vec<Row> {
    names.iter().map(|name| Row::new().with("name", *name)).collect()
}

// ============================================================================
// PAGINATION
// ============================================================================

#[test]
fn test_init_requests_first_page() {
    let mut harness = remote_harness(server(true, false, false));
    let ticket = ticket(harness.table.init());
    assert_eq!(
        ticket.request,
        PageRequest {
            page: 1,
            page_size: 10,
            sort_key: None,
            sort_direction: SortDirection::Asc,
            filter_text: String::new(),
            filter_mode: FilterMode::Plain,
        }
    );
    assert!(harness.table.is_loading());
    assert!(harness.table.view().loading);
}

#[test]
fn test_server_page_is_not_sliced_again() {
    let mut harness = remote_harness(server(true, false, false));
    let first = ticket(harness.table.init());

    let rows: Vec<Row> = (0..10).map(|n| Row::new().with("n", n as f64)).collect();
    let outcome = harness.table.complete_page_load(&first, Ok(PageResponse::new(rows, 42)));
    assert_eq!(outcome, LoadOutcome::Applied);

    let view = harness.table.view();
    assert_eq!(view.rows().len(), 10);
    assert_eq!(view.window.total_count, 42);
    assert_eq!(view.window.total_pages, 5);
    assert!(!view.loading);

    // Server rows get ids from zero.
    assert_eq!(harness.table.data()[0].id, Some(0));
}

#[test]
fn test_page_change_carries_parameters() {
    let mut harness = remote_harness(server(true, true, false));
    let first = ticket(harness.table.init());
    harness.table.complete_page_load(&first, Ok(PageResponse::new(page_of(&["a"]), 30)));

    harness.table.set_sort(Some(SortSpec::desc("name")));
    let sorted = ticket(harness.table.set_page(3));
    assert_eq!(sorted.request.page, 3);
    assert_eq!(sorted.request.sort_key.as_deref(), Some("name"));
    assert_eq!(sorted.request.sort_direction, SortDirection::Desc);

    harness.table.complete_page_load(&sorted, Ok(PageResponse::new(page_of(&["x", "y"]), 30)));
    assert_eq!(harness.table.state().page, 3);
    assert_eq!(harness.page_texts("name"), vec!["x", "y"]);
}

#[test]
fn test_missing_total_uses_row_count() {
    let mut harness = remote_harness(server(true, false, false));
    let first = ticket(harness.table.init());
    let response = PageResponse {
        rows: page_of(&["a", "b", "c"]),
        total: None,
    };
    harness.table.complete_page_load(&first, Ok(response));
    assert_eq!(harness.table.view().window.total_count, 3);
}

#[test]
fn test_failed_load_keeps_previous_total() {
    let mut harness = remote_harness(server(true, false, false));
    let first = ticket(harness.table.init());
    harness.table.complete_page_load(&first, Ok(PageResponse::new(page_of(&["a", "b"]), 25)));

    let next = ticket(harness.table.set_page(2));
    let outcome = harness.table.complete_page_load(&next, Err(LoadError::from("timeout")));
    assert_eq!(outcome, LoadOutcome::Applied);

    let view = harness.table.view();
    assert!(view.is_empty());
    assert_eq!(view.window.total_count, 25);
    assert!(!view.loading);
}

// ============================================================================
// OVERLAPPING LOADS
// ============================================================================

#[test]
fn test_superseded_load_is_discarded() {
    let mut harness = remote_harness(server(true, true, true));
    let first = ticket(harness.table.init());
    let second = ticket(harness.table.set_filter("ben", None));
    assert_eq!(second.request.filter_text, "ben");

    // The newer load finishes first; the older one must not overwrite it.
    harness.table.complete_page_load(&second, Ok(PageResponse::new(page_of(&["Ben"]), 1)));
    let late = harness.table.complete_page_load(&first, Ok(PageResponse::new(page_of(&["Anna", "Ben"]), 2)));
    assert_eq!(late, LoadOutcome::Stale);
    assert_eq!(harness.page_texts("name"), vec!["Ben"]);
}

#[test]
fn test_replaced_data_outlives_older_page_load() {
    let mut harness = remote_harness(server(false, true, false));
    let pending = ticket(harness.table.init());

    harness.table.set_data(page_of(&["fresh"]));
    assert!(!harness.table.is_loading());

    let late = harness.table.complete_page_load(&pending, Ok(PageResponse::new(page_of(&["late"]), 1)));
    assert_eq!(late, LoadOutcome::Stale);
    assert_eq!(harness.page_texts("name"), vec!["fresh"]);
}

#[test]
fn test_identical_request_is_pending() {
    let mut harness = remote_harness(server(true, false, false));
    let _first = ticket(harness.table.init());
    assert_eq!(harness.table.init(), RefreshAction::Pending);
}

#[test]
fn test_filter_and_sort_reset_to_first_page() {
    let mut harness = remote_harness(server(true, true, true));
    let first = ticket(harness.table.init());
    harness.table.complete_page_load(&first, Ok(PageResponse::new(page_of(&["a"]), 50)));
    let paged = ticket(harness.table.set_page(4));
    harness.table.complete_page_load(&paged, Ok(PageResponse::new(page_of(&["d"]), 50)));

    let sorted = ticket(harness.table.set_sort(Some(SortSpec::asc("name"))));
    assert_eq!(sorted.request.page, 1);
    harness.table.complete_page_load(&sorted, Ok(PageResponse::new(page_of(&["a"]), 50)));

    harness.table.set_page(4);
    let filtered = ticket(harness.table.set_filter("a", Some(FilterMode::Regex)));
    assert_eq!(filtered.request.page, 1);
    assert_eq!(filtered.request.filter_mode, FilterMode::Regex);
}

// ============================================================================
// PARTIAL SERVER CAPABILITIES
// ============================================================================

#[test]
fn test_server_sorting_skips_local_sort() {
    let mut harness = remote_harness(server(false, true, false));
    let first = ticket(harness.table.init());
    harness.table.complete_page_load(&first, Ok(PageResponse::new(page_of(&["b", "c", "a"]), 3)));

    let resort = ticket(harness.table.set_sort(Some(SortSpec::asc("name"))));
    harness.table.complete_page_load(&resort, Ok(PageResponse::new(page_of(&["c", "a", "b"]), 3)));
    assert_eq!(harness.page_texts("name"), vec!["c", "a", "b"]);

    // Paging and filtering stay local.
    assert_eq!(harness.table.set_page(1), RefreshAction::Local);
    assert_eq!(harness.table.set_filter("a", None), RefreshAction::Local);
    assert_eq!(harness.page_texts("name"), vec!["a"]);
}

#[test]
fn test_server_filtering_skips_local_filter() {
    let mut harness = remote_harness(server(false, false, true));
    let first = ticket(harness.table.set_filter("zzz", None));
    harness.table.complete_page_load(&first, Ok(PageResponse::new(page_of(&["kept"]), 1)));
    assert_eq!(harness.page_texts("name"), vec!["kept"]);
    assert_eq!(harness.table.set_sort(Some(SortSpec::asc("name"))), RefreshAction::Local);
}

#[test]
fn test_local_table_never_fetches() {
    let mut harness = TestHarness::with_people();
    assert_eq!(harness.table.init(), RefreshAction::Local);
    assert_eq!(harness.table.set_page(2), RefreshAction::Local);
    assert!(!harness.table.is_loading());
}

#[tokio::test]
async fn test_run_remote_with_closure_loader() {
    let mut harness = remote_harness(server(true, false, false));
    let loader = |request: &PageRequest| {
        let page = request.page;
        async move {
            let rows = vec![Row::new().with("name", format!("row-{}", page))];
            Ok::<_, LoadError>(PageResponse::new(rows, 25))
        }
    };

    let action = harness.table.init();
    assert_eq!(harness.table.run_remote(action, &loader).await, Some(LoadOutcome::Applied));
    assert_eq!(harness.page_texts("name"), vec!["row-1"]);

    let action = harness.table.set_page(3);
    harness.table.run_remote(action, &loader).await;
    assert_eq!(harness.page_texts("name"), vec!["row-3"]);
    assert_eq!(harness.table.view().window.page, 3);

    assert_eq!(harness.table.run_remote(RefreshAction::Local, &loader).await, None);
}
