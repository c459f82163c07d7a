/// Parallel Scan Tests
///
/// Tests segment coordination, fairness between segments and resuming a
/// parallel scan from a scan state snapshot.
use aws_sdk_dynamodb::error::BuildError;
use dynamo_mapper::backend::ScanRequest;
use dynamo_mapper::paginate::{Paginator, ParallelScanPaginator, ScanState};
use dynamo_mapper::{AttributeMap, Error};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

mod helpers;
use helpers::*;

fn segments(sizes: &[usize]) -> Vec<Vec<AttributeMap>> {
    sizes
        .iter()
        .enumerate()
        .map(|(segment, &size)| {
            (0..size)
                .map(|i| item(&format!("{segment}-{i}"), i))
                .collect()
        })
        .collect()
}

fn segmented(sizes: &[usize]) -> MockBackend {
    let segments = segments(sizes);
    MockBackend::new().on_scan(move |request| {
        assert_eq!(request.total_segments, Some(segments.len() as i32));
        let segment = request.segment.expect("segment is set") as usize;
        Reply::ok(paged(
            &segments[segment],
            request.exclusive_start_key.as_ref(),
            request.limit,
        ))
    })
}

fn scan_request() -> ScanRequest {
    ScanRequest {
        table_name: "snap".to_string(),
        limit: Some(2),
        ..Default::default()
    }
}

fn segment_of(id: &str) -> usize {
    id.split('-').next().unwrap().parse().unwrap()
}

async fn drain(paginator: &mut ParallelScanPaginator<MockBackend>) -> Vec<String> {
    let mut ids = Vec::new();
    while let Some(page) = paginator.next_page().await {
        ids.extend(helpers::ids(&page.expect("page should succeed")));
    }
    ids
}

/// Test that every segment is scanned to its end
#[tokio::test]
async fn test_parallel_scan_covers_every_segment() {
    let backend = Arc::new(segmented(&[5, 0, 7]));
    let mut paginator = ParallelScanPaginator::new(Arc::clone(&backend), scan_request(), 3);

    let ids = drain(&mut paginator).await;
    let unique: BTreeSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), 12);
    assert_eq!(unique.len(), 12);
    assert_eq!(paginator.count(), 12);

    assert!(paginator.scan_state().iter().all(ScanState::is_exhausted));
    assert!(paginator.next_page().await.is_none());
}

/// Test that segments take turns when several have pages ready
#[tokio::test]
async fn test_segments_take_turns() {
    let backend = Arc::new(segmented(&[6, 6]));
    let mut paginator = ParallelScanPaginator::new(Arc::clone(&backend), scan_request(), 2);

    let mut order = Vec::new();
    while let Some(page) = paginator.next_page().await {
        let page = page.unwrap();
        order.push(segment_of(&id_of(&page.items[0])));
    }
    assert_eq!(order, vec![0, 1, 0, 1, 0, 1]);
}

/// Test that a slow segment still gets all of its items out while others race ahead
#[tokio::test(start_paused = true)]
async fn test_delayed_segment_is_not_starved() {
    let items = segments(&[10, 10]);
    let backend = Arc::new(MockBackend::new().on_scan(move |request| {
        let segment = request.segment.unwrap() as usize;
        let reply = Reply::ok(paged(
            &items[segment],
            request.exclusive_start_key.as_ref(),
            request.limit,
        ));
        if segment == 1 {
            reply.after(Duration::from_millis(500))
        } else {
            reply
        }
    }));
    let request = ScanRequest {
        limit: Some(1),
        ..scan_request()
    };
    let mut paginator = ParallelScanPaginator::new(Arc::clone(&backend), request, 2);

    let ids = drain(&mut paginator).await;
    let unique: BTreeSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), 20);
    assert_eq!(unique.len(), 20);
    for i in 0..10 {
        assert!(unique.contains(&format!("1-{i}")), "missing 1-{i}");
    }
    assert!(paginator.scan_state().iter().all(ScanState::is_exhausted));
}

/// Test that a resumed scan skips finished segments and continues the others
#[tokio::test]
async fn test_resume_from_scan_state() {
    let backend = Arc::new(segmented(&[4, 4, 4]));
    let scan_state = vec![
        ScanState::Initialized {
            last_evaluated_key: None,
        },
        ScanState::Initialized {
            last_evaluated_key: Some(key("1-1")),
        },
        ScanState::Uninitialized,
    ];
    let mut paginator =
        ParallelScanPaginator::resume(Arc::clone(&backend), scan_request(), 3, scan_state)
            .expect("state matches segment count");

    let ids: BTreeSet<String> = drain(&mut paginator).await.into_iter().collect();
    let expected: BTreeSet<String> = ["1-2", "1-3", "2-0", "2-1", "2-2", "2-3"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(ids, expected);

    let requests: Vec<ScanRequest> = backend
        .calls()
        .into_iter()
        .map(|call| match call.request {
            Request::Scan(request) => request,
            other => panic!("unexpected request {other:?}"),
        })
        .collect();
    assert!(requests.iter().all(|request| request.segment != Some(0)));
    let first_of_segment_1 = requests
        .iter()
        .find(|request| request.segment == Some(1))
        .unwrap();
    assert_eq!(first_of_segment_1.exclusive_start_key, Some(key("1-1")));
}

/// Test that a snapshot taken mid-scan resumes without losing or repeating items
#[tokio::test]
async fn test_snapshot_resumes_where_it_left_off() {
    let backend = Arc::new(segmented(&[5, 3]));
    let mut paginator = ParallelScanPaginator::new(Arc::clone(&backend), scan_request(), 2);

    let first = paginator.next_page().await.unwrap().unwrap();
    let snapshot = paginator.scan_state();
    assert_eq!(
        snapshot,
        vec![
            ScanState::Initialized {
                last_evaluated_key: Some(key("0-1")),
            },
            ScanState::Uninitialized,
        ]
    );
    paginator.close();

    let mut resumed =
        ParallelScanPaginator::resume(Arc::clone(&backend), scan_request(), 2, snapshot).unwrap();
    let mut ids = helpers::ids(&first);
    ids.extend(drain(&mut resumed).await);
    ids.sort();
    assert_eq!(ids, vec!["0-0", "0-1", "0-2", "0-3", "0-4", "1-0", "1-1", "1-2"]);
}

/// Test that a snapshot must hold one entry per segment
#[tokio::test]
async fn test_scan_state_length_must_match_segments() {
    let backend = Arc::new(segmented(&[1, 1, 1]));
    let result = ParallelScanPaginator::resume(
        Arc::clone(&backend),
        scan_request(),
        3,
        vec![ScanState::Uninitialized; 2],
    );

    let Err(err) = result else {
        panic!("a short scan state is rejected");
    };
    assert!(matches!(
        err,
        Error::InvalidScanState {
            expected: 3,
            actual: 2
        }
    ));
    assert!(backend.calls().is_empty());
}

/// Test that a failing segment ends the whole scan
#[tokio::test]
async fn test_failed_segment_ends_scan() {
    let items = segments(&[6, 6]);
    let backend = Arc::new(MockBackend::new().on_scan(move |request| {
        let segment = request.segment.unwrap() as usize;
        if segment == 1 {
            return Reply::err(Error::BuildError(BuildError::other("service unavailable")));
        }
        Reply::ok(paged(
            &items[segment],
            request.exclusive_start_key.as_ref(),
            request.limit,
        ))
    }));
    let mut paginator = ParallelScanPaginator::new(Arc::clone(&backend), scan_request(), 2);

    let mut errors = 0;
    let mut pages = 0;
    while let Some(page) = paginator.next_page().await {
        match page {
            Ok(_) => pages += 1,
            Err(err) => {
                assert!(err.is_dynamodb_error());
                errors += 1;
            }
        }
    }
    assert_eq!(errors, 1);
    assert_eq!(pages, 1);
    assert!(paginator.next_page().await.is_none());
}

/// Test that a closed parallel scan is interrupted
#[tokio::test]
async fn test_closed_parallel_scan_is_interrupted() {
    let backend = Arc::new(segmented(&[4, 4]));
    let mut paginator = ParallelScanPaginator::new(Arc::clone(&backend), scan_request(), 2);

    let _ = paginator.next_page().await.unwrap().unwrap();
    paginator.close();
    assert!(matches!(
        paginator.next_page().await,
        Some(Err(Error::IterationInterrupted))
    ));
}
