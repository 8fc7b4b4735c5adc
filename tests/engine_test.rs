//! Integration tests for the bounded-concurrency task engine.

use mediaq::engine::{EngineConfig, TaskEngine};
use mediaq::error::Error;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    assert!(matches!(TaskEngine::new(0), Err(Error::Config(_))));
}

#[tokio::test]
async fn zero_queue_capacity_is_rejected() {
    let result = TaskEngine::with_config(EngineConfig {
        concurrency_limit: 2,
        queue_capacity: Some(0),
    });
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn smallest_queue_still_accepts_work_when_slots_are_free() {
    let engine = TaskEngine::with_config(EngineConfig {
        concurrency_limit: 2,
        queue_capacity: Some(1),
    })
    .unwrap();

    let first = engine.submit(|| async { Ok(1) }).unwrap();
    let second = engine.submit(|| async { Ok(2) }).unwrap();

    assert_eq!(first.await.unwrap(), 1);
    assert_eq!(second.await.unwrap(), 2);
}

#[test]
fn construction_outside_a_runtime_is_rejected() {
    assert!(matches!(TaskEngine::new(1), Err(Error::Config(_))));
}

// ---------------------------------------------------------------------------
// Concurrency cap
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_runs_more_than_the_limit() {
    let engine = TaskEngine::new(3).unwrap();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..24)
        .map(|i| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            engine
                .submit(move || async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                })
                .unwrap()
        })
        .collect();

    assert!(engine.in_flight() <= 3);

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), i);
    }

    let peak = peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "observed {peak} concurrent units");
    assert!(peak >= 1);
}

#[tokio::test]
async fn units_are_not_started_until_a_slot_frees() {
    let engine = TaskEngine::new(1).unwrap();
    let (release, gate) = oneshot::channel::<()>();
    let second_started = Arc::new(AtomicBool::new(false));

    let first = engine
        .submit(move || async move {
            let _ = gate.await;
            Ok(())
        })
        .unwrap();

    let flag = Arc::clone(&second_started);
    let second = engine
        .submit(move || {
            flag.store(true, Ordering::SeqCst);
            async { Ok(()) }
        })
        .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!second_started.load(Ordering::SeqCst));
    assert_eq!(engine.in_flight(), 1);
    assert_eq!(engine.queued(), 1);

    release.send(()).unwrap();
    first.await.unwrap();
    second.await.unwrap();
    assert!(second_started.load(Ordering::SeqCst));
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn queued_units_start_in_submission_order() {
    let engine = TaskEngine::new(1).unwrap();
    let (release, gate) = oneshot::channel::<()>();
    let order = Arc::new(Mutex::new(Vec::new()));

    let blocker = engine
        .submit(move || async move {
            let _ = gate.await;
            Ok(())
        })
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let order = Arc::clone(&order);
            engine
                .submit(move || async move {
                    order.lock().unwrap().push(i);
                    Ok(())
                })
                .unwrap()
        })
        .collect();

    release.send(()).unwrap();
    blocker.await.unwrap();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn completions_may_finish_out_of_submission_order() {
    let engine = TaskEngine::new(2).unwrap();
    let finished = Arc::new(Mutex::new(Vec::new()));

    let slow_log = Arc::clone(&finished);
    let slow = engine
        .submit(move || async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            slow_log.lock().unwrap().push("slow");
            Ok(())
        })
        .unwrap();
    let fast_log = Arc::clone(&finished);
    let fast = engine
        .submit(move || async move {
            fast_log.lock().unwrap().push("fast");
            Ok(())
        })
        .unwrap();

    fast.await.unwrap();
    slow.await.unwrap();
    assert_eq!(*finished.lock().unwrap(), vec!["fast", "slow"]);
}

// ---------------------------------------------------------------------------
// Result delivery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failures_are_delivered_and_not_retried() {
    let engine = TaskEngine::new(1).unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let failed = engine
        .submit(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Error::Other("boom".to_string()))
        })
        .unwrap();
    let after = engine.submit(|| async { Ok("still running") }).unwrap();

    match failed.await {
        Err(Error::Other(msg)) => assert_eq!(msg, "boom"),
        other => panic!("expected Other error, got {other:?}"),
    }
    assert_eq!(after.await.unwrap(), "still running");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_unit_aborts_its_handle_and_frees_the_slot() {
    let engine = TaskEngine::new(1).unwrap();

    let doomed = engine
        .submit(|| async {
            if true {
                panic!("unit blew up");
            }
            Ok(())
        })
        .unwrap();
    let next = engine.submit(|| async { Ok(7) }).unwrap();

    assert!(matches!(doomed.await, Err(Error::TaskAborted)));
    assert_eq!(next.await.unwrap(), 7);
}

#[tokio::test]
async fn detached_units_still_run() {
    let engine = TaskEngine::new(1).unwrap();
    let done = Arc::new(Notify::new());

    let signal = Arc::clone(&done);
    engine
        .submit(move || async move {
            signal.notify_one();
            Ok(())
        })
        .unwrap()
        .detach();

    tokio::time::timeout(Duration::from_secs(1), done.notified())
        .await
        .expect("detached unit never ran");
}

// ---------------------------------------------------------------------------
// Bounded queue
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_queue_rejects_submission() {
    let engine = TaskEngine::with_config(EngineConfig {
        concurrency_limit: 1,
        queue_capacity: Some(1),
    })
    .unwrap();
    let (release, gate) = oneshot::channel::<()>();

    // Dequeued immediately into the only slot.
    let running = engine
        .submit(move || async move {
            let _ = gate.await;
            Ok(())
        })
        .unwrap();
    // Fills the queue.
    let waiting = engine.submit(|| async { Ok(()) }).unwrap();

    match engine.submit(|| async { Ok(()) }) {
        Err(Error::QueueFull { capacity }) => assert_eq!(capacity, 1),
        Err(other) => panic!("expected QueueFull, got {other:?}"),
        Ok(_) => panic!("expected QueueFull, got a handle"),
    }

    release.send(()).unwrap();
    running.await.unwrap();
    waiting.await.unwrap();
    assert_eq!(engine.queued(), 0);
}
