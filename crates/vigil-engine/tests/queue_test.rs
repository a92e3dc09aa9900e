//! Backpressure and capacity behavior of the work queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use vigil_core::traits::RunToken;
use vigil_engine::pipeline::{Popped, WorkQueue};
use vigil_engine::unit::MemoryCorpus;

#[test]
fn test_producer_blocks_until_consumer_drains() {
    let corpus = MemoryCorpus::with_documents((0..5).map(|i| (format!("u{i}"), "x")));
    let units: Vec<_> = (0..5)
        .map(|i| corpus.get(std::path::Path::new(&format!("u{i}"))).unwrap())
        .collect();
    let queue = Arc::new(WorkQueue::new(1, Duration::from_millis(1)));
    let pushed = Arc::new(AtomicUsize::new(0));
    let token = RunToken::new();

    let producer = {
        let queue = Arc::clone(&queue);
        let pushed = Arc::clone(&pushed);
        let token = token.clone();
        thread::spawn(move || {
            for unit in units {
                queue.push(unit, &token).unwrap();
                pushed.fetch_add(1, Ordering::SeqCst);
            }
            queue.push_sentinel().unwrap();
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert_eq!(pushed.load(Ordering::SeqCst), 1, "second push must block on a full queue");
    assert!(queue.len() <= queue.capacity());

    let mut received = Vec::new();
    loop {
        assert!(queue.len() <= queue.capacity());
        match queue.pop(&token).unwrap() {
            Popped::Unit(unit) => received.push(unit.name().to_string()),
            Popped::Exhausted => break,
        }
    }
    producer.join().unwrap();
    assert_eq!(received, vec!["u0", "u1", "u2", "u3", "u4"]);
    assert!(queue.sentinel_sent());
    assert!(queue.sentinel_consumed());
}

#[test]
fn test_blocked_push_observes_cancellation() {
    let corpus = MemoryCorpus::new();
    let queue = Arc::new(WorkQueue::new(1, Duration::from_millis(1)));
    let token = RunToken::new();
    queue.push(corpus.insert("a", "x"), &token).unwrap();

    let blocked = {
        let queue = Arc::clone(&queue);
        let token = token.clone();
        let unit = corpus.insert("b", "x");
        thread::spawn(move || queue.push(unit, &token))
    };
    thread::sleep(Duration::from_millis(20));
    vigil_core::traits::Cancellable::cancel(&token);
    assert!(blocked.join().unwrap().is_err());
    assert_eq!(queue.len(), 1);
}

#[test]
fn test_many_consumers_see_exhaustion_once_sentinel_is_consumed() {
    let corpus = MemoryCorpus::new();
    let queue = Arc::new(WorkQueue::new(8, Duration::from_millis(1)));
    let token = RunToken::new();
    for i in 0..6 {
        queue.push(corpus.insert(format!("u{i}"), "x"), &token).unwrap();
    }
    queue.push_sentinel().unwrap();

    let total = Arc::new(AtomicUsize::new(0));
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let total = Arc::clone(&total);
            let token = token.clone();
            thread::spawn(move || loop {
                match queue.pop(&token).unwrap() {
                    Popped::Unit(_) => {
                        total.fetch_add(1, Ordering::SeqCst);
                    }
                    Popped::Exhausted => break,
                }
            })
        })
        .collect();
    for consumer in consumers {
        consumer.join().unwrap();
    }
    assert_eq!(total.load(Ordering::SeqCst), 6);
}
