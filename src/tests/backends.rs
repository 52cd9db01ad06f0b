use core::ops::ControlFlow;
use std::thread;
use std::time::Duration;

use handoff_core::{AddError, BlockingQueue};
use parking_lot::Mutex;

use crate::backend::{Bag, Channel, Polled, Pool, Segmented, Sharded};
use crate::{Backend, BackendKind, ParseBackendError, Retrieval, Retrieved};

/// Drain a completed backend, panicking if it ever reports `Empty`.
fn drain<B: Backend<u32> + ?Sized>(backend: &B) -> Vec<u32> {
    let mut items = Vec::new();
    loop {
        match backend.retrieve() {
            Retrieved::Item(item) => items.push(item),
            Retrieved::Empty => panic!("{} reported empty after completion", backend.name()),
            Retrieved::Finished => return items,
        }
    }
}

#[test]
fn every_kind_rejects_pushes_after_complete() {
    for kind in BackendKind::ALL {
        let backend = kind.build::<u32>();
        backend.push(1).unwrap();
        backend.push(2).unwrap();
        backend.complete();

        assert_eq!(backend.push(3), Err(AddError::Closed(3)), "{kind}");

        let mut items = drain(backend.as_ref());
        items.sort_unstable();
        assert_eq!(items, vec![1, 2], "{kind}");
        assert_eq!(backend.retrieve(), Retrieved::Finished, "{kind}");
    }
}

#[test]
fn complete_is_idempotent() {
    for kind in BackendKind::ALL {
        let backend = kind.build::<u32>();
        backend.complete();
        backend.complete();
        assert_eq!(backend.retrieve(), Retrieved::Finished, "{kind}");
    }
}

#[test]
fn names_and_retrieval_modes() {
    let expected = [
        ("locked", Retrieval::Blocking),
        ("locked-poll", Retrieval::Polling),
        ("segqueue", Retrieval::Polling),
        ("unbounded", Retrieval::Stream),
        ("bounded", Retrieval::Blocking),
        ("sharded", Retrieval::Polling),
        ("bag", Retrieval::Polling),
        ("pool", Retrieval::Dispatch),
    ];
    for (kind, (name, retrieval)) in BackendKind::ALL.into_iter().zip(expected) {
        let backend = kind.build::<u32>();
        assert_eq!(backend.name(), name);
        assert_eq!(backend.retrieval(), retrieval, "{kind}");
    }
}

#[test]
fn polling_backends_report_empty_while_open() {
    let polled = Polled::new();
    assert_eq!(Backend::<u32>::retrieve(&polled), Retrieved::Empty);

    let segmented = Segmented::new();
    assert_eq!(Backend::<u32>::retrieve(&segmented), Retrieved::Empty);

    let sharded = Sharded::with_timeout(2, Duration::from_millis(5));
    assert_eq!(Backend::<u32>::retrieve(&sharded), Retrieved::Empty);

    let bag = Bag::new(3);
    assert_eq!(Backend::<u32>::retrieve(&bag), Retrieved::Empty);
}

#[test]
fn polled_shares_the_blocking_queue() {
    let polled = Polled::new();
    polled.push(4).unwrap();
    assert_eq!(polled.queue().len(), 1);

    polled.complete();
    assert!(polled.queue().is_closed());
    assert_eq!(polled.retrieve(), Retrieved::Item(4));
    assert_eq!(polled.retrieve(), Retrieved::Finished);
}

#[test]
fn blocking_retrieve_wakes_on_complete() {
    let queue: BlockingQueue<u32> = BlockingQueue::new();

    thread::scope(|s| {
        let waiter = s.spawn(|| queue.retrieve());
        thread::sleep(Duration::from_millis(20));
        queue.complete();
        assert_eq!(waiter.join().unwrap(), Retrieved::Finished);
    });
}

#[test]
fn segmented_keeps_fifo_order() {
    let queue = Segmented::new();
    for i in 0..100 {
        queue.push(i).unwrap();
    }
    assert_eq!(queue.len(), 100);
    queue.complete();

    assert_eq!(drain(&queue), (0..100).collect::<Vec<_>>());
    assert!(queue.is_empty());
}

#[test]
fn segmented_never_finishes_before_accepted_items() {
    let queue = Segmented::new();

    let (accepted, received) = thread::scope(|s| {
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let queue = &queue;
                s.spawn(move || {
                    (0..1000)
                        .filter(|i| queue.push(p * 1000 + i).is_ok())
                        .count()
                })
            })
            .collect();
        let consumer = s.spawn(|| {
            let mut received = 0;
            loop {
                match queue.retrieve() {
                    Retrieved::Item(_) => received += 1,
                    Retrieved::Empty => thread::yield_now(),
                    Retrieved::Finished => return received,
                }
            }
        });

        thread::sleep(Duration::from_millis(1));
        queue.complete();

        let accepted: usize = producers.into_iter().map(|h| h.join().unwrap()).sum();
        (accepted, consumer.join().unwrap())
    });

    assert_eq!(accepted, received);
}

#[test]
fn bounded_channel_applies_backpressure() {
    let channel = Channel::bounded(2);
    assert_eq!(channel.capacity(), Some(2));
    channel.push(1).unwrap();
    channel.push(2).unwrap();

    thread::scope(|s| {
        let producer = s.spawn(|| channel.push(3));
        thread::sleep(Duration::from_millis(20));
        assert!(!producer.is_finished());
        assert_eq!(channel.len(), 2);

        assert_eq!(channel.retrieve(), Retrieved::Item(1));
        assert_eq!(producer.join().unwrap(), Ok(()));
    });

    assert_eq!(channel.retrieve(), Retrieved::Item(2));
    assert_eq!(channel.retrieve(), Retrieved::Item(3));
}

#[test]
fn producer_blocked_on_full_channel_is_released_by_complete() {
    let channel = Channel::bounded(1);
    channel.push(1).unwrap();

    thread::scope(|s| {
        let producer = s.spawn(|| channel.push(2));
        thread::sleep(Duration::from_millis(20));
        channel.complete();
        assert_eq!(producer.join().unwrap(), Err(AddError::Closed(2)));
    });

    assert_eq!(drain(&channel), vec![1]);
}

#[test]
fn unbounded_channel_streams_until_complete() {
    let channel = Channel::unbounded();
    assert_eq!(channel.capacity(), None);

    thread::scope(|s| {
        let consumer = s.spawn(|| drain(&channel));
        for i in 0..50 {
            channel.push(i).unwrap();
        }
        channel.complete();
        assert_eq!(consumer.join().unwrap(), (0..50).collect::<Vec<_>>());
    });
    assert!(channel.is_empty());
}

#[test]
fn sharded_spreads_items_round_robin() {
    let sharded = Sharded::with_timeout(3, Duration::from_millis(5));
    assert_eq!(sharded.shards(), 3);
    for i in 0..9 {
        sharded.push(i).unwrap();
    }
    assert_eq!(sharded.len(), 9);
    sharded.complete();

    let mut items = drain(&sharded);
    items.sort_unstable();
    assert_eq!(items, (0..9).collect::<Vec<_>>());
    assert!(sharded.is_empty());
}

#[test]
fn sharded_clamps_to_one_shard() {
    let sharded: Sharded<u32> = Sharded::new(0);
    assert_eq!(sharded.shards(), 1);
}

#[test]
fn backend_kind_round_trips_through_strings() {
    for kind in BackendKind::ALL {
        assert_eq!(kind.to_string().parse::<BackendKind>(), Ok(kind));
    }
    assert_eq!(
        "bounded:16".parse::<BackendKind>(),
        Ok(BackendKind::Bounded { capacity: 16 })
    );
    assert_eq!(
        "sharded:8".parse::<BackendKind>(),
        Ok(BackendKind::Sharded { shards: 8 })
    );
    assert_eq!("bag:3".parse::<BackendKind>(), Ok(BackendKind::Bag { slots: 3 }));
    assert_eq!("pool".parse::<BackendKind>(), Ok(BackendKind::Pool));
}

#[test]
fn backend_kind_rejects_bad_input() {
    for input in ["", "queue", "locked:2", "bounded", "sharded:", "bag", "pool:2"] {
        let err = input.parse::<BackendKind>().unwrap_err();
        assert!(
            matches!(err, ParseBackendError::Unknown { .. } | ParseBackendError::Parameter { .. }),
            "{input}: {err}"
        );
    }

    assert!(matches!(
        "bounded:x".parse::<BackendKind>(),
        Err(ParseBackendError::Parameter { .. })
    ));
    assert!(matches!(
        "sharded:0".parse::<BackendKind>(),
        Err(ParseBackendError::Zero { .. })
    ));
    assert!(matches!(
        "locked:2".parse::<BackendKind>(),
        Err(ParseBackendError::Unknown { .. })
    ));
}

#[test]
fn bag_slot_hands_out_newest_first() {
    let bag = Bag::new(1);
    for i in 0..5 {
        bag.push(i).unwrap();
    }
    assert_eq!(bag.len(), 5);
    bag.complete();

    assert_eq!(drain(&bag), vec![4, 3, 2, 1, 0]);
    assert!(bag.is_empty());
}

#[test]
fn bag_spreads_items_over_slots() {
    let bag = Bag::new(4);
    assert_eq!(bag.slots(), 4);
    for i in 0..40 {
        bag.push(i).unwrap();
    }
    bag.complete();

    let mut items = drain(&bag);
    items.sort_unstable();
    assert_eq!(items, (0..40).collect::<Vec<_>>());
    assert_eq!(Bag::<u32>::new(0).slots(), 1);
}

#[test]
fn bag_never_finishes_before_accepted_items() {
    let bag = Bag::new(3);

    let (accepted, received) = thread::scope(|s| {
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let bag = &bag;
                s.spawn(move || (0..1000).filter(|i| bag.push(p * 1000 + i).is_ok()).count())
            })
            .collect();
        let consumer = s.spawn(|| {
            let mut received = 0;
            loop {
                match bag.retrieve() {
                    Retrieved::Item(_) => received += 1,
                    Retrieved::Empty => thread::yield_now(),
                    Retrieved::Finished => return received,
                }
            }
        });

        thread::sleep(Duration::from_millis(1));
        bag.complete();

        let accepted: usize = producers.into_iter().map(|h| h.join().unwrap()).sum();
        (accepted, consumer.join().unwrap())
    });

    assert_eq!(accepted, received);
}

#[test]
fn pool_dispatch_feeds_every_item_to_one_worker() {
    let pool = Pool::new();
    let handled = Mutex::new(Vec::new());
    let handler = |worker: usize, item: u32| -> ControlFlow<()> {
        handled.lock().push((worker, item));
        ControlFlow::Continue(())
    };

    let counts: Vec<usize> = thread::scope(|s| {
        let workers: Vec<_> = pool
            .dispatch(s, 3, &handler)
            .into_iter()
            .map(|spawned| spawned.unwrap())
            .collect();

        for i in 0..300 {
            pool.push(i).unwrap();
        }
        pool.complete();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(counts.len(), 3);
    assert_eq!(counts.iter().sum::<usize>(), 300);

    let handled = handled.into_inner();
    assert!(handled.iter().all(|&(worker, _)| worker < 3));
    let mut items: Vec<_> = handled.into_iter().map(|(_, item)| item).collect();
    items.sort_unstable();
    assert_eq!(items, (0..300).collect::<Vec<_>>());
    assert!(pool.is_empty());
}

#[test]
fn pool_worker_stops_when_handler_breaks() {
    let pool = Pool::new();
    for i in 0..10 {
        pool.push(i).unwrap();
    }

    let handler = |_: usize, item: u32| -> ControlFlow<()> {
        if item == 3 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    };

    let handled = thread::scope(|s| {
        let worker = pool.dispatch(s, 1, &handler).pop().unwrap().unwrap();
        worker.join().unwrap()
    });

    assert_eq!(handled, 3);
    assert_eq!(pool.len(), 6);
}

#[test]
fn non_dispatching_backends_start_no_workers() {
    let queue: BlockingQueue<u32> = BlockingQueue::new();
    let handler = |_: usize, _: u32| -> ControlFlow<()> { ControlFlow::Continue(()) };
    thread::scope(|s| assert!(queue.dispatch(s, 4, &handler).is_empty()));
}
