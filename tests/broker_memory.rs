// tests/broker_memory.rs

use std::time::Duration;

use cmdpipe::broker::{Broker, ConsumeOptions, MemoryBroker, QueueStats, queue_name};
use cmdpipe_test_utils::{init_tracing, with_timeout};

fn options(prefetch: usize) -> ConsumeOptions {
    ConsumeOptions::new(prefetch, Duration::from_millis(5))
}

#[test]
fn queues_are_named_per_command() {
    assert_eq!(queue_name("echo"), "command:echo");
}

#[tokio::test]
async fn publish_then_consume_in_order() {
    init_tracing();
    let broker = MemoryBroker::new();
    let queue = broker.open_queue("command:echo").await.unwrap();
    assert_eq!(queue.name(), "command:echo");

    queue.publish(b"one".to_vec()).await.unwrap();
    queue.publish(b"two".to_vec()).await.unwrap();

    let mut consumer = queue.consume(options(10)).await.unwrap();
    let first = with_timeout(consumer.next()).await.unwrap();
    let second = with_timeout(consumer.next()).await.unwrap();

    assert_eq!(first.payload(), b"one");
    assert_eq!(second.payload(), b"two");
    assert_eq!(broker.stats("command:echo").unacked, 2);

    first.ack().await.unwrap();
    second.reject().await.unwrap();

    assert_eq!(
        broker.stats("command:echo"),
        QueueStats {
            ready: 0,
            unacked: 0,
            rejected: 1,
        }
    );
}

#[tokio::test]
async fn queues_are_isolated() {
    let broker = MemoryBroker::new();
    let foo = broker.open_queue("command:foo").await.unwrap();
    foo.publish(b"x".to_vec()).await.unwrap();

    assert_eq!(broker.stats("command:foo").ready, 1);
    assert_eq!(broker.stats("command:bar").ready, 0);
    assert_eq!(MemoryBroker::new().stats("command:foo").ready, 0);
}

#[tokio::test]
async fn prefetch_bounds_unacked_deliveries() {
    let broker = MemoryBroker::new();
    let queue = broker.open_queue("q").await.unwrap();
    for i in 0..5u8 {
        queue.publish(vec![i]).await.unwrap();
    }

    let mut consumer = queue.consume(options(2)).await.unwrap();
    let first = with_timeout(consumer.next()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // One in hand plus at most `prefetch` buffered: prefetch + 1 unacked.
    let stats = broker.stats("q");
    assert!(stats.unacked <= 3, "unacked = {}", stats.unacked);
    assert!(stats.ready >= 2, "ready = {}", stats.ready);

    first.ack().await.unwrap();
}

#[tokio::test]
async fn stable_tag_reclaims_what_it_left_unacknowledged() {
    let broker = MemoryBroker::new();
    let queue = broker.open_queue("q").await.unwrap();
    queue.publish(b"again".to_vec()).await.unwrap();

    {
        let mut consumer = queue
            .consume(options(1).with_stable_tag("host-a"))
            .await
            .unwrap();
        let delivery = with_timeout(consumer.next()).await.unwrap();
        assert_eq!(delivery.payload(), b"again");
        // Neither acked nor rejected.
    }
    assert_eq!(broker.unacked_for("q", "host-a"), 1);

    let mut consumer = queue
        .consume(options(1).with_stable_tag("host-a"))
        .await
        .unwrap();
    let delivery = with_timeout(consumer.next()).await.unwrap();
    assert_eq!(delivery.payload(), b"again");
    delivery.ack().await.unwrap();
    assert_eq!(broker.stats("q"), QueueStats::default());
}

#[tokio::test]
async fn starting_a_consumer_leaves_other_consumers_work_alone() {
    init_tracing();
    let broker = MemoryBroker::new();
    let queue = broker.open_queue("command:sleep").await.unwrap();
    queue.publish(b"job".to_vec()).await.unwrap();

    let first_options = options(1);
    let first_tag = first_options.tag.clone();
    let mut first = queue.consume(first_options).await.unwrap();
    let job = with_timeout(first.next()).await.unwrap();
    assert_eq!(job.payload(), b"job");

    // A second worker comes up while the first is still running `job`.
    let second_options = options(1);
    assert_ne!(second_options.tag, first_tag);
    let mut second = queue.consume(second_options).await.unwrap();

    let redelivered = tokio::time::timeout(Duration::from_millis(100), async {
        tokio::select! {
            d = first.next() => d,
            d = second.next() => d,
        }
    })
    .await;
    assert!(redelivered.is_err(), "in-flight job handed out again: {redelivered:?}");
    assert_eq!(
        broker.stats("command:sleep"),
        QueueStats {
            ready: 0,
            unacked: 1,
            rejected: 0,
        }
    );
    assert_eq!(broker.unacked_for("command:sleep", &first_tag), 1);

    job.ack().await.unwrap();
    assert_eq!(broker.stats("command:sleep"), QueueStats::default());
}

#[tokio::test]
async fn unrelated_stable_tag_does_not_reclaim_foreign_work() {
    let broker = MemoryBroker::new();
    let queue = broker.open_queue("q").await.unwrap();
    queue.publish(b"mine".to_vec()).await.unwrap();

    let mut owner = queue
        .consume(options(1).with_stable_tag("host-a"))
        .await
        .unwrap();
    let held = with_timeout(owner.next()).await.unwrap();

    let _other = queue
        .consume(options(1).with_stable_tag("host-b"))
        .await
        .unwrap();
    assert_eq!(broker.stats("q").ready, 0);
    assert_eq!(broker.unacked_for("q", "host-a"), 1);

    held.ack().await.unwrap();
}
