mod setup;

use venty::cloud_event::CloudEvent;
use venty::event_store::{EventStoreExt, ReadInstruction};
use venty::types::{CurrentVersion, StreamName, NO_COMMIT_POSITION};
use venty::version::ExpectedVersion;
use venty::EventStore as _;

fn event(id: &str) -> CloudEvent {
    CloudEvent::new(id, "urn:venty:test", "test.event")
}

#[tokio::test]
async fn empty_store_reports_no_stream_and_no_commit_position() {
    let (store, _node) = setup::event_store().await;

    assert_eq!(store.commit_position().await, NO_COMMIT_POSITION);
    assert_eq!(
        store
            .current_version(&StreamName::from("s"), None)
            .await
            .unwrap(),
        CurrentVersion::NoStream
    );
}

#[tokio::test]
async fn append_then_read_round_trips_the_stream() {
    let (store, _node) = setup::event_store().await;
    let stream = StreamName::from("orders-1");

    let events: Vec<_> = (0..5).map(|i| event(&i.to_string())).collect();

    let position = store
        .append(stream.clone(), ExpectedVersion::NoStream, events.clone(), None)
        .await
        .unwrap();

    assert_eq!(position, 4);

    let recorded = store
        .read_stream(stream.clone(), None, usize::MAX, None)
        .await
        .unwrap();

    assert_eq!(recorded.len(), 5);

    for (i, r) in recorded.iter().enumerate() {
        assert_eq!(r.stream_position, i as i64);
        assert_eq!(r.event, events[i]);
    }

    assert_eq!(
        store.current_version(&stream, None).await.unwrap(),
        CurrentVersion::Current(4)
    );
}

#[tokio::test]
async fn wrong_expected_version_leaves_the_stream_untouched() {
    let (store, _node) = setup::event_store().await;
    let stream = StreamName::from("orders-1");

    store
        .append(stream.clone(), ExpectedVersion::NoStream, vec![event("0")], None)
        .await
        .unwrap();

    let result = store
        .attempt_append(stream.clone(), ExpectedVersion::NoStream, vec![event("1")], None)
        .await
        .unwrap();

    assert_eq!(result, None);

    let recorded = store
        .read_stream(stream, None, usize::MAX, None)
        .await
        .unwrap();

    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].event.id(), "0");
}

#[tokio::test]
async fn interleaved_appends_across_streams_keep_contiguous_positions() {
    let (store, _node) = setup::event_store().await;
    let mine = StreamName::from("my-stream");
    let yours = StreamName::from("your-stream");

    let batch = |n: usize| -> Vec<_> { (0..n).map(|i| event(&i.to_string())).collect() };

    store
        .append(mine.clone(), ExpectedVersion::NoStream, batch(5), None)
        .await
        .unwrap();
    store
        .append(yours.clone(), ExpectedVersion::NoStream, batch(5), None)
        .await
        .unwrap();
    store
        .append(mine.clone(), ExpectedVersion::Exact(4), batch(5), None)
        .await
        .unwrap();

    let mut instructions = std::collections::BTreeMap::new();
    instructions.insert(mine.clone(), ReadInstruction::all());

    let mine_events = store
        .read_streams(instructions, false, usize::MAX, None)
        .await
        .unwrap();

    assert_eq!(mine_events.len(), 10);
    assert_eq!(mine_events[9].stream_position, 9);
    assert_eq!(mine_events[9].commit_position, 14);
}

#[tokio::test]
async fn concurrent_appends_with_any_both_eventually_commit() {
    let (store, _node) = setup::event_store().await;
    let stream = StreamName::from("racing-stream");

    let first = store.append(stream.clone(), ExpectedVersion::Any, vec![event("a0"), event("a1")], None);
    let second = store.append(stream.clone(), ExpectedVersion::Any, vec![event("b0"), event("b1")], None);

    let (first, second) = tokio::join!(first, second);
    first.unwrap();
    second.unwrap();

    let recorded = store
        .read_stream(stream, None, usize::MAX, None)
        .await
        .unwrap();

    assert_eq!(recorded.len(), 4);

    let positions: Vec<_> = recorded.iter().map(|r| r.stream_position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}
