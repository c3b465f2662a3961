//! End-to-end plugin behavior against the in-memory broker.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    pipeworks_broker::{Broker, MemoryBroker},
    pipeworks_channel::{ChannelEvent, ChannelPlugin, Error},
    pipeworks_config::ChannelConfig,
    tokio::sync::mpsc,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_config() -> ChannelConfig {
    ChannelConfig {
        plugin_id: "demo.plugin.channel".into(),
        input_pipe: "demo.pipe.channel".into(),
        output_pipe: "demo.pipe.output".into(),
        ..Default::default()
    }
}

/// Spawn a running plugin and wait for its one-time `Ready` event.
async fn spawn_ready_plugin(
    broker: Arc<MemoryBroker>,
    config: &ChannelConfig,
) -> (Arc<ChannelPlugin>, mpsc::Receiver<ChannelEvent>) {
    let (plugin, mut events) = ChannelPlugin::new(broker, config);
    let plugin = Arc::new(plugin);
    tokio::spawn({
        let plugin = Arc::clone(&plugin);
        async move { plugin.run().await }
    });

    let first = recv(&mut events).await;
    assert_eq!(first, ChannelEvent::Ready);
    assert!(plugin.is_ready());
    (plugin, events)
}

async fn recv<T>(rx: &mut mpsc::Receiver<T>) -> T {
    match tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await {
        Ok(Some(value)) => value,
        Ok(None) => panic!("event channel closed unexpectedly"),
        Err(_) => panic!("timed out waiting for event"),
    }
}

#[tokio::test]
async fn inbound_message_becomes_one_data_event() {
    let broker = Arc::new(MemoryBroker::new());
    let (_plugin, mut events) = spawn_ready_plugin(Arc::clone(&broker), &test_config()).await;

    broker
        .publish("demo.pipe.channel", br#"{"foo":"bar"}"#.to_vec())
        .await
        .unwrap();

    let event = recv(&mut events).await;
    assert_eq!(event, ChannelEvent::Data(serde_json::json!({"foo": "bar"})));
}

#[tokio::test]
async fn ready_fires_exactly_once() {
    let broker = Arc::new(MemoryBroker::new());
    let (_plugin, mut events) = spawn_ready_plugin(Arc::clone(&broker), &test_config()).await;

    for i in 0..3 {
        broker
            .publish("demo.pipe.channel", format!("{{\"n\":{i}}}").into_bytes())
            .await
            .unwrap();
    }

    for _ in 0..3 {
        let event = recv(&mut events).await;
        assert!(
            matches!(event, ChannelEvent::Data(_)),
            "only Data events may follow the single Ready, got {event:?}"
        );
    }
}

#[tokio::test]
async fn malformed_inbound_is_skipped_without_stalling() {
    let broker = Arc::new(MemoryBroker::new());
    let (_plugin, mut events) = spawn_ready_plugin(Arc::clone(&broker), &test_config()).await;

    broker
        .publish("demo.pipe.channel", b"not json at all".to_vec())
        .await
        .unwrap();
    broker
        .publish("demo.pipe.channel", br#"{"after":"garbage"}"#.to_vec())
        .await
        .unwrap();

    // The malformed payload yields no event; the next valid one still flows.
    let event = recv(&mut events).await;
    assert_eq!(
        event,
        ChannelEvent::Data(serde_json::json!({"after": "garbage"}))
    );
}

#[tokio::test]
async fn relay_publishes_envelope_verbatim() {
    let broker = Arc::new(MemoryBroker::new());
    let mut relayed = broker.subscribe("demo.pipe.output").await.unwrap();
    let (plugin, _events) = spawn_ready_plugin(Arc::clone(&broker), &test_config()).await;

    plugin
        .relay_message("test", vec!["a".into()], vec!["b".into()])
        .await
        .unwrap();

    let raw = recv(&mut relayed).await;
    let envelope: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(
        envelope,
        serde_json::json!({
            "message": "test",
            "devices": ["a"],
            "deviceTypes": ["b"],
        })
    );
}

#[tokio::test]
async fn identical_relay_calls_are_not_deduplicated() {
    let broker = Arc::new(MemoryBroker::new());
    let mut relayed = broker.subscribe("demo.pipe.output").await.unwrap();
    let (plugin, _events) = spawn_ready_plugin(Arc::clone(&broker), &test_config()).await;

    for _ in 0..2 {
        plugin
            .relay_message("test", vec!["a".into()], vec![])
            .await
            .unwrap();
    }

    let first = recv(&mut relayed).await;
    let second = recv(&mut relayed).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn log_publishes_to_every_configured_queue() {
    let broker = Arc::new(MemoryBroker::new());
    let mut config = test_config();
    config.loggers = vec!["logs.ops.a".into(), "logs.ops.b".into()];

    let mut queue_a = broker.subscribe("logs.ops.a").await.unwrap();
    let mut queue_b = broker.subscribe("logs.ops.b").await.unwrap();
    let (plugin, _events) = spawn_ready_plugin(Arc::clone(&broker), &config).await;

    plugin.log("dummy log data").await.unwrap();

    for rx in [&mut queue_a, &mut queue_b] {
        let raw = recv(rx).await;
        let entry: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(entry["data"], "dummy log data");
        assert_eq!(entry["plugin"], "demo.plugin.channel");
        assert!(entry["timestamp"].is_i64());
    }
}

#[tokio::test]
async fn log_exception_publishes_to_every_configured_queue() {
    let broker = Arc::new(MemoryBroker::new());
    let mut config = test_config();
    config.exception_loggers = vec!["logs.errors".into()];

    let mut errors = broker.subscribe("logs.errors").await.unwrap();
    let (plugin, _events) = spawn_ready_plugin(Arc::clone(&broker), &config).await;

    plugin
        .log_exception(&std::io::Error::other("test"))
        .await
        .unwrap();

    let raw = recv(&mut errors).await;
    let entry: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(entry["message"], "test");
    assert_eq!(entry["plugin"], "demo.plugin.channel");
}

#[tokio::test]
async fn fan_out_failure_is_best_effort_and_aggregated() {
    let broker = Arc::new(MemoryBroker::new());
    let mut config = test_config();
    config.loggers = vec!["logs.bad".into(), "logs.good".into()];

    let mut good = broker.subscribe("logs.good").await.unwrap();
    broker.fail_publishes_to("logs.bad").await;
    let (plugin, _events) = spawn_ready_plugin(Arc::clone(&broker), &config).await;

    let err = plugin.log("still delivered elsewhere").await.unwrap_err();
    match err {
        Error::LoggerFanout { failures } => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "logs.bad");
        },
        other => panic!("expected LoggerFanout, got {other:?}"),
    }

    // The healthy queue received its copy despite the failure.
    let raw = recv(&mut good).await;
    let entry: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(entry["data"], "still delivered elsewhere");
}

#[tokio::test]
async fn dropped_event_receiver_stops_the_inbound_loop() {
    let broker = Arc::new(MemoryBroker::new());
    let (plugin, mut events) =
        ChannelPlugin::new(Arc::<MemoryBroker>::clone(&broker), &test_config());
    let plugin = Arc::new(plugin);
    let runner = tokio::spawn({
        let plugin = Arc::clone(&plugin);
        async move { plugin.run().await }
    });

    assert_eq!(recv(&mut events).await, ChannelEvent::Ready);
    drop(events);

    // With nobody consuming events, the next delivery must end the loop
    // instead of piling decoded messages into a dead channel.
    broker
        .publish("demo.pipe.channel", br#"{"foo":"bar"}"#.to_vec())
        .await
        .unwrap();

    let outcome = tokio::time::timeout(RECV_TIMEOUT, runner)
        .await
        .expect("run should return once the receiver is gone")
        .expect("runner task should not panic");
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn cancellation_stops_the_inbound_loop() {
    let broker = Arc::new(MemoryBroker::new());
    let (plugin, mut events) = spawn_ready_plugin(Arc::clone(&broker), &test_config()).await;

    plugin.cancel_token().cancel();
    drop(plugin);

    // Once the loop exits, the last event sender drops and the channel closes.
    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        while events.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "event channel should close after cancel");
}
