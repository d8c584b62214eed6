//! Ticks and responses racing on the same monitor key

mod common;

use alivemon::{EngineConfig, LivenessState, MonitorProfile, EtherTypes};
use common::{Harness, arp_reply};
use futures::future::join_all;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_interleaved_ticks_and_responses() {
    let config = EngineConfig::builder().lock_timeout(Duration::from_secs(5)).build();
    let mut harness = Harness::with_config(config);

    // long interval so only explicit probes drive the session
    let profile = MonitorProfile::new(3, 3_600_000, 5, EtherTypes::Arp);
    let profile_id = harness.engine.create_profile(profile.clone()).await.unwrap().id();
    let monitor_id = harness.start_arp(profile_id, 2).await;

    let (reply, context) = arp_reply(2);
    let mut tasks = Vec::new();
    for round in 0..60 {
        let engine = harness.engine.clone();
        if round % 4 == 0 {
            let reply = reply.clone();
            tasks.push(tokio::spawn(async move {
                engine.handle_packet(&reply, &context).await.unwrap();
            }));
        } else {
            tasks.push(tokio::spawn(async move {
                engine.probe(monitor_id).await.unwrap();
            }));
        }
    }
    for result in join_all(tasks).await {
        result.unwrap();
    }

    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert!(state.response_pending_count <= profile.monitor_window);

    // transitions alternate and the last one matches the stored verdict
    let events = harness.drain_events();
    assert!(events.windows(2).all(|pair| pair[0].state != pair[1].state));
    if let Some(last) = events.last() {
        assert_eq!(last.state, state.state);
    }

    harness.engine.handle_packet(&reply, &context).await.unwrap();
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.state, LivenessState::Up);
    assert_eq!(state.response_pending_count, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_independent_monitors_run_concurrently() {
    let harness = Harness::new();
    let profile_id = harness
        .engine
        .create_profile(MonitorProfile::new(3, 3_600_000, 5, EtherTypes::Arp))
        .await
        .unwrap()
        .id();

    let mut monitors = Vec::new();
    for host in 2..12 {
        monitors.push(harness.start_arp(profile_id, host).await);
    }

    let probes = monitors.iter().map(|&monitor_id| {
        let engine = harness.engine.clone();
        tokio::spawn(async move { engine.probe(monitor_id).await })
    });
    for result in join_all(probes).await {
        result.unwrap().unwrap();
    }

    for monitor_id in monitors {
        let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
        assert!(state.response_pending_count >= 1);
    }
}
