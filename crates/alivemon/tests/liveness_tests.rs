//! Up/Down detection driven by scheduler ticks and received packets

mod common;

use alivemon::packet::LldpFrame;
use alivemon::{
    EndpointType, EtherTypes, LivenessState, MonitorEvent, MonitorProfile, MonitorStatus, MonitoringMode, PortContext,
};
use common::{Harness, arp_reply};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_down_after_failure_threshold() {
    let mut harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;

    // three unanswered probes at 0, 1000 and 2000ms
    sleep(Duration::from_millis(2500)).await;
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.state, LivenessState::Down);
    assert_eq!(state.response_pending_count, 3);
    assert_eq!(state.request_count, 0);
    assert_eq!(harness.drain_events(), vec![MonitorEvent { monitor_id, state: LivenessState::Down }]);

    // fourth and fifth probes do not announce Down again
    sleep(Duration::from_millis(2000)).await;
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.state, LivenessState::Down);
    assert_eq!(state.response_pending_count, 5);
    assert!(harness.drain_events().is_empty());
    assert_eq!(harness.sink.count(), 5);

    // pending stays capped at the window
    sleep(Duration::from_millis(3000)).await;
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.response_pending_count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_from_down() {
    let mut harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;

    sleep(Duration::from_millis(4500)).await;
    harness.drain_events();

    let (reply, context) = arp_reply(2);
    harness.engine.handle_packet(&reply, &context).await.unwrap();

    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.state, LivenessState::Up);
    assert_eq!(state.response_pending_count, 0);
    assert_eq!(harness.drain_events(), vec![MonitorEvent { monitor_id, state: LivenessState::Up }]);

    // one missed probe is below the threshold
    sleep(Duration::from_millis(1000)).await;
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.state, LivenessState::Up);
    assert_eq!(state.response_pending_count, 1);
    assert!(harness.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_first_reply_moves_unknown_to_up_once() {
    let mut harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;
    sleep(Duration::from_millis(100)).await;

    let (reply, context) = arp_reply(2);
    harness.engine.handle_packet(&reply, &context).await.unwrap();
    harness.engine.handle_packet(&reply, &context).await.unwrap();

    assert_eq!(harness.drain_events(), vec![MonitorEvent { monitor_id, state: LivenessState::Up }]);
}

#[tokio::test(start_paused = true)]
async fn test_replies_for_other_neighbours_are_ignored() {
    let mut harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;
    sleep(Duration::from_millis(100)).await;

    let (reply, context) = arp_reply(9);
    harness.engine.handle_packet(&reply, &context).await.unwrap();

    let (reply, _) = arp_reply(2);
    let wrong_table = PortContext { table_id: 17, ..context };
    harness.engine.handle_packet(&reply, &wrong_table).await.unwrap();

    harness.engine.handle_packet(&[0xff; 9], &context).await.unwrap();

    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.state, LivenessState::Unknown);
    assert_eq!(state.response_pending_count, 1);
    assert!(harness.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_lldp_keepalive_loopback() {
    let mut harness = Harness::new();
    let profile_id = harness
        .engine
        .create_profile(MonitorProfile::new(2, 1000, 4, EtherTypes::Lldp))
        .await
        .unwrap()
        .id();
    let monitor_id = harness
        .engine
        .start_monitor(profile_id, EndpointType::interface("tap1", None), None, MonitoringMode::OneOne)
        .await
        .unwrap()
        .id();

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(harness.drain_events(), vec![MonitorEvent { monitor_id, state: LivenessState::Down }]);

    let keepalive = harness.sink.last().unwrap();
    let decoded = LldpFrame::decode_frame(&keepalive).unwrap();
    assert_eq!(decoded.keepalive_string().as_deref(), Some("tap1#2"));

    harness.engine.handle_packet(&keepalive, &PortContext::default()).await.unwrap();
    assert_eq!(harness.drain_events(), vec![MonitorEvent { monitor_id, state: LivenessState::Up }]);
}

#[tokio::test(start_paused = true)]
async fn test_dispatched_packet_is_processed() {
    let mut harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;
    sleep(Duration::from_millis(100)).await;

    let (reply, context) = arp_reply(2);
    harness.engine.dispatch_packet(reply, context).await.unwrap();

    assert_eq!(harness.drain_events(), vec![MonitorEvent { monitor_id, state: LivenessState::Up }]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_probe_counts_like_a_tick() {
    let harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;
    sleep(Duration::from_millis(100)).await;

    harness.engine.probe(monitor_id).await.unwrap();
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.response_pending_count, 2);
    assert_eq!(harness.sink.count(), 2);

    assert!(harness.engine.probe(4242).await.unwrap_err().is_not_found());
}

#[tokio::test(start_paused = true)]
async fn test_paused_monitor_ignores_manual_probe() {
    let harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;
    sleep(Duration::from_millis(100)).await;

    harness.engine.pause_monitor(monitor_id).await.unwrap();
    harness.engine.probe(monitor_id).await.unwrap();

    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.response_pending_count, 1);
    assert_eq!(harness.sink.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_skip_while_profile_is_deleted() {
    let mut harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.sink.count(), 1);

    harness.engine.delete_profile(profile_id).await.unwrap();
    sleep(Duration::from_millis(3000)).await;
    harness.engine.probe(monitor_id).await.unwrap();

    assert_eq!(harness.sink.count(), 1);
    assert!(harness.engine.is_scheduled(monitor_id));
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.response_pending_count, 1);
    assert_eq!(state.state, LivenessState::Unknown);
    assert!(harness.drain_events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reply_while_paused_clears_pending() {
    let mut harness = Harness::new();
    let profile_id = harness.arp_profile().await;
    let monitor_id = harness.start_arp(profile_id, 2).await;

    sleep(Duration::from_millis(1500)).await;
    harness.engine.pause_monitor(monitor_id).await.unwrap();
    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.response_pending_count, 2);

    let (reply, context) = arp_reply(2);
    harness.engine.handle_packet(&reply, &context).await.unwrap();

    let state = harness.engine.monitoring_state(monitor_id).await.unwrap().unwrap();
    assert_eq!(state.status, MonitorStatus::Paused);
    assert_eq!(state.state, LivenessState::Up);
    assert_eq!(state.response_pending_count, 0);
    assert_eq!(harness.drain_events(), vec![MonitorEvent { monitor_id, state: LivenessState::Up }]);
    assert_eq!(harness.sink.count(), 2);
}
