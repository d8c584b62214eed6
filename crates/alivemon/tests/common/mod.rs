//! Shared fixtures for the engine integration tests

#![allow(dead_code)]

use alivemon::packet::ArpPacket;
use alivemon::{
    AlivenessMonitor, BroadcastPublisher, EndpointType, EngineConfig, InMemoryStore, LocalIdPool, MacAddr,
    MonitorEvent, MonitorProfile, MonitorStore, MonitoringInfo, MonitoringMode, MonitoringState, PacketSink,
    PortContext, PortRef, ProbeError, ProtocolRegistry, StaticInventory, StoreError,
};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub const LOCAL_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x01);
pub const PEER_MAC: MacAddr = MacAddr(0x02, 0, 0, 0, 0, 0x02);
pub const TAP0_LPORT: u32 = 42;
pub const ARP_TABLE: u8 = 81;

/// Packet sink remembering every transmitted frame
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<(PortRef, Vec<u8>)>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Vec<u8>> {
        self.frames.lock().unwrap().last().map(|(_, frame)| frame.clone())
    }
}

#[async_trait]
impl PacketSink for RecordingSink {
    async fn transmit(&self, egress: PortRef, frame: Vec<u8>) -> Result<(), ProbeError> {
        self.frames.lock().unwrap().push((egress, frame));
        Ok(())
    }
}

/// Store whose interface index rejects the next `n` writes
pub struct FlakyStore {
    inner: Arc<InMemoryStore>,
    failing_interface_adds: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<InMemoryStore>, failing_interface_adds: usize) -> Self {
        Self { inner, failing_interface_adds: AtomicUsize::new(failing_interface_adds) }
    }
}

#[async_trait]
impl MonitorStore for FlakyStore {
    async fn get_profile(&self, profile_id: u32) -> Result<Option<MonitorProfile>, StoreError> {
        self.inner.get_profile(profile_id).await
    }

    async fn put_profile(&self, profile_id: u32, profile: &MonitorProfile) -> Result<(), StoreError> {
        self.inner.put_profile(profile_id, profile).await
    }

    async fn delete_profile(&self, profile_id: u32) -> Result<(), StoreError> {
        self.inner.delete_profile(profile_id).await
    }

    async fn get_monitoring_info(&self, monitor_id: u32) -> Result<Option<MonitoringInfo>, StoreError> {
        self.inner.get_monitoring_info(monitor_id).await
    }

    async fn put_monitoring_info(&self, info: &MonitoringInfo) -> Result<(), StoreError> {
        self.inner.put_monitoring_info(info).await
    }

    async fn delete_monitoring_info(&self, monitor_id: u32) -> Result<(), StoreError> {
        self.inner.delete_monitoring_info(monitor_id).await
    }

    async fn list_monitoring_infos(&self) -> Result<Vec<MonitoringInfo>, StoreError> {
        self.inner.list_monitoring_infos().await
    }

    async fn get_monitoring_state(&self, monitor_key: &str) -> Result<Option<MonitoringState>, StoreError> {
        self.inner.get_monitoring_state(monitor_key).await
    }

    async fn put_monitoring_state(&self, state: &MonitoringState) -> Result<(), StoreError> {
        self.inner.put_monitoring_state(state).await
    }

    async fn delete_monitoring_state(&self, monitor_key: &str) -> Result<(), StoreError> {
        self.inner.delete_monitoring_state(monitor_key).await
    }

    async fn get_monitor_key(&self, monitor_id: u32) -> Result<Option<String>, StoreError> {
        self.inner.get_monitor_key(monitor_id).await
    }

    async fn put_monitor_key(&self, monitor_id: u32, monitor_key: &str) -> Result<(), StoreError> {
        self.inner.put_monitor_key(monitor_id, monitor_key).await
    }

    async fn delete_monitor_key(&self, monitor_id: u32) -> Result<(), StoreError> {
        self.inner.delete_monitor_key(monitor_id).await
    }

    async fn get_interface_monitors(&self, interface: &str) -> Result<Vec<u32>, StoreError> {
        self.inner.get_interface_monitors(interface).await
    }

    async fn add_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError> {
        let remaining = self
            .failing_interface_adds
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining.is_ok() {
            return Err(StoreError::Backend("transient".to_string()));
        }
        self.inner.add_interface_monitor(interface, monitor_id).await
    }

    async fn remove_interface_monitor(&self, interface: &str, monitor_id: u32) -> Result<(), StoreError> {
        self.inner.remove_interface_monitor(interface, monitor_id).await
    }
}

pub struct Harness {
    pub engine: Arc<AlivenessMonitor>,
    pub store: Arc<InMemoryStore>,
    pub ids: Arc<LocalIdPool>,
    pub sink: Arc<RecordingSink>,
    pub events: broadcast::Receiver<MonitorEvent>,
    config: EngineConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::assemble(config, store.clone(), store, Arc::new(LocalIdPool::default()))
    }

    /// Engine over a store whose interface index fails the first `n` writes
    pub fn with_flaky_interface_index(failures: usize) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let flaky = Arc::new(FlakyStore::new(store.clone(), failures));
        Self::assemble(EngineConfig::default(), store, flaky, Arc::new(LocalIdPool::default()))
    }

    /// Drop this engine and build a fresh one over the same store and id pool
    pub fn restart(self) -> Self {
        let Harness { engine, store, ids, config, .. } = self;
        drop(engine);
        Self::assemble(config, store.clone(), store, ids)
    }

    fn assemble(
        config: EngineConfig,
        store: Arc<InMemoryStore>,
        engine_store: Arc<dyn MonitorStore>,
        ids: Arc<LocalIdPool>,
    ) -> Self {
        let _ = tracing_subscriber::fmt::try_init();

        let inventory = StaticInventory::new()
            .with_interface("tap0", Some(LOCAL_MAC), Some(PortRef { dpn_id: 1, port_no: 3 }), Some(TAP0_LPORT))
            .with_interface("tap1", Some(LOCAL_MAC), Some(PortRef { dpn_id: 1, port_no: 4 }), Some(43));
        let sink = Arc::new(RecordingSink::default());
        let bus = BroadcastPublisher::new(config.notification_capacity);
        let events = bus.subscribe();

        let engine = AlivenessMonitor::builder()
            .protocols(ProtocolRegistry::standard(&config, Arc::new(inventory), sink.clone()))
            .config(config.clone())
            .store(engine_store)
            .id_allocator(ids.clone())
            .publisher(Arc::new(bus))
            .build()
            .expect("engine should build inside a runtime");

        Self { engine, store, ids, sink, events, config }
    }

    /// All events published so far
    pub fn drain_events(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn arp_profile(&self) -> u32 {
        self.engine
            .create_profile(MonitorProfile::new(3, 1000, 5, alivemon::EtherTypes::Arp))
            .await
            .unwrap()
            .id()
    }

    /// Start an ARP monitor from tap0 (10.0.0.1) towards `10.0.0.{host}`
    pub async fn start_arp(&self, profile_id: u32, host: u8) -> u32 {
        self.engine
            .start_monitor(profile_id, tap0_source(), Some(neighbour(host)), MonitoringMode::OneOne)
            .await
            .unwrap()
            .id()
    }
}

pub fn tap0_source() -> EndpointType {
    EndpointType::interface("tap0", Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))))
}

pub fn neighbour(host: u8) -> EndpointType {
    EndpointType::ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, host)))
}

/// ARP reply from `10.0.0.{host}` to tap0's address, as punted on tap0
pub fn arp_reply(host: u8) -> (Vec<u8>, PortContext) {
    let request = ArpPacket::request(LOCAL_MAC, Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, host));
    let frame = ArpPacket::reply_to(&request, PEER_MAC).to_frame().unwrap();
    (frame, PortContext { table_id: ARP_TABLE, lport_tag: TAP0_LPORT })
}
