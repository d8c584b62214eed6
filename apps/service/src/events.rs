use alivemon::{BroadcastPublisher, LivenessState};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Log every liveness transition published on the bus
pub fn spawn_logger(bus: &BroadcastPublisher) -> JoinHandle<()> {
    let mut rx = bus.subscribe();

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.state {
                    LivenessState::Down => warn!(monitor_id = event.monitor_id, "Monitored endpoint is down"),
                    _ => info!(monitor_id = event.monitor_id, state = %event.state, "Monitored endpoint state changed"),
                },
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event logger lagged behind"),
                Err(RecvError::Closed) => {
                    debug!("Event bus closed");
                    break;
                }
            }
        }
    })
}
