//! Up/Down bookkeeping applied under a monitor key's lock.
//!
//! Both functions mutate the state in place and return the liveness state
//! entered, if the update caused a transition that must be announced.

use crate::types::{LivenessState, MonitorProfile, MonitoringState};

/// Account for one probe about to be sent
pub(crate) fn on_probe_sent(state: &mut MonitoringState, profile: &MonitorProfile) -> Option<LivenessState> {
    state.request_count += 1;
    if state.response_pending_count < profile.monitor_window {
        state.response_pending_count += 1;
    }

    if state.response_pending_count >= profile.failure_threshold && state.state != LivenessState::Down {
        state.state = LivenessState::Down;
        state.request_count = 0;
        return Some(LivenessState::Down);
    }
    None
}

/// Account for a correlated probe response.
///
/// Any response clears the pending count, whatever transition it causes.
pub(crate) fn on_response(state: &mut MonitoringState) -> Option<LivenessState> {
    state.response_pending_count = 0;
    match state.state {
        LivenessState::Down | LivenessState::Unknown => {
            state.state = LivenessState::Up;
            Some(LivenessState::Up)
        }
        LivenessState::Up => None,
    }
}
