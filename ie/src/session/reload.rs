//! Periodic reload of the active plan

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::editor::ReloadOutcome;
use super::manager::SessionManager;
use super::messages::SessionError;

/// Re-normalize the active plan every `interval` until the session shuts down
pub fn spawn_reload_loop(session: SessionManager, interval: Duration) -> JoinHandle<()> {
    debug!(interval_ms = interval.as_millis() as u64, "spawn_reload_loop: called");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the session was just seeded
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match session.reload_active().await {
                Ok(Some(ReloadOutcome::Applied { entry_count })) => {
                    debug!(entry_count, "reload loop: applied");
                }
                Ok(Some(outcome)) => debug!(?outcome, "reload loop: not applied"),
                Ok(None) => debug!("reload loop: no active plan"),
                Err(SessionError::ChannelError) => {
                    info!("Session closed, stopping reload loop");
                    break;
                }
                Err(e) => warn!(error = %e, "Reload failed, will retry"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Plan;
    use crate::events::{EditorEvent, EventBus};
    use crate::session::{SeedMode, SessionSettings};
    use crate::sync::ItineraryStore;
    use crate::sync::mock::MockItineraryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reload_picks_up_new_document() {
        let store = Arc::new(MockItineraryStore::new().with_plan(Plan::with_id("p", "Porto", 2), Vec::new()));
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let session = SessionManager::spawn(store.clone(), bus, SessionSettings::default());
        session.open("p", SeedMode::Open).await.unwrap();
        assert!(session.view().await.unwrap().entries.is_empty());

        let generated = Plan::with_id("p", "Porto", 2).with_document(json!({"hotels": ["Pestana Vintage"]}));
        store.save_plan(&generated).await.unwrap();

        let handle = spawn_reload_loop(session.clone(), Duration::from_millis(10));
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Ok(EditorEvent::ReloadApplied { entry_count, .. })) => {
                    assert_eq!(entry_count, 1);
                    break;
                }
                Ok(Ok(_)) => continue,
                other => panic!("no reload event: {:?}", other),
            }
        }
        assert_eq!(session.view().await.unwrap().entries[0].name, "Pestana Vintage");

        session.shutdown().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("reload loop should stop")
            .unwrap();
    }
}
