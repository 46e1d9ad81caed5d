//! Event log replay
//!
//! Feeds recorded browser events through a [`ControlPlane`] backed by
//! in-memory storage and an in-memory rule engine, printing every message
//! response and a summary of the final rule table.
//!
//! Each log line is one event:
//!
//! ```text
//! {"event":"request","tabId":1,"url":"https://ads.example/x.js","initiator":"https://news.example","timestamp":0}
//! {"event":"message","message":{"type":"GET_DOMAINS","tabId":1}}
//! {"event":"navigation","tabId":1,"frameId":0}
//! {"event":"tabRemoved","tabId":1}
//! ```

use std::rc::Rc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use tracery_control::{ControlPlane, NoBadge, PortError, Ports, ScriptInjector, StaticKnowledge, TabMessenger};
use tracery_core::{MemoryStore, ObserveOutcome, ObservedRequest, TabId};
use tracery_rules::MemoryRuleEngine;

use crate::read_file;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum Event {
    #[serde(rename_all = "camelCase")]
    Request {
        tab_id: TabId,
        url: String,
        #[serde(default)]
        initiator: Option<String>,
        #[serde(default)]
        timestamp: u64,
    },
    Message {
        message: Value,
    },
    #[serde(rename_all = "camelCase")]
    Navigation {
        tab_id: TabId,
        #[serde(default)]
        frame_id: i64,
    },
    #[serde(rename_all = "camelCase")]
    TabRemoved {
        tab_id: TabId,
    },
}

/// Relay messages have nowhere to go offline; they are logged.
struct LoggedTabs;

#[async_trait(?Send)]
impl TabMessenger for LoggedTabs {
    async fn send_to_active_tab(&self, message: Value) -> Result<(), PortError> {
        log::info!("To active tab: {}", message);
        Ok(())
    }
}

struct LoggedInjector;

#[async_trait(?Send)]
impl ScriptInjector for LoggedInjector {
    async fn inject_relay(&self, tab_id: TabId) -> Result<(), PortError> {
        log::info!("Relay injected into tab {}", tab_id);
        Ok(())
    }
}

fn parse_events(text: &str) -> Result<Vec<Event>, String> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| format!("Line {}: {}", index + 1, e))
        })
        .collect()
}

pub fn run(knowledge: &str, log_path: &str, settings: Option<&str>) -> Result<(), String> {
    let knowledge = read_file(knowledge)?;
    let events = parse_events(&read_file(log_path)?)?;
    let store = match settings {
        Some(path) => {
            let document: Value =
                serde_json::from_str(&read_file(path)?).map_err(|e| format!("Invalid settings '{}': {}", path, e))?;
            MemoryStore::with_document(document)
        }
        None => MemoryStore::new(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))?;

    runtime.block_on(replay(knowledge, store, events))
}

async fn replay(knowledge: String, store: MemoryStore, events: Vec<Event>) -> Result<(), String> {
    let engine = Rc::new(MemoryRuleEngine::new());
    let plane = ControlPlane::new(Ports {
        knowledge: Rc::new(StaticKnowledge(knowledge)),
        store: Rc::new(store),
        rules: engine.clone(),
        badges: Rc::new(NoBadge),
        tabs: Rc::new(LoggedTabs),
        injector: Rc::new(LoggedInjector),
    });
    plane.initialize().await;

    let mut recorded = 0usize;
    for event in &events {
        match event {
            Event::Request { tab_id, url, initiator, timestamp } => {
                let request = ObservedRequest {
                    tab_id: *tab_id,
                    url,
                    initiator: initiator.as_deref(),
                    timestamp: *timestamp,
                };
                if let ObserveOutcome::Recorded { newly_seen: true, .. } = plane.on_request(&request) {
                    recorded += 1;
                }
            }
            Event::Message { message } => {
                let response = plane.handle_message(message).await;
                println!("{}", response);
            }
            Event::Navigation { tab_id, frame_id } => {
                plane.on_navigation_committed(*tab_id, *frame_id).await;
            }
            Event::TabRemoved { tab_id } => {
                plane.on_tab_removed(*tab_id);
            }
        }
    }

    let state = plane.state();
    eprintln!("Replayed {} events ({} hosts recorded)", events.len(), recorded);
    eprintln!("  Blocked domains:  {}", state.global_block().len());
    eprintln!("  Whitelisted:      {}", state.whitelist().len());
    eprintln!("  Active rules:     {}", engine.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_event_kind() {
        let log = r#"
{"event":"request","tabId":3,"url":"https://a.example/x","initiator":"https://b.example"}
{"event":"message","message":{"type":"GET_DOMAINS","tabId":3}}

{"event":"navigation","tabId":3}
{"event":"tabRemoved","tabId":3}
"#;
        let events = parse_events(log).unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], Event::Request { tab_id: 3, timestamp: 0, .. }));
        assert!(matches!(&events[2], Event::Navigation { frame_id: 0, .. }));
    }

    #[test]
    fn reports_bad_line_number() {
        let err = parse_events("{\"event\":\"request\"}\n").unwrap_err();
        assert!(err.starts_with("Line 1:"));
    }

    #[test]
    fn replays_block_toggle_into_rules() {
        let events = parse_events(
            r#"{"event":"message","message":{"type":"TOGGLE_GLOBAL","domain":"ads.example"}}"#,
        )
        .unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime
            .block_on(replay(r#"{"trackers":{},"categories":{}}"#.to_string(), MemoryStore::new(), events))
            .unwrap();
    }
}
