//! Telemetry events posted to a dedicated reporter thread.
//!
//! The engine thread never blocks on reporting: events go through an
//! unbounded channel and a send failure only logs. The generic info block is
//! attached to every event so downstream consumers can slice by page and
//! runtime configuration.

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

use static_assertions::assert_impl_all;
use tracing::warn;

/// One opaque telemetry event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEvent {
    pub name: String,
    pub props: HashMap<String, String>,
}

assert_impl_all!(ReportEvent: Send);

/// Runtime facts stamped onto every event.
#[derive(Debug, Clone, Default)]
pub struct GenericInfo {
    pub target_sdk_version: String,
    pub dsl: String,
    pub script_engine: String,
    pub page_version: String,
    pub enable_air: bool,
    pub enable_no_diff: bool,
}

impl GenericInfo {
    fn stamp(&self, props: &mut HashMap<String, String>) {
        props.insert(
            "vireo_target_sdk_version".into(),
            self.target_sdk_version.clone(),
        );
        props.insert("vireo_dsl".into(), self.dsl.clone());
        props.insert("vireo_script_engine".into(), self.script_engine.clone());
        props.insert("vireo_page_version".into(), self.page_version.clone());
        props.insert("enable_air".into(), self.enable_air.to_string());
        props.insert("enable_no_diff".into(), self.enable_no_diff.to_string());
    }
}

/// Handle to the reporter thread. Dropping it shuts the thread down after
/// the queue drains.
#[derive(Debug)]
pub struct Reporter {
    sender: mpsc::Sender<ReportEvent>,
    info: GenericInfo,
    handle: Option<thread::JoinHandle<()>>,
}

impl Reporter {
    /// Spawn the reporter thread. `sink` receives every event in post order.
    pub fn spawn(info: GenericInfo, mut sink: impl FnMut(ReportEvent) + Send + 'static) -> Self {
        let (sender, receiver) = mpsc::channel::<ReportEvent>();
        let handle = thread::Builder::new()
            .name("vireo-reporter".into())
            .spawn(move || {
                while let Ok(event) = receiver.recv() {
                    sink(event);
                }
            })
            .ok();
        if handle.is_none() {
            warn!("failed to spawn reporter thread, telemetry disabled");
        }
        Self {
            sender,
            info,
            handle,
        }
    }

    /// Post one event. Never blocks the engine thread.
    pub fn report(&self, name: impl Into<String>, mut props: HashMap<String, String>) {
        self.info.stamp(&mut props);
        let event = ReportEvent {
            name: name.into(),
            props,
        };
        if self.sender.send(event).is_err() {
            warn!("reporter thread gone, dropping telemetry event");
        }
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain and exit.
        let (closed, _) = mpsc::channel();
        self.sender = closed;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn events_reach_the_sink_with_generic_info() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = Reporter::spawn(
            GenericInfo {
                dsl: "ttml".into(),
                ..Default::default()
            },
            move |event| sink.lock().unwrap().push(event),
        );
        reporter.report("list_diff", HashMap::new());
        drop(reporter); // joins the thread, flushing the queue
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].name, "list_diff");
        assert_eq!(seen[0].props.get("vireo_dsl").map(String::as_str), Some("ttml"));
    }
}
