use std::sync::{Arc, Mutex};

use vigil_core::{EventSource, EventSourceError, ForegroundApp, TransitionEvent};

#[derive(Default)]
struct Script {
    events: Vec<TransitionEvent>,
    foreground: Option<ForegroundApp>,
    failing: bool,
}

/// Event source fed by the test. Clones share the same script, so a test can keep a handle
/// while the tracker owns the source.
#[derive(Clone, Default)]
pub struct ScriptedEventSource {
    script: Arc<Mutex<Script>>,
}

impl ScriptedEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: TransitionEvent) {
        if let Ok(mut script) = self.script.lock() {
            script.events.push(event);
        }
    }

    pub fn set_foreground(&self, foreground: Option<ForegroundApp>) {
        if let Ok(mut script) = self.script.lock() {
            script.foreground = foreground;
        }
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut script) = self.script.lock() {
            script.failing = failing;
        }
    }

    fn script(&self) -> Result<std::sync::MutexGuard<'_, Script>, EventSourceError> {
        self.script.lock().map_err(|_| EventSourceError::Unavailable {
            message: "script poisoned".to_string(),
        })
    }
}

impl EventSource for ScriptedEventSource {
    fn poll_transitions(
        &mut self,
        since_ms: i64,
        now_ms: i64,
    ) -> Result<Vec<TransitionEvent>, EventSourceError> {
        let script = self.script()?;
        if script.failing {
            return Err(EventSourceError::Query {
                message: "scripted failure".to_string(),
            });
        }

        let mut events: Vec<TransitionEvent> = script
            .events
            .iter()
            .filter(|event| event.timestamp_ms > since_ms && event.timestamp_ms <= now_ms)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.timestamp_ms);

        Ok(events)
    }

    fn most_recent_foreground(
        &mut self,
        _window_ms: i64,
    ) -> Result<Option<ForegroundApp>, EventSourceError> {
        let script = self.script()?;
        if script.failing {
            return Err(EventSourceError::Query {
                message: "scripted failure".to_string(),
            });
        }

        Ok(script.foreground.clone())
    }
}
