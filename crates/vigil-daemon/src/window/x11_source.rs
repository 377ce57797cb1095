use chrono::Utc;
use tracing::{debug, trace};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use vigil_core::{EventSource, EventSourceError, ForegroundApp, TransitionEvent};

use super::FocusHistory;

const DEFAULT_DISPLAY: &str = ":0";

pub struct X11EventSource {
    connection: RustConnection,
    root_window: Window,
    active_window_atom: u32,
    wm_class_atom: u32,
    history: FocusHistory,
}

impl X11EventSource {
    pub fn new(history_retention_ms: i64) -> Option<Self> {
        let display_str = display_name(std::env::var("DISPLAY").ok());
        let (connection, screen_number) = RustConnection::connect(Some(&display_str))
            .map_err(|error| {
                debug!(%error, display = %display_str, "failed to connect to X11 display");
            })
            .ok()?;

        let root_window = connection.setup().roots.get(screen_number)?.root;

        let active_window_atom = connection
            .intern_atom(false, b"_NET_ACTIVE_WINDOW")
            .ok()?
            .reply()
            .ok()?
            .atom;

        debug!("X11 event source initialized");

        Some(Self {
            connection,
            root_window,
            active_window_atom,
            wm_class_atom: AtomEnum::WM_CLASS.into(),
            history: FocusHistory::new(history_retention_ms),
        })
    }

    fn active_window(&self) -> Result<Option<Window>, EventSourceError> {
        let reply = self
            .connection
            .get_property(
                false,
                self.root_window,
                self.active_window_atom,
                AtomEnum::WINDOW,
                0,
                1,
            )
            .map_err(query_error)?
            .reply()
            .map_err(query_error)?;

        Ok(reply
            .value32()
            .and_then(|mut values| values.next())
            .filter(|window| *window != 0))
    }

    /// Lowercased class part of `WM_CLASS`, falling back to the instance part.
    fn window_class(&self, window: Window) -> Option<String> {
        let reply = self
            .connection
            .get_property(false, window, self.wm_class_atom, AtomEnum::STRING, 0, 2048)
            .ok()?
            .reply()
            .ok()?;

        parse_wm_class(&reply.value)
    }

    fn sample(&mut self, now_ms: i64) -> Result<(), EventSourceError> {
        let focused = match self.active_window()? {
            Some(window) => self.window_class(window),
            None => None,
        };

        trace!(focused = ?focused, "sampled focused window");
        self.history.record(focused, now_ms);
        Ok(())
    }
}

/// Daemons launched from a scheduler have no `DISPLAY`; fall back to the first local display.
fn display_name(from_env: Option<String>) -> String {
    from_env
        .filter(|display| !display.is_empty())
        .unwrap_or_else(|| DEFAULT_DISPLAY.to_string())
}

fn parse_wm_class(value: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(value).ok()?;
    let parts: Vec<&str> = text.split('\0').filter(|part| !part.is_empty()).collect();

    parts
        .get(1)
        .or(parts.first())
        .map(|class| class.to_lowercase())
}

fn query_error(error: impl std::fmt::Display) -> EventSourceError {
    EventSourceError::Query {
        message: error.to_string(),
    }
}

impl EventSource for X11EventSource {
    fn poll_transitions(
        &mut self,
        since_ms: i64,
        now_ms: i64,
    ) -> Result<Vec<TransitionEvent>, EventSourceError> {
        self.sample(now_ms)?;
        Ok(self.history.events_between(since_ms, now_ms))
    }

    fn most_recent_foreground(
        &mut self,
        window_ms: i64,
    ) -> Result<Option<ForegroundApp>, EventSourceError> {
        Ok(self
            .history
            .most_recent(window_ms, Utc::now().timestamp_millis()))
    }
}
