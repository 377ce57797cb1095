#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatMark {
    pub last_seen_ms: i64,
}

impl HeartbeatMark {
    pub fn at(last_seen_ms: i64) -> Self {
        Self { last_seen_ms }
    }
}
