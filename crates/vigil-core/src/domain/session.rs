/// A contiguous interval during which one trackable package held the foreground.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub package: String,
    pub start_ms: i64,
    pub end_ms: Option<i64>,
}

impl Session {
    pub fn open(package: impl Into<String>, start_ms: i64) -> Self {
        Self {
            package: package.into(),
            start_ms,
            end_ms: None,
        }
    }

    /// Closes the session, clamping an end that precedes the start.
    pub fn close(&mut self, end_ms: i64) {
        self.end_ms = Some(end_ms.max(self.start_ms));
    }

    pub fn is_open(&self) -> bool {
        self.end_ms.is_none()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.end_ms.map(|end_ms| end_ms - self.start_ms)
    }
}
