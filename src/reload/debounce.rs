/// Minimum distance between two accepted changes.
pub const DEBOUNCE_WINDOW_MS: u64 = 1000;

/// Accepts at most one change per `DEBOUNCE_WINDOW_MS`, however many
/// qualifying events arrive.
#[derive(Debug, Default)]
pub struct Debounce {
    last_accepted_ms: Option<u64>,
}

impl Debounce {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_accept(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_accepted_ms
            && now_ms.saturating_sub(last) < DEBOUNCE_WINDOW_MS
        {
            return false;
        }
        self.last_accepted_ms = Some(now_ms);
        true
    }

    pub fn last_accepted_ms(&self) -> Option<u64> {
        self.last_accepted_ms
    }
}
