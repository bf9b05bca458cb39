use std::sync::Arc;

/// Percent-complete update for a single transfer attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Whole percent in `0..=100`.
    pub percent_complete: u8,
}

/// Callback invoked with upload progress.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Computes `round(sent / total * 100)`, clamped to 100.
///
/// An empty payload is complete by definition.
pub fn percent_complete(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let ratio = sent.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

/// Tracks bytes sent for one attempt and notifies the callback whenever
/// the whole-percent value moves forward.
///
/// Values never regress: an update that would round to the same or a lower
/// percentage is swallowed.
pub struct ProgressMonitor {
    total: u64,
    sent: u64,
    last: Option<u8>,
    callback: Option<ProgressCallback>,
}

impl ProgressMonitor {
    /// Creates a monitor for a payload of `total` bytes.
    pub fn new(total: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            total,
            sent: 0,
            last: None,
            callback,
        }
    }

    /// Records `bytes` more bytes handed to the transport.
    pub fn advance(&mut self, bytes: u64) {
        self.sent = self.sent.saturating_add(bytes);
        self.emit(percent_complete(self.sent, self.total));
    }

    /// Reports 100% if it has not been reported yet.
    pub fn complete(&mut self) {
        self.sent = self.total;
        self.emit(100);
    }

    /// Starts over from zero, always reporting a `0` event so observers can
    /// reset their display when a transfer restarts.
    pub fn reset(&mut self) {
        self.sent = 0;
        self.last = Some(0);
        if let Some(cb) = &self.callback {
            cb(ProgressEvent {
                percent_complete: 0,
            });
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// Last percentage reported, if any.
    pub fn last_percent(&self) -> Option<u8> {
        self.last
    }

    fn emit(&mut self, percent: u8) {
        if self.last.is_some_and(|last| percent <= last) {
            return;
        }
        self.last = Some(percent);
        if let Some(cb) = &self.callback {
            cb(ProgressEvent {
                percent_complete: percent,
            });
        }
    }
}
