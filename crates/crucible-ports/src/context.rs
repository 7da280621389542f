use tokio_util::sync::CancellationToken;

/// Ambient context threaded through every Port call. Every Port invocation
/// and every Store operation is a potential suspension point; carrying the
/// cancellation token here lets the retry controller observe it between
/// attempts without the Ports needing their own signaling mechanism.
#[derive(Clone)]
pub struct PortContext {
    pub run_id: String,
    pub cancellation: CancellationToken,
}

impl PortContext {
    pub fn new(run_id: impl Into<String>, cancellation: CancellationToken) -> Self {
        Self {
            run_id: run_id.into(),
            cancellation,
        }
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
