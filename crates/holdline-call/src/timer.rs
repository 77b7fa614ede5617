use tokio::task::AbortHandle;

/// Cancellable handle for the scheduled keyword-timeout action.
///
/// The generation number ties the handle to the spawn that created it: a
/// fire callback whose generation no longer matches the slot in the shared
/// record is stale and must not act. Both cancellation and firing must take
/// the slot under the manager's lock, so at most one of them ever proceeds.
#[derive(Debug)]
pub(crate) struct KeywordTimer {
    pub generation: u64,
    abort: AbortHandle,
}

impl KeywordTimer {
    pub fn new(generation: u64, abort: AbortHandle) -> Self {
        Self { generation, abort }
    }

    pub fn cancel(self) {
        self.abort.abort();
    }
}
