use std::future::Future;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("request was cancelled by a newer one")]
    Cancelled,
    #[error("response arrived after a newer request started")]
    Stale,
}

#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
struct SlotState {
    generation: u64,
    token: CancellationToken,
}

/// One in-flight request per slot (a page load, an AI panel). Starting a
/// request cancels the previous one; results for superseded tickets are
/// reported as stale.
#[derive(Debug)]
pub struct RequestSlot {
    name: &'static str,
    state: Mutex<SlotState>,
}

impl RequestSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(SlotState {
                generation: 0,
                token: CancellationToken::new(),
            }),
        }
    }

    pub fn begin(&self) -> Ticket {
        let mut state = self.state.lock();
        state.token.cancel();
        state.generation += 1;
        state.token = CancellationToken::new();
        debug!(slot = self.name, generation = state.generation, "request started");
        Ticket {
            generation: state.generation,
            token: state.token.clone(),
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.state.lock().generation == ticket.generation
    }

    /// Cancels whatever is in flight without starting anything new.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.token.cancel();
        state.generation += 1;
    }

    /// Accepts a result only if `ticket` is still the latest request.
    pub fn settle<T>(&self, ticket: &Ticket, value: T) -> Result<T, RequestError> {
        if ticket.is_cancelled() {
            return Err(RequestError::Cancelled);
        }
        if !self.is_current(ticket) {
            debug!(slot = self.name, generation = ticket.generation, "dropping stale response");
            return Err(RequestError::Stale);
        }
        Ok(value)
    }

    pub async fn run<F, T>(&self, work: F) -> Result<T, RequestError>
    where
        F: Future<Output = T>,
    {
        let ticket = self.begin();
        self.run_with(&ticket, work).await
    }

    pub async fn run_with<F, T>(&self, ticket: &Ticket, work: F) -> Result<T, RequestError>
    where
        F: Future<Output = T>,
    {
        let value = tokio::select! {
            _ = ticket.token.cancelled() => return Err(RequestError::Cancelled),
            value = work => value,
        };
        self.settle(ticket, value)
    }
}
