use tokio_util::sync::CancellationToken;

/// Ticket for one issued request. The spawned task races its future against
/// `token`; the result it sends back is tagged with `generation`.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    generation: u64,
    token: CancellationToken,
}

impl RequestHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Latest-request-wins channel (viewport, one search item, hover, selected).
///
/// Issuing cancels whatever was in flight before bumping the generation, and a
/// completion is accepted only if it carries the current generation.
#[derive(Debug, Default)]
pub struct Slot {
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl Slot {
    pub fn issue(&mut self) -> RequestHandle {
        self.cancel();
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        RequestHandle {
            generation: self.generation,
            token,
        }
    }

    /// Cancels the in-flight request, if any. Its result can no longer be accepted.
    pub fn cancel(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
    }

    pub fn accept(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.in_flight.is_none() {
            return false;
        }
        self.in_flight = None;
        true
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
