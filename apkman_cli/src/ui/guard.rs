/// Discards responses to page loads that were overtaken by a navigation.
///
/// A load takes a [`Ticket`] before it awaits the network and applies its
/// result only if no navigation happened in between.
///
/// Command handlers hold `&mut Console` across their awaits, so today a
/// ticket cannot go stale outside of tests. The guard is there for callers
/// that run page loads concurrently with navigation.
#[derive(Debug, Default)]
pub struct RequestGuard {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl RequestGuard {
    pub fn issue(&self) -> Ticket {
        Ticket(self.generation)
    }

    /// Invalidates every outstanding ticket.
    pub fn advance(&mut self) {
        self.generation += 1;
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation == ticket.0
    }
}
