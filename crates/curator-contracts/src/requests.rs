use crate::error::CritiqueError;

pub type Ticket = u64;

/// Lifecycle of one request channel: `idle -> pending -> success | error`.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestState<T> {
    Idle,
    Pending {
        ticket: Ticket,
        subject: String,
    },
    Success {
        subject: String,
        value: T,
    },
    Error {
        subject: String,
        error: CritiqueError,
    },
}

/// A reusable request channel.
///
/// Each `begin` hands out a new ticket; only the outcome carrying the
/// current ticket is accepted, so outcomes that arrive after a `reset` or a
/// re-submission are discarded.
#[derive(Debug, Clone)]
pub struct RequestSlot<T> {
    state: RequestState<T>,
    next_ticket: Ticket,
}

impl<T> Default for RequestSlot<T> {
    fn default() -> Self {
        Self {
            state: RequestState::Idle,
            next_ticket: 1,
        }
    }
}

impl<T> RequestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RequestState<T> {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RequestState::Pending { .. })
    }

    pub fn begin(&mut self, subject: impl Into<String>) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.state = RequestState::Pending {
            ticket,
            subject: subject.into(),
        };
        ticket
    }

    /// Applies an outcome. Returns `false` when the ticket is stale.
    pub fn resolve(&mut self, ticket: Ticket, outcome: Result<T, CritiqueError>) -> bool {
        let subject = match &self.state {
            RequestState::Pending {
                ticket: current,
                subject,
            } if *current == ticket => subject.clone(),
            _ => return false,
        };
        self.state = match outcome {
            Ok(value) => RequestState::Success { subject, value },
            Err(error) => RequestState::Error { subject, error },
        };
        true
    }

    pub fn reset(&mut self) {
        self.state = RequestState::Idle;
    }

    /// The successful value, only if it belongs to `subject`.
    pub fn success_for(&self, subject: &str) -> Option<&T> {
        match &self.state {
            RequestState::Success {
                subject: owner,
                value,
            } if owner == subject => Some(value),
            _ => None,
        }
    }

    pub fn error_for(&self, subject: &str) -> Option<&CritiqueError> {
        match &self.state {
            RequestState::Error {
                subject: owner,
                error,
            } if owner == subject => Some(error),
            _ => None,
        }
    }
}
