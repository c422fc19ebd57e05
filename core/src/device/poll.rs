use crate::generation::{Generation, GenerationCounter};
use log::debug;

/// Orders overlapping poll requests.
///
/// Each request takes a ticket; a completion is applied only when no newer
/// request has already been applied, so a slow response can never roll the
/// view back to older data.
#[derive(Debug, Default)]
pub struct PollSequencer {
    counter: GenerationCounter,
    applied: Option<Generation>,
}

impl PollSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> Generation {
        self.counter.issue()
    }

    /// Returns true when the completion for `ticket` should be applied.
    pub fn accept(&mut self, ticket: Generation) -> bool {
        match self.applied {
            Some(applied) if ticket <= applied => {
                debug!(
                    "discarding poll {} superseded by {}",
                    ticket.value(),
                    applied.value()
                );
                false
            }
            _ => {
                self.applied = Some(ticket);
                true
            }
        }
    }

    pub fn last_applied(&self) -> Option<Generation> {
        self.applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_completions_are_applied() {
        let mut sequencer = PollSequencer::new();
        let first = sequencer.begin();
        let second = sequencer.begin();
        assert!(sequencer.accept(first));
        assert!(sequencer.accept(second));
        assert_eq!(sequencer.last_applied(), Some(second));
    }

    #[test]
    fn late_completion_of_older_poll_is_discarded() {
        let mut sequencer = PollSequencer::new();
        let first = sequencer.begin();
        let second = sequencer.begin();
        assert!(sequencer.accept(second));
        assert!(!sequencer.accept(first));
        assert_eq!(sequencer.last_applied(), Some(second));
    }

    #[test]
    fn ticket_is_applied_once() {
        let mut sequencer = PollSequencer::new();
        let ticket = sequencer.begin();
        assert!(sequencer.accept(ticket));
        assert!(!sequencer.accept(ticket));
    }
}
