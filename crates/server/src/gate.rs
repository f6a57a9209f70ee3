use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Allows one outstanding server request at a time.
///
/// Each ticket carries the generation it was issued under; a completion is
/// applied only while its generation is still the latest one.
#[derive(Debug, Default)]
pub struct RequestGate {
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another request is in flight.
    pub fn try_begin(&self) -> Option<Ticket<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        Some(Ticket {
            gate: self,
            generation,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Make every outstanding ticket stale, e.g. when the session it would
    /// write into has been thrown away.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

#[derive(Debug)]
pub struct Ticket<'a> {
    gate: &'a RequestGate,
    generation: u64,
}

impl Ticket<'_> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.gate.generation() == self.generation
    }
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_ticket_at_a_time() {
        let gate = RequestGate::new();
        let t1 = gate.try_begin().expect("first ticket");
        assert!(gate.is_busy());
        assert!(gate.try_begin().is_none());
        drop(t1);
        assert!(!gate.is_busy());
        let t2 = gate.try_begin().expect("second ticket");
        assert_eq!(t2.generation(), 2);
        assert!(t2.is_current());
    }

    #[test]
    fn invalidated_ticket_is_stale() {
        let gate = RequestGate::new();
        let t = gate.try_begin().unwrap();
        gate.invalidate();
        assert!(!t.is_current());
    }
}
