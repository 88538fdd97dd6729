//! Global search budget.
//!
//! The one piece of mutable state shared between the two periodic
//! tasks. Acquisition is an atomic check-and-increment so the limit
//! cannot be overrun by concurrent runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::SchedulerError;

/// Process-wide counter of search invocations against an optional
/// hard ceiling.
pub struct SearchBudget {
    used: AtomicU32,
    limit: Mutex<Option<u32>>,
}

impl SearchBudget {
    pub fn new(limit: Option<u32>) -> Self {
        Self {
            used: AtomicU32::new(0),
            limit: Mutex::new(limit),
        }
    }

    /// Consume one search slot, or refuse when the ceiling is reached.
    pub fn try_acquire(&self) -> Result<(), SchedulerError> {
        let limit = *self.limit.lock().unwrap();
        match limit {
            None => {
                self.used.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Some(limit) => self
                .used
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                    if used < limit {
                        Some(used + 1)
                    } else {
                        None
                    }
                })
                .map(|_| ())
                .map_err(|_| SchedulerError::BudgetExhausted { limit }),
        }
    }

    /// Check whether a search could be issued, without consuming a slot.
    pub fn check(&self) -> Result<(), SchedulerError> {
        let limit = *self.limit.lock().unwrap();
        match limit {
            Some(limit) if self.used.load(Ordering::SeqCst) >= limit => {
                Err(SchedulerError::BudgetExhausted { limit })
            }
            _ => Ok(()),
        }
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> Option<u32> {
        *self.limit.lock().unwrap()
    }

    /// Operator reset: zero the counter, keep the limit.
    pub fn reset(&self) {
        self.used.store(0, Ordering::SeqCst);
    }

    /// Operator override: remove the ceiling entirely.
    pub fn clear_limit(&self) {
        *self.limit.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unlimited_budget() {
        let budget = SearchBudget::new(None);
        for _ in 0..1000 {
            budget.try_acquire().unwrap();
        }
        assert_eq!(budget.used(), 1000);
    }

    #[test]
    fn test_hard_ceiling() {
        let budget = SearchBudget::new(Some(3));
        assert!(budget.try_acquire().is_ok());
        assert!(budget.try_acquire().is_ok());
        assert!(budget.try_acquire().is_ok());

        let err = budget.try_acquire().unwrap_err();
        assert!(matches!(err, SchedulerError::BudgetExhausted { limit: 3 }));
        assert_eq!(budget.used(), 3);
    }

    #[test]
    fn test_check_does_not_consume() {
        let budget = SearchBudget::new(Some(1));
        budget.check().unwrap();
        budget.check().unwrap();
        assert_eq!(budget.used(), 0);

        budget.try_acquire().unwrap();
        assert!(budget.check().is_err());
    }

    #[test]
    fn test_reset_reopens_budget() {
        let budget = SearchBudget::new(Some(1));
        budget.try_acquire().unwrap();
        assert!(budget.try_acquire().is_err());

        budget.reset();
        assert!(budget.try_acquire().is_ok());
    }

    #[test]
    fn test_clear_limit() {
        let budget = SearchBudget::new(Some(1));
        budget.try_acquire().unwrap();
        assert!(budget.try_acquire().is_err());

        budget.clear_limit();
        assert!(budget.try_acquire().is_ok());
        assert_eq!(budget.limit(), None);
    }

    #[test]
    fn test_concurrent_acquisition_never_overruns() {
        let budget = Arc::new(SearchBudget::new(Some(100)));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let budget = Arc::clone(&budget);
            handles.push(std::thread::spawn(move || {
                let mut acquired = 0u32;
                for _ in 0..50 {
                    if budget.try_acquire().is_ok() {
                        acquired += 1;
                    }
                }
                acquired
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
        assert_eq!(budget.used(), 100);
    }
}
