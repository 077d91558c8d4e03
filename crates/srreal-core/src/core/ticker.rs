use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared monotonic counter that orders every click of every ticker created from it.
///
/// Cloning a `ClockSource` yields a handle to the same counter. Tickers created
/// from handles of one source can be compared directly, even when they belong to
/// unrelated components.
#[derive(Debug, Clone, Default)]
pub struct ClockSource {
    counter: Arc<AtomicU64>,
}

impl ClockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next value, strictly greater than any value issued before.
    fn advance(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Largest value issued so far, or zero if the source was never clicked.
    pub fn latest(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn ticker(&self) -> EventTicker {
        EventTicker::new(self)
    }

    pub fn same_source(&self, other: &ClockSource) -> bool {
        Arc::ptr_eq(&self.counter, &other.counter)
    }
}

/// Modification time stamp of a single component.
///
/// A component clicks its ticker after each change of its configuration. Cached
/// results are stale when the combined ticker value of everything they depend on
/// is newer than the value recorded at computation time.
#[derive(Debug)]
pub struct EventTicker {
    source: ClockSource,
    value: u64,
}

impl EventTicker {
    /// Creates a ticker that is newer than every click issued so far by `source`.
    pub fn new(source: &ClockSource) -> Self {
        Self {
            source: source.clone(),
            value: source.advance(),
        }
    }

    pub fn click(&mut self) {
        self.value = self.source.advance();
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn source(&self) -> &ClockSource {
        &self.source
    }

    pub fn is_newer_than(&self, value: u64) -> bool {
        self.value > value
    }

    /// Maximum of this ticker and the given dependency values.
    pub fn combined_value<I>(&self, dependencies: I) -> u64
    where
        I: IntoIterator<Item = u64>,
    {
        combined_value(self.value, dependencies)
    }
}

impl Clone for EventTicker {
    /// The clone shares the clock source but starts from a fresh click, so it
    /// never inherits the modification time of the original.
    fn clone(&self) -> Self {
        Self::new(&self.source)
    }
}

pub fn combined_value<I>(own: u64, dependencies: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    dependencies.into_iter().fold(own, u64::max)
}
