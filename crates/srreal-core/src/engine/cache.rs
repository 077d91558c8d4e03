use tracing::trace;

/// A derived value together with the clock value it was computed at.
///
/// The cache is refreshed only when a newer clock value is supplied, which is how
/// callers skip recomputation while none of the inputs changed.
#[derive(Debug, Clone)]
pub struct StalenessCache<T> {
    entry: Option<(u64, T)>,
}

impl<T> Default for StalenessCache<T> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<T> StalenessCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock value of the cached result, if any.
    pub fn stamp(&self) -> Option<u64> {
        self.entry.as_ref().map(|(stamp, _)| *stamp)
    }

    pub fn is_fresh(&self, stamp: u64) -> bool {
        matches!(self.entry, Some((cached, _)) if cached >= stamp)
    }

    /// The cached value, provided nothing changed after it was computed.
    pub fn get(&self, stamp: u64) -> Option<&T> {
        match &self.entry {
            Some((cached, value)) if *cached >= stamp => Some(value),
            _ => None,
        }
    }

    pub fn get_or_update<F>(&mut self, stamp: u64, compute: F) -> &T
    where
        F: FnOnce() -> T,
    {
        let entry = match self.entry.take() {
            Some(entry) if entry.0 >= stamp => entry,
            previous => {
                trace!(stamp, cached = ?previous.map(|(s, _)| s), "Cached value is stale; recomputing.");
                (stamp, compute())
            }
        };
        &self.entry.insert(entry).1
    }

    /// Like [`StalenessCache::get_or_update`]; a failed computation leaves the
    /// previous entry in place.
    pub fn try_get_or_update<F, E>(&mut self, stamp: u64, compute: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let entry = match self.entry.take() {
            Some(entry) if entry.0 >= stamp => entry,
            previous => {
                trace!(stamp, cached = ?previous.as_ref().map(|(s, _)| *s), "Cached value is stale; recomputing.");
                match compute() {
                    Ok(value) => (stamp, value),
                    Err(e) => {
                        self.entry = previous;
                        return Err(e);
                    }
                }
            }
        };
        Ok(&self.entry.insert(entry).1)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
