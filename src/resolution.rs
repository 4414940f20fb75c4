/// Outcome of best-effort reference resolution.
///
/// References that could not be resolved are kept in `skipped` instead of
/// failing the whole operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution<T, K> {
    pub resolved: Vec<T>,
    pub skipped: Vec<K>,
}

impl<T, K> Resolution<T, K> {
    pub fn push(&mut self, key: K, value: Option<T>) {
        match value {
            Some(value) => self.resolved.push(value),
            None => self.skipped.push(key),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl<T, K> Default for Resolution<T, K> {
    fn default() -> Self {
        Self {
            resolved: Vec::new(),
            skipped: Vec::new(),
        }
    }
}
