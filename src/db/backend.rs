use std::collections::HashMap;

use anyhow::Result;

/// One entry of a batched write. `None` removes the key.
pub type KeyWrite<'a> = (&'a str, Option<&'a str>);

/// Raw keyed string storage underneath an `AnalyticsStore`.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Applies every write or none of them.
    fn write_batch(&mut self, writes: &[KeyWrite<'_>]) -> Result<()>;
}

/// Backend kept entirely in process memory. Used by tests and by callers
/// that only need a throwaway analytics session.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn write_batch(&mut self, writes: &[KeyWrite<'_>]) -> Result<()> {
        for (key, value) in writes {
            match value {
                Some(value) => self.entries.insert(key.to_string(), value.to_string()),
                None => self.entries.remove(*key),
            };
        }
        Ok(())
    }
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for &mut B {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn write_batch(&mut self, writes: &[KeyWrite<'_>]) -> Result<()> {
        (**self).write_batch(writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_overwrites_and_removes() {
        let mut backend = MemoryBackend::new();
        backend.set("currentIP", "10.0.0.1").unwrap();
        backend.set("currentIP", "10.0.0.2").unwrap();
        assert_eq!(backend.get("currentIP").unwrap().as_deref(), Some("10.0.0.2"));
        assert_eq!(backend.len(), 1);

        backend.remove("currentIP").unwrap();
        assert!(backend.get("currentIP").unwrap().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn memory_backend_applies_batches_in_order() {
        let mut backend = MemoryBackend::new();
        backend.set("sessionStartTime", "1000").unwrap();

        backend
            .write_batch(&[
                ("currentSessionId", Some("a")),
                ("currentSessionId", Some("b")),
                ("sessionStartTime", None),
            ])
            .unwrap();

        assert_eq!(backend.get("currentSessionId").unwrap().as_deref(), Some("b"));
        assert!(backend.get("sessionStartTime").unwrap().is_none());
    }
}
