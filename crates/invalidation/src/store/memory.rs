use super::RecordStore;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// In-process record store.
///
/// Records live only as long as the store; useful for dry runs and for callers
/// that persist decisions elsewhere.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<BTreeMap<String, String>>,
}

impl MemoryRecordStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self, id: &str) -> Result<Option<String>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(id).cloned())
    }

    fn write(&self, id: &str, fingerprint: &str) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(id.to_string(), fingerprint.to_string());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.remove(id);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.clear();
        Ok(())
    }

    fn entries(&self) -> Result<Vec<(String, String)>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .iter()
            .map(|(id, fingerprint)| (id.clone(), fingerprint.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let store = MemoryRecordStore::new();
        assert_eq!(store.read("a").unwrap(), None);
        store.write("a", "1").unwrap();
        assert_eq!(store.read("a").unwrap().as_deref(), Some("1"));
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert_eq!(store.read("a").unwrap(), None);
    }

    #[test]
    fn clear_drops_all_records() {
        let store = MemoryRecordStore::new();
        store.write("a", "1").unwrap();
        store.write("b", "2").unwrap();
        store.clear().unwrap();
        assert!(store.entries().unwrap().is_empty());
    }
}
