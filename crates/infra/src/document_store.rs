//! Company-isolated store of certified document snapshots.
//!
//! A snapshot is submitted once. Later lifecycle transitions (payments,
//! cancellation) replace it through `supersede`; nothing is ever deleted.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use kwanza_core::CompanyId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document {0} was already submitted")]
    AlreadySubmitted(String),

    #[error("document {0} not found")]
    NotFound(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub trait DocumentStore<K, V>: Send + Sync {
    /// Store a new snapshot; a second submit for the same key is rejected.
    fn submit(&self, company_id: CompanyId, key: K, value: V) -> Result<(), StoreError>;

    /// Replace an existing snapshot.
    fn supersede(&self, company_id: CompanyId, key: K, value: V) -> Result<(), StoreError>;

    fn get(&self, company_id: CompanyId, key: &K) -> Result<Option<V>, StoreError>;

    /// All snapshots of a company, in key order.
    fn list(&self, company_id: CompanyId) -> Result<Vec<V>, StoreError>;
}

impl<K, V, S> DocumentStore<K, V> for Arc<S>
where
    S: DocumentStore<K, V> + ?Sized,
{
    fn submit(&self, company_id: CompanyId, key: K, value: V) -> Result<(), StoreError> {
        (**self).submit(company_id, key, value)
    }

    fn supersede(&self, company_id: CompanyId, key: K, value: V) -> Result<(), StoreError> {
        (**self).supersede(company_id, key, value)
    }

    fn get(&self, company_id: CompanyId, key: &K) -> Result<Option<V>, StoreError> {
        (**self).get(company_id, key)
    }

    fn list(&self, company_id: CompanyId) -> Result<Vec<V>, StoreError> {
        (**self).list(company_id)
    }
}

#[derive(Debug)]
pub struct InMemoryDocumentStore<K, V> {
    inner: RwLock<BTreeMap<(CompanyId, K), V>>,
}

impl<K, V> InMemoryDocumentStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> Default for InMemoryDocumentStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> DocumentStore<K, V> for InMemoryDocumentStore<K, V>
where
    K: Clone + Ord + core::fmt::Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn submit(&self, company_id: CompanyId, key: K, value: V) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let slot = (company_id, key);
        if map.contains_key(&slot) {
            return Err(StoreError::AlreadySubmitted(slot.1.to_string()));
        }
        map.insert(slot, value);
        Ok(())
    }

    fn supersede(&self, company_id: CompanyId, key: K, value: V) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        match map.get_mut(&(company_id, key.clone())) {
            Some(existing) => {
                *existing = value;
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    fn get(&self, company_id: CompanyId, key: &K) -> Result<Option<V>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(&(company_id, key.clone())).cloned())
    }

    fn list(&self, company_id: CompanyId) -> Result<Vec<V>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map
            .iter()
            .filter(|((c, _), _)| *c == company_id)
            .map(|(_, v)| v.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_submit_is_rejected() {
        let store: InMemoryDocumentStore<String, u32> = InMemoryDocumentStore::new();
        let company = CompanyId::new();
        store.submit(company, "FT-1".into(), 1).unwrap();
        let err = store.submit(company, "FT-1".into(), 2).unwrap_err();
        assert_eq!(err, StoreError::AlreadySubmitted("FT-1".into()));
        assert_eq!(store.get(company, &"FT-1".to_string()).unwrap(), Some(1));
    }

    #[test]
    fn supersede_requires_existing_snapshot() {
        let store: InMemoryDocumentStore<String, u32> = InMemoryDocumentStore::new();
        let company = CompanyId::new();
        assert!(matches!(
            store.supersede(company, "FT-9".into(), 1),
            Err(StoreError::NotFound(_))
        ));
        store.submit(company, "FT-9".into(), 1).unwrap();
        store.supersede(company, "FT-9".into(), 5).unwrap();
        assert_eq!(store.get(company, &"FT-9".to_string()).unwrap(), Some(5));
    }

    #[test]
    fn list_is_company_scoped() {
        let store: InMemoryDocumentStore<String, u32> = InMemoryDocumentStore::new();
        let a = CompanyId::new();
        let b = CompanyId::new();
        store.submit(a, "2".into(), 2).unwrap();
        store.submit(a, "1".into(), 1).unwrap();
        store.submit(b, "1".into(), 10).unwrap();
        assert_eq!(store.list(a).unwrap(), vec![1, 2]);
        assert_eq!(store.list(b).unwrap(), vec![10]);
    }
}
