//! Row types of the in-memory store.
//!
//! Records are kept the way a database adapter would keep them: a few plain
//! index columns plus the record body serialized to a JSON string. Typed
//! values only exist on either side of [`Row::encode`] / [`Row::decode`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use swarm_application::StoreError;

#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub key: String,
    pub swarm_id: Option<String>,
    /// Status column for filtered listings
    pub status: Option<String>,
    pub body: String,
}

impl Row {
    pub fn encode<T: Serialize>(
        kind: &'static str,
        key: impl Into<String>,
        value: &T,
    ) -> Result<Self, StoreError> {
        let key = key.into();
        let body = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
            kind,
            id: key.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            key,
            swarm_id: None,
            status: None,
            body,
        })
    }

    pub fn with_swarm(mut self, swarm_id: impl Into<String>) -> Self {
        self.swarm_id = Some(swarm_id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn decode<T: DeserializeOwned>(&self, kind: &'static str) -> Result<T, StoreError> {
        serde_json::from_str(&self.body).map_err(|e| StoreError::Corrupt {
            kind,
            id: self.key.clone(),
            reason: e.to_string(),
        })
    }
}

/// Rows keyed by primary key, iterated in insertion order
#[derive(Debug, Default)]
pub(crate) struct Table {
    rows: HashMap<String, Row>,
    order: Vec<String>,
}

impl Table {
    pub fn get(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    /// Insert or replace; a replaced row keeps its position.
    pub fn upsert(&mut self, row: Row) -> Option<Row> {
        if !self.rows.contains_key(&row.key) {
            self.order.push(row.key.clone());
        }
        self.rows.insert(row.key.clone(), row)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.order.iter().filter_map(|key| self.rows.get(key))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
