use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::AttributeMap;
use crate::batch::key_identifier;

#[derive(Debug)]
struct TableSchemata<E> {
    key_properties: Vec<String>,
    entries: HashMap<String, Vec<E>>,
}

/// Remembers, per table and item key, what a batch submitted
///
/// Lets results coming back from the service be matched with the typed
/// object (or the unmarshaller) they originated from.
#[derive(Debug)]
pub(crate) struct BatchState<E> {
    tables: HashMap<String, TableSchemata<E>>,
}

impl<E> Default for BatchState<E> {
    fn default() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }
}

impl<E> BatchState<E> {
    /// Record `entry` under the key of `attributes`
    ///
    /// `key_properties` is only called the first time a table is seen.
    pub(crate) fn insert(
        &mut self,
        table_name: &str,
        key_properties: impl FnOnce() -> Vec<String>,
        attributes: &AttributeMap,
        entry: E,
    ) {
        let schemata = self
            .tables
            .entry(table_name.to_string())
            .or_insert_with(|| TableSchemata {
                key_properties: key_properties(),
                entries: HashMap::new(),
            });
        let identifier = key_identifier(attributes, &schemata.key_properties);
        schemata.entries.entry(identifier).or_default().push(entry);
    }

    /// The most recent entry recorded for the key of `attributes`
    pub(crate) fn get(&self, table_name: &str, attributes: &AttributeMap) -> Option<&E> {
        let schemata = self.tables.get(table_name)?;
        let identifier = key_identifier(attributes, &schemata.key_properties);
        schemata.entries.get(&identifier)?.last()
    }

    /// Remove and return the oldest entry recorded for the key of `attributes`
    pub(crate) fn take(&mut self, table_name: &str, attributes: &AttributeMap) -> Option<E> {
        let schemata = self.tables.get_mut(table_name)?;
        let identifier = key_identifier(attributes, &schemata.key_properties);
        let entries = schemata.entries.get_mut(&identifier)?;
        if entries.is_empty() {
            return None;
        }
        let entry = entries.remove(0);
        if entries.is_empty() {
            let _ = schemata.entries.remove(&identifier);
        }
        Some(entry)
    }

    /// Identifier of `attributes` within `table_name`, for error reports
    pub(crate) fn identifier(&self, table_name: &str, attributes: &AttributeMap) -> String {
        match self.tables.get(table_name) {
            Some(schemata) => key_identifier(attributes, &schemata.key_properties),
            None => String::new(),
        }
    }
}

/// Lock shared batch state; a panic while holding the lock leaves the map usable
pub(crate) fn lock<E>(state: &Mutex<BatchState<E>>) -> MutexGuard<'_, BatchState<E>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
