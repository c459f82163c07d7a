use std::collections::{BTreeMap, VecDeque};

/// Buffers fresh input elements per table until a request can be filled
#[derive(Debug)]
pub(crate) struct RequestPartitioner<E> {
    batch_size: usize,
    queues: BTreeMap<String, VecDeque<E>>,
    buffered: usize,
}

impl<E> RequestPartitioner<E> {
    pub(crate) fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            queues: BTreeMap::new(),
            buffered: 0,
        }
    }

    pub(crate) fn push(&mut self, table_name: String, element: E) {
        self.queues.entry(table_name).or_default().push_back(element);
        self.buffered += 1;
    }

    /// Total number of elements waiting across all tables
    pub(crate) fn buffered(&self) -> usize {
        self.buffered
    }

    /// Number of elements waiting for one table
    pub(crate) fn queued(&self, table_name: &str) -> usize {
        self.queues.get(table_name).map_or(0, VecDeque::len)
    }

    pub(crate) fn is_full(&self, table_name: &str) -> bool {
        self.queued(table_name) >= self.batch_size
    }

    /// Tables that currently have at least one element waiting
    pub(crate) fn tables(&self) -> impl Iterator<Item = &String> {
        self.queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(table_name, _)| table_name)
    }

    /// Remove up to `max` elements for a table in arrival order
    pub(crate) fn take(&mut self, table_name: &str, max: usize) -> Vec<E> {
        let Some(queue) = self.queues.get_mut(table_name) else {
            return Vec::new();
        };
        let count = max.min(queue.len());
        let taken: Vec<E> = queue.drain(..count).collect();
        self.buffered -= taken.len();
        if queue.is_empty() {
            let _ = self.queues.remove(table_name);
        }
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_respects_batch_size_and_order() {
        let mut partitioner = RequestPartitioner::new(3);
        for i in 0..5 {
            partitioner.push("snap".to_string(), i);
        }
        partitioner.push("crackle".to_string(), 100);

        assert!(partitioner.is_full("snap"));
        assert!(!partitioner.is_full("crackle"));
        assert_eq!(partitioner.buffered(), 6);

        assert_eq!(partitioner.take("snap", 3), vec![0, 1, 2]);
        assert_eq!(partitioner.take("snap", 3), vec![3, 4]);
        assert_eq!(partitioner.take("snap", 3), Vec::<i32>::new());
        assert_eq!(partitioner.buffered(), 1);
    }

    #[test]
    fn test_tables_lists_only_non_empty_queues() {
        let mut partitioner = RequestPartitioner::new(25);
        partitioner.push("pop".to_string(), 1);
        partitioner.push("crackle".to_string(), 2);
        let _ = partitioner.take("pop", 25);

        let tables: Vec<&String> = partitioner.tables().collect();
        assert_eq!(tables, vec!["crackle"]);
        assert_eq!(partitioner.queued("pop"), 0);
    }
}
