use futures_util::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::Error;
use crate::backend::DynamoDbBackend;
use crate::batch::{BatchGet, BatchGetOptions, BatchWrite, WriteRequest, WriteType};
use crate::table::state::{BatchState, lock};
use crate::table::{BatchItem, DataMapper, Unmarshaller};

impl<B: DynamoDbBackend> DataMapper<B> {
    /// Retrieve the stored version of every item in `items`
    ///
    /// Only the key attributes of each item are sent. Items may belong to
    /// different tables; each result is unmarshalled with the
    /// [`unmarshaller`](BatchItem::unmarshaller) of the item that requested
    /// it. Keys with no stored item are silently skipped, and results arrive
    /// in completion order rather than input order.
    ///
    /// Tables in `options.per_table_options` are named without the mapper's
    /// prefix. When `options.consistent_read` is unset, the mapper's read
    /// consistency applies.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use dynamo_mapper::{BatchGetOptions, DataMapper, DynamoTable};
    /// use futures_util::{StreamExt, stream};
    /// # use serde::{Deserialize, Serialize};
    /// # #[derive(Debug, Clone, Serialize, Deserialize)]
    /// # struct User { user_id: String, name: Option<String> }
    /// # impl DynamoTable for User {
    /// #     type PK = String;
    /// #     type SK = String;
    /// #     const TABLE: &'static str = "users";
    /// #     const PARTITION_KEY: &'static str = "user_id";
    /// #     fn partition_key(&self) -> String { self.user_id.clone() }
    /// # }
    ///
    /// # async fn example() -> Result<(), dynamo_mapper::Error> {
    /// let mapper = DataMapper::from_global().await;
    /// let wanted = ["u1", "u2"].map(|id| User { user_id: id.to_string(), name: None });
    /// let users = mapper.batch_get(stream::iter(wanted), BatchGetOptions::default());
    /// futures_util::pin_mut!(users);
    /// while let Some(user) = users.next().await {
    ///     println!("{:?}", user?);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn batch_get<T, S>(
        &self,
        items: S,
        options: BatchGetOptions,
    ) -> impl Stream<Item = Result<T, Error>> + Send + use<B, T, S>
    where
        T: BatchItem,
        S: Stream<Item = T> + Send + 'static,
    {
        let state: Arc<Mutex<BatchState<Unmarshaller<T>>>> = Arc::default();

        let prefix = self.table_name_prefix.clone();
        let input_state = Arc::clone(&state);
        let keys = items.map(move |item| {
            let table_name = format!("{}{}", prefix, item.table_name());
            let key = item.marshall_key()?;
            lock(&input_state).insert(
                &table_name,
                || item.key_properties(),
                &key,
                item.unmarshaller(),
            );
            Ok((table_name, key))
        });

        BatchGet::from_results(Arc::clone(&self.backend), keys)
            .with_options(self.prefixed_options(options))
            .with_retry_config(self.retry_config)
            .into_stream()
            .map(move |result| {
                let (table_name, item) = result?;
                let state = lock(&state);
                let Some(&unmarshall) = state.get(&table_name, &item) else {
                    return Err(Error::UnmatchedItem {
                        identifier: state.identifier(&table_name, &item),
                        table: table_name,
                    });
                };
                drop(state);
                unmarshall(item)
            })
    }

    /// Put or delete every item in `items`
    ///
    /// Puts send the whole item, deletes only its key attributes. Each input
    /// pair is yielded back once DynamoDB has acknowledged the write, in
    /// completion order. Writes the service leaves unprocessed are retried
    /// with the mapper's [`RetryConfig`](crate::RetryConfig).
    pub fn batch_write<T, S>(
        &self,
        items: S,
    ) -> impl Stream<Item = Result<(WriteType, T), Error>> + Send + use<B, T, S>
    where
        T: BatchItem,
        S: Stream<Item = (WriteType, T)> + Send + 'static,
    {
        let state: Arc<Mutex<BatchState<T>>> = Arc::default();

        let prefix = self.table_name_prefix.clone();
        let input_state = Arc::clone(&state);
        let requests = items.map(move |(write_type, item)| {
            let table_name = format!("{}{}", prefix, item.table_name());
            let request = match write_type {
                WriteType::Put => WriteRequest::Put(item.marshall_item()?),
                WriteType::Delete => WriteRequest::Delete(item.marshall_key()?),
            };
            let key_properties = item.key_properties();
            lock(&input_state).insert(
                &table_name,
                || key_properties,
                request.attributes(),
                item,
            );
            Ok((table_name, request))
        });

        BatchWrite::from_results(Arc::clone(&self.backend), requests)
            .with_retry_config(self.retry_config)
            .into_stream()
            .map(move |result| {
                let (table_name, request) = result?;
                let mut state = lock(&state);
                match state.take(&table_name, request.attributes()) {
                    Some(item) => Ok((request.write_type(), item)),
                    None => Err(Error::UnmatchedItem {
                        identifier: state.identifier(&table_name, request.attributes()),
                        table: table_name,
                    }),
                }
            })
    }

    /// Put every item in `items`, yielding each once it is written
    pub fn batch_put<T, S>(
        &self,
        items: S,
    ) -> impl Stream<Item = Result<T, Error>> + Send + use<B, T, S>
    where
        T: BatchItem,
        S: Stream<Item = T> + Send + 'static,
    {
        self.batch_write(items.map(|item| (WriteType::Put, item)))
            .map(|result| result.map(|(_, item)| item))
    }

    /// Delete every item in `items`, yielding each once it is deleted
    pub fn batch_delete<T, S>(
        &self,
        items: S,
    ) -> impl Stream<Item = Result<T, Error>> + Send + use<B, T, S>
    where
        T: BatchItem,
        S: Stream<Item = T> + Send + 'static,
    {
        self.batch_write(items.map(|item| (WriteType::Delete, item)))
            .map(|result| result.map(|(_, item)| item))
    }

    fn prefixed_options(&self, options: BatchGetOptions) -> BatchGetOptions {
        let per_table_options: HashMap<_, _> = options
            .per_table_options
            .into_iter()
            .map(|(table_name, table_options)| (self.table_name(&table_name), table_options))
            .collect();

        BatchGetOptions {
            consistent_read: options
                .consistent_read
                .or_else(|| self.read_consistency.consistent_read()),
            per_table_options,
        }
    }
}

