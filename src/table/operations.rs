use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Serialize, de::DeserializeOwned};
use serde_dynamo::{from_attribute_value, from_item, to_attribute_value, to_item};
use std::fmt;

use crate::backend::{AttributeMap, Key};
use crate::error::Error;
use crate::table::types::CompositeKey;

/// Generic table trait, generic over partition and sort key types
///
/// # Example
///
/// ```rust
/// use dynamo_mapper::DynamoTable;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Order {
///     user_id: String,
///     order_id: u64,
/// }
///
/// impl DynamoTable for Order {
///     type PK = String;
///     type SK = u64;
///
///     const TABLE: &'static str = "orders";
///     const PARTITION_KEY: &'static str = "user_id";
///     const SORT_KEY: Option<&'static str> = Some("order_id");
///
///     fn partition_key(&self) -> Self::PK {
///         self.user_id.clone()
///     }
///
///     fn sort_key(&self) -> Option<Self::SK> {
///         Some(self.order_id)
///     }
/// }
/// ```
pub trait DynamoTable: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Associated partition key type
    type PK: fmt::Display + Clone + Send + Sync + fmt::Debug + Serialize + DeserializeOwned;

    /// Associated sort key type
    type SK: fmt::Display + Clone + Send + Sync + fmt::Debug + Serialize + DeserializeOwned;

    /// Name of table to retrieve
    const TABLE: &'static str;

    /// Partition key of the table
    const PARTITION_KEY: &'static str;

    /// Sort key of the table
    const SORT_KEY: Option<&'static str> = None;

    /// Default page size for scans and queries
    const DEFAULT_PAGE_SIZE: u16 = 10;

    /// Partition key name
    fn partition_key_name(&self) -> &'static str {
        Self::PARTITION_KEY
    }

    /// Sort key name
    fn sort_key_name(&self) -> Option<&'static str> {
        Self::SORT_KEY
    }

    /// Partition key value
    fn partition_key(&self) -> Self::PK;

    /// Sort key value
    fn sort_key(&self) -> Option<Self::SK> {
        None
    }

    /// Composite key
    fn composite_key(&self) -> CompositeKey<Self::PK, Self::SK> {
        (self.partition_key(), self.sort_key())
    }

    /// Marshall a key of this table into its attribute map
    fn key_attributes(
        partition_key: &Self::PK,
        sort_key: Option<&Self::SK>,
    ) -> Result<Key, Error> {
        let mut key = Key::new();
        let _ = key.insert(
            Self::PARTITION_KEY.to_string(),
            to_attribute_value::<_, AttributeValue>(partition_key)?,
        );
        if let (Some(name), Some(value)) = (Self::SORT_KEY, sort_key) {
            let _ = key.insert(
                name.to_string(),
                to_attribute_value::<_, AttributeValue>(value)?,
            );
        }
        Ok(key)
    }

    /// Unmarshall a key (such as a `LastEvaluatedKey`) of this table
    ///
    /// Returns `None` when the partition key attribute is missing.
    fn composite_key_from(key: &Key) -> Result<Option<CompositeKey<Self::PK, Self::SK>>, Error> {
        let Some(partition_key) = key.get(Self::PARTITION_KEY) else {
            return Ok(None);
        };
        let partition_key: Self::PK = from_attribute_value(partition_key.clone())?;
        let sort_key: Option<Self::SK> = Self::SORT_KEY
            .and_then(|name| key.get(name))
            .map(|value| from_attribute_value(value.clone()))
            .transpose()?;
        Ok(Some((partition_key, sort_key)))
    }
}

/// Converts a raw item back into a batch item
pub type Unmarshaller<T> = fn(AttributeMap) -> Result<T, Error>;

/// An item that can take part in a batch get or batch write
///
/// Every [`DynamoTable`] is a batch item. Implement it for an enum over
/// several table types to read or write heterogeneous batches spanning
/// several tables:
///
/// ```rust
/// use dynamo_mapper::{AttributeMap, BatchItem, DynamoTable, Error, Unmarshaller, unmarshall_item};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct User { user_id: String }
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Team { team_id: String }
///
/// impl DynamoTable for User {
///     type PK = String;
///     type SK = String;
///     const TABLE: &'static str = "users";
///     const PARTITION_KEY: &'static str = "user_id";
///     fn partition_key(&self) -> String { self.user_id.clone() }
/// }
///
/// impl DynamoTable for Team {
///     type PK = String;
///     type SK = String;
///     const TABLE: &'static str = "teams";
///     const PARTITION_KEY: &'static str = "team_id";
///     fn partition_key(&self) -> String { self.team_id.clone() }
/// }
///
/// enum Record { User(User), Team(Team) }
///
/// impl BatchItem for Record {
///     fn table_name(&self) -> &str {
///         match self { Record::User(u) => u.table_name(), Record::Team(t) => t.table_name() }
///     }
///     fn key_properties(&self) -> Vec<String> {
///         match self { Record::User(u) => u.key_properties(), Record::Team(t) => t.key_properties() }
///     }
///     fn marshall_item(&self) -> Result<AttributeMap, Error> {
///         match self { Record::User(u) => u.marshall_item(), Record::Team(t) => t.marshall_item() }
///     }
///     fn unmarshaller(&self) -> Unmarshaller<Self> {
///         match self {
///             Record::User(_) => |item| unmarshall_item(item).map(Record::User),
///             Record::Team(_) => |item| unmarshall_item(item).map(Record::Team),
///         }
///     }
/// }
/// ```
pub trait BatchItem: Send + Sized + 'static {
    /// Table the item lives in, before any mapper prefix is applied
    fn table_name(&self) -> &str;

    /// Names of the table's key attributes, partition key first
    fn key_properties(&self) -> Vec<String>;

    /// Marshall the full item
    fn marshall_item(&self) -> Result<AttributeMap, Error>;

    /// Marshall only the key attributes of the item
    fn marshall_key(&self) -> Result<Key, Error> {
        let key_properties = self.key_properties();
        let mut key = self.marshall_item()?;
        key.retain(|name, _| key_properties.contains(name));
        Ok(key)
    }

    /// Function that turns an item read from this item's table back into `Self`
    fn unmarshaller(&self) -> Unmarshaller<Self>;
}

impl<T: DynamoTable> BatchItem for T {
    fn table_name(&self) -> &str {
        T::TABLE
    }

    fn key_properties(&self) -> Vec<String> {
        std::iter::once(T::PARTITION_KEY)
            .chain(T::SORT_KEY)
            .map(String::from)
            .collect()
    }

    fn marshall_item(&self) -> Result<AttributeMap, Error> {
        Ok(to_item(self)?)
    }

    fn unmarshaller(&self) -> Unmarshaller<Self> {
        unmarshall_item::<T>
    }
}

/// Unmarshall an item into any deserializable type
pub fn unmarshall_item<T: DeserializeOwned>(item: AttributeMap) -> Result<T, Error> {
    Ok(from_item(item)?)
}
