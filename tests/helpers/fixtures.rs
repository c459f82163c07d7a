/// Common test fixtures and data structures
///
/// Defines reusable test models that implement DynamoTable, and a record
/// type mixing them for heterogeneous batches.
use super::{Deserialize, DynamoTable, Serialize};
use dynamo_mapper::table::SortKey;
use dynamo_mapper::{AttributeMap, BatchItem, Error, Unmarshaller, unmarshall_item};

/// Simple test object with partition and sort key
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestObject {
    pub game: String,
    pub age: String,
    pub ux: String,
    pub number2: usize,
}

impl DynamoTable for TestObject {
    type PK = String;
    type SK = String;
    const TABLE: &'static str = "tests_generic_objects";
    const PARTITION_KEY: &'static str = "game";
    const SORT_KEY: Option<&'static str> = Some("age");

    fn partition_key(&self) -> String {
        self.game.to_string()
    }

    fn sort_key(&self) -> SortKey<String> {
        Some(self.age.clone())
    }
}

impl TestObject {
    pub fn new(game: &str, age: usize) -> Self {
        Self {
            game: game.to_string(),
            age: age.to_string(),
            ux: format!("ux-{age}"),
            number2: age,
        }
    }
}

/// Test object keyed by partition key only
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct TestCounters {
    pub imo: String,
    pub det: String,
    pub p1: usize,
    pub p2: usize,
}

impl DynamoTable for TestCounters {
    type PK = String;
    type SK = String;
    const TABLE: &'static str = "tests_generic_counters";
    const PARTITION_KEY: &'static str = "imo";

    fn partition_key(&self) -> String {
        self.imo.to_string()
    }
}

impl TestCounters {
    pub fn new(imo: &str, p1: usize) -> Self {
        Self {
            imo: imo.to_string(),
            det: "counter".to_string(),
            p1,
            p2: p1 * 2,
        }
    }
}

/// Either fixture, for batches spanning both tables
#[derive(PartialEq, Debug, Clone)]
pub enum Record {
    Object(TestObject),
    Counters(TestCounters),
}

impl BatchItem for Record {
    fn table_name(&self) -> &str {
        match self {
            Record::Object(object) => object.table_name(),
            Record::Counters(counters) => counters.table_name(),
        }
    }

    fn key_properties(&self) -> Vec<String> {
        match self {
            Record::Object(object) => object.key_properties(),
            Record::Counters(counters) => counters.key_properties(),
        }
    }

    fn marshall_item(&self) -> Result<AttributeMap, Error> {
        match self {
            Record::Object(object) => object.marshall_item(),
            Record::Counters(counters) => counters.marshall_item(),
        }
    }

    fn unmarshaller(&self) -> Unmarshaller<Self> {
        match self {
            Record::Object(_) => |item| unmarshall_item(item).map(Record::Object),
            Record::Counters(_) => |item| unmarshall_item(item).map(Record::Counters),
        }
    }
}
