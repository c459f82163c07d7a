/// Key condition expression builder for DynamoDB queries
pub(crate) mod expressions {
    use aws_sdk_dynamodb::types::AttributeValue;
    use serde::Serialize;
    use serde_dynamo::to_attribute_value;
    use std::collections::HashMap;

    use crate::Error;
    use crate::table::SortKeyCondition;

    /// Builds `#pk = :pk [AND <sort condition>]` with placeholder names, so
    /// key attributes never collide with reserved words
    #[derive(Debug, Default)]
    pub(crate) struct KeyConditionBuilder {
        expression: String,
        names: HashMap<String, String>,
        values: HashMap<String, AttributeValue>,
    }

    impl KeyConditionBuilder {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with_partition_key<PK: Serialize>(
            mut self,
            field: &str,
            value: &PK,
        ) -> Result<Self, Error> {
            self.expression = "#pk = :pk".to_string();
            let _ = self.names.insert("#pk".to_string(), field.to_string());
            let _ = self
                .values
                .insert(":pk".to_string(), to_attribute_value(value)?);
            Ok(self)
        }

        pub(crate) fn with_sort_key<SK: Serialize>(
            mut self,
            field: &str,
            condition: &SortKeyCondition<SK>,
        ) -> Result<Self, Error> {
            let clause = match condition {
                SortKeyCondition::Equals(value) => {
                    let _ = self
                        .values
                        .insert(":sk".to_string(), to_attribute_value(value)?);
                    "#sk = :sk"
                }
                SortKeyCondition::BeginsWith(prefix) => {
                    let _ = self
                        .values
                        .insert(":sk".to_string(), AttributeValue::S(prefix.clone()));
                    "begins_with(#sk, :sk)"
                }
                SortKeyCondition::Between(start, end) => {
                    let _ = self
                        .values
                        .insert(":sk_start".to_string(), to_attribute_value(start)?);
                    let _ = self
                        .values
                        .insert(":sk_end".to_string(), to_attribute_value(end)?);
                    "#sk BETWEEN :sk_start AND :sk_end"
                }
            };

            if !self.expression.is_empty() {
                self.expression.push_str(" AND ");
            }
            self.expression.push_str(clause);
            let _ = self.names.insert("#sk".to_string(), field.to_string());
            Ok(self)
        }

        pub(crate) fn build(
            self,
        ) -> (
            String,
            HashMap<String, String>,
            HashMap<String, AttributeValue>,
        ) {
            (self.expression, self.names, self.values)
        }
    }

}
