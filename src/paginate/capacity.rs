use aws_sdk_dynamodb::types::{Capacity, ConsumedCapacity};
use std::collections::HashMap;

use crate::Error;

/// Merge two consumed capacity reports for the same table
///
/// Capacity units are summed at the top level, for the table itself and per
/// local and global secondary index. Reports naming different tables cannot
/// be merged; a report without a table name takes the other report's name.
///
/// ```
/// use aws_sdk_dynamodb::types::ConsumedCapacity;
/// use dynamo_mapper::paginate::merge_consumed_capacities;
///
/// let page = ConsumedCapacity::builder()
///     .table_name("users")
///     .capacity_units(1.5)
///     .build();
/// let total = merge_consumed_capacities(Some(&page), Some(&page)).unwrap();
/// assert_eq!(total.and_then(|c| c.capacity_units), Some(3.0));
/// ```
pub fn merge_consumed_capacities(
    left: Option<&ConsumedCapacity>,
    right: Option<&ConsumedCapacity>,
) -> Result<Option<ConsumedCapacity>, Error> {
    let (left, right) = match (left, right) {
        (None, None) => return Ok(None),
        (Some(only), None) | (None, Some(only)) => return Ok(Some(only.clone())),
        (Some(left), Some(right)) => (left, right),
    };

    if let (Some(left_name), Some(right_name)) = (&left.table_name, &right.table_name) {
        if left_name != right_name {
            return Err(Error::CapacityTableMismatch {
                left: left_name.clone(),
                right: right_name.clone(),
            });
        }
    }

    Ok(Some(
        ConsumedCapacity::builder()
            .set_table_name(left.table_name.clone().or_else(|| right.table_name.clone()))
            .set_capacity_units(add_units(left.capacity_units, right.capacity_units))
            .set_read_capacity_units(add_units(
                left.read_capacity_units,
                right.read_capacity_units,
            ))
            .set_write_capacity_units(add_units(
                left.write_capacity_units,
                right.write_capacity_units,
            ))
            .set_table(merge_capacity(left.table.as_ref(), right.table.as_ref()))
            .set_local_secondary_indexes(merge_index_capacities(
                left.local_secondary_indexes.as_ref(),
                right.local_secondary_indexes.as_ref(),
            ))
            .set_global_secondary_indexes(merge_index_capacities(
                left.global_secondary_indexes.as_ref(),
                right.global_secondary_indexes.as_ref(),
            ))
            .build(),
    ))
}

fn add_units(left: Option<f64>, right: Option<f64>) -> Option<f64> {
    match (left, right) {
        (None, None) => None,
        (left, right) => Some(left.unwrap_or_default() + right.unwrap_or_default()),
    }
}

fn merge_capacity(left: Option<&Capacity>, right: Option<&Capacity>) -> Option<Capacity> {
    match (left, right) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(left), Some(right)) => Some(
            Capacity::builder()
                .set_capacity_units(add_units(left.capacity_units, right.capacity_units))
                .set_read_capacity_units(add_units(
                    left.read_capacity_units,
                    right.read_capacity_units,
                ))
                .set_write_capacity_units(add_units(
                    left.write_capacity_units,
                    right.write_capacity_units,
                ))
                .build(),
        ),
    }
}

fn merge_index_capacities(
    left: Option<&HashMap<String, Capacity>>,
    right: Option<&HashMap<String, Capacity>>,
) -> Option<HashMap<String, Capacity>> {
    match (left, right) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(left), Some(right)) => {
            let mut merged = left.clone();
            for (index_name, capacity) in right {
                let combined = merge_capacity(merged.get(index_name), Some(capacity));
                if let Some(combined) = combined {
                    let _ = merged.insert(index_name.clone(), combined);
                }
            }
            Some(merged)
        }
    }
}
