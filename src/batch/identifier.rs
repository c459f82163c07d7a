use aws_sdk_dynamodb::types::AttributeValue;
use std::fmt::Write as _;

use crate::backend::AttributeMap;
use crate::batch::WriteRequest;

/// Identify a write request within a batch write
///
/// The identifier is `{table}::{put|delete}::{name=value&...}`, built from the
/// string, number and binary attributes of the request sorted by name. Two
/// requests against the same table share an identifier exactly when they
/// write the same key-shaped attributes with the same write type, which is how
/// unprocessed elements returned by the service are matched against the ones
/// that were sent.
pub fn item_identifier(table_name: &str, request: &WriteRequest) -> String {
    let mut identifier = format!("{table_name}::{}::", request.write_type());
    let mut names: Vec<&String> = request
        .attributes()
        .iter()
        .filter(|(_, value)| is_key_type(value))
        .map(|(name, _)| name)
        .collect();
    names.sort();

    for (index, name) in names.into_iter().enumerate() {
        if index > 0 {
            identifier.push('&');
        }
        identifier.push_str(name);
        identifier.push('=');
        if let Some(value) = request.attributes().get(name) {
            push_scalar(&mut identifier, value);
        }
    }

    identifier
}

/// Identify an item by the values of its key attributes
///
/// Produces `{key}={value}` pairs joined with `:` in the order the key
/// attributes are given. Missing attributes render as an empty value.
pub(crate) fn key_identifier(attributes: &AttributeMap, key_properties: &[String]) -> String {
    let mut identifier = String::new();
    for (index, name) in key_properties.iter().enumerate() {
        if index > 0 {
            identifier.push(':');
        }
        identifier.push_str(name);
        identifier.push('=');
        if let Some(value) = attributes.get(name) {
            push_scalar(&mut identifier, value);
        }
    }
    identifier
}

fn is_key_type(value: &AttributeValue) -> bool {
    matches!(
        value,
        AttributeValue::S(_) | AttributeValue::N(_) | AttributeValue::B(_)
    )
}

fn push_scalar(out: &mut String, value: &AttributeValue) {
    match value {
        AttributeValue::S(s) => out.push_str(s),
        AttributeValue::N(n) => out.push_str(n),
        AttributeValue::B(blob) => {
            for byte in blob.as_ref() {
                let _ = write!(out, "{byte:02x}");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::Blob;

    fn item(attributes: &[(&str, AttributeValue)]) -> AttributeMap {
        attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_put_identifier_sorts_key_type_attributes() {
        let request = WriteRequest::Put(item(&[
            ("fizz", AttributeValue::S("buzz".to_string())),
            ("age", AttributeValue::N("42".to_string())),
            ("tags", AttributeValue::Ss(vec!["x".to_string()])),
            ("flag", AttributeValue::Bool(true)),
        ]));

        assert_eq!(
            item_identifier("snap", &request),
            "snap::put::age=42&fizz=buzz"
        );
    }

    #[test]
    fn test_delete_identifier_differs_from_put() {
        let attributes = item(&[("id", AttributeValue::S("1".to_string()))]);
        let put = item_identifier("snap", &WriteRequest::Put(attributes.clone()));
        let delete = item_identifier("snap", &WriteRequest::Delete(attributes));

        assert_eq!(delete, "snap::delete::id=1");
        assert_ne!(put, delete);
    }

    #[test]
    fn test_binary_attributes_render_as_hex() {
        let request = WriteRequest::Delete(item(&[(
            "bin",
            AttributeValue::B(Blob::new(vec![0x0a, 0xff])),
        )]));
        assert_eq!(item_identifier("t", &request), "t::delete::bin=0aff");
    }

    #[test]
    fn test_key_identifier_follows_key_property_order() {
        let attributes = item(&[
            ("game", AttributeValue::S("chess".to_string())),
            ("age", AttributeValue::N("7".to_string())),
            ("ux", AttributeValue::S("ignored".to_string())),
        ]);
        let keys = vec!["game".to_string(), "age".to_string()];

        assert_eq!(key_identifier(&attributes, &keys), "game=chess:age=7");
        assert_eq!(
            key_identifier(&attributes, &["missing".to_string()]),
            "missing="
        );
    }
}
