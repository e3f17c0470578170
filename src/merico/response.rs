use serde_json::{Map, Value};

use crate::error::FetchError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    pub records: Vec<Map<String, Value>>,
    pub total_pages: Option<u32>,
    pub total: Option<u64>,
}

impl PageResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| FetchError::Decode(format!("invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, FetchError> {
        // Records live under `data`, `data.list` or `list` depending on the
        // endpoint. An object with none of those is an empty page.
        let Value::Object(mut root) = value else {
            return Err(FetchError::Decode("response is not a JSON object".to_string()));
        };

        let mut total_pages = read_u64(&root, &["totalPages", "pageCount"]);
        let mut total = read_u64(&root, &["total"]);

        let list = match root.remove("data") {
            Some(Value::Array(items)) => Some(items),
            Some(Value::Object(mut data)) => {
                total_pages = total_pages.or_else(|| read_u64(&data, &["totalPages", "pageCount"]));
                total = total.or_else(|| read_u64(&data, &["total"]));
                match data.remove("list") {
                    Some(Value::Array(items)) => Some(items),
                    Some(other) => return Err(unexpected("data.list", &other)),
                    None => None,
                }
            }
            Some(Value::Null) | None => None,
            Some(other) => return Err(unexpected("data", &other)),
        };

        let list = match list {
            Some(items) => items,
            None => match root.remove("list") {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => return Err(unexpected("list", &other)),
            },
        };

        let records = list
            .into_iter()
            .map(|item| match item {
                Value::Object(object) => Ok(object),
                other => Err(unexpected("record", &other)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            records,
            total_pages: total_pages.map(|n| n.min(u32::MAX as u64) as u32),
            total,
        })
    }
}

fn read_u64(object: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| object.get(*key).and_then(Value::as_u64))
}

fn unexpected(location: &str, value: &Value) -> FetchError {
    let found = match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    };
    FetchError::Decode(format!("unexpected {} at `{}`", found, location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_under_data_array() {
        let page = PageResponse::from_value(json!({
            "total": 2,
            "data": [{ "severity": "high" }, { "severity": "low" }]
        }))
        .unwrap();

        assert_eq!(page.records.len(), 2);
        assert_eq!(page.total, Some(2));
        assert_eq!(page.total_pages, None);
    }

    #[test]
    fn test_records_under_data_list() {
        let page = PageResponse::from_value(json!({
            "data": { "list": [{ "type": "method" }], "totalPages": 4 }
        }))
        .unwrap();

        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total_pages, Some(4));
    }

    #[test]
    fn test_records_under_top_level_list() {
        let page = PageResponse::from_value(json!({ "list": [{}, {}, {}], "pageCount": 1 })).unwrap();
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.total_pages, Some(1));
    }

    #[test]
    fn test_object_without_records_is_empty_page() {
        let page = PageResponse::from_value(json!({ "code": 0, "data": null })).unwrap();
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_malformed_bodies_are_decode_errors() {
        assert!(matches!(
            PageResponse::from_slice(b"<html>bad gateway</html>"),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            PageResponse::from_value(json!([1, 2])),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            PageResponse::from_value(json!({ "data": "oops" })),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            PageResponse::from_value(json!({ "data": [1] })),
            Err(FetchError::Decode(_))
        ));
    }
}
