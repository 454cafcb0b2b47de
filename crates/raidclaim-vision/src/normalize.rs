//! Turn a provider's raw reply into the canonical result

use serde_json::Value;

use crate::types::*;

/// Substituted when a plain-text extraction comes back empty
pub const NO_TEXT_EXTRACTED: &str = "No text extracted";

/// Normalize raw provider text for the given intent. Never fails: replies
/// that cannot be parsed degrade to `raw_response`.
pub fn normalize(raw_text: &str, intent: Intent) -> ExtractionResult {
    match intent {
        Intent::DateTime => ExtractionResult::PlainText {
            extracted_text: raw_text.to_string(),
        },
        Intent::PlainText => ExtractionResult::PlainText {
            extracted_text: if raw_text.is_empty() {
                NO_TEXT_EXTRACTED.to_string()
            } else {
                raw_text.to_string()
            },
        },
        Intent::StructuredReceipt => ExtractionResult::StructuredReceipt(
            extract_json_object(raw_text)
                .map(|object| receipt_fields(&object))
                .unwrap_or_else(|| ReceiptFields::degraded(raw_text)),
        ),
    }
}

/// Greedy `{ ... }` span from the first `{` to the last `}`, decoded as an object
pub fn extract_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn receipt_fields(object: &serde_json::Map<String, Value>) -> ReceiptFields {
    let field = |keys: &[&str]| keys.iter().find_map(|k| object.get(*k).and_then(scalar_string));

    ReceiptFields {
        title: field(&["title"]),
        date: field(&["date"]),
        time: field(&["time"]),
        amount: field(&["amount"]),
        currency: field(&["currency"]),
        status: field(&["status"]),
        activity_type: field(&["activityType", "activity_type"]),
        raw_response: None,
    }
}

/// Providers send amounts as numbers as often as strings
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_time_passes_through() {
        let result = normalize("Date: Nov 10, Time: 3:30 PM", Intent::DateTime);
        assert_eq!(result.extracted_text(), Some("Date: Nov 10, Time: 3:30 PM"));

        let result = normalize("", Intent::DateTime);
        assert_eq!(result.extracted_text(), Some(""));
    }

    #[test]
    fn test_plain_text_sentinel() {
        assert_eq!(
            normalize("", Intent::PlainText).extracted_text(),
            Some(NO_TEXT_EXTRACTED)
        );
        assert_eq!(
            normalize("TOTAL 450", Intent::PlainText).extracted_text(),
            Some("TOTAL 450")
        );
    }

    #[test]
    fn test_structured_receipt_wrapped_in_prose() {
        let raw = r#"Here you go: {"title":"Taxi","amount":"450","currency":"LKR"}"#;
        let result = normalize(raw, Intent::StructuredReceipt);

        assert_eq!(
            result.receipt(),
            Some(&ReceiptFields {
                title: Some("Taxi".into()),
                amount: Some("450".into()),
                currency: Some("LKR".into()),
                ..ReceiptFields::default()
            })
        );
    }

    #[test]
    fn test_structured_receipt_all_fields() {
        let raw = r#"```json
{"title":"Cafe Nero","date":"2024-11-10","time":"15:30","amount":12.5,"currency":"EUR","status":"paid","activityType":"food","extra":"ignored"}
```"#;
        let fields = normalize(raw, Intent::StructuredReceipt).receipt().cloned().unwrap();

        assert_eq!(fields.title.as_deref(), Some("Cafe Nero"));
        assert_eq!(fields.date.as_deref(), Some("2024-11-10"));
        assert_eq!(fields.time.as_deref(), Some("15:30"));
        assert_eq!(fields.amount.as_deref(), Some("12.5"));
        assert_eq!(fields.currency.as_deref(), Some("EUR"));
        assert_eq!(fields.status.as_deref(), Some("paid"));
        assert_eq!(fields.activity_type.as_deref(), Some("food"));
        assert_eq!(fields.raw_response, None);
    }

    #[test]
    fn test_snake_case_activity_type_and_nulls() {
        let raw = r#"{"activity_type":"transport","date":null}"#;
        let fields = normalize(raw, Intent::StructuredReceipt).receipt().cloned().unwrap();
        assert_eq!(fields.activity_type.as_deref(), Some("transport"));
        assert_eq!(fields.date, None);
    }

    #[test]
    fn test_no_json_degrades_to_raw_response() {
        let raw = "I could not read this receipt.";
        let fields = normalize(raw, Intent::StructuredReceipt).receipt().cloned().unwrap();
        assert_eq!(fields, ReceiptFields::degraded(raw));
    }

    #[test]
    fn test_unbalanced_or_non_object_json_degrades() {
        for raw in ["} nothing {", "{ not json }", "[1, 2]", "{\"a\": 1"] {
            let fields = normalize(raw, Intent::StructuredReceipt).receipt().cloned().unwrap();
            assert_eq!(fields.raw_response.as_deref(), Some(raw));
            assert_eq!(fields.title, None);
        }
    }

    #[test]
    fn test_greedy_span_covers_nested_objects() {
        let raw = r#"{"title":"Hotel","meta":{"x":1}} trailing"#;
        let object = extract_json_object(raw).unwrap();
        assert!(object.contains_key("meta"));
    }
}
