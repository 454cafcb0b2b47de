//! Instructions sent alongside the receipt image

use crate::types::Intent;

/// Instruction templates, one per intent
pub struct ExtractionPrompts;

impl ExtractionPrompts {
    pub fn for_intent(intent: Intent) -> &'static str {
        match intent {
            Intent::DateTime => Self::date_time(),
            Intent::StructuredReceipt => Self::structured_receipt(),
            Intent::PlainText => Self::plain_text(),
        }
    }

    pub fn date_time() -> &'static str {
        "Extract ONLY the date and time from this receipt image. Return in format: 'Date: [date], Time: [time]'. Do not include any other information."
    }

    pub fn structured_receipt() -> &'static str {
        r#"You are reading a photographed receipt. Extract the following fields and respond with a single JSON object and nothing else:
{
  "title": "merchant or short description of the expense",
  "date": "date printed on the receipt",
  "time": "time printed on the receipt",
  "amount": "total amount paid, digits only",
  "currency": "ISO 4217 currency code",
  "status": "payment status, e.g. paid or pending",
  "activityType": "category such as transport, food, lodging or fuel"
}
Use null for any field that is not visible. Do not invent values."#
    }

    pub fn plain_text() -> &'static str {
        "Transcribe all legible text from this receipt image exactly as printed, line by line. Do not add commentary or formatting."
    }

    /// Token ceiling for the reply; the date/time answer is one short line
    pub fn max_tokens(intent: Intent) -> u32 {
        match intent {
            Intent::DateTime => 100,
            Intent::StructuredReceipt | Intent::PlainText => 1024,
        }
    }
}
