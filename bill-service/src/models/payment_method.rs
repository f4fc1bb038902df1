use crate::settlement::money::extract_first_url;
use serde::Serialize;

/// How participants should pay the bill owner, as shown on the receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum PaymentMethod {
    /// A payment link to open.
    Link(String),
    /// Free text such as an account number.
    Text(String),
}

impl PaymentMethod {
    /// The first `http(s)://` URL becomes a link; anything else is shown as text.
    pub fn parse(raw: &str) -> Self {
        match extract_first_url(raw) {
            Some(url) => PaymentMethod::Link(url.to_string()),
            None => PaymentMethod::Text(raw.trim().to_string()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            PaymentMethod::Link(value) | PaymentMethod::Text(value) => value,
        }
    }
}
