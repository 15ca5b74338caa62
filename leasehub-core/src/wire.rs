//! JSON wire format
//!
//! Stored documents are BSON; clients see plain JSON with hex ids and
//! RFC 3339 dates. Every response uses the [`Envelope`] shape
//! `{ success, message, data?, total? }`.

use bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::pagination::Paginated;
use crate::validation::ValidationError;

/// Convert a BSON value into client-facing JSON.
pub fn to_api_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or_else(|_| Value::from(dt.timestamp_millis())),
        Bson::Document(doc) => doc_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(to_api_json).collect()),
        Bson::Int32(n) => Value::from(n),
        Bson::Int64(n) => Value::from(n),
        Bson::Double(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s),
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}

/// Convert a whole document into a JSON object.
pub fn doc_json(doc: Document) -> Value {
    Value::Object(
        doc.into_iter()
            .map(|(key, value)| (key, to_api_json(value)))
            .collect(),
    )
}

pub fn docs_json(docs: Vec<Document>) -> Value {
    Value::Array(docs.into_iter().map(doc_json).collect())
}

/// Turn a client JSON object into a BSON document.
pub fn json_to_document(value: Value) -> Result<Document, ValidationError> {
    if !value.is_object() {
        return Err(ValidationError::InvalidFormat {
            field: "body",
            reason: "expected a JSON object",
        });
    }
    bson::to_document(&value).map_err(|_| ValidationError::InvalidFormat {
        field: "body",
        reason: "contains values that cannot be stored",
    })
}

/// Standard response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            total: None,
            page: None,
            size: None,
            extra: Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn document(self, doc: Document) -> Self {
        self.data(doc_json(doc))
    }

    pub fn documents(self, docs: Vec<Document>) -> Self {
        self.data(docs_json(docs))
    }

    pub fn total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Attach a page of documents along with total, page and size.
    pub fn paginated(mut self, result: Paginated<Document>) -> Self {
        self.total = Some(result.total);
        self.page = Some(result.page);
        self.size = Some(result.size);
        self.data(docs_json(result.items))
    }

    /// Extra top-level field (`isNewVisitor`, `results`, ...).
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_owned(), value.into());
        self
    }
}
