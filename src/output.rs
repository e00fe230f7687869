//! Data types produced by the pipeline and the record store.

use serde::{Deserialize, Serialize};

/// Schema-free document metadata: an ordered map from string keys to JSON
/// values.
///
/// The LLM is asked for a fixed set of string fields, but nothing enforces
/// that shape. Clients may also save arbitrary metadata directly, so the type
/// stays open.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A stored document record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Assigned by the store on insert; never reused.
    pub id: i64,
    pub metadata: Metadata,
    /// Where the uploaded file can be fetched, or any caller-supplied string
    /// for metadata-only saves.
    pub file_url: String,
}

/// Result of a successful upload.
///
/// Nothing is persisted in the record store at this point: the client
/// reviews the metadata and calls `/save` to keep it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub metadata: Metadata,
    pub file_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_serialises_with_snake_case_url() {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!("Doc"));
        let record = DocumentRecord {
            id: 7,
            metadata,
            file_url: "http://host/files/doc.pdf".into(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"id": 7, "metadata": {"title": "Doc"}, "file_url": "http://host/files/doc.pdf"})
        );
    }

    #[test]
    fn metadata_keeps_insertion_order() {
        let metadata: Metadata = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<&str> = metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }
}
