use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Kind of content carried by a logical chunk.
///
/// Stored as lowercase text (`sql`, `data`, `chart`, `insights`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Sql,
    Data,
    Chart,
    Insights,
}

impl ChunkType {
    pub const ALL: [ChunkType; 4] = [
        ChunkType::Sql,
        ChunkType::Data,
        ChunkType::Chart,
        ChunkType::Insights,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Sql => "sql",
            ChunkType::Data => "data",
            ChunkType::Chart => "chart",
            ChunkType::Insights => "insights",
        }
    }

    /// JSON pointer of the repeating array that may be split across fragments.
    ///
    /// Only tabular results and charts carry one; the path is fixed per type.
    pub fn split_array_pointer(&self) -> Option<&'static str> {
        match self {
            ChunkType::Data => Some("/rows"),
            ChunkType::Chart => Some("/chartConfig/vegaSpec/data/values"),
            ChunkType::Sql | ChunkType::Insights => None,
        }
    }

    pub fn is_splittable(&self) -> bool {
        self.split_array_pointer().is_some()
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(ChunkType::Sql),
            "data" => Ok(ChunkType::Data),
            "chart" => Ok(ChunkType::Chart),
            "insights" => Ok(ChunkType::Insights),
            _ => Err(ValidationError::UnknownChunkType(s.to_string())),
        }
    }
}

/// Generated query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlPayload {
    pub sql_query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Tabular query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPayload {
    pub rows: Vec<Value>,
    pub schema: Value,
    pub name: String,
    #[serde(default = "default_execution_time")]
    pub execution_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn default_execution_time() -> String {
    "0ms".to_string()
}

/// Metadata derived while normalizing a chart specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub chart_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub template_used: bool,
}

/// Rendering hints passed through to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderingOptions {
    pub width: String,
    pub height: u32,
    pub theme: String,
}

impl Default for RenderingOptions {
    fn default() -> Self {
        Self {
            width: "container".to_string(),
            height: 400,
            theme: "default".to_string(),
        }
    }
}

/// A validated, cleaned chart specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    /// Vega-Lite document. Its `data.values` array is the splittable part.
    pub vega_spec: Value,
    pub chart_metadata: ChartMetadata,
    #[serde(default)]
    pub rendering_options: RenderingOptions,
}

/// Chart chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPayload {
    pub chart_config: ChartConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A document mentioned in narrative text, with its deep link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReference {
    pub title: String,
    pub filename: String,
    pub url: String,
    pub document_type: String,
}

/// Narrative insight text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_references: Vec<DocumentReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Typed content of one logical chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ChunkPayload {
    Sql(SqlPayload),
    Data(DataPayload),
    Chart(ChartPayload),
    Insights(InsightsPayload),
}

impl ChunkPayload {
    pub fn chunk_type(&self) -> ChunkType {
        match self {
            ChunkPayload::Sql(_) => ChunkType::Sql,
            ChunkPayload::Data(_) => ChunkType::Data,
            ChunkPayload::Chart(_) => ChunkType::Chart,
            ChunkPayload::Insights(_) => ChunkType::Insights,
        }
    }

    /// Encode the inner payload as the JSON document stored in fragments.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        match self {
            ChunkPayload::Sql(p) => serde_json::to_value(p),
            ChunkPayload::Data(p) => serde_json::to_value(p),
            ChunkPayload::Chart(p) => serde_json::to_value(p),
            ChunkPayload::Insights(p) => serde_json::to_value(p),
        }
    }

    /// Decode a stored document back into the payload for `chunk_type`.
    pub fn from_document(chunk_type: ChunkType, document: Value) -> Result<Self, serde_json::Error> {
        Ok(match chunk_type {
            ChunkType::Sql => ChunkPayload::Sql(serde_json::from_value(document)?),
            ChunkType::Data => ChunkPayload::Data(serde_json::from_value(document)?),
            ChunkType::Chart => ChunkPayload::Chart(serde_json::from_value(document)?),
            ChunkType::Insights => ChunkPayload::Insights(serde_json::from_value(document)?),
        })
    }
}

/// One typed unit of an assistant message, in stream order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalChunk {
    pub message_id: String,
    /// Dense per-message order over classified events.
    pub sequence: u32,
    pub payload: ChunkPayload,
}

impl LogicalChunk {
    pub fn new(message_id: &str, sequence: u32, payload: ChunkPayload) -> Self {
        Self {
            message_id: message_id.to_string(),
            sequence,
            payload,
        }
    }

    pub fn chunk_type(&self) -> ChunkType {
        self.payload.chunk_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chunk_type_parse_and_display() {
        for chunk_type in ChunkType::ALL {
            let parsed: ChunkType = chunk_type.to_string().parse().unwrap();
            assert_eq!(parsed, chunk_type);
        }
        assert_eq!("DATA".parse::<ChunkType>().unwrap(), ChunkType::Data);
        assert!("table".parse::<ChunkType>().is_err());
    }

    #[test]
    fn test_only_data_and_chart_are_splittable() {
        assert!(ChunkType::Data.is_splittable());
        assert!(ChunkType::Chart.is_splittable());
        assert!(!ChunkType::Sql.is_splittable());
        assert!(!ChunkType::Insights.is_splittable());
    }

    #[test]
    fn test_data_document_uses_rows_pointer() {
        let payload = ChunkPayload::Data(DataPayload {
            rows: vec![json!({"a": 1}), json!({"a": 2})],
            schema: json!({"fields": [{"name": "a"}]}),
            name: "result".to_string(),
            execution_time: "12ms".to_string(),
            timestamp: None,
        });

        let doc = payload.to_document().unwrap();
        let rows = doc
            .pointer(ChunkType::Data.split_array_pointer().unwrap())
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(doc["executionTime"], "12ms");
    }

    #[test]
    fn test_chart_document_uses_values_pointer() {
        let payload = ChunkPayload::Chart(ChartPayload {
            chart_config: ChartConfig {
                vega_spec: json!({"mark": "bar", "data": {"values": [{"x": 1}]}}),
                chart_metadata: ChartMetadata {
                    chart_type: "bar".to_string(),
                    title: None,
                    description: None,
                    template_used: false,
                },
                rendering_options: RenderingOptions::default(),
            },
            timestamp: None,
        });

        let doc = payload.to_document().unwrap();
        let values = doc
            .pointer(ChunkType::Chart.split_array_pointer().unwrap())
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(values, &vec![json!({"x": 1})]);
    }

    #[test]
    fn test_from_document_rejects_wrong_shape() {
        let doc = json!({"text": "hello"});
        assert!(ChunkPayload::from_document(ChunkType::Sql, doc.clone()).is_err());
        let insights = ChunkPayload::from_document(ChunkType::Insights, doc).unwrap();
        assert_eq!(insights.chunk_type(), ChunkType::Insights);
    }

    #[test]
    fn test_data_document_defaults_execution_time() {
        let doc = json!({"rows": [], "schema": {}, "name": "r"});
        let payload = ChunkPayload::from_document(ChunkType::Data, doc).unwrap();
        match payload {
            ChunkPayload::Data(data) => assert_eq!(data.execution_time, "0ms"),
            other => panic!("Expected data payload, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_chunk_serializes_type_and_data() {
        let chunk = LogicalChunk::new(
            "msg-1",
            3,
            ChunkPayload::Sql(SqlPayload {
                sql_query: "SELECT 1".to_string(),
                timestamp: None,
            }),
        );
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["messageId"], "msg-1");
        assert_eq!(json["sequence"], 3);
        assert_eq!(json["payload"]["type"], "sql");
        assert_eq!(json["payload"]["data"]["sqlQuery"], "SELECT 1");
    }
}
