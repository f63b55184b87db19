//! Chart specification normalization.
//!
//! The classifier hands every chart spec to a [`ChartNormalizerTrait`]. The
//! default [`VegaLiteChartNormalizer`] checks the Vega-Lite structure and fills
//! in the fields the renderer relies on.

use serde_json::{json, Map, Value};
use thiserror::Error;

use querystream_core::{ChartConfig, ChartMetadata, RenderingOptions};

pub const VEGA_LITE_SCHEMA_URL: &str = "https://vega.github.io/schema/vega-lite/v5.json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartNormalizationError {
    #[error("Chart specification is not an object")]
    NotAnObject,

    #[error("Chart specification needs mark + encoding, layer, facet or concat")]
    MissingStructure,
}

/// Validates and cleans a raw chart specification.
pub trait ChartNormalizerTrait: Send + Sync {
    fn normalize(
        &self,
        spec: &Value,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<ChartConfig, ChartNormalizationError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VegaLiteChartNormalizer;

impl VegaLiteChartNormalizer {
    pub fn new() -> Self {
        Self
    }

    fn chart_type(spec: &Map<String, Value>) -> String {
        let mark = match spec.get("mark") {
            Some(Value::String(mark)) => Some(mark.as_str()),
            Some(Value::Object(mark)) => mark.get("type").and_then(Value::as_str),
            _ => None,
        };

        match mark {
            Some("arc") | Some("pie") => "pie".to_string(),
            Some("point") => "scatter".to_string(),
            Some(other) => other.to_string(),
            None if spec.contains_key("layer") => "layered".to_string(),
            None if spec.contains_key("facet") => "faceted".to_string(),
            None if ["concat", "hconcat", "vconcat"]
                .iter()
                .any(|k| spec.contains_key(*k)) =>
            {
                "concat".to_string()
            }
            None => "unknown".to_string(),
        }
    }

    fn spec_text(spec: &Map<String, Value>, key: &str) -> Option<String> {
        match spec.get(key) {
            Some(Value::String(text)) => Some(text.clone()),
            Some(Value::Object(obj)) => obj.get("text").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }
}

impl ChartNormalizerTrait for VegaLiteChartNormalizer {
    fn normalize(
        &self,
        spec: &Value,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<ChartConfig, ChartNormalizationError> {
        let Value::Object(raw) = spec else {
            return Err(ChartNormalizationError::NotAnObject);
        };

        let has_mark_encoding = raw.contains_key("mark") && raw.contains_key("encoding");
        let has_layer = raw.contains_key("layer");
        let has_facet = raw.contains_key("facet");
        let has_concat = ["concat", "hconcat", "vconcat"]
            .iter()
            .any(|k| raw.contains_key(*k));
        if !(has_mark_encoding || has_layer || has_facet || has_concat) {
            return Err(ChartNormalizationError::MissingStructure);
        }

        let mut cleaned = raw.clone();
        cleaned
            .entry("data")
            .or_insert_with(|| json!({ "values": [] }));
        cleaned
            .entry("$schema")
            .or_insert_with(|| Value::String(VEGA_LITE_SCHEMA_URL.to_string()));

        let chart_metadata = ChartMetadata {
            chart_type: Self::chart_type(raw),
            title: title
                .map(str::to_string)
                .or_else(|| Self::spec_text(raw, "title")),
            description: description
                .map(str::to_string)
                .or_else(|| Self::spec_text(raw, "description")),
            template_used: false,
        };

        Ok(ChartConfig {
            vega_spec: Value::Object(cleaned),
            chart_metadata,
            rendering_options: RenderingOptions::default(),
        })
    }
}
