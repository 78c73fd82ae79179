use serde_json::{Value, json};

use crate::labels::LabelRegistry;
use crate::types::{NUM_CLASSES, NUM_FEATURES};

fn prediction_operation(summary: &str, request_schema: &str, with_backend_error: bool) -> Value {
    let mut responses = json!({
        "200": {
            "description": "Predicted label and per-label scores for every sample, in input order",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/PredictionResponse"}}}
        },
        "422": {
            "description": "crystalData is missing or a sample is not a list of 4 numbers",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}
        },
        "500": {
            "description": "The model failed to compute a prediction",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}
        }
    });
    if with_backend_error {
        responses["400"] = json!({
            "description": "model is missing or not one of the supported backends",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Error"}}}
        });
    }

    json!({
        "post": {
            "summary": summary,
            "requestBody": {
                "required": true,
                "content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{request_schema}")}}}
            },
            "responses": responses
        }
    })
}

/// OpenAPI 3 description of the prediction API, with score keys taken from
/// the configured labels.
pub fn document(labels: &LabelRegistry) -> Value {
    let score_properties: serde_json::Map<String, Value> = labels
        .as_slice()
        .iter()
        .map(|label| (label.clone(), json!({"type": "number"})))
        .collect();

    let crystal_data = json!({
        "type": "array",
        "minItems": 1,
        "items": {
            "type": "array",
            "items": {"type": "number"},
            "minItems": NUM_FEATURES,
            "maxItems": NUM_FEATURES
        }
    });

    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Astromech Crystal Classifier API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": format!(
                "Classifies {NUM_FEATURES}-feature crystal samples into one of {NUM_CLASSES} labels using a linear or a neural network model."
            )
        },
        "paths": {
            "/sklearn": prediction_operation("Predict with the linear model", "CrystalData", false),
            "/pytorch": prediction_operation("Predict with the neural network", "CrystalData", false),
            "/astromech": prediction_operation("Predict with the model named in the request", "AstromechData", true)
        },
        "components": {
            "schemas": {
                "CrystalData": {
                    "type": "object",
                    "required": ["crystalData"],
                    "properties": {"crystalData": crystal_data.clone()}
                },
                "AstromechData": {
                    "type": "object",
                    "required": ["crystalData", "model"],
                    "properties": {
                        "crystalData": crystal_data,
                        "model": {"type": "string", "enum": ["sklearn", "pytorch"]}
                    }
                },
                "PredictionScores": {
                    "type": "object",
                    "required": labels.as_slice(),
                    "properties": score_properties
                },
                "PredictionResponse": {
                    "type": "object",
                    "required": ["prediction", "scores"],
                    "properties": {
                        "prediction": {"type": "array", "items": {"type": "string", "enum": labels.as_slice()}},
                        "scores": {"type": "array", "items": {"$ref": "#/components/schemas/PredictionScores"}}
                    }
                },
                "Error": {
                    "type": "object",
                    "required": ["error", "detail"],
                    "properties": {
                        "error": {"type": "string", "enum": ["invalid_backend", "invalid_shape", "computation_error"]},
                        "detail": {"type": "string"}
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::labels;

    #[test]
    fn describes_all_prediction_endpoints() {
        let doc = document(&labels());
        for path in ["/sklearn", "/pytorch", "/astromech"] {
            assert!(doc["paths"][path]["post"].is_object(), "{path} missing");
        }
        assert!(doc["paths"]["/astromech"]["post"]["responses"]["400"].is_object());
        assert!(doc["paths"]["/sklearn"]["post"]["responses"]["400"].is_null());
    }

    #[test]
    fn score_schema_uses_configured_labels() {
        let doc = document(&labels());
        let scores = &doc["components"]["schemas"]["PredictionScores"];
        assert_eq!(scores["required"], json!(["blue", "green", "yellow"]));
        assert!(scores["properties"]["yellow"].is_object());
    }
}
