use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};
use serde::Serialize;
use serde_json::Value;

use mirror::{
    EncodedTemporalLock, EncodingError, MirrorId, MirrorStore, PuzzleJson, TemporalLockPuzzle,
    VerdictLog,
};

use super::parse_json;
use crate::error::ApiError;
use crate::state::SharedState;

/// Text forms of an encoded puzzle.
#[derive(Debug, Serialize)]
pub struct EncodedView {
    pub scale_hex: String,
    pub scale_b64: String,
}

impl From<EncodedTemporalLock> for EncodedView {
    fn from(encoded: EncodedTemporalLock) -> Self {
        Self {
            scale_hex: encoded.to_hex(),
            scale_b64: encoded.to_base64(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntryTemporalResponse {
    #[serde(flatten)]
    pub encoded: EncodedView,
    pub puzzle: PuzzleJson,
}

/// `GET /mirror/{id}/temporal`
///
/// Non-numeric ids are treated like unknown ones.
pub async fn entry_lock<S>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> Result<Json<EntryTemporalResponse>, ApiError>
where
    S: MirrorStore + VerdictLog,
{
    let id: u64 = id.parse().map_err(|_| ApiError::NotFound)?;
    let view = state.service.temporal_lock(MirrorId(id))?;

    Ok(Json(EntryTemporalResponse {
        encoded: view.encoded.into(),
        puzzle: view.puzzle.to_json(),
    }))
}

/// `POST /encode_temporal_lock`
///
/// Accepts either `{"temporal_lock": {...}}` or the puzzle fields at the
/// top level. A missing, `null` or empty `temporal_lock` falls back to the
/// top level; any other non-object value is rejected.
pub async fn encode(body: Bytes) -> Result<Json<EncodedView>, ApiError> {
    let body = parse_json(&body)?;
    let fields = puzzle_fields(&body)?;
    let puzzle = TemporalLockPuzzle::from_json(fields).map_err(ApiError::EncodeFailed)?;
    Ok(Json(puzzle.encode().into()))
}

fn puzzle_fields(body: &Value) -> Result<&Value, ApiError> {
    if !body.is_object() {
        return Err(ApiError::EncodeFailed(EncodingError::Field {
            field: "temporal_lock",
            reason: "expected a JSON object".to_string(),
        }));
    }
    match body.get("temporal_lock") {
        None | Some(Value::Null) => Ok(body),
        Some(Value::Object(inner)) if inner.is_empty() => Ok(body),
        Some(nested @ Value::Object(_)) => Ok(nested),
        Some(other) => Err(ApiError::EncodeFailed(EncodingError::Field {
            field: "temporal_lock",
            reason: format!("expected a JSON object, got {other}"),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_object_wins_over_top_level() {
        let body = json!({"temporal_lock": {"reveal_time": 5}, "reveal_time": 9});
        assert_eq!(puzzle_fields(&body).unwrap(), &json!({"reveal_time": 5}));
    }

    #[test]
    fn empty_nested_object_falls_back_to_top_level() {
        let body = json!({"temporal_lock": {}, "reveal_time": 9});
        assert_eq!(puzzle_fields(&body).unwrap(), &body);
    }

    #[test]
    fn null_nested_value_falls_back_to_top_level() {
        let body = json!({"temporal_lock": null, "reveal_time": 9});
        assert_eq!(puzzle_fields(&body).unwrap(), &body);
    }

    #[test]
    fn scalar_nested_value_is_rejected() {
        for nested in [json!("0xabab"), json!(42), json!([1, 2, 3]), json!(true)] {
            let body = json!({"temporal_lock": nested, "reveal_time": 9});
            match puzzle_fields(&body).unwrap_err() {
                ApiError::EncodeFailed(EncodingError::Field { field, .. }) => {
                    assert_eq!(field, "temporal_lock")
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = puzzle_fields(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, ApiError::EncodeFailed(_)));
    }
}
