//! Messages exchanged with the arc generation worker.

use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub count: usize,
    pub min_arc_distance: f64,
}

/// Worker reply. `Records` is left untyped so the caller validates the shape
/// instead of trusting the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum WorkerMessage {
    Records(serde_json::Value),
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::{GenerateRequest, WorkerMessage};
    use serde_json::json;

    #[test]
    fn request_and_reply_wire_shape() {
        let req = GenerateRequest {
            count: 40,
            min_arc_distance: 0.75,
        };
        assert_eq!(
            serde_json::to_value(req).unwrap(),
            json!({"count": 40, "minArcDistance": 0.75})
        );
        assert_eq!(
            serde_json::to_value(WorkerMessage::Error("boom".into())).unwrap(),
            json!({"type": "error", "payload": "boom"})
        );
    }
}
