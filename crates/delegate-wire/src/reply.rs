use serde_json::{Map, Value};

use crate::WireError;

/// `action` value marking a reply as a nested render request.
pub const RENDER_ACTION: &str = "render";

/// Worker reply to a recipe exchange message.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReply {
    /// The worker needs the orchestrator to render `req` before it can continue.
    Render(RenderCallback),
    /// The exchange is finished.
    Completed(CompletedReply),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCallback {
    /// Request state the orchestrator should resume with.
    pub parent_req: Map<String, Value>,
    /// Nested request to render.
    pub req: Value,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletedReply {
    pub req: Map<String, Value>,
    pub res: Map<String, Value>,
}

impl WorkerReply {
    /// Classify a decoded reply body.
    ///
    /// Absent patches are treated as empty; present patches must be JSON objects.
    pub fn from_value(body: Value) -> Result<Self, WireError> {
        let Value::Object(mut body) = body else {
            return Err(WireError::malformed("reply body is not a JSON object"));
        };

        let is_render = body.get("action").and_then(Value::as_str) == Some(RENDER_ACTION);
        if !is_render {
            return Ok(Self::Completed(CompletedReply {
                req: take_patch(&mut body, "req")?,
                res: take_patch(&mut body, "res")?,
            }));
        }

        let mut data = match body.remove("data") {
            Some(Value::Object(data)) => data,
            _ => {
                return Err(WireError::malformed(
                    "render callback is missing its `data` object",
                ));
            }
        };
        let parent_req = take_patch(&mut data, "parentReq")?;
        let req = match data.remove("req") {
            Some(req @ Value::Object(_)) => req,
            _ => {
                return Err(WireError::malformed(
                    "render callback is missing the nested `req`",
                ));
            }
        };

        Ok(Self::Render(RenderCallback { parent_req, req }))
    }
}

fn take_patch(body: &mut Map<String, Value>, key: &str) -> Result<Map<String, Value>, WireError> {
    match body.remove(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(patch)) => Ok(patch),
        Some(_) => Err(WireError::malformed(format!(
            "`{key}` in worker reply is not an object"
        ))),
    }
}
