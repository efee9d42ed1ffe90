use uuid::Uuid;

/// Produces the id that ties together every message of one exchange.
pub trait CorrelationSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCorrelation;

impl CorrelationSource for UuidCorrelation {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
