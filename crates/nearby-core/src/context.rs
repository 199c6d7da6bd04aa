//! Session Context: who the engine is acting for
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: String,
    /// Attached to lifecycle log lines of this session
    pub trace_id: String,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
