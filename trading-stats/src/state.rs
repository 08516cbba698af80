use crate::error::SeriesError;

/// Lifecycle of one endpoint's series for the current window.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SeriesState<T> {
    #[default]
    NotRequested,
    Pending,
    Ready(T),
    Failed(SeriesError),
}

impl<T> SeriesState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, SeriesState::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SeriesState::Ready(_))
    }

    /// Data if the series resolved successfully.
    pub fn ready(&self) -> Option<&T> {
        match self {
            SeriesState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SeriesError> {
        match self {
            SeriesState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SeriesState::NotRequested => "not_requested",
            SeriesState::Pending => "pending",
            SeriesState::Ready(_) => "ready",
            SeriesState::Failed(_) => "failed",
        }
    }
}

impl<T> From<Result<T, SeriesError>> for SeriesState<T> {
    fn from(result: Result<T, SeriesError>) -> Self {
        match result {
            Ok(data) => SeriesState::Ready(data),
            Err(error) => SeriesState::Failed(error),
        }
    }
}
