//! Operation snapshot returned by one poll

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Remote operation status.
///
/// Empty or missing values map to `Unknown`, which the poller treats as an
/// API contract violation. Non-empty values outside the known set keep their
/// wire spelling in `Other` and count as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationStatus {
    Pending,
    Running,
    Canceling,
    Finished,
    Failed,
    Other(String),
    #[default]
    Unknown,
}

impl OperationStatus {
    /// Parse a wire status, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "" => Self::Unknown,
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "CANCELING" | "CANCELLING" => Self::Canceling,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            _ => Self::Other(trimmed.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Canceling => "CANCELING",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
            Self::Other(raw) => raw,
            Self::Unknown => "",
        }
    }

    /// FINISHED or FAILED.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OperationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse).unwrap_or_default())
    }
}

/// One poll of a remote operation. Replaced wholesale on every poll.
///
/// `operation_type` is only used in diagnostic messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationState {
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(rename = "type", default)]
    pub operation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl OperationState {
    pub fn new(status: OperationStatus, operation_type: impl Into<String>) -> Self {
        Self {
            status,
            operation_type: operation_type.into(),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }
}
