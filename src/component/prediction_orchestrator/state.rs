use std::fmt;

/// 預測流程狀態，只由協調器寫入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrchestrationState {
    #[default]
    Idle,
    AwaitingFile,
    Sampling,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    AssetValidated,
    Predict,
    SamplingSettled,
    ResponseAccepted,
    ResponseRejected,
    Reset,
}

impl OrchestrationState {
    /// 狀態轉換表；不允許的轉換回傳 `None`
    ///
    /// 新媒體在任何狀態都會被接受並取代進行中的工作；
    /// Failed 可以再次 `predict()`（由使用者手動重試）。
    #[must_use]
    pub const fn next(self, event: Event) -> Option<Self> {
        match (self, event) {
            (_, Event::AssetValidated) => Some(Self::AwaitingFile),
            (Self::AwaitingFile | Self::Failed, Event::Predict) => Some(Self::Sampling),
            (Self::Sampling, Event::SamplingSettled) => Some(Self::Submitting),
            (Self::Submitting, Event::ResponseAccepted) => Some(Self::Succeeded),
            (Self::Submitting, Event::ResponseRejected) => Some(Self::Failed),
            (_, Event::Reset) => Some(Self::Idle),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_in_flight(self) -> bool {
        matches!(self, Self::Sampling | Self::Submitting)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingFile => "awaiting_file",
            Self::Sampling => "sampling",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
