use serde::Serialize;

pub const SUBSCRIBED: &str = "You have successfully subscribed.";
pub const ALREADY_SUBSCRIBED: &str = "You are already subscribed.";
pub const GENERIC_FAILURE: &str = "An error occurred while subscribing.";
pub const SERVER_ERROR: &str = "Server error occurred. Please try again later.";

/// What happened to a single submission. Returned to the visitor, never
/// stored.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionOutcome {
    Success(String),
    AlreadySubscribed(String),
    Error(String),
}

impl SubscriptionOutcome {
    pub fn subscribed() -> Self { Self::Success(SUBSCRIBED.to_string()) }

    pub fn already_subscribed() -> Self { Self::AlreadySubscribed(ALREADY_SUBSCRIBED.to_string()) }

    pub fn error(message: impl Into<String>) -> Self { Self::Error(message.into()) }

    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::AlreadySubscribed(m) | Self::Error(m) => m,
        }
    }

    pub fn is_success(&self) -> bool { matches!(self, Self::Success(_)) }
}

/// JSON body returned by the submission endpoint: `success` is only true for
/// `Success`; `outcome` lets scripts tell "already subscribed" apart from a
/// failure.
#[derive(Serialize, Debug)]
pub struct OutcomeEnvelope {
    pub success: bool,
    pub outcome: &'static str,
    pub data: String,
}

impl From<SubscriptionOutcome> for OutcomeEnvelope {
    fn from(value: SubscriptionOutcome) -> Self {
        let outcome = match value {
            SubscriptionOutcome::Success(_) => "success",
            SubscriptionOutcome::AlreadySubscribed(_) => "already_subscribed",
            SubscriptionOutcome::Error(_) => "error",
        };
        Self {
            success: value.is_success(),
            outcome,
            data: value.message().to_string(),
        }
    }
}
