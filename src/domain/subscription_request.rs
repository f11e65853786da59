use super::ListReference;
use super::Provider;
use super::SubscriberEmail;
use super::SubscriberName;

/// Raw, unvalidated fields of a form submission, as posted by the browser.
#[derive(Debug, Default, Clone)]
pub struct Submission {
    pub service: Option<String>,
    pub list_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Reasons a submission is rejected before any provider is contacted. The
/// `Display` strings are shown to the visitor as-is.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Something is wrong with your list ID.")]
    ListId,
    #[error("Email is invalid.")]
    Email,
}

/// A parsed submission. Holding one means the email is well-formed and the
/// list reference is non-empty; the name, if any, is already cleaned up. It
/// is never persisted.
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub provider: Provider,
    pub list: ListReference,
    pub email: SubscriberEmail,
    pub name: Option<SubscriberName>,
}

impl TryFrom<Submission> for SubscriptionRequest {
    type Error = ValidationError;
    fn try_from(value: Submission) -> Result<Self, Self::Error> {
        let provider = Provider::resolve(value.service.as_deref());
        let list = ListReference::parse(value.list_id.unwrap_or_default())
            .map_err(|_| ValidationError::ListId)?;
        let email = SubscriberEmail::parse(value.email.unwrap_or_default())
            .map_err(|_| ValidationError::Email)?;
        let name = value.name.and_then(SubscriberName::parse);
        Ok(Self {
            provider,
            list,
            email,
            name,
        })
    }
}
