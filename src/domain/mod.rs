mod list_reference;
mod provider;
mod subscriber_email;
mod subscriber_name;
mod subscription_outcome;
mod subscription_request;
// allow external `use` statements to skip `subscriber_email` etc
pub use list_reference::ListReference;
pub use provider::Provider;
pub use subscriber_email::SubscriberEmail;
pub use subscriber_name::SubscriberName;
pub use subscription_outcome::*;
pub use subscription_request::Submission;
pub use subscription_request::SubscriptionRequest;
pub use subscription_request::ValidationError;
