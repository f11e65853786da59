use validator::ValidateEmail;

/// An email address submitted through a subscription form. Only constructed
/// via `parse`, so holding one means the address passed format validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(email: String) -> Result<Self, String> {
        let email = email.trim().to_string();
        ValidateEmail::validate_email(&email)
            .then_some(Self(email.clone()))
            .ok_or(format!("Invalid email: {email:?}"))
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
