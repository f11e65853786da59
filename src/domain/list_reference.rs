/// A provider-scoped audience identifier: MailChimp audience ID, Kit form
/// ID or MailerLite group ID. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ListReference(String);

impl ListReference {
    pub fn parse(id: String) -> Result<Self, String> {
        let id = id.trim().to_string();
        match id.is_empty() {
            true => Err("Empty list reference".to_string()),
            false => Ok(Self(id)),
        }
    }
}

impl AsRef<str> for ListReference {
    fn as_ref(&self) -> &str { &self.0 }
}

impl std::fmt::Display for ListReference {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
