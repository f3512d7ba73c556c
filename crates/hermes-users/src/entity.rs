//! Stored user entities.

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Store-assigned identifier. Zero until the user is added.
    pub id: i32,
    /// Given names.
    pub given_names: String,
    /// Last name.
    pub last_name: String,
    /// Contact details, if any were recorded.
    pub contact_detail: Option<ContactDetail>,
}

impl User {
    /// Creates an unsaved user.
    pub fn new(given_names: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: 0,
            given_names: given_names.into(),
            last_name: last_name.into(),
            contact_detail: None,
        }
    }

    /// Sets the contact details.
    #[must_use]
    pub fn with_contact(
        mut self,
        email_address: impl Into<String>,
        mobile_number: impl Into<String>,
    ) -> Self {
        self.contact_detail = Some(ContactDetail {
            email_address: email_address.into(),
            mobile_number: mobile_number.into(),
        });
        self
    }
}

/// How to reach a user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactDetail {
    /// Email address.
    pub email_address: String,
    /// Mobile number.
    pub mobile_number: String,
}
