//! Response shapes returned by the user requests.

use serde::{Deserialize, Serialize};

use crate::entity::User;

/// A user as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// User identifier.
    pub user_id: i32,
    /// Given names.
    pub given_names: String,
    /// Last name.
    pub last_name: String,
    /// Email address, empty if no contact details are stored.
    pub email_address: String,
    /// Mobile number, empty if no contact details are stored.
    pub mobile_number: String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        let (email_address, mobile_number) = user
            .contact_detail
            .as_ref()
            .map(|c| (c.email_address.clone(), c.mobile_number.clone()))
            .unwrap_or_default();

        Self {
            user_id: user.id,
            given_names: user.given_names.clone(),
            last_name: user.last_name.clone(),
            email_address,
            mobile_number,
        }
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedDto<T> {
    /// The page content.
    pub data: T,
    /// Whether a later page exists.
    pub has_next_page: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_without_contact() {
        let mut user = User::new("Ada", "Lovelace");
        user.id = 3;
        let dto = UserDto::from(&user);
        assert_eq!(dto.user_id, 3);
        assert_eq!(dto.email_address, "");
        assert_eq!(dto.mobile_number, "");
    }

    #[test]
    fn test_json_is_camel_case() {
        let user = User::new("Ada", "Lovelace").with_contact("ada@example.com", "0400000000");
        let json = serde_json::to_value(UserDto::from(user)).unwrap();
        assert_eq!(json["givenNames"], "Ada");
        assert_eq!(json["emailAddress"], "ada@example.com");
        assert_eq!(json["userId"], 0);

        let page = PaginatedDto {
            data: Vec::<UserDto>::new(),
            has_next_page: true,
        };
        let json = serde_json::to_value(page).unwrap();
        assert_eq!(json["hasNextPage"], true);
    }
}
