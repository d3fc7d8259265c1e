//! Access-control status sets for users and chats.
//!
//! Both sets are closed; the string forms are what the persistence layer
//! stores and what admin commands accept.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// Can edit other admins' privileges.
    Superadmin,
    /// Can administrate the bot.
    Admin,
    /// Can send generation requests.
    Authorized,
    /// New user awaiting confirmation.
    Pending,
    /// Not authorized to create requests.
    Unauthorized,
    /// Blocked explicitly.
    Blocked,
    /// The user has blocked the bot.
    ReverseBlocked,
}

impl UserStatus {
    /// Whether this user may administrate statuses.
    pub fn is_admin(self) -> bool {
        matches!(self, UserStatus::Superadmin | UserStatus::Admin)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserStatus::Superadmin => "SUPERADMIN",
            UserStatus::Admin => "ADMIN",
            UserStatus::Authorized => "AUTHORIZED",
            UserStatus::Pending => "PENDING",
            UserStatus::Unauthorized => "UNAUTHORIZED",
            UserStatus::Blocked => "BLOCKED",
            UserStatus::ReverseBlocked => "REVERSE_BLOCKED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUPERADMIN" => Ok(UserStatus::Superadmin),
            "ADMIN" => Ok(UserStatus::Admin),
            "AUTHORIZED" => Ok(UserStatus::Authorized),
            "PENDING" => Ok(UserStatus::Pending),
            "UNAUTHORIZED" => Ok(UserStatus::Unauthorized),
            "BLOCKED" => Ok(UserStatus::Blocked),
            "REVERSE_BLOCKED" => Ok(UserStatus::ReverseBlocked),
            other => Err(format!("invalid user status: '{other}'")),
        }
    }
}

/// Status of a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatStatus {
    /// Any non-blocked member may send generation requests.
    Authorized,
    /// New chat awaiting confirmation.
    Pending,
    /// Not authorized for requests.
    Unauthorized,
    /// Blocked explicitly.
    Blocked,
}

impl fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatStatus::Authorized => "AUTHORIZED",
            ChatStatus::Pending => "PENDING",
            ChatStatus::Unauthorized => "UNAUTHORIZED",
            ChatStatus::Blocked => "BLOCKED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ChatStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AUTHORIZED" => Ok(ChatStatus::Authorized),
            "PENDING" => Ok(ChatStatus::Pending),
            "UNAUTHORIZED" => Ok(ChatStatus::Unauthorized),
            "BLOCKED" => Ok(ChatStatus::Blocked),
            other => Err(format!("invalid chat status: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_status_roundtrip() {
        for status in [
            UserStatus::Superadmin,
            UserStatus::Admin,
            UserStatus::Authorized,
            UserStatus::Pending,
            UserStatus::Unauthorized,
            UserStatus::Blocked,
            UserStatus::ReverseBlocked,
        ] {
            let s = status.to_string();
            let parsed: UserStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_chat_status_roundtrip() {
        for status in [
            ChatStatus::Authorized,
            ChatStatus::Pending,
            ChatStatus::Unauthorized,
            ChatStatus::Blocked,
        ] {
            let s = status.to_string();
            let parsed: ChatStatus = s.parse().unwrap();
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let parsed: ChatStatus = "authorized".parse().unwrap();
        assert_eq!(parsed, ChatStatus::Authorized);
        assert!("nonsense".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_is_admin() {
        assert!(UserStatus::Superadmin.is_admin());
        assert!(UserStatus::Admin.is_admin());
        assert!(!UserStatus::Authorized.is_admin());
    }
}
