use crate::error::CoreError;
use crate::id::UserId;
use crate::time::{Timestamp, now_utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user within the system.
///
/// The upstream identity layer encodes these as numeric codes (0/1/2);
/// `code`/`from_code` preserve that mapping for callers that still speak it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Patient,
    MedicalCenter,
}

impl Role {
    pub fn code(&self) -> u8 {
        match self {
            Role::Admin => 0,
            Role::Patient => 1,
            Role::MedicalCenter => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, CoreError> {
        match code {
            0 => Ok(Role::Admin),
            1 => Ok(Role::Patient),
            2 => Ok(Role::MedicalCenter),
            other => Err(CoreError::invalid_role(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Patient => write!(f, "patient"),
            Role::MedicalCenter => write!(f, "medical_center"),
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "patient" => Ok(Role::Patient),
            "medical_center" => Ok(Role::MedicalCenter),
            other => Err(CoreError::invalid_role(other)),
        }
    }
}

/// Identity record linking an external subject and a wallet address to a role.
///
/// `subject` and `wallet_address` are each globally unique; the stores enforce
/// this on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub subject: String,
    pub wallet_address: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    pub profile_complete: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn new(subject: impl Into<String>, wallet_address: impl Into<String>, role: Role) -> Self {
        let now = now_utc();
        Self {
            id: UserId::generate(),
            subject: subject.into(),
            wallet_address: wallet_address.into(),
            role,
            email: None,
            name: None,
            profile_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_profile_complete(mut self, complete: bool) -> Self {
        self.profile_complete = complete;
        self
    }

    /// Apply a profile patch and refresh `updated_at`.
    pub fn apply_patch(&mut self, patch: UserPatch) {
        if let Some(email) = patch.email {
            self.email = Some(email);
        }
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(complete) = patch.profile_complete {
            self.profile_complete = complete;
        }
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = now_utc();
    }

    pub fn is_medical_center(&self) -> bool {
        matches!(self.role, Role::MedicalCenter)
    }

    pub fn is_patient(&self) -> bool {
        matches!(self.role, Role::Patient)
    }
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub profile_complete: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_code_roundtrip() {
        for role in [Role::Admin, Role::Patient, Role::MedicalCenter] {
            assert_eq!(Role::from_code(role.code()).unwrap(), role);
        }
        assert!(Role::from_code(3).is_err());
    }

    #[test]
    fn test_role_display_and_parse() {
        assert_eq!(Role::MedicalCenter.to_string(), "medical_center");
        assert_eq!("patient".parse::<Role>().unwrap(), Role::Patient);
        assert!("doctor".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::MedicalCenter).unwrap();
        assert_eq!(json, "\"medical_center\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::MedicalCenter);
    }

    #[test]
    fn test_user_new_defaults() {
        let user = User::new("auth0|abc", "0x1234", Role::Patient);
        assert!(!user.profile_complete);
        assert!(user.email.is_none());
        assert_eq!(user.created_at, user.updated_at);
        assert!(user.is_patient());
        assert!(!user.is_medical_center());
    }

    #[test]
    fn test_user_builder() {
        let user = User::new("auth0|abc", "0x1234", Role::MedicalCenter)
            .with_email("clinic@example.org")
            .with_name("Mercy Clinic")
            .with_profile_complete(true);
        assert_eq!(user.email.as_deref(), Some("clinic@example.org"));
        assert_eq!(user.name.as_deref(), Some("Mercy Clinic"));
        assert!(user.profile_complete);
    }

    #[test]
    fn test_apply_patch_refreshes_updated_at() {
        let mut user = User::new("auth0|abc", "0x1234", Role::Patient);
        let before = user.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(1));

        user.apply_patch(UserPatch {
            name: Some("Alice".into()),
            ..Default::default()
        });

        assert_eq!(user.name.as_deref(), Some("Alice"));
        assert!(user.updated_at > before);
        // untouched fields survive
        assert_eq!(user.subject, "auth0|abc");
        assert_eq!(user.role, Role::Patient);
    }

    #[test]
    fn test_user_wire_format() {
        let user = User::new("auth0|abc", "0x1234", Role::Patient);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json["walletAddress"].is_string());
        assert!(json["profileComplete"].is_boolean());
        assert!(json["createdAt"].is_string());
        // absent optionals are omitted, not null
        assert!(json.get("email").is_none());
    }
}
