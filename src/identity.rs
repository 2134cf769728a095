//! Caller identity as resolved by the external auth provider.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineError;

/// Capability held by a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Donor,
    /// A recipient organization account. Older accounts say `ngo`.
    #[serde(alias = "ngo")]
    Recipient,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Admin => "admin",
            Role::Donor => "donor",
            Role::Recipient => "recipient",
        })
    }
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: Vec::new(),
            name: None,
            organization_name: None,
            email: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization_name = Some(organization.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

/// Who is making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(Caller),
}

impl Identity {
    pub fn caller(&self) -> Option<&Caller> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(caller) => Some(caller),
        }
    }

    pub fn require_authenticated(&self) -> Result<&Caller, EngineError> {
        self.caller().ok_or(EngineError::Unauthorized)
    }

    /// Authenticated and holding `role`.
    pub fn require_role(&self, role: Role) -> Result<&Caller, EngineError> {
        self.require_any_role(&[role])
    }

    /// Authenticated and holding at least one of `roles`.
    pub fn require_any_role(&self, roles: &[Role]) -> Result<&Caller, EngineError> {
        let caller = self.require_authenticated()?;
        if roles.iter().any(|role| caller.has_role(*role)) {
            Ok(caller)
        } else {
            let wanted = roles
                .iter()
                .map(Role::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            Err(EngineError::Forbidden(wanted))
        }
    }
}

impl From<Caller> for Identity {
    fn from(caller: Caller) -> Self {
        Identity::Authenticated(caller)
    }
}
