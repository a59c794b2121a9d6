#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

/// What a caller may do. Handlers check capabilities, never role names.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Capability {
    /// Departments and employee records
    ManageOrganisation,
    ManageLeaveTypes,
    /// Approve/reject requests and consume balances
    ManageLeave,
    /// Read any employee's balances, not just one's own
    ViewAllBalances,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    pub fn can(self, capability: Capability) -> bool {
        match self {
            Role::Admin => true,
            Role::Hr => !matches!(capability, Capability::ManageLeaveTypes),
            Role::System => matches!(
                capability,
                Capability::ManageLeave | Capability::ViewAllBalances
            ),
            Role::ApiUser => matches!(capability, Capability::ViewAllBalances),
            Role::Employee => false,
        }
    }
}
