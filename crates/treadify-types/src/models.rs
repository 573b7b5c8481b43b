use serde::{Deserialize, Serialize};

/// The fixed set of roles a user can hold. Names match the `roles` table
/// exactly; lookups against the store are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Product Manager")]
    ProductManager,
    #[serde(rename = "Technical Lead")]
    TechnicalLead,
    #[serde(rename = "Developer")]
    Developer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::ProductManager, Role::TechnicalLead, Role::Developer];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::ProductManager => "Product Manager",
            Role::TechnicalLead => "Technical Lead",
            Role::Developer => "Developer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Product Manager" => Ok(Role::ProductManager),
            "Technical Lead" => Ok(Role::TechnicalLead),
            "Developer" => Ok(Role::Developer),
            _ => Err(()),
        }
    }
}

/// Capabilities gated by the RBAC authorizer.
///
/// Every gated handler declares one of these, and the same value is what the
/// authorizer looks up, so a handler can never ask for a permission name that
/// does not exist in the seed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    CreateProductChannel,
    AddFeature,
    DeprecateChannel,
    UpdateDeadline,
    GenerateJoinCode,
    ViewProductReport,
    ViewFeatureProgress,
    CreateGoal,
    CompleteGoal,
    ReviewCommit,
    SubmitCommit,
}

impl Permission {
    pub const ALL: [Permission; 11] = [
        Permission::CreateProductChannel,
        Permission::AddFeature,
        Permission::DeprecateChannel,
        Permission::UpdateDeadline,
        Permission::GenerateJoinCode,
        Permission::ViewProductReport,
        Permission::ViewFeatureProgress,
        Permission::CreateGoal,
        Permission::CompleteGoal,
        Permission::ReviewCommit,
        Permission::SubmitCommit,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::CreateProductChannel => "createProductChannel",
            Permission::AddFeature => "addFeature",
            Permission::DeprecateChannel => "deprecateChannel",
            Permission::UpdateDeadline => "updateDeadline",
            Permission::GenerateJoinCode => "generateJoinCode",
            Permission::ViewProductReport => "viewProductReport",
            Permission::ViewFeatureProgress => "viewFeatureProgress",
            Permission::CreateGoal => "createGoal",
            Permission::CompleteGoal => "completeGoal",
            Permission::ReviewCommit => "reviewCommit",
            Permission::SubmitCommit => "submitCommit",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Permission {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == value)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Deprecated,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Deprecated => "deprecated",
        }
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(ProductStatus::Active),
            "deprecated" => Ok(ProductStatus::Deprecated),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Open,
    Completed,
}

impl GoalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Open => "open",
            GoalStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for GoalStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(GoalStatus::Open),
            "completed" => Ok(GoalStatus::Completed),
            _ => Err(()),
        }
    }
}

/// Review state of a submitted commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommitStatus::Pending => "pending",
            CommitStatus::Approved => "approved",
            CommitStatus::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for CommitStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(CommitStatus::Pending),
            "approved" => Ok(CommitStatus::Approved),
            "rejected" => Ok(CommitStatus::Rejected),
            _ => Err(()),
        }
    }
}
