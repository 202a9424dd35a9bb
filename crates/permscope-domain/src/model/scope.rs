//! Scope context and directory records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The currently active organization, and optionally project and branch.
///
/// Supplied by the caller on every evaluation; the engine never stores it
/// globally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeContext {
    pub organization_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

impl ScopeContext {
    /// Creates a context scoped to an organization only.
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            project_id: None,
            branch_id: None,
        }
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }

    /// The organization id, if non-empty.
    pub fn organization(&self) -> Option<&str> {
        Some(self.organization_id.as_str()).filter(|id| !id.is_empty())
    }

    /// The project id, if present and non-empty.
    pub fn project(&self) -> Option<&str> {
        self.project_id.as_deref().filter(|id| !id.is_empty())
    }
}

impl fmt::Display for ScopeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "org={}", self.organization_id)?;
        if let Some(project) = &self.project_id {
            write!(f, " project={project}")?;
        }
        if let Some(branch) = &self.branch_id {
            write!(f, " branch={branch}")?;
        }
        Ok(())
    }
}

/// A project as listed by the project directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub organization_id: String,
}

impl ProjectRecord {
    pub fn new(id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
        }
    }
}

/// A branch as listed by the branch directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRecord {
    pub id: String,
    pub project_id: String,
}

impl BranchRecord {
    pub fn new(id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_optional_ids() {
        let ctx = ScopeContext::new("org-a")
            .with_project("p1")
            .with_branch("b1");
        assert_eq!(ctx.organization(), Some("org-a"));
        assert_eq!(ctx.project(), Some("p1"));
        assert_eq!(ctx.branch_id.as_deref(), Some("b1"));
        assert_eq!(ctx.to_string(), "org=org-a project=p1 branch=b1");
    }

    #[test]
    fn test_empty_ids_are_treated_as_missing() {
        let ctx = ScopeContext::new("").with_project("");
        assert_eq!(ctx.organization(), None);
        assert_eq!(ctx.project(), None);
    }
}
