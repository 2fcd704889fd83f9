use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NewHardwareForm {
    pub name: String,
    pub capacity: i64,
}

/// Shared request shape for check-out and check-in.
#[derive(Debug, Deserialize)]
pub struct AllocationForm {
    pub name: String,
    pub amount: i64,
    #[serde(rename = "projectId")]
    pub project_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NewProjectForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub projectid: String,
}

#[derive(Debug, Deserialize)]
pub struct ProjectsQuery {
    pub user: Option<String>,
}
