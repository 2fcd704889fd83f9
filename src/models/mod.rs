mod forms;
mod hardware;
mod project;
mod user;

pub use forms::{
    AllocationForm, LoginForm, NewHardwareForm, NewProjectForm, ProjectsQuery, RegisterForm,
    ToggleForm,
};
pub use hardware::HardwareSet;
pub use project::Project;
pub use user::User;
