mod auth;
mod hardware;
mod project;

pub use auth::{handle_login, handle_logout, handle_register, index};
pub use hardware::{check_in, check_out, create_hardware_set, list_hardware_sets};
pub use project::{create_project, list_projects, toggle_membership};
