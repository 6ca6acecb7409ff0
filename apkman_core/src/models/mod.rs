pub mod dashboard;
pub mod files;
pub mod projects;
pub mod users;
pub mod versions;
