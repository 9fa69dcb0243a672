//! Repository traits for metadata operations.

pub mod datasets;
pub mod departments;
pub mod users;

pub use datasets::DatasetRepo;
pub use departments::DepartmentRepo;
pub use users::UserRepo;
