mod password;
mod permission_registrar;
mod rbac_model;
mod traits;

pub use password::*;
pub use permission_registrar::*;
pub use rbac_model::*;
pub use traits::*;
