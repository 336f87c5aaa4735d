mod permission;
mod result;
mod role;
mod user;

pub use permission::*;
pub use result::*;
pub use role::*;
pub use user::*;
