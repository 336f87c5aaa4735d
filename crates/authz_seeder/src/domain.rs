mod catalog;
mod seeder_service;
mod summary;

pub use catalog::*;
pub use seeder_service::*;
pub use summary::*;
