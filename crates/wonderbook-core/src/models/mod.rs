pub mod book;
pub mod collection;
pub mod comment;
pub mod user;

pub use book::*;
pub use collection::*;
pub use comment::*;
pub use user::*;
