// Re-export all model types
pub use self::catalog::*;
pub use self::enums::*;
pub use self::errors::*;
pub use self::pagination::*;
pub use self::recipe::*;
pub use self::relation::*;
pub use self::shopping_list::*;
pub use self::user::*;
pub use self::validation::*;

mod catalog;
mod enums;
mod errors;
mod pagination;
mod recipe;
mod relation;
mod shopping_list;
mod user;
mod validation;
