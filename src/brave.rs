mod statement;
mod api;

pub use self::statement::*;
pub use self::api::*;
