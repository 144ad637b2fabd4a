mod database {
    pub mod actions;
    pub mod error;
    pub mod export;
    pub mod form;
    pub mod pagination;
    pub mod schema;
}
mod constants;

pub use constants::*;
pub use database::*;
