//! User records: the model, its validation, and the sqlx-backed store.

mod model;
mod store;

pub use model::{InvalidUser, User, UserInput};
pub use store::{StoreError, UserStore};

#[cfg(test)]
pub(crate) use store::memory_store;
