pub mod token_store;

pub use token_store::{create_shared_token_store, LinkedAccount, SharedTokenStore, TokenStore};
