pub mod store;

pub use store::{
    AUTH_TOKEN_KEY, FileSessionStore, InMemorySessionStore, SESSION_ID_KEY, SessionStore,
    StoreError,
};
