pub mod catalog;
pub mod chat;
pub mod constants;
pub mod conversation;
pub mod debounce;
pub mod driver;
pub mod error;
pub mod filter;
pub mod relay;
pub mod relay_client;
pub mod render;
pub mod selection;
pub mod session;
pub mod storage;
pub mod stream;

pub use catalog::{Catalog, Product};
pub use conversation::{ChatMessage, Conversation, Role};
pub use error::{ChatError, RelayError};
pub use relay::{router, RelayConfig};
pub use relay_client::{RelayClient, RelayReply};
pub use session::{Effect, Session, UiEvent};
