pub mod audio;
pub mod credential;
pub mod events;
pub mod session;
pub mod tools;
mod content;

pub use content::items::{FunctionCallItem, FunctionCallOutputItem, Item, ItemStatus};
pub use content::message::*;
pub use events::{ClientEvent, ServerEvent};
pub use session::Session;
