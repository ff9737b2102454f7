pub mod command;
pub mod dispatcher;
pub mod message;

pub use command::{ChoiceContext, Command, ProtocolError};
pub use dispatcher::Dispatcher;
pub use message::{Envelope, NodeDetails, ServerMessage, TitleChoices};
