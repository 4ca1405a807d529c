pub mod engine;
pub mod intent;
pub mod prompts;

pub use engine::{
    DialogueEngine, Extraction, OrderDispatch, OrderExtraction, TurnContext, TurnReply,
};
pub use intent::Intent;
