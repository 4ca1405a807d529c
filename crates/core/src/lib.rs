pub mod config;
pub mod dialogue;
pub mod domain;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use dialogue::{
    DialogueEngine, Extraction, Intent, OrderDispatch, OrderExtraction, TurnContext, TurnReply,
};
pub use domain::{CallId, CallSession, Catalog, CatalogEntry, CatalogError, OrderLine, Stage};
