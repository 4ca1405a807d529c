use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use storeline_core::config::{AppConfig, ConfigError, LoadOptions};
use storeline_core::{Catalog, CatalogError, DialogueEngine};
use storeline_extractor::{ExtractorError, HttpLlmClient, OrderExtractor};
use storeline_notify::{
    HttpSmsTransport, MessageTransport, NoopTransport, NotifyError, OrderNotifier, Recipients,
};
use storeline_sessions::SessionStore;

pub struct Application {
    pub config: AppConfig,
    pub engine: Arc<DialogueEngine>,
    pub sessions: Arc<SessionStore>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("catalog snapshot load failed: {0}")]
    Catalog(#[from] CatalogError),
    #[error("extractor client setup failed: {0}")]
    Extractor(#[from] ExtractorError),
    #[error("sms transport setup failed: {0}")]
    SmsTransport(#[from] NotifyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = Arc::new(Catalog::from_path(&config.catalog.path)?);
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        path = %config.catalog.path.display(),
        entries = catalog.len(),
        "catalog snapshot loaded"
    );

    let extractor = Arc::new(OrderExtractor::new(HttpLlmClient::new(&config.llm)?));

    let transport: Arc<dyn MessageTransport> = if config.sms.enabled {
        Arc::new(HttpSmsTransport::new(&config.sms)?)
    } else {
        warn!(
            event_name = "system.bootstrap.sms_disabled",
            correlation_id = "bootstrap",
            "sms transport disabled; order summaries will be logged, not sent"
        );
        Arc::new(NoopTransport)
    };
    let notifier = Arc::new(OrderNotifier::new(
        transport,
        Recipients {
            customer_number: config.sms.customer_number.clone(),
            owner_number: config.sms.owner_number.clone(),
        },
    ));

    let sessions = Arc::new(SessionStore::new(std::time::Duration::from_secs(
        config.sessions.ttl_secs,
    )));

    let engine = Arc::new(DialogueEngine::new(
        catalog,
        extractor,
        notifier,
        config.store.name.clone(),
        config.dialogue.max_reasks,
    ));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        "application bootstrap complete"
    );

    Ok(Application { config, engine, sessions })
}

#[cfg(test)]
mod tests {
    use storeline_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn catalog_fixture() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join("catalog.toml"),
            "[[entries]]\nname = \"Biscuits\"\navailable = 5\n",
        )
        .expect("write catalog");
        dir
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_missing_catalog() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                catalog_path: Some("/nonexistent/catalog.toml".into()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(matches!(result, Err(BootstrapError::Catalog(_))));
    }

    #[tokio::test]
    async fn bootstrap_succeeds_with_defaults_and_a_catalog_snapshot() {
        let dir = catalog_fixture();
        let mut config = AppConfig::default();
        config.catalog.path = dir.path().join("catalog.toml");

        let app = crate::bootstrap::bootstrap_with_config(config).await.expect("bootstrap");

        assert_eq!(app.sessions.active_count(), 0);
        assert!(!app.config.sms.enabled);
    }
}
