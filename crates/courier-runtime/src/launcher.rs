//! Bot launcher.
//!
//! Ties configuration, logging and the bot lifecycle together:
//!
//! ```text
//! load config ─▶ validate ─▶ init logging ─▶ apply dispatch policy
//!      ─▶ connect ─▶ listen until SIGINT/SIGTERM ─▶ drain ─▶ disconnect
//! ```
//!
//! ```rust,ignore
//! use courier_runtime::Launcher;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = build_bot();
//!     Launcher::builder().profile("production").build()?.launch(bot).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use courier_core::{Bot, wait_for_shutdown};
use tracing::{debug, info};

use crate::config::{ConfigLoader, CourierConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging::{LoggingBuilder, LoggingError};

/// Runs a bot under a loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    config: CourierConfig,
}

impl Launcher {
    /// Creates a launcher over an existing configuration.
    pub fn from_config(config: CourierConfig) -> Self {
        Self { config }
    }

    /// Starts building a launcher from layered configuration sources.
    pub fn builder() -> LauncherBuilder {
        LauncherBuilder::default()
    }

    /// The configuration this launcher runs with.
    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Runs `bot` until SIGINT or SIGTERM.
    pub async fn launch(self, bot: Bot) -> RuntimeResult<()> {
        self.launch_until(bot, wait_for_shutdown()).await
    }

    /// Runs `bot` until `shutdown` completes.
    ///
    /// Fails before connecting if the configuration is invalid, and with
    /// [`RuntimeError::Bot`](crate::RuntimeError::Bot) if the connection
    /// cannot be established.
    pub async fn launch_until<F>(self, mut bot: Bot, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        validate_config(&self.config)?;
        self.init_logging()?;

        bot.set_shutdown_policy(self.config.dispatch.shutdown_policy());
        let bot = Arc::new(bot);

        bot.connect().await?;
        info!(
            bot_type = %bot.bot_type(),
            drain_timeout_ms = self.config.dispatch.drain_timeout_ms,
            "Courier bot is running"
        );

        bot.start_listening_until(shutdown).await;
        info!("Courier bot stopped");

        Ok(())
    }

    fn init_logging(&self) -> Result<(), LoggingError> {
        match LoggingBuilder::from_config(&self.config.logging).try_init() {
            Err(LoggingError::Install(_)) => {
                debug!("Tracing subscriber already installed, keeping it");
                Ok(())
            }
            other => other,
        }
    }
}

/// Builder loading a [`Launcher`]'s configuration through [`ConfigLoader`].
#[derive(Default)]
pub struct LauncherBuilder {
    loader: ConfigLoader,
}

impl LauncherBuilder {
    /// Loads this file instead of searching for `courier.toml`.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Adds a directory to search for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.search_path(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Ignores `COURIER_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.loader = self.loader.without_env();
        self
    }

    /// Merges a configuration over every other source.
    pub fn merge(mut self, config: CourierConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Loads and validates the configuration.
    pub fn build(self) -> RuntimeResult<Launcher> {
        let config = self.loader.load()?;
        validate_config(&config)?;
        Ok(Launcher::from_config(config))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use courier_core::platform::discord;
    use courier_core::{BackendError, BackendResult, EventCallback, Gateway};

    use super::*;
    use crate::config::ConfigError;
    use crate::error::RuntimeError;

    #[derive(Default)]
    struct CountingGateway {
        opens: AtomicUsize,
        closes: AtomicUsize,
        refuse: bool,
    }

    #[async_trait]
    impl Gateway for CountingGateway {
        type Event = discord::MessageCreate;

        fn self_id(&self) -> Option<String> {
            Some("bot".into())
        }

        async fn open(&self, _on_event: EventCallback<Self::Event>) -> BackendResult<()> {
            if self.refuse {
                return Err(BackendError::connection_failed("401 unauthorized"));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn close(&self) -> BackendResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn send_text(&self, _channel: &str, _text: &str) -> BackendResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_launch_connects_and_disconnects() {
        let gateway = Arc::new(CountingGateway::default());
        let bot = Bot::discord(Arc::clone(&gateway));

        Launcher::default()
            .launch_until(bot, async {})
            .await
            .unwrap();

        assert_eq!(gateway.opens.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let gateway = Arc::new(CountingGateway {
            refuse: true,
            ..Default::default()
        });
        let result = Launcher::default()
            .launch_until(Bot::discord(Arc::clone(&gateway)), async {})
            .await;

        assert!(matches!(
            result,
            Err(RuntimeError::Bot(courier_core::Error::Backend(
                BackendError::ConnectionFailed { .. }
            )))
        ));
        assert_eq!(gateway.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_bot_is_rejected() {
        let result = Launcher::default()
            .launch_until(Bot::unsupported("matrix"), async {})
            .await;
        let Err(RuntimeError::Bot(err)) = result else {
            panic!("expected bot error, got {result:?}");
        };
        assert!(err.is_unrecognized_bot_type());
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_connect() {
        let gateway = Arc::new(CountingGateway::default());
        let mut config = CourierConfig::default();
        config.dispatch.drain_timeout_ms = 0;

        let result = Launcher::from_config(config)
            .launch_until(Bot::discord(Arc::clone(&gateway)), async {})
            .await;

        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::ValidationError { .. }))
        ));
        assert_eq!(gateway.opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_builder_applies_overrides() {
        figment::Jail::expect_with(|jail| {
            let mut config = CourierConfig::default();
            config.dispatch.drain_timeout_ms = 750;

            let launcher = Launcher::builder()
                .search_path(jail.directory())
                .without_env()
                .merge(config)
                .build()
                .map_err(|e| e.to_string())?;

            assert_eq!(launcher.config().dispatch.drain_timeout_ms, 750);
            Ok(())
        });
    }
}
