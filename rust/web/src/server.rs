use crate::disconnect::DisconnectController;
use crate::handlers;
use crate::matchmaker::Matchmaker;
use crate::orchestrator::MoveOrchestrator;
use crate::persistence::{self, GameRepository, MatchRecorder};
use crate::registry::GameRegistry;
use crate::settings::{GameSettings, SettingsError};
use crate::telemetry::Telemetry;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::reply::Reply;
use warp::Filter;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    settings: GameSettings,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, settings: GameSettings) -> Self {
        Self {
            host: host.into(),
            port,
            settings,
        }
    }

    /// Ephemeral port and timings short enough for tests.
    pub fn for_tests() -> Self {
        Self::new(
            "127.0.0.1",
            0,
            GameSettings {
                matchmaking_timeout_ms: 150,
                grace_period_ms: 200,
                think_delay_ms: 20,
                ..GameSettings::default()
            },
        )
    }

    pub fn with_settings(mut self, settings: GameSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }
}

/// Shared services handed to every connection.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    registry: Arc<GameRegistry>,
    matchmaker: Arc<Matchmaker>,
    orchestrator: Arc<MoveOrchestrator>,
    disconnects: Arc<DisconnectController>,
    telemetry: Telemetry,
    repository: Arc<dyn GameRepository>,
}

impl AppContext {
    /// Builds the context with the repository named by `DATABASE_URL`.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_repository(config, persistence::repository_from_env())
    }

    pub fn with_repository(
        config: ServerConfig,
        repository: Arc<dyn GameRepository>,
    ) -> Result<Self, ServerError> {
        config.settings().validate()?;
        let settings = config.settings().clone();

        let opponent: Arc<dyn fourinrow_ai::Opponent> =
            fourinrow_ai::create_opponent(&settings.opponent)
                .map(Arc::from)
                .ok_or_else(|| {
                    SettingsError::Invalid(format!("unknown opponent `{}`", settings.opponent))
                })?;

        let telemetry = Telemetry::new();
        let registry = Arc::new(GameRegistry::new());
        let recorder = MatchRecorder::new(Arc::clone(&repository), telemetry.clone());
        let disconnects = Arc::new(DisconnectController::new(
            Arc::clone(&registry),
            recorder.clone(),
            telemetry.clone(),
            settings.grace_period(),
        ));
        let matchmaker = Arc::new(Matchmaker::new(
            Arc::clone(&registry),
            Arc::clone(&disconnects),
            telemetry.clone(),
            settings.matchmaking_timeout(),
        ));
        let orchestrator = Arc::new(MoveOrchestrator::new(
            opponent,
            recorder,
            settings.think_delay(),
        ));

        Ok(Self {
            config,
            registry,
            matchmaker,
            orchestrator,
            disconnects,
            telemetry,
            repository,
        })
    }

    pub fn new_for_tests() -> Self {
        Self::with_repository(
            ServerConfig::for_tests(),
            Arc::new(persistence::DisabledRepository),
        )
        .expect("test context")
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<GameRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn matchmaker(&self) -> Arc<Matchmaker> {
        Arc::clone(&self.matchmaker)
    }

    pub fn orchestrator(&self) -> Arc<MoveOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn disconnects(&self) -> Arc<DisconnectController> {
        Arc::clone(&self.disconnects)
    }

    pub fn telemetry(&self) -> Telemetry {
        self.telemetry.clone()
    }

    pub fn repository(&self) -> Arc<dyn GameRepository> {
        Arc::clone(&self.repository)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        Ok(Self {
            context: AppContext::new(config)?,
        })
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let bind_addr = Self::bind_addr(context.config())?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(Self::routes(&context))
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        tracing::info!(%addr, "fourinrow server listening");

        let task = tokio::spawn(server_future);
        let sweeper = Self::spawn_sweeper(&context);

        Ok(ServerHandle {
            addr,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            sweeper,
            context,
        })
    }

    /// Periodically evicts games finished longer than the retention period.
    fn spawn_sweeper(context: &AppContext) -> JoinHandle<()> {
        let registry = context.registry();
        let settings = context.config().settings().clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(settings.sweep_interval());
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(err) = registry.prune_finished(settings.retention()) {
                    tracing::error!(error = %err, "retention sweep failed");
                }
            }
        })
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;
        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(io_err) = err
            .source()
            .and_then(|source| source.downcast_ref::<std::io::Error>())
        {
            return ServerError::BindError(std::io::Error::new(io_err.kind(), io_err.to_string()));
        }
        ServerError::ConfigError(err.to_string())
    }

    pub fn routes(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        Self::health_route(context)
            .or(Self::leaderboard_route(context))
            .unify()
            .or(Self::ws_route(context))
            .unify()
            .boxed()
    }

    fn health_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let context = context.clone();
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .and(warp::any().map(move || context.clone()))
            .map(|context| handlers::health::health(context).into_response())
            .boxed()
    }

    fn leaderboard_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let context = context.clone();
        warp::path("leaderboard")
            .and(warp::get())
            .and(warp::path::end())
            .and(warp::any().map(move || context.clone()))
            .and_then(handlers::leaderboard::leaderboard)
            .boxed()
    }

    fn ws_route(context: &AppContext) -> BoxedFilter<(warp::reply::Response,)> {
        let context = context.clone();
        warp::path("ws")
            .and(warp::path::end())
            .and(warp::ws())
            .and(warp::query::<handlers::ws::JoinQuery>())
            .and(warp::any().map(move || context.clone()))
            .map(handlers::ws::upgrade)
            .boxed()
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    sweeper: JoinHandle<()>,
    context: AppContext,
}

impl ServerHandle {
    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        self.sweeper.abort();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.map_err(|err| {
                ServerError::ConfigError(format!("server task join error: {err}"))
            })?;
        }
        tracing::info!("fourinrow server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.sweeper.abort();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
