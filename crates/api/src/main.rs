//! Service entry point.

use std::process::ExitCode;
use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::workers::{WorkerDeps, Workers};
use api::{AppState, create_app, create_gateway_app, demo};
use assembly::AssemblyConfig;
use event_bus::{ConsumerConfig, InMemoryEventBus, ShutdownSignal, shutdown_channel};
use gateway::{AuthGateway, InMemorySessionStore, MetricsAuthMetrics, SessionIdentityService};
use notification::{LogChannel, MessagingChannel, TelegramChannel};
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use saga::{
    InMemoryPaymentService, InMemoryStockService, MetricsOrderMetrics, OrderSaga, SagaConfig,
};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for SIGINT or SIGTERM.
async fn os_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_order_store(config: &Config) -> Result<Arc<dyn OrderStore>, BoxError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresOrderStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using postgres order store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            Ok(Arc::new(InMemoryOrderStore::new()))
        }
    }
}

fn notification_channel(config: &Config) -> Result<Arc<dyn MessagingChannel>, BoxError> {
    match &config.telegram {
        Some(telegram) => {
            let channel = TelegramChannel::new(&telegram.bot_token, &telegram.chat_id)?;
            tracing::info!(chat_id = %telegram.chat_id, "notifications go to telegram");
            Ok(Arc::new(channel))
        }
        None => {
            tracing::info!("telegram not configured, notifications are logged");
            Ok(Arc::new(LogChannel))
        }
    }
}

async fn serve(
    addr: &str,
    app: axum::Router,
    shutdown: ShutdownSignal,
    name: &'static str,
) -> Result<(), BoxError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, server = name, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.triggered().await })
        .await?;
    tracing::info!(server = name, "server shut down gracefully");
    Ok(())
}

async fn run(config: Config) -> Result<(), BoxError> {
    // 1. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 2. Stores, bus and the stand-ins for the stock, payment and login services
    let store = open_order_store(&config).await?;
    let bus = InMemoryEventBus::new(config.bus_partitions);
    let stock = InMemoryStockService::new();
    let payment = InMemoryPaymentService::new();
    let sessions = InMemorySessionStore::new();
    demo::seed_parts(&stock).await;
    demo::seed_sessions(&sessions).await;

    // 3. Order saga and auth gateway
    let saga = OrderSaga::new(
        store.clone(),
        Arc::new(stock),
        Arc::new(payment),
        Arc::new(bus.clone()),
    )
    .with_metrics(Arc::new(MetricsOrderMetrics))
    .with_config(SagaConfig {
        rpc_timeout: config.rpc_timeout,
    });
    let gateway = AuthGateway::new(Arc::new(SessionIdentityService::new(Arc::new(sessions))))
        .with_metrics(Arc::new(MetricsAuthMetrics));

    // 4. Background consumers
    let (trigger, shutdown) = shutdown_channel();
    let workers = Workers::spawn(
        bus,
        WorkerDeps {
            store,
            channel: notification_channel(&config)?,
            assembly: AssemblyConfig {
                time_unit: config.assembly_time_unit,
                ..AssemblyConfig::default()
            },
            consumer: ConsumerConfig {
                max_attempts: config.consumer_max_attempts,
                ..ConsumerConfig::default()
            },
        },
        &shutdown,
    );
    tracing::info!(consumers = workers.len(), "consumers started");

    let trigger = Arc::new(trigger);
    tokio::spawn({
        let trigger = trigger.clone();
        async move {
            os_shutdown_signal().await;
            trigger.trigger();
        }
    });

    // 5. Serve the order API and the auth check until shutdown
    let api = create_app(Arc::new(AppState { saga }), metrics_handle);
    let gateway = create_gateway_app(Arc::new(gateway));
    let (api_addr, gateway_addr) = (config.addr(), config.gateway_addr());
    let served = tokio::try_join!(
        serve(&api_addr, api, shutdown.clone(), "api"),
        serve(&gateway_addr, gateway, shutdown.clone(), "gateway"),
    );

    // A server that failed to start stops the consumers too.
    trigger.trigger();
    workers.join().await;
    tracing::info!("consumers stopped");

    served.map(|_| ())
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::FAILURE
        }
    }
}
