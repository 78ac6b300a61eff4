mod core;
mod features;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, SwaggerInfoModifier};
use crate::core::{database, middleware};
use crate::features::applications::{routes as applications_routes, ApplicationService};
use crate::features::auth;
use crate::features::auth::routes as auth_routes;
use crate::features::catalog::{routes as catalog_routes, CatalogService};
use crate::features::categories::{routes as categories_routes, CategoryService};
use crate::features::executors::{ExecutorProfileStore, PgExecutorProfileStore};
use crate::features::notifications::{ChannelEventPublisher, EventPublisher, NotificationRelay};
use crate::features::orders::{routes as orders_routes, OrderService};
use axum::extract::DefaultBodyLimit;
use axum::{middleware::from_fn_with_state, Router};
use std::sync::Arc;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: available_cpus={}, tokio_worker_threads={}, pid={}",
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1),
        worker_threads,
        std::process::id()
    );

    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Auth
    let jwks_client = Arc::new(auth::JwksClient::new(
        &config.auth.issuer,
        config.auth.jwks_cache_ttl,
    ));
    let jwt_validator = Arc::new(auth::JwtValidator::new(
        jwks_client,
        config.auth.issuer.clone(),
        config.auth.audience.clone(),
        config.auth.claims_namespace.clone(),
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized");

    // Notifications: services publish into a bounded channel drained by the relay
    let (publisher, receiver) = ChannelEventPublisher::channel(config.notifications.queue_capacity);
    let events: Arc<dyn EventPublisher> = Arc::new(publisher);
    let relay = NotificationRelay::new(receiver, &config.notifications)?;
    tokio::spawn(relay.run());
    tracing::info!("Notification relay spawned");

    // Marketplace services
    let category_service = Arc::new(CategoryService::new(
        pool.clone(),
        config.marketplace.order_lock_timeout,
    ));
    let order_service = Arc::new(OrderService::new(
        pool.clone(),
        Arc::clone(&category_service),
        Arc::clone(&events),
        config.marketplace.order_lock_timeout,
    ));
    let application_service = Arc::new(ApplicationService::new(
        pool.clone(),
        Arc::clone(&events),
        config.marketplace.order_lock_timeout,
    ));
    let executor_profiles: Arc<dyn ExecutorProfileStore> =
        Arc::new(PgExecutorProfileStore::new(pool.clone()));
    let catalog_service = Arc::new(CatalogService::new(
        pool.clone(),
        Arc::clone(&category_service),
        executor_profiles,
    ));
    tracing::info!(
        "Marketplace services initialized (order lock timeout: {:?})",
        config.marketplace.order_lock_timeout
    );

    // Build application router with dynamic swagger config
    let swagger_modifier = SwaggerInfoModifier {
        title: config.swagger.title.clone(),
        version: config.swagger.version.clone(),
        description: config.swagger.description.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    swagger_modifier.modify(&mut openapi);

    let swagger = if let Some(credentials) = config.swagger.credentials() {
        tracing::info!("Swagger UI basic auth enabled");
        Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
            .layer(from_fn_with_state(
                Arc::new(credentials),
                middleware::basic_auth_middleware,
            ))
    } else {
        tracing::info!("Swagger UI basic auth disabled (no credentials configured)");
        Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(auth_routes::protected_routes())
        .merge(orders_routes::routes(Arc::clone(&order_service)))
        .merge(applications_routes::routes(Arc::clone(&application_service)))
        .merge(catalog_routes::protected_routes(Arc::clone(&catalog_service)))
        .merge(categories_routes::admin_routes(Arc::clone(&category_service)))
        .route_layer(from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", axum::routing::get(health_check));

    // Public routes (no auth required)
    let public_routes = Router::new()
        .merge(categories_routes::routes(category_service))
        .merge(catalog_routes::routes(catalog_service));

    let app = Router::new()
        .merge(swagger)
        .merge(protected_routes)
        .merge(public_routes)
        .merge(health_route)
        .layer(DefaultBodyLimit::max(config.app.max_request_body_size))
        .layer(middleware::cors_layer(&config.app.cors_allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(middleware::MakeSpanWithRequestId)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Generate X-Request-Id using UUID v7 (or use client-provided one)
        .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid));

    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    #[cfg(unix)]
    socket.set_reuse_port(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
