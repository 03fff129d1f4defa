use axum::{routing::get, Router};
use brave_statement_agent::agent::{AgentOptions, StatementAgent, LAST_STATUS_KEY};
use brave_statement_agent::app_state::AppState;
use brave_statement_agent::brave::StatementsApi;
use brave_statement_agent::db::{EventsDb, KeyValueStore, LogsDb, MemoryDb};
use brave_statement_agent::handlers::{
    check_now_handler, events_to_csv_handler, list_events_handler, list_logs_handler,
    run_check_job, status_handler,
};
use clokwerk::{Scheduler, TimeUnits};
use std::time::Duration;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use tracing::info;

#[tokio::main]
async fn main() {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // agent options come from the environment (.env supported)
    let options = AgentOptions::from_env();
    let option_errors = options.validate();
    if !option_errors.is_empty() {
        for message in &option_errors {
            error!("Invalid agent option: {}", message);
        }
        return;
    }

    // init file DBs
    let events_db: EventsDb = match EventsDb::new_events_db() {
        Ok(db) => db,
        Err(e) => {
            error!("Error creating EventsDb: {:#?}", e);
            return;
        }
    };

    let logs_db: LogsDb = match LogsDb::new_logs_db() {
        Ok(db) => db,
        Err(e) => {
            error!("Error creating LogsDb: {:#?}", e);
            return;
        }
    };

    let memory_db: MemoryDb = match MemoryDb::new_memory_db() {
        Ok(db) => db,
        Err(e) => {
            error!("Error creating MemoryDb: {:#?}", e);
            return;
        }
    };

    // init statements API caller
    let api = StatementsApi::new(&options);

    // App State
    let app_state = AppState {
        agent: StatementAgent::new(options, api, memory_db, events_db, logs_db),
    };

    // prime the snapshot on first run instead of waiting a full schedule tick
    if app_state
        .agent
        .memory
        .get(LAST_STATUS_KEY)
        .unwrap_or_default()
        .is_empty()
    {
        info!("No statements snapshot found, running initial check.");
        run_check_job(app_state.clone());
    }

    // Create a new scheduler
    let mut scheduler = Scheduler::new();
    {
        let app_state = app_state.clone();
        let every_hours: u32 = dotenv::var("SCHEDULER_CHECK_EVERY_HOURS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(12);
        scheduler.every(every_hours.hours()).run(move || {
            run_check_job(app_state.clone());
        });
    }

    // Run scheduler loop in a spawned task
    tokio::spawn(async move {
        info!("Scheduler started.");
        loop {
            scheduler.run_pending(); // Ensure `run_pending` processes tasks
            tokio::time::sleep(Duration::from_secs(2)).await;
        }
    });

    // build our application with a route
    let app = Router::new()
        // `GET /` goes to `root`
        .route("/", get(root))
        .route("/events", get(list_events_handler))
        .route("/events/csv", get(events_to_csv_handler))
        .route("/check", get(check_now_handler))
        .route("/status", get(status_handler))
        .route("/logs", get(list_logs_handler))
        .with_state(app_state)
        .layer((
            TraceLayer::new_for_http(),
            // Graceful shutdown will wait for outstanding requests to complete. Add a timeout so
            // requests don't hang forever.
            TimeoutLayer::new(Duration::from_secs(10)),
        ));

    // run our app with hyper, listening globally on port 3000
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn root() -> String {
    "ok".to_string()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down.");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down.");
        },
    }
}
