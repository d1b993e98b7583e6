use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use crisiswatch::config::Config;
use crisiswatch::detect::engine::CrisisEngine;
use crisiswatch::model::{Location, Report, Sentiment, SentimentLabel, SourceType};
use crisiswatch::{detect, storage};

#[derive(Parser)]
#[command(
    name = "crisiswatch",
    about = "Crisis detection and alert escalation engine for citizen reports",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (API server + periodic batch processing)
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },

    /// Run one batch pass over the unprocessed report window
    Process,

    /// Ingest a report from a JSON file
    Ingest {
        /// Path to the report JSON
        #[arg(long)]
        file: String,
    },

    /// Acknowledge an alert
    Acknowledge {
        /// Alert ID
        #[arg(long)]
        alert: String,

        /// Acting user ID
        #[arg(long)]
        user: String,
    },

    /// Resolve an alert and its linked incident
    Resolve {
        /// Alert ID
        #[arg(long)]
        alert: String,

        /// Resolution notes
        #[arg(long)]
        notes: String,
    },

    /// Run the built-in demonstration scenario against a scratch database
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(%bind, "Starting crisiswatch daemon");
            crisiswatch::serve(&bind, config).await?;
        }
        Commands::Process => {
            let pool = storage::open_pool(&config.db_path)?;
            let engine = CrisisEngine::from_config(pool, &config)?;
            let outcome = engine.process_reports().await?;

            println!("\n=== Crisiswatch Batch Run ===");
            println!("Reports fetched:   {}", outcome.fetched);
            println!("Anomalies flagged: {}", outcome.anomalies);
            println!("Geo clusters:      {}", outcome.clusters);
            println!("Incidents created: {}", outcome.incidents.len());
            for id in &outcome.incidents {
                println!(" - {}", id);
            }
            println!("Alerts raised:     {}", outcome.alerts.len());
            for id in &outcome.alerts {
                println!(" - {}", id);
            }
            println!("=============================\n");
        }
        Commands::Ingest { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let mut doc: serde_json::Value = serde_json::from_str(&raw)?;
            let Some(fields) = doc.as_object_mut() else {
                anyhow::bail!("Report file must contain a JSON object");
            };

            // Fill in what upstream ingestion normally assigns
            fields
                .entry("id")
                .or_insert_with(|| serde_json::json!(uuid::Uuid::new_v4().to_string()));
            fields
                .entry("created_at")
                .or_insert_with(|| serde_json::json!(Utc::now().to_rfc3339()));

            let report: Report = serde_json::from_value(doc)?;
            let pool = storage::open_pool(&config.db_path)?;
            storage::save_report(&pool, &report)?;
            println!("Report '{}' ingested.", report.id);
        }
        Commands::Acknowledge { alert, user } => {
            let pool = storage::open_pool(&config.db_path)?;
            if crisiswatch::alert::lifecycle::acknowledge(&pool, &alert, &user)? {
                println!("Alert '{}' acknowledged by '{}'.", alert, user);
            } else {
                anyhow::bail!("No unacknowledged alert '{}' found", alert);
            }
        }
        Commands::Resolve { alert, notes } => {
            let pool = storage::open_pool(&config.db_path)?;
            if crisiswatch::alert::lifecycle::resolve(&pool, &alert, &notes)? {
                println!("Alert '{}' resolved.", alert);
            } else {
                anyhow::bail!("Alert '{}' not found", alert);
            }
        }
        Commands::Demo => {
            run_demo(config).await?;
        }
    }

    Ok(())
}

/// The rue des Lilas fire: three close, high-priority reports that should
/// cluster, score at least Urgence, and raise an alert.
async fn run_demo(mut config: Config) -> Result<()> {
    let scratch = std::env::temp_dir().join(format!("crisiswatch-demo-{}.db", std::process::id()));
    config.db_path = scratch.to_string_lossy().into_owned();

    let pool = storage::open_pool(&config.db_path)?;
    let engine = CrisisEngine::from_config(pool.clone(), &config)?;

    let now = Utc::now();
    let reports = vec![
        demo_report(
            "report1",
            "Il y a un gros incendie dans l'immeuble au 15 rue des Lilas ! Urgent !",
            now,
            5,
            -0.9,
            (45.7578, 4.8320),
        ),
        demo_report(
            "report2",
            "Je vois des flammes sortir du toit de l'immeuble rue des Lilas !",
            now - chrono::Duration::minutes(5),
            4,
            -0.8,
            (45.7580, 4.8318),
        ),
        demo_report(
            "report3",
            "Beaucoup de fumée noire venant de l'immeuble à côté du parc",
            now - chrono::Duration::minutes(10),
            4,
            -0.7,
            (45.7575, 4.8325),
        ),
    ];
    for report in &reports {
        storage::save_report(&pool, report)?;
    }

    println!("=== CRISISWATCH DEMO ===");

    println!("\n-> Geographic clustering");
    let clusters = detect::geo::cluster_by_location(&reports, 1.0);
    println!("Clusters detected: {}", clusters.len());
    println!("First cluster size: {} reports", clusters[0].len());

    println!("\n-> Incident creation");
    let created = engine
        .aggregator()
        .create_incident(&reports, SourceType::Manual)
        .await?;
    println!("Incident created: {}", created.incident_id);
    match created.alert_id {
        Some(alert_id) => println!("Alert raised: {}", alert_id),
        None => println!("Severity below alert threshold, no alert raised"),
    }

    println!("\n=== END OF DEMO ===");
    println!("(scratch database: {})", config.db_path);
    Ok(())
}

fn demo_report(
    id: &str,
    text: &str,
    created_at: chrono::DateTime<Utc>,
    priority: i64,
    sentiment_score: f64,
    (lat, lng): (f64, f64),
) -> Report {
    Report {
        id: id.to_string(),
        text: text.to_string(),
        created_at,
        priority,
        categories: vec!["securite".to_string(), "incendie".to_string()],
        sentiment: Some(Sentiment {
            label: SentimentLabel::Negative,
            score: sentiment_score,
        }),
        location: Some(Location { lat, lng }),
        processed: false,
        incident_id: None,
    }
}
