mod config;
mod db;
mod errors;
mod interview;
mod llm_client;
mod models;
mod resume;
mod routes;
mod speech;
mod state;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::db::create_pool;
use crate::interview::answer_evaluator::TemplateAnswerEvaluator;
use crate::interview::archive::S3ReportArchive;
use crate::interview::lock::{LocalTurnLock, RedisTurnLock, TurnLock};
use crate::interview::overall_evaluator::TemplateOverallEvaluator;
use crate::interview::owners::PgOwnerDirectory;
use crate::interview::question_generator::QuestionGenerator;
use crate::interview::session::{InterviewSession, SessionParts, TerminationPolicy};
use crate::interview::store::PgInterviewStore;
use crate::llm_client::{LanguageModel, LlmClient, LlmConfig};
use crate::resume::PdfResumeExtractor;
use crate::routes::build_router;
use crate::speech::{DeepgramClient, SpeechTranscriber};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Turn lock: Redis when configured, otherwise in-process (single node only)
    let turn_lock: Arc<dyn TurnLock> = match &config.redis_url {
        Some(url) => {
            let redis = redis::Client::open(url.as_str())?;
            info!("Redis turn lock initialized");
            Arc::new(RedisTurnLock::new(redis))
        }
        None => {
            warn!("REDIS_URL not set; interview turns are serialized in-process only");
            Arc::new(LocalTurnLock::default())
        }
    };

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(LlmConfig {
        api_key: config.llm_api_key.clone(),
        model: config.llm_model.clone(),
    })?;
    info!("LLM client initialized (model: {})", llm.model());
    let llm: Arc<dyn LanguageModel> = Arc::new(llm);

    // Initialize speech recognition
    let recognizer = DeepgramClient::new(config.deepgram_api_key.clone())?;
    info!("Speech recognizer initialized");

    let session = InterviewSession::new(SessionParts {
        store: Arc::new(PgInterviewStore::new(db.clone())),
        owners: Arc::new(PgOwnerDirectory::new(db)),
        resumes: Arc::new(PdfResumeExtractor),
        transcriber: SpeechTranscriber::new(Arc::new(recognizer)),
        questions: QuestionGenerator::new(llm.clone()),
        answer_evaluator: Arc::new(TemplateAnswerEvaluator::new(llm.clone())),
        overall_evaluator: Arc::new(TemplateOverallEvaluator::new(llm)),
        turn_lock,
        archive: Arc::new(S3ReportArchive::new(s3, config.s3_bucket.clone())),
        policy: TerminationPolicy::default(),
    });
    info!(
        "Interview session ready ({} rounds per interview, upload limit {} bytes)",
        session.policy().rounds(),
        config.max_upload_bytes
    );

    // Build app state
    let state = AppState {
        session: Arc::new(session),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "interview-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
