// SPDX-License-Identifier: Apache-2.0

// Pushes generated OTLP telemetry to Kafka through the size-bounded exporter

use clap::{Args, Parser, Subcommand, ValueEnum};
use rotel_kafka_exporter::exporters::kafka::{
    KafkaExportable, KafkaExporter, build_logs_exporter, build_metrics_exporter,
    build_traces_exporter,
};
use rotel_kafka_exporter::init::kafka_exporter::KafkaExporterArgs;
use std::error::Error;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing::{error, info};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};
use utilities::otlp::FakeOTLP;

type BoxError = Box<dyn Error + Send + Sync>;

type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

#[derive(Debug, Parser)]
#[command(name = "kafka-push")]
#[command(bin_name = "kafka-push")]
#[command(version, about = "Push generated OTLP telemetry to Kafka")]
struct Arguments {
    #[arg(
        value_enum,
        long,
        global = true,
        env = "ROTEL_LOG_FORMAT",
        default_value = "text"
    )]
    /// Log format
    log_format: LogFormatArg,

    #[command(flatten)]
    kafka: KafkaExporterArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Push trace data
    Traces(GenerateArgs),
    /// Push metrics data
    Metrics(GenerateArgs),
    /// Push logs data
    Logs(GenerateArgs),
    /// Return version
    Version,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Number of resource spans/metrics/logs to generate
    #[arg(short, long, default_value = "1")]
    resources: usize,

    /// Number of spans/metrics/logs per resource
    #[arg(short, long, default_value = "1")]
    items: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

fn main() -> ExitCode {
    let opt = Arguments::parse();

    if let Commands::Version = opt.command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let _guard = match setup_logging(&opt.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: failed to setup logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Failed to push telemetry.");
            ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn run(opt: Arguments) -> Result<(), BoxError> {
    let config = opt.kafka.build_config();

    let cancel_token = CancellationToken::new();
    {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received.");
                token.cancel();
            }
        });
    }

    match opt.command {
        Commands::Traces(args) => {
            let exporter = build_traces_exporter(config)?;
            let batch = FakeOTLP::trace_service_request_with_spans(args.resources, args.items)
                .resource_spans;
            push_and_close(exporter, batch, &cancel_token).await
        }
        Commands::Metrics(args) => {
            let exporter = build_metrics_exporter(config)?;
            let batch = FakeOTLP::metrics_service_request_with_metrics(args.resources, args.items)
                .resource_metrics;
            push_and_close(exporter, batch, &cancel_token).await
        }
        Commands::Logs(args) => {
            let exporter = build_logs_exporter(config)?;
            let batch =
                FakeOTLP::logs_service_request_with_logs(args.resources, args.items).resource_logs;
            push_and_close(exporter, batch, &cancel_token).await
        }
        Commands::Version => Ok(()),
    }
}

async fn push_and_close<Resource: KafkaExportable>(
    exporter: KafkaExporter<Resource>,
    batch: Vec<Resource>,
    cancel_token: &CancellationToken,
) -> Result<(), BoxError> {
    let pushed = exporter.push(batch, cancel_token).await;
    // Flush whatever made it out before reporting
    exporter.close()?;
    pushed?;

    info!(topic = exporter.topic(), "Push complete.");
    Ok(())
}

fn setup_logging(log_format: &LogFormatArg) -> Result<LoggerGuard, BoxError> {
    LogTracer::init()?;

    let (non_blocking_writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?
        .add_directive("librdkafka=warn".parse()?);

    if *log_format == LogFormatArg::Json {
        let app_name = format!("{}-{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        let bunyan_formatting_layer = BunyanFormattingLayer::new(app_name, non_blocking_writer);

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(bunyan_formatting_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        use std::io;
        use std::io::IsTerminal;

        // Skip color codes when not in a terminal
        let use_ansi = io::stdout().is_terminal();

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_target(false)
            .with_level(true)
            .with_ansi(use_ansi)
            .compact();

        let subscriber = Registry::default().with(filter).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(guard)
}
