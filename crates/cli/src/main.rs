#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use instant_translate_core::config::{
    resolve_api_key, resolve_optional_string, ApiKeys, AppConfig, ChunkSize, ConfigStore, Env,
    LangCode, MemoryStore, Pacing, StdEnv, AUTO_LANG, CONFIG_SECTION, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_DELAY_MS, DEFAULT_MIN_DELAY_MS, DEFAULT_TARGET_LANG, ENV_SERVICE_NAME,
    ENV_YANDEX_API_KEY, KEY_SERVICE_NAME,
};
use instant_translate_core::registry::Registry;
use instant_translate_core::translate::{
    ChannelNotifier, ReqwestFetcher, RunOutcome, TranslationJob, TranslationRequest,
};
use std::io::Read;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "instant-translate")]
#[command(about = "Translate text through a remote service, chunked at punctuation")]
struct Args {
    /// Text to translate; read from stdin when omitted.
    text: Option<String>,

    #[arg(long, default_value = AUTO_LANG)]
    from: String,

    #[arg(long, default_value = DEFAULT_TARGET_LANG)]
    to: String,

    /// Target used instead when the detected source already equals --to.
    #[arg(long)]
    swap: Option<String>,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long)]
    service: Option<String>,

    /// Switch to the backend after the selected one before translating.
    #[arg(long, default_value_t = false)]
    next_service: bool,

    #[arg(long)]
    yandex_api_key: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MIN_DELAY_MS)]
    min_delay_ms: u64,

    #[arg(long, default_value_t = DEFAULT_MAX_DELAY_MS)]
    max_delay_ms: u64,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();
    init_tracing(&args.log_level)?;

    let text = match args.text.take() {
        Some(t) => t,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read text from stdin")?;
            buf
        }
    };
    let next_service = args.next_service;

    let env = StdEnv;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        from = %cfg.from,
        to = %cfg.to,
        chunk_size = cfg.chunk_size.get(),
        "config loaded"
    );

    run_translation(cfg, text, next_service).await
}

async fn run_translation(cfg: AppConfig, text: String, next_service: bool) -> anyhow::Result<()> {
    let registry = Registry::default();
    let mut store = MemoryStore::default();
    if let Some(name) = &cfg.service_name {
        store.set(CONFIG_SECTION, KEY_SERVICE_NAME, name.clone());
    }

    let backend = if next_service {
        *registry.advance(&mut store)
    } else {
        *registry.selected(&store)
    };
    let provider = backend
        .build(&cfg.api_keys)
        .with_context(|| format!("cannot use {}", backend.name))?;
    let fetch = ReqwestFetcher::new().context("failed to build HTTP client")?;

    let (notifier, mut notifications) = ChannelNotifier::new();
    let request = TranslationRequest::from_config(&cfg, text);
    let handle = TranslationJob::new(provider, Arc::new(fetch), Arc::new(notifier), request)
        .with_pacing(cfg.pacing)
        .start();
    tracing::info!(service = handle.service_name(), "translation started");

    // The job owns the only sender, so this ends once the run is over.
    let host_queue = tokio::spawn(async move {
        while let Some(message) = notifications.recv().await {
            eprintln!("{message}");
        }
    });

    let outcome = handle.join().await.context("translation aborted")?;
    host_queue.await.context("notification queue panicked")?;

    match outcome {
        RunOutcome::Completed(result) | RunOutcome::Cancelled(result) => {
            println!("{}", result.text);
            eprintln!(
                "{} -> {}",
                result.detected_lang_label(),
                result.target.as_str()
            );
            Ok(())
        }
        RunOutcome::Failed => anyhow::bail!("no translation produced"),
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: Args, env: &impl Env) -> anyhow::Result<AppConfig> {
    let from = LangCode::new(args.from)?;
    let to = LangCode::new(args.to)?;
    let swap = args.swap.map(LangCode::new).transpose()?;
    let chunk_size = ChunkSize::new(args.chunk_size)?;
    let pacing = Pacing::new(args.min_delay_ms, args.max_delay_ms)?;

    let yandex = resolve_api_key(args.yandex_api_key, ENV_YANDEX_API_KEY, env)?;
    let service_name = resolve_optional_string(args.service, ENV_SERVICE_NAME, env);

    Ok(AppConfig {
        from,
        to,
        swap,
        chunk_size,
        service_name,
        api_keys: ApiKeys { yandex },
        pacing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use instant_translate_core::config::MapEnv;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("instant-translate").chain(argv.iter().copied()))
            .expect("valid args")
    }

    #[test]
    fn defaults_translate_from_auto_to_english() {
        let cfg = build_config(parse(&["hello"]), &MapEnv::default()).expect("valid config");
        assert!(cfg.from.is_auto());
        assert_eq!(cfg.to.as_str(), DEFAULT_TARGET_LANG);
        assert_eq!(cfg.chunk_size.get(), DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.swap, None);
        assert_eq!(cfg.service_name, None);
        assert_eq!(cfg.pacing, Pacing::default());
    }

    #[test]
    fn service_and_key_come_from_env_when_not_given() {
        let env = MapEnv::default()
            .with_var(ENV_SERVICE_NAME, "Yandex translator")
            .with_var(ENV_YANDEX_API_KEY, "env-key");
        let cfg = build_config(parse(&["--to", "fr", "--swap", "en", "hi"]), &env)
            .expect("valid config");
        assert_eq!(cfg.service_name.as_deref(), Some("Yandex translator"));
        assert_eq!(
            cfg.api_keys.yandex.as_ref().map(|k| k.expose()),
            Some("env-key")
        );
        assert_eq!(cfg.swap.as_ref().map(|l| l.as_str()), Some("en"));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(build_config(parse(&["--chunk-size", "0", "x"]), &MapEnv::default()).is_err());
        assert!(build_config(parse(&["--to", " ", "x"]), &MapEnv::default()).is_err());
        assert!(build_config(
            parse(&["--min-delay-ms", "10", "--max-delay-ms", "1", "x"]),
            &MapEnv::default()
        )
        .is_err());
    }
}
