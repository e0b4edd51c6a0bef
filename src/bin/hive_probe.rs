//! Diagnostic CLI: resolve a provider the way the library does and send it a prompt.

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use hive_llm::config::{EnvSnapshot, ProviderSettings};
use hive_llm::llm::models::DisplayFormat;
use hive_llm::llm::providers::OllamaClient;
use hive_llm::llm::{ContentGenerator, Generator, ModelCatalog, ProviderSelector, ProviderType};
use hive_llm::telemetry::{init_logging, LoggingConfig};
use hive_llm::types::{GenerationParams, Messages};
use std::io::Write;
use std::path::PathBuf;

/// Probe the configured LLM provider.
#[derive(Parser)]
#[command(name = "hive-probe", version, about)]
struct Cli {
    /// Settings file (.toml, .yaml or .json); environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Force a provider: bedrock or ollama.
    #[arg(short, long)]
    provider: Option<ProviderType>,

    /// Model hint, e.g. amazon.nova-pro-v1:0 or qwen2.5:7b.
    #[arg(short, long)]
    model: Option<String>,

    /// Stream the response chunk by chunk.
    #[arg(short, long)]
    stream: bool,

    /// Pull the model into the local daemon first.
    #[arg(long)]
    pull: bool,

    /// List known models for the resolved provider and exit.
    #[arg(long)]
    list: bool,

    /// Maximum output tokens.
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Prompt to send.
    #[arg(default_value = "Say hello in one short sentence.")]
    prompt: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guard = init_logging(LoggingConfig::from_env())?;
    let cli = Cli::parse();

    let env = EnvSnapshot::capture();
    let settings = match &cli.config {
        Some(path) => ProviderSettings::from_file(path)
            .with_context(|| format!("reading {}", path.display()))?
            .merge_with_env(&env)?,
        None => ProviderSettings::from_env(&env)?,
    };
    settings.validate()?;

    let selector = ProviderSelector::new(ModelCatalog::builtin(), settings, env);

    if cli.list {
        return list_models(&selector, cli.provider, cli.model.as_deref()).await;
    }

    if cli.pull {
        let selection = selector
            .resolve(cli.provider.or(Some(ProviderType::Ollama)), cli.model.as_deref())
            .into_result()?;
        let model = selection.model.context("no model to pull")?;
        let client = OllamaClient::new(selector.settings().ollama.base_url.clone());
        client
            .pull_model(&model, |progress| eprintln!("{}", progress.describe()))
            .await?;
    }

    let generator = Generator::connect_or_exit(&selector, cli.provider, cli.model.as_deref()).await?;
    println!(
        "{} / {}",
        generator.provider_type().display_name(),
        selector
            .catalog()
            .display_name(generator.model_id(), DisplayFormat::Full)
    );

    let mut messages = Messages::new();
    messages.add_user_message(&cli.prompt);
    let mut params = GenerationParams::default();
    if let Some(max_tokens) = cli.max_tokens {
        params = params.with_max_output_tokens(max_tokens);
    }

    if cli.stream {
        let mut stream = generator.generate_content_stream(&messages, &params).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            write!(stdout, "{}", chunk.text)?;
            stdout.flush()?;
            if let Some(usage) = chunk.usage {
                println!(
                    "\n[usage] prompt={} completion={} total={}",
                    usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                );
            }
        }
        println!();
    } else {
        let response = generator.generate_content(&messages, &params).await?;
        println!("{}", response.text);
        println!("[finish] {}", response.finish_reason);
        if let Some(usage) = response.usage {
            println!(
                "[usage] prompt={} completion={} total={}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
    }

    Ok(())
}

async fn list_models(
    selector: &ProviderSelector,
    provider: Option<ProviderType>,
    hint: Option<&str>,
) -> anyhow::Result<()> {
    let selection = selector.resolve(provider, hint).into_result()?;
    let catalog = selector.catalog();

    match selection.provider {
        ProviderType::Ollama => {
            let client = OllamaClient::new(selector.settings().ollama.base_url.clone());
            match client.list_models().await {
                Ok(models) => {
                    println!("Installed in {}:", client.base_url());
                    for model in models {
                        println!("  {}", model.name);
                    }
                }
                Err(e) => eprintln!("Could not reach Ollama: {}", e),
            }
            println!("Known:");
            for model in catalog.models_for(ProviderType::Ollama) {
                println!("  {}", model);
            }
        }
        ProviderType::Bedrock => {
            for model in catalog.bedrock_models().iter().filter(|m| m.supports_text()) {
                println!("  {:<45} {} ({})", model.model_id, model.model_name, model.vendor);
            }
        }
        other => println!("{} has no built-in model list", other.display_name()),
    }
    Ok(())
}
