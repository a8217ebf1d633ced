use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::time::Instant;
use tagcache::{CacheConfig, CacheValue, MemoryBackend, RegionCache};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "tagcache-cli")]
#[command(about = "tagcache CLI - interactive typed-cache shell", long_about = None)]
struct Args {
    /// Cache region to operate on
    #[arg(short, long, default_value = "default")]
    region: String,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// Command to execute (if not in interactive mode)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

struct Shell {
    cache: RegionCache<MemoryBackend>,
    backend: Arc<MemoryBackend>,
}

impl Shell {
    fn new(region: &str, config: &CacheConfig) -> Self {
        let backend = Arc::new(MemoryBackend::new(config.to_memory_config()));
        let cache = RegionCache::new(backend.clone(), region)
            .with_default_ttl(config.region.default_ttl_secs);
        Self { cache, backend }
    }

    async fn execute_command(&self, command: &str, args: &[String]) -> Result<String> {
        let start = Instant::now();

        let response = match command.to_uppercase().as_str() {
            "SET" => self.cmd_set(args).await?,
            "GET" => self.cmd_get(args).await?,
            "DEL" | "DELETE" | "EVICT" => self.cmd_del(args).await?,
            "EXISTS" => self.cmd_exists(args).await?,
            "INCR" => self.cmd_incr(args).await?,
            "DECR" => self.cmd_decr(args).await?,
            "CLEAR" | "FLUSHDB" => self.cmd_clear().await?,
            "INFO" | "STATS" => self.cmd_stats()?,
            "HELP" => self.help_text(),
            _ => return Err(anyhow::anyhow!("Unknown command: {}", command)),
        };

        let elapsed = start.elapsed();
        Ok(format!(
            "{}\n{}",
            response,
            format!("({:.2?})", elapsed).dimmed()
        ))
    }

    async fn cmd_set(&self, args: &[String]) -> Result<String> {
        if args.len() < 2 {
            return Err(anyhow::anyhow!("Usage: SET key value [ttl]"));
        }

        let ttl = args.get(2).and_then(|s| s.parse::<u64>().ok());
        let value = parse_value(&args[1])?;

        self.cache.put(&args[0], value, ttl).await?;
        Ok("OK".green().to_string())
    }

    async fn cmd_get(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: GET key"));
        }

        match self.cache.get(&args[0]).await? {
            Some(CacheValue::Str(s)) => Ok(format!("\"{}\"", s)),
            Some(CacheValue::I32(n)) => Ok(format!("(i32) {}", n)),
            Some(CacheValue::I64(n)) => Ok(format!("(i64) {}", n)),
            Some(CacheValue::Opaque(v)) => Ok(format!("(opaque) {}", v)),
            None => Ok("(nil)".dimmed().to_string()),
        }
    }

    async fn cmd_del(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: DEL key [key ...]"));
        }

        for key in args {
            self.cache.evict(key).await?;
        }
        Ok(format!("(integer) {}", args.len()))
    }

    async fn cmd_exists(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: EXISTS key"));
        }

        let exists = self.cache.exists(&args[0]).await?;
        Ok(format!("(integer) {}", if exists { 1 } else { 0 }))
    }

    async fn cmd_incr(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: INCR key [ttl]"));
        }

        let ttl = args.get(1).and_then(|s| s.parse::<u64>().ok());
        let value = self.cache.incr(&args[0], ttl).await?;
        Ok(format!("(integer) {}", value))
    }

    async fn cmd_decr(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(anyhow::anyhow!("Usage: DECR key [ttl]"));
        }

        let ttl = args.get(1).and_then(|s| s.parse::<u64>().ok());
        let value = self.cache.decr(&args[0], ttl).await?;
        Ok(format!("(integer) {}", value))
    }

    async fn cmd_clear(&self) -> Result<String> {
        self.cache.clear().await;
        Ok("OK".green().to_string())
    }

    fn cmd_stats(&self) -> Result<String> {
        let stats = self.backend.stats();
        Ok(format!(
            "keys: {}\nmemory_bytes: {}\ngets: {}\nsets: {}\nhits: {}\nmisses: {}\nhit_rate: {:.2}%",
            stats.total_keys,
            stats.total_memory_bytes,
            stats.gets,
            stats.sets,
            stats.hits,
            stats.misses,
            stats.hit_rate() * 100.0
        ))
    }

    fn help_text(&self) -> String {
        [
            "Available commands:",
            "  SET key value [ttl]   Store a value (type inferred: i32, i64, JSON, string)",
            "  GET key               Fetch a value with its original type",
            "  DEL key [key ...]     Remove keys",
            "  EXISTS key            Check whether a key is live",
            "  INCR key [ttl]        Increment a counter",
            "  DECR key [ttl]        Decrement a counter",
            "  CLEAR                 Drop every key in the region",
            "  STATS                 Backend statistics",
            "  QUIT | EXIT           Leave the shell",
        ]
        .join("\n")
    }
}

/// Infer the typed value from its literal: i32 first, then i64, then a JSON
/// structure (stored as opaque), else a plain string.
fn parse_value(literal: &str) -> Result<CacheValue> {
    if let Ok(n) = literal.parse::<i32>() {
        return Ok(CacheValue::I32(n));
    }
    if let Ok(n) = literal.parse::<i64>() {
        return Ok(CacheValue::I64(n));
    }
    if literal.starts_with('{') || literal.starts_with('[') {
        let json: serde_json::Value =
            serde_json::from_str(literal).context("invalid JSON literal")?;
        return Ok(CacheValue::opaque(&json)?);
    }
    Ok(CacheValue::from(literal))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info level by default so user-facing output comes through untagged
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout)
        .with_env_filter(tracing_subscriber::EnvFilter::new(log_level))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CacheConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path))?,
        None => CacheConfig::default(),
    };

    let shell = Shell::new(&args.region, &config);
    shell.backend.start_ttl_cleanup();

    if !args.command.is_empty() {
        let cmd = &args.command[0];
        let cmd_args: Vec<String> = args.command[1..].to_vec();

        match shell.execute_command(cmd, &cmd_args).await {
            Ok(output) => {
                info!("{}", output);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "{}", format!("Error: {}", e).red());
                std::process::exit(1);
            }
        }
    } else {
        run_interactive(shell, &args.region).await
    }
}

async fn run_interactive(shell: Shell, region: &str) -> Result<()> {
    info!(
        "{}",
        format!("tagcache CLI v{}", env!("CARGO_PKG_VERSION"))
            .bold()
            .cyan()
    );
    info!("Region: {}", region);
    info!("Type {} for available commands\n", "HELP".bold());

    let mut rl = DefaultEditor::new()?;

    loop {
        let prompt = format!("{}> ", format!("tagcache {}", region).green());
        let readline = rl.readline(&prompt);

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                rl.add_history_entry(&line)?;

                let parts: Vec<String> = line.split_whitespace().map(String::from).collect();
                if parts.is_empty() {
                    continue;
                }

                let cmd = &parts[0];
                let args = &parts[1..];

                if cmd.to_uppercase() == "QUIT" || cmd.to_uppercase() == "EXIT" {
                    info!("Goodbye!");
                    break;
                }

                match shell.execute_command(cmd, args).await {
                    Ok(output) => info!("{}", output),
                    Err(e) => {
                        error!(error = %e, "{}", format!("Error: {}", e).red());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                info!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("Goodbye!");
                break;
            }
            Err(err) => {
                error!(error = ?err, "Readline error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
