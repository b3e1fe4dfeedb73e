//! pda CLI - コマンドラインインターフェース
//!
//! クラッシュダンプをデバッガで解析し、スタックトレースを表示します。

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};
use pda_core::{
    analyze, AnalysisCache, CommandRunner, Debugger, DebuggerCommand, DebuggerConfig, Platform, RunOptions,
    WinDbg,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// pda - Post-mortem Dump Analyzer
#[derive(Parser)]
#[command(name = "pda")]
#[command(version = "0.1.0")]
#[command(about = "Analyze crash dumps with the platform debugger", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: PdaCommand,
}

/// デバッガの設定（環境変数でも指定できる）
#[derive(Args)]
struct ConfigArgs {
    /// Path to the debugger executable
    #[arg(long, global = true, env = "PDA_DEBUGGER")]
    debugger: Option<PathBuf>,

    /// Local directory for downloaded symbols
    #[arg(long, global = true, env = "PDA_SYMBOL_CACHE")]
    symbol_cache: Option<PathBuf>,

    /// Upstream symbol server
    #[arg(long, global = true, env = "PDA_SYMBOL_SERVER")]
    symbol_server: Option<String>,

    /// Seconds allowed for each debugger invocation
    #[arg(long, global = true, env = "PDA_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Maximum number of frames to extract
    #[arg(long, global = true, env = "PDA_MAX_STACK_DEPTH")]
    max_stack_depth: Option<usize>,
}

impl ConfigArgs {
    fn to_config(&self) -> DebuggerConfig {
        let mut config = DebuggerConfig::default();
        if let Some(path) = &self.debugger {
            config = config.with_debugger_path(path);
        }
        if let Some(path) = &self.symbol_cache {
            config = config.with_symbol_cache(path);
        }
        if let Some(server) = &self.symbol_server {
            config = config.with_symbol_server(server.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(depth) = self.max_stack_depth {
            config = config.with_max_stack_depth(depth);
        }
        config
    }
}

/// 解析対象のクラッシュダンプ
#[derive(Args)]
struct DumpArgs {
    /// Path to the crash dump
    dump: PathBuf,

    /// Symbol location searched after the local cache
    #[arg(short, long, default_value = "")]
    symbols: String,

    /// Executable that produced the crash dump
    #[arg(short, long)]
    executable: Option<PathBuf>,

    /// Platform the crash dump was taken on
    #[arg(long, default_value = "Windows")]
    platform: Platform,
}

impl DumpArgs {
    fn check(&self) -> Result<()> {
        ensure!(self.dump.is_file(), "Crash dump not found: {}", self.dump.display());
        Ok(())
    }

    /// コマンドを直接送るための cdb バックエンド
    fn open_windbg(&self, config: &DebuggerConfig) -> Result<WinDbg> {
        self.check()?;
        match self.platform {
            Platform::Windows => Ok(WinDbg::new(&self.dump, &self.symbols, self.executable.clone(), config)?),
        }
    }
}

#[derive(Subcommand)]
enum PdaCommand {
    /// Analyze a crash dump and print its stack trace
    Analyze {
        #[command(flatten)]
        target: DumpArgs,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,

        /// Cache file (default: <dump>.analysis.json)
        #[arg(long, conflicts_with = "no_cache")]
        cache: Option<PathBuf>,

        /// Do not read or write the analysis cache
        #[arg(long)]
        no_cache: bool,

        /// Ignore a cached analysis and analyze again
        #[arg(long)]
        refresh: bool,
    },

    /// Run debugger commands against a crash dump one at a time
    Shell {
        #[command(flatten)]
        target: DumpArgs,
    },

    /// Open an interactive debugger session on a crash dump
    Session {
        #[command(flatten)]
        target: DumpArgs,
    },

    /// Remove the cached analysis of a crash dump
    ClearCache {
        /// Path to the crash dump
        dump: PathBuf,

        /// Cache file (default: <dump>.analysis.json)
        #[arg(long)]
        cache: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = cli.config.to_config();

    match cli.command {
        PdaCommand::Analyze { target, json, cache, no_cache, refresh } => {
            let cache = (!no_cache).then(|| cache_for(&target.dump, cache));
            run_analyze(&target, &config, cache, refresh, json)
        }
        PdaCommand::Shell { target } => {
            let windbg = target.open_windbg(&config)?;
            run_repl(&windbg)
        }
        PdaCommand::Session { target } => run_session(&target, &config),
        PdaCommand::ClearCache { dump, cache } => {
            let cache = cache_for(&dump, cache);
            if cache.remove()? {
                println!("Removed {}", cache.path().display());
            } else {
                println!("No cached analysis at {}", cache.path().display());
            }
            Ok(())
        }
    }
}

/// ログの出力先を標準エラー出力に設定する（`RUST_LOG` が優先）
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cache_for(dump: &Path, cache: Option<PathBuf>) -> AnalysisCache {
    match cache {
        Some(path) => AnalysisCache::new(path),
        None => AnalysisCache::beside(dump),
    }
}

/// 解析を実行して結果を表示する
fn run_analyze(
    target: &DumpArgs,
    config: &DebuggerConfig,
    cache: Option<AnalysisCache>,
    refresh: bool,
    json: bool,
) -> Result<()> {
    target.check()?;
    let run = || {
        let debugger = target.platform.open(&target.dump, &target.symbols, target.executable.clone(), config)?;
        analyze(debugger.as_ref())
    };

    let analysis = match cache {
        Some(cache) => {
            if refresh && cache.remove()? {
                info!("discarded cached analysis {}", cache.path().display());
            }
            cache.load_or_analyze(run)?
        }
        None => run()?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print!("{}", analysis);
    }
    Ok(())
}

/// デバッガをコンソールに接続して起動する
fn run_session(target: &DumpArgs, config: &DebuggerConfig) -> Result<()> {
    let windbg = target.open_windbg(config)?;
    let driver = windbg.runner();
    println!("Debugger: {}", driver.debugger_path().display());
    println!("Crash dump: {}", driver.crash_dump().display());
    println!("Symbol path: {}", driver.symbols());
    println!("The exception context is selected. Type 'q' to leave the debugger.");
    println!();

    driver.run_commands(&[], &RunOptions::interactive())?;

    println!();
    println!("Debugger session ended");
    Ok(())
}

/// REPLループを実行する
fn run_repl(windbg: &WinDbg) -> Result<()> {
    println!("Crash dump: {}", windbg.dump_path().display());
    println!("Type 'help' for available commands, 'quit' to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;

    loop {
        let readline = rl.readline("(pda) ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)?;

                match handle_command(windbg, line) {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Quit) => break,
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

fn handle_command(windbg: &WinDbg, line: &str) -> Result<Flow> {
    match line {
        "help" | "h" => print_help(),
        // 構造化したスタックトレース
        "where" => print!("{}", windbg.get_stack_trace()?),
        _ => match DebuggerCommand::parse(line) {
            Some(command) if command.is_quit() => {
                println!("Goodbye!");
                return Ok(Flow::Quit);
            }
            Some(command) => println!("{}", windbg.run_command(command)?),
            None => {}
        },
    }
    Ok(Flow::Continue)
}

fn print_help() {
    println!("Available commands:");
    println!();
    println!("  help           - Show this help message");
    println!("  quit/exit/q    - Exit");
    println!();
    println!("Analysis commands:");
    println!("  where          - Show the parsed stack trace with locals");
    println!("  bt             - Extended stack trace (kpn)");
    println!("  stack          - Module!function stack trace (kcn)");
    println!("  frame <n>      - Switch to frame n (hex as in 'bt', e.g. 0a or 0xa)");
    println!("  locals (l)     - Typed locals of the current frame");
    println!("  thread         - Current thread");
    println!("  analyze        - Built-in crash analysis (!analyze -v)");
    println!();
    println!("Anything else is sent to the debugger as is.");
    println!("Each command runs in a fresh debugger with the exception context selected.");
    println!();
    println!("Examples:");
    println!("  bt");
    println!("  lm vm ntdll");
    println!("  dx @$curthread");
}
