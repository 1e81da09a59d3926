use anyhow::Result;
use clap::{Parser, Subcommand};

mod settings;
mod toolset;

#[cfg(feature = "stdio")]
mod mcp;

use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "exabridge")]
#[command(about = "Exa web search and deep research as MCP tools (stdio server)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for Cursor / Claude Desktop / other MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio(ToolsArg),
    /// List every tool with whether it would be enabled (json).
    Tools(ToolsArg),
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ToolsArg {
    /// Comma-separated tool names to enable, or "all". Default: a small search + research set.
    #[arg(long, env = "EXABRIDGE_TOOLS")]
    tools: Option<String>,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Attempt a local stdio MCP handshake (list_tools) to prove a client can start the server.
    ///
    /// This spawns a child `exabridge mcp-stdio` process and calls `list_tools`. It performs no
    /// provider calls and prints no secret values.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    check_stdio: bool,
    /// Timeout for the stdio handshake (ms).
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Loads `KEY=VALUE` lines from `EXABRIDGE_ENV_FILE`, if set. Existing process env wins.
/// Values are never logged.
fn load_env_file() {
    let Ok(p) = std::env::var("EXABRIDGE_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let s = s.strip_prefix("export ").unwrap_or(s);
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim().trim_matches('"');
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var("EXABRIDGE_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    // stdout carries the MCP transport; logs go to stderr only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn has_env(k: &str) -> bool {
    std::env::var(k).ok().is_some_and(|v| !v.trim().is_empty())
}

#[cfg(feature = "stdio")]
async fn stdio_handshake(timeout_ms: u64) -> serde_json::Value {
    use rmcp::service::ServiceExt;
    use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
    use tokio::process::Command;

    let t0 = std::time::Instant::now();
    let exe = std::env::current_exe().unwrap_or_else(|_| std::path::PathBuf::from("exabridge"));
    let child = TokioChildProcess::new(Command::new(exe).configure(|cmd| {
        cmd.args(["mcp-stdio"]);
        // The handshake never calls the provider; keep the key out of the child anyway.
        cmd.env_remove(settings::ENV_API_KEY);
        cmd.env_remove(settings::ENV_API_KEY_FALLBACK);
        cmd.env("EXABRIDGE_LOG", "error");
    }));
    let result: Result<usize, serde_json::Value> = async {
        let child = child.map_err(|e| {
            serde_json::json!({
                "code": "spawn_failed",
                "message": e.to_string(),
                "hint": "Could not start `exabridge mcp-stdio`. Reinstall the binary and check it is on PATH."
            })
        })?;
        let service = ().serve(child).await.map_err(|e| {
            serde_json::json!({
                "code": "handshake_failed",
                "message": e.to_string(),
                "hint": "The child closed the stdio transport early. Common causes: something printing to stdout in mcp-stdio mode, or a crash on startup (run it by hand to see stderr)."
            })
        })?;
        let listed = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            service.list_tools(Default::default()),
        )
        .await;
        let _ = service.cancel().await;
        match listed {
            Ok(Ok(tools)) => Ok(tools.tools.len()),
            Ok(Err(e)) => Err(serde_json::json!({
                "code": "handshake_failed",
                "message": e.to_string(),
                "hint": "Stdio MCP handshake failed. Verify the client config runs this binary with args [\"mcp-stdio\"]."
            })),
            Err(_) => Err(serde_json::json!({
                "code": "timeout",
                "message": format!("stdio handshake timed out after {timeout_ms}ms"),
                "hint": "The child did not answer list_tools in time. Check for a stuck startup."
            })),
        }
    }
    .await;

    let (ok, tool_count, error) = match result {
        Ok(n) => (true, Some(n), serde_json::Value::Null),
        Err(e) => (false, None, e),
    };
    serde_json::json!({
        "name": "mcp_stdio_handshake",
        "ok": ok,
        "skipped": false,
        "tool_count": tool_count,
        "elapsed_ms": t0.elapsed().as_millis(),
        "error": error,
    })
}

async fn doctor(args: DoctorCmd, tools: Option<String>) -> serde_json::Value {
    let t0 = std::time::Instant::now();
    let mut checks: Vec<serde_json::Value> = Vec::new();

    let parsed = Settings::from_env(tools.as_deref());
    checks.push(match &parsed {
        Ok(_) => serde_json::json!({
            "name": "settings_valid",
            "ok": true,
            "message": "environment settings parsed",
            "hint": "",
        }),
        Err(e) => serde_json::json!({
            "name": "settings_valid",
            "ok": false,
            "message": format!("{e:#}"),
            "hint": "Fix the named EXABRIDGE_* variable; the server refuses to start until then.",
        }),
    });

    let key_configured =
        has_env(settings::ENV_API_KEY) || has_env(settings::ENV_API_KEY_FALLBACK);
    checks.push(serde_json::json!({
        "name": "exa_api_key",
        "ok": key_configured,
        "message": if key_configured { "API key is set" } else { "API key is missing" },
        "hint": if key_configured { "" } else { "Set EXABRIDGE_EXA_API_KEY (or EXA_API_KEY)." },
    }));

    #[cfg(feature = "stdio")]
    let handshake = if args.check_stdio {
        stdio_handshake(args.timeout_ms).await
    } else {
        serde_json::json!({
            "name": "mcp_stdio_handshake",
            "ok": true,
            "skipped": true,
            "tool_count": null,
            "elapsed_ms": null,
            "error": null,
        })
    };
    #[cfg(not(feature = "stdio"))]
    let handshake = serde_json::json!({
        "name": "mcp_stdio_handshake",
        "ok": !args.check_stdio,
        "skipped": !args.check_stdio,
        "tool_count": null,
        "elapsed_ms": null,
        "error": if args.check_stdio {
            serde_json::json!({"code": "not_supported", "message": "built without feature `stdio`", "hint": ""})
        } else {
            serde_json::Value::Null
        },
    });
    checks.push(handshake);

    let ok = checks.iter().all(|c| c["ok"].as_bool().unwrap_or(false));
    let (tools_enabled, research) = match &parsed {
        Ok(s) => (
            serde_json::json!(s.tools.enabled()),
            serde_json::json!({
                "poll_interval_ms": s.poll.interval.as_millis(),
                "deadline_ms": s.poll.deadline.as_millis(),
                "max_transient_failures": s.poll.max_transient_failures,
            }),
        ),
        Err(_) => (serde_json::Value::Null, serde_json::Value::Null),
    };
    serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": ok,
        "name": "exabridge",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": {
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        },
        "features": {
            "stdio": cfg!(feature = "stdio"),
        },
        "elapsed_ms": t0.elapsed().as_millis(),
        "configured": {
            "exa_api_key": key_configured,
            "base_url_overridden": has_env(settings::ENV_BASE_URL),
            "env_file": has_env("EXABRIDGE_ENV_FILE"),
        },
        "tools": tools_enabled,
        "research": research,
        "checks": checks,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "stdio")]
        Commands::McpStdio(args) => {
            let settings = Settings::from_env(args.tools.as_deref())?;
            tracing::debug!(?settings, "starting");
            mcp::serve_stdio(settings)
                .await
                .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        }
        Commands::Tools(args) => {
            let tools = toolset::ToolSet::parse(args.tools.as_deref());
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "tools",
                "ok": true,
                "tools": tools.listing(),
                "unknown": tools.unknown(),
            });
            println!("{v}");
        }
        Commands::Doctor(args) => {
            let output = args.output.to_ascii_lowercase();
            let tools = std::env::var(settings::ENV_TOOLS).ok();
            let payload = doctor(args, tools).await;
            match output.as_str() {
                "text" => {
                    println!(
                        "exabridge {} (ok={})",
                        env!("CARGO_PKG_VERSION"),
                        payload["ok"].as_bool().unwrap_or(false)
                    );
                    println!(
                        "exa_api_key: {}",
                        payload["configured"]["exa_api_key"]
                            .as_bool()
                            .unwrap_or(false)
                    );
                    println!("tools: {}", payload["tools"]);
                    println!("checks:");
                    if let Some(arr) = payload["checks"].as_array() {
                        for c in arr {
                            let name = c["name"].as_str().unwrap_or("?");
                            if c["skipped"].as_bool().unwrap_or(false) {
                                println!("- {name}: skipped");
                            } else {
                                let ok = c["ok"].as_bool().unwrap_or(false);
                                println!("- {name}: {}", if ok { "ok" } else { "fail" });
                            }
                        }
                    }
                }
                _ => println!("{payload}"),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "exabridge",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("exabridge {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
