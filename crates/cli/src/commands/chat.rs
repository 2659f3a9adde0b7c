//! `schemagent chat`: Interactive or single-message chat.
//!
//! Interactive commands: `/reset` clears memory, `/history` prints it,
//! `/state` shows the session state, `exit` quits.

use super::Runtime;
use schemagent_agent::{AgentSession, ProviderRequester, SessionPolicy, ToolDispatch, TurnOutcome, TurnResult};
use schemagent_config::AppConfig;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    execute_tools: bool,
    reasoning: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::load()?;
    let config = &runtime.config;

    if !config.has_api_key() && config.default_provider != "ollama" {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export SCHEMAGENT_API_KEY=sk-...");
        eprintln!("    export OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = schemagent_providers::build_from_config(config);
    let provider = router.default().ok_or("No default provider configured")?;
    let requester = ProviderRequester::new(provider, &config.default_model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);

    let mut policy = SessionPolicy::from(&config.agent);
    if execute_tools {
        policy.dispatch = ToolDispatch::Execute;
    }
    policy.reasoning |= reasoning;

    let mut session = AgentSession::builder(
        Arc::new(requester),
        Arc::clone(&runtime.schemas),
        Arc::clone(&runtime.tools),
    )
    .with_assembler(runtime.assembler()?)
    .with_policy(policy)
    .build()?;
    tracing::debug!(session_id = %session.id(), provider = %config.default_provider, "Chat session ready");

    if let Some(msg) = message {
        let result = session.run_turn(&msg).await?;
        print_result(&result);
        return Ok(());
    }

    println!();
    println!("  schemagent: interactive mode");
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {}", runtime.tools.names().join(", "));
    println!("  Dispatch:  {:?}", session.policy().dispatch);
    println!();
    println!("  Type a message and press Enter. /reset, /history, /state, exit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                session.memory_mut().reset();
                println!("  (memory cleared)\n");
            }
            "/history" => {
                for (i, turn) in session.memory().turns().iter().enumerate() {
                    println!("  {i:>3} [{}] {}", turn.role, turn.content);
                }
                println!();
            }
            "/state" => println!("  {} ({} turns)\n", session.state(), session.memory().len()),
            _ => match session.run_turn(input).await {
                Ok(result) => print_result(&result),
                Err(e) => eprintln!("  Error: {e}\n"),
            },
        }
    }
    Ok(())
}

fn print_result(result: &TurnResult) {
    if let Some(plan) = &result.plan {
        println!("  [plan] {}", plan.summary().replace('\n', "\n         "));
    }
    match &result.outcome {
        TurnOutcome::Reply(text) => println!("  Agent > {text}\n"),
        TurnOutcome::ToolSelected(invocation) => {
            println!("  Agent selected `{}` with {}", invocation.tool, invocation.arguments);
            println!("  (not executed; pass --execute-tools to run it)\n");
        }
        TurnOutcome::ToolExecuted { invocation, result } => match result {
            Ok(output) => println!("  [{}] {output}\n", invocation.tool),
            Err(e) => println!("  [{}] failed: {e}\n", invocation.tool),
        },
    }
}
