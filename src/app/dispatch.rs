use super::console::{choose, read_line};
use super::wiring::{Models, build_models, open_history};
use crate::adaptation::{AdaptationLoop, CycleReport, learn_from_feedback};
use crate::cli::{Cli, Commands, PolicyCommands};
use crate::config::Config;
use crate::feedback::{FeedbackInterpreter, InterpreterMode};
use crate::generator::Generator;
use crate::history::HistoryRecord;
use crate::policy::{PolicySchema, PolicyValues, routing_schema, schema_by_name};
use crate::prompt::build_policy_prompt;
use crate::retrieval::{DEFAULT_PASSAGE_CHARS, KeywordRetriever};
use crate::routing::{RoutingAgent, StaticRouter};
use crate::session::{Persona, SessionStore};
use anyhow::{Result, bail};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Fold global CLI flags into the loaded config.
pub fn apply_cli_overrides(cli: &Cli, config: &mut Config) {
    if let Some(provider) = &cli.provider {
        config.provider.name.clone_from(provider);
    }
    if let Some(model) = &cli.model {
        config.models.model.clone_from(model);
    }
    if let Some(history) = &cli.history {
        config.history.path = Some(history.clone());
    }
}

pub async fn dispatch(cli: Cli, mut config: Config) -> Result<()> {
    apply_cli_overrides(&cli, &mut config);
    config.validate()?;

    match cli.command {
        Commands::Adapt {
            mode,
            schema,
            task,
            feedback,
        } => {
            let schema_name = schema.unwrap_or_else(|| default_schema_for(mode).to_string());
            run_adapt(&config, mode, &schema_name, task.zip(feedback)).await
        }
        Commands::Respond { message, schema } => run_respond(&config, &schema, &message).await,
        Commands::Route { use_static, query } => {
            if use_static {
                run_static_route(query.as_deref())
            } else {
                run_route(&config, query.as_deref()).await
            }
        }
        Commands::Chat {
            persona,
            name,
            docs,
        } => run_chat(&config, persona, name.as_deref(), docs).await,
        Commands::Policy { policy_command } => match policy_command {
            PolicyCommands::Show { schema } => show_policy(&config, &schema),
            PolicyCommands::History { schema, limit } => {
                show_history(&config, schema.as_deref(), limit)
            }
        },
    }
}

fn default_schema_for(mode: InterpreterMode) -> &'static str {
    match mode {
        InterpreterMode::Delta => "response",
        InterpreterMode::Reward => "reward",
    }
}

fn load_schema(name: &str) -> Result<Arc<PolicySchema>> {
    Ok(schema_by_name(name)?)
}

async fn run_adapt(
    config: &Config,
    mode: InterpreterMode,
    schema_name: &str,
    single: Option<(String, String)>,
) -> Result<()> {
    let schema = load_schema(schema_name)?;
    let Models {
        generator,
        evaluator,
        ..
    } = build_models(config)?;
    let interpreter = FeedbackInterpreter::new(evaluator, mode)?;
    let mut agent = AdaptationLoop::new(
        Generator::new(generator),
        interpreter,
        open_history(config),
        &schema,
    );
    info!(mode = %mode, schema = %schema.name, "adaptation loop started");

    if let Some((task, feedback)) = single {
        let report = agent.run_cycle(&task, &feedback).await?;
        println!("{}\n", report.first.text);
        print_report(&report);
        return Ok(());
    }

    println!("Adaptive agent ({mode} mode). Type 'exit' to quit.");
    loop {
        println!("\n[Active policy] {}", agent.policy().summary());
        let Some(task) = read_line("Task")? else {
            break;
        };
        if task.is_empty() {
            continue;
        }

        let first = agent.respond(&task).await;
        println!("\n{}\n", first.text);

        let Some(feedback) = read_line("Feedback (Enter to skip)")? else {
            break;
        };
        if feedback.is_empty() {
            continue;
        }
        let report = agent.adapt(&feedback).await?;
        print_report(&report);
    }

    if agent.history().is_degraded() {
        println!(
            "Note: the history file was unavailable; changes from this run were kept in memory only."
        );
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    if let Some(reward) = report.assessment.reward {
        println!(" -> Reward: {reward}");
    }
    if !report.assessment.guardrails.is_empty() {
        println!(" -> Guardrails: {}", report.assessment.guardrails.join(", "));
    }
    if let Some(err) = &report.rejected {
        println!(" -> Update rejected: {err}");
    } else if report.delta.is_empty() {
        println!(" -> No policy change needed.");
    } else {
        println!(" -> Policy delta: {}", report.delta);
        println!(" -> Policy updated: {}", report.policy_after.summary());
    }
    println!("\n{}", report.second.text);
}

async fn run_respond(config: &Config, schema_name: &str, message: &str) -> Result<()> {
    let schema = load_schema(schema_name)?;
    let policy = open_history(config).current_policy(&schema);
    let generator = Generator::new(build_models(config)?.generator);
    let generation = generator.respond(&policy, message).await;
    println!("{}", generation.text);
    Ok(())
}

fn run_static_route(query: Option<&str>) -> Result<()> {
    if let Some(query) = query {
        println!("{}", StaticRouter::route(query));
        return Ok(());
    }
    println!("Static keyword routing. Type 'exit' to quit.");
    while let Some(query) = read_line("Query")? {
        if !query.is_empty() {
            println!(" -> Routing decision: {}", StaticRouter::route(&query));
        }
    }
    Ok(())
}

async fn run_route(config: &Config, query: Option<&str>) -> Result<()> {
    let schema = routing_schema();
    let models = build_models(config)?;
    let agent = RoutingAgent::new(models.router)?;
    let mut history = open_history(config);

    if let Some(query) = query {
        let policy = history.current_policy(&schema);
        let decision = agent.route(query, &policy).await;
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    let interpreter = FeedbackInterpreter::new(models.evaluator, InterpreterMode::Delta)?;
    println!("Adaptive routing. Type 'exit' to quit.");
    loop {
        let policy = history.current_policy(&schema);
        println!("\n[Active policy] {}", policy.summary());

        let Some(query) = read_line("Query")? else {
            break;
        };
        if query.is_empty() {
            continue;
        }
        let decision = agent.route(&query, &policy).await;
        match decision.rerouted_from {
            Some(original) => println!(
                " -> Decision: {} (conf {:.2}, below threshold for {original})",
                decision.department, decision.confidence
            ),
            None => println!(
                " -> Decision: {} (conf {:.2})",
                decision.department, decision.confidence
            ),
        }
        println!(" -> Reasoning: {}", decision.reasoning);

        let Some(feedback) = read_line("Correct? (Enter to skip, or type feedback)")? else {
            break;
        };
        if feedback.is_empty() {
            continue;
        }
        let update = learn_from_feedback(&interpreter, &mut history, &policy, &feedback).await;
        if let Some(err) = update.rejected {
            println!(" -> Update rejected: {err}");
        } else if update.applied {
            println!(" -> Policy delta: {}", update.delta);
        } else {
            println!(" -> No policy change needed.");
        }
    }
    Ok(())
}

async fn run_chat(
    config: &Config,
    persona: Option<Persona>,
    name: Option<&str>,
    docs: Option<PathBuf>,
) -> Result<()> {
    let models = build_models(config)?;
    let mut store =
        SessionStore::new(models.chat)?.with_history_window(config.sessions.history_window);
    if let Some(path) = docs {
        let retriever = KeywordRetriever::from_file(&path, DEFAULT_PASSAGE_CHARS)?;
        if retriever.is_empty() {
            bail!("document {} has no text to answer from", path.display());
        }
        info!(passages = retriever.len(), path = %path.display(), "document loaded");
        store = store.with_retriever(Arc::new(retriever), config.sessions.passages);
    }

    let mut active = store.create(name);
    pick_persona(&mut store, &active, persona)?;

    println!("Chat. Commands: /new [name], /list, /switch <n>. Type 'exit' to quit.");
    while let Some(line) = read_line(&session_prompt(&store, &active))? {
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("/new") {
            let rest = rest.trim();
            active = store.create((!rest.is_empty()).then_some(rest));
            pick_persona(&mut store, &active, None)?;
            continue;
        }
        if line == "/list" {
            for (i, session) in store.list().iter().enumerate() {
                let persona = session
                    .persona
                    .map_or_else(|| "default".to_string(), |p| p.to_string());
                let marker = if session.id == active { "*" } else { " " };
                println!(
                    "{marker} {}. {} [{persona}] {} messages",
                    i + 1,
                    session.name,
                    session.transcript.len()
                );
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("/switch") {
            let picked = rest
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| store.list().get(n.wrapping_sub(1)));
            match picked {
                Some(session) => active = session.id.clone(),
                None => println!("No such session."),
            }
            continue;
        }

        let reply = store.send(&active, &line).await?;
        println!("\n{}\n", reply.text);
    }
    Ok(())
}

fn session_prompt(store: &SessionStore, id: &str) -> String {
    store
        .get(id)
        .map_or_else(|| "You".to_string(), |s| format!("You ({})", s.name))
}

fn pick_persona(store: &mut SessionStore, id: &str, persona: Option<Persona>) -> Result<()> {
    let persona = match persona {
        Some(persona) => Some(persona),
        None => {
            let mut items: Vec<String> = Persona::ALL.iter().map(ToString::to_string).collect();
            items.push("Default assistant".into());
            let index = choose("Choose persona (locked after first message)", &items)?;
            Persona::ALL.get(index).copied()
        }
    };
    if let Some(persona) = persona {
        store.select_persona(id, persona)?;
    }
    Ok(())
}

fn show_policy(config: &Config, schema_name: &str) -> Result<()> {
    let schema = load_schema(schema_name)?;
    let policy = open_history(config).current_policy(&schema);
    println!("Schema:  {}", schema.name);
    println!("Policy:  {}", policy.summary());
    println!("History: {}\n", config.history_path().display());
    print!("{}", build_policy_prompt(&policy));
    Ok(())
}

fn show_history(config: &Config, schema: Option<&str>, limit: usize) -> Result<()> {
    if let Some(name) = schema {
        load_schema(name)?;
    }
    let records: Vec<HistoryRecord> = open_history(config)
        .all_records()
        .into_iter()
        .filter(|r| schema.is_none_or(|s| r.belongs_to(s)))
        .collect();
    if records.is_empty() {
        println!("No policy changes recorded.");
        return Ok(());
    }
    let skip = records.len().saturating_sub(limit);
    for record in &records[skip..] {
        println!(
            "{} [{}] \"{}\"\n    {} -> {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.schema.as_deref().unwrap_or("?"),
            record.feedback,
            record.applied_delta,
            format_values(&record.policy_after)
        );
    }
    Ok(())
}

fn format_values(values: &PolicyValues) -> String {
    values
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
