//! Tracery CLI
//!
//! Offline tools for knowledge bases and synthesized rules.

use std::fs;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use tracery_core::{Classifier, KnowledgeBase, MatchKind, ResourceType};
use tracery_rules::{build_rules, MemoryRuleEngine, RuleActionType, RuleUpdate};

mod replay;

#[derive(Parser)]
#[command(name = "tracery")]
#[command(about = "Tracery knowledge base and rule tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify hosts against a knowledge base
    Classify {
        /// Knowledge base JSON file
        #[arg(short, long)]
        knowledge: String,

        /// Hosts to classify
        #[arg(required = true)]
        hosts: Vec<String>,

        /// Print one JSON object per host
        #[arg(long)]
        json: bool,
    },

    /// Validate a knowledge base
    Validate {
        /// Knowledge base JSON file
        #[arg(short, long)]
        knowledge: String,
    },

    /// Print the rules synthesized for a blocklist and whitelist
    Rules {
        /// Blocked domains
        #[arg(short, long, value_delimiter = ',')]
        block: Vec<String>,

        /// Whitelisted initiator domains
        #[arg(short, long, value_delimiter = ',')]
        allow: Vec<String>,

        /// Check whether this request URL would be blocked
        #[arg(long)]
        check: Option<String>,

        /// Initiator of the checked request
        #[arg(long, requires = "check")]
        initiator: Option<String>,

        /// Resource type of the checked request
        #[arg(long, default_value = "script", requires = "check")]
        resource_type: String,
    },

    /// Replay a JSON-lines event log through the control plane
    Replay {
        /// Knowledge base JSON file
        #[arg(short, long)]
        knowledge: String,

        /// Event log, one JSON event per line
        #[arg(short, long)]
        log: String,

        /// Initial settings document
        #[arg(short, long)]
        settings: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Classify { knowledge, hosts, json } => cmd_classify(&knowledge, &hosts, json),
        Commands::Validate { knowledge } => cmd_validate(&knowledge),
        Commands::Rules {
            block,
            allow,
            check,
            initiator,
            resource_type,
        } => cmd_rules(&block, &allow, check.as_deref(), initiator.as_deref(), &resource_type),
        Commands::Replay { knowledge, log, settings } => replay::run(&knowledge, &log, settings.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

pub(crate) fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))
}

fn load_knowledge(path: &str) -> Result<KnowledgeBase, String> {
    KnowledgeBase::from_json(&read_file(path)?).map_err(|e| format!("Invalid knowledge base '{}': {}", path, e))
}

fn cmd_classify(knowledge: &str, hosts: &[String], as_json: bool) -> Result<(), String> {
    let kb = load_knowledge(knowledge)?;
    let classifier = Classifier::new(&kb);

    for host in hosts {
        let assessment = classifier.assess(host);
        let matched = assessment.record.map(|m| {
            let kind = match m.kind {
                MatchKind::Exact => "exact",
                MatchKind::Containment => "containment",
            };
            (m.key, kind)
        });

        if as_json {
            let mut line = json!({
                "domain": host,
                "category": assessment.category.as_str(),
                "threatLevel": assessment.threat_level.as_str(),
            });
            if let Some((key, kind)) = matched {
                line["matchedKey"] = json!(key);
                line["match"] = json!(kind);
            }
            println!("{}", line);
        } else {
            let via = matched
                .map(|(key, kind)| format!("  ({} match on {})", kind, key))
                .unwrap_or_default();
            println!(
                "{:<40} {:<15} {:<8}{}",
                host,
                assessment.category.as_str(),
                assessment.threat_level.as_str(),
                via
            );
        }
    }

    Ok(())
}

fn cmd_validate(knowledge: &str) -> Result<(), String> {
    let start = Instant::now();
    let kb = load_knowledge(knowledge)?;
    let elapsed = start.elapsed();

    println!("Knowledge base OK");
    println!("  Trackers:   {}", kb.tracker_count());
    println!("  Categories: {}", kb.category_count());
    println!("  Load time:  {:?}", elapsed);

    if kb.is_empty() {
        return Err("Knowledge base has no trackers or categories".to_string());
    }
    Ok(())
}

fn cmd_rules(
    block: &[String],
    allow: &[String],
    check: Option<&str>,
    initiator: Option<&str>,
    resource_type: &str,
) -> Result<(), String> {
    let rules = build_rules(block, allow);

    let url = match check {
        Some(url) => url,
        None => {
            let text = serde_json::to_string_pretty(&rules).map_err(|e| e.to_string())?;
            println!("{}", text);
            return Ok(());
        }
    };

    let engine = MemoryRuleEngine::new();
    engine.apply(RuleUpdate::add(rules)).map_err(|e| format!("Rules rejected: {}", e))?;

    let kind = ResourceType::from_request_name(resource_type);
    match engine.matching_rule(url, initiator, kind) {
        Some(rule) if rule.action.kind == RuleActionType::Block => {
            println!("blocked by rule {} ({})", rule.id, rule.condition.url_filter);
        }
        _ => println!("allowed"),
    }
    Ok(())
}
