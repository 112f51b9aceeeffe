//! Clinician Portal - demo shell
//!
//! Reads one command per line from stdin and prints the screen the view
//! layer would show after it:
//!
//! ```text
//! login <username> <password>
//! logout
//! whoami
//! search <first name> [last name]
//! patient <id>
//! quit
//! ```

use anyhow::Result;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinician_portal::{
    config::Config,
    context::AppContext,
    models::SearchCriteria,
    view::{LoginForm, Screen},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinician_portal=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting Clinician Portal...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let context = AppContext::init(&config).await;
    println!("{}", Screen::for_snapshot(&context.auth.snapshot()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        match command {
            "quit" | "exit" => break,
            "login" => {
                let mut form = LoginForm::new(
                    args.first().copied().unwrap_or_default(),
                    args.get(1).copied().unwrap_or_default(),
                );
                if form.submit(&context.auth).await.is_err() {
                    if let Some(message) = form.display_error(&context.auth.snapshot()) {
                        println!("error: {}", message);
                    }
                }
            }
            "logout" => context.auth.logout().await,
            "whoami" => match context.auth.require_user() {
                Ok(user) => println!("{} <{}> ({})", user.name, user.email, user.role),
                Err(e) => println!("error: {}", e),
            },
            "search" => run_search(&context, &args).await,
            "patient" => show_patient(&context, &args).await,
            other => println!("unknown command: {}", other),
        }

        println!("{}", Screen::for_snapshot(&context.auth.snapshot()));
    }

    context.teardown();
    Ok(())
}

async fn run_search(context: &AppContext, args: &[&str]) {
    if let Err(e) = context.auth.require_user() {
        println!("error: {}", e);
        return;
    }

    let criteria = SearchCriteria::new(
        args.first().copied().unwrap_or_default(),
        args.get(1).copied().unwrap_or_default(),
    );
    match context.patients.search(&criteria).await {
        Ok(results) if results.is_empty() => println!("No patients found"),
        Ok(results) => {
            for row in results {
                println!(
                    "{}  {} {}  {}  {:?}  last visit: {}",
                    row.id,
                    row.first_name,
                    row.last_name,
                    row.date_of_birth,
                    row.gender,
                    row.last_visit.as_deref().unwrap_or("-"),
                );
            }
        }
        Err(e) => println!("error: {}", e),
    }
}

async fn show_patient(context: &AppContext, args: &[&str]) {
    if let Err(e) = context.auth.require_user() {
        println!("error: {}", e);
        return;
    }

    let Some(id) = args.first() else {
        println!("usage: patient <id>");
        return;
    };
    match context.patients.get(id).await {
        Ok(patient) => {
            let flagged = patient.labs.iter().filter(|lab| lab.needs_attention()).count();
            println!("{} ({})", patient.demographics.full_name(), patient.id());
            println!(
                "history: {}  diagnoses: {}  treatments: {}  labs: {} ({} flagged)",
                patient.history.len(),
                patient.diagnoses.len(),
                patient.treatments.len(),
                patient.labs.len(),
                flagged,
            );
            match serde_json::to_string_pretty(&patient.demographics) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::warn!("Failed to render demographics: {}", e),
            }
        }
        Err(e) => println!("error: {}", e),
    }
}
