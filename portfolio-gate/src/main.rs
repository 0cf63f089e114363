use std::path::PathBuf;

use clap::Parser;
use portfolio_gate::{
    CountdownState, CredentialConfig, GateConfig, NewCustomSkill, PortfolioGate,
    PortfolioGateBuilder, ProjectCategory, SkillCategory, SqliteKeyValueStore,
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Command line interface for the portfolio admin gate
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(
        long,
        env = "PORTFOLIO_GATE_DB_URL",
        default_value = "sqlite://portfolio-gate.db"
    )]
    db_url: String,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Admin credential, overrides the one in the configuration file
    #[arg(long, env = "PORTFOLIO_GATE_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Show attempt counter, lockout and admin session
    Status,
    /// Submit a credential
    Login { candidate: String },
    /// Leave admin mode
    Logout {
        /// Page location to strip the admin parameter from
        #[arg(long)]
        location: Option<Url>,
    },
    /// Derive the admin session from a page location
    Restore {
        #[arg(long)]
        location: Url,
    },
    /// Follow the lockout countdown until it ends
    Watch,
    /// Inspect or edit the skill link catalog
    Links {
        #[command(subcommand)]
        command: LinkCommands,
    },
    /// Inspect or edit the project catalog
    Projects {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Print version information
    Version,
}

#[derive(clap::Subcommand)]
enum LinkCommands {
    /// Print every link and custom skill
    List,
    /// Point a skill at a new URL
    Set { key: String, url: String },
    /// Add a custom skill
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        certification_url: String,
        #[arg(long)]
        icon_url: Option<String>,
        #[arg(long, default_value_t = SkillCategory::Languages.to_string())]
        category: String,
    },
    /// Remove a custom skill by id
    Remove { id: String },
}

#[derive(clap::Subcommand)]
enum ProjectCommands {
    /// Print shipped project links and added projects
    List,
    /// Change the links of a shipped project
    SetLinks {
        id: String,
        #[arg(long)]
        github_url: Option<String>,
        /// Pass an empty value to clear the link
        #[arg(long)]
        live_url: Option<String>,
    },
    /// Add a project
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        github_url: String,
        #[arg(long, default_value = "")]
        live_url: String,
        #[arg(long, default_value = "")]
        media_url: String,
        #[arg(long, default_value_t = ProjectCategory::WebApp.to_string())]
        category: String,
        #[arg(long)]
        featured: bool,
        /// Up to five skills, repeat the flag for each
        #[arg(long = "skill")]
        skills: Vec<String>,
    },
    /// Remove an added project by id
    Remove { id: String },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => {
            println!("Running migrations...");
            let store = SqliteKeyValueStore::connect(&cli.db_url).await?;
            let applied = store.migrate().await?;
            println!("Applied {applied} migration(s)");
        }
        Commands::Version => {
            println!("portfolio-gate v{}", env!("CARGO_PKG_VERSION"));
        }
        ref command => {
            let gate = open_gate(&cli).await?;
            run(&gate, command).await?;
        }
    }

    Ok(())
}

async fn open_gate(cli: &Cli) -> Result<PortfolioGate<SqliteKeyValueStore>, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => GateConfig::from_json_file(path)?,
        None => GateConfig::default(),
    };
    if let Some(credential) = &cli.credential {
        config = config.with_credential(CredentialConfig::Plaintext(credential.clone()));
    }

    let gate = PortfolioGateBuilder::new()
        .with_sqlite(&cli.db_url)
        .await?
        .apply_migrations()
        .await?
        .with_config(config)
        .build()
        .await?;
    Ok(gate)
}

async fn run(gate: &PortfolioGate<SqliteKeyValueStore>, command: &Commands) -> CliResult {
    match command {
        Commands::Status => {
            let status = gate.status().await?;
            println!("Failed attempts:    {}", status.failed_attempts);
            println!("Remaining attempts: {}", status.remaining_attempts);
            match status.time_remaining_display() {
                Some(display) => println!("Locked out:         {display} remaining"),
                None => println!("Locked out:         no"),
            }
            println!("Admin session:      {}", if gate.is_admin() { "yes" } else { "no" });
        }
        Commands::Login { candidate } => {
            let outcome = gate.submit(candidate).await?;
            match outcome.message() {
                Some(message) => println!("{message}"),
                None => println!("Admin mode enabled."),
            }
        }
        Commands::Logout { location } => {
            let location = gate.logout(location.as_ref()).await?;
            println!("Logged out.");
            if let Some(location) = location {
                println!("{location}");
            }
        }
        Commands::Restore { location } => {
            let is_admin = gate.restore(Some(location)).await?;
            println!("Admin session: {}", if is_admin { "yes" } else { "no" });
        }
        Commands::Watch => watch(gate).await?,
        Commands::Links { command } => links(gate, command).await?,
        Commands::Projects { command } => projects(gate, command).await?,
        Commands::Migrate | Commands::Version => {}
    }

    Ok(())
}

async fn watch(gate: &PortfolioGate<SqliteKeyValueStore>) -> CliResult {
    let countdown = gate.countdown().await?;
    let mut state = countdown.subscribe();

    loop {
        match state.borrow_and_update().clone() {
            CountdownState::Open => {
                println!("Login is open.");
                break;
            }
            CountdownState::LockedOut { display, .. } => {
                println!("Locked out. Time remaining: {display}");
            }
        }

        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    countdown.stop().await;
    Ok(())
}

async fn links(gate: &PortfolioGate<SqliteKeyValueStore>, command: &LinkCommands) -> CliResult {
    match command {
        LinkCommands::List => {
            let catalog = gate.catalog().await?;
            for (key, url) in &catalog.links {
                println!("{key}\t{url}");
            }
            for category in SkillCategory::ALL {
                for skill in catalog.custom_skills_in(category) {
                    println!(
                        "{}\t{}\t{}\t{}",
                        skill.id, category, skill.name, skill.certification_url
                    );
                }
            }
        }
        LinkCommands::Set { key, url } => {
            let mut draft = gate.edit_catalog().await?;
            draft.set_link(key, url)?;
            gate.save_catalog(draft).await?;
            println!("Updated {key}");
        }
        LinkCommands::Add {
            name,
            certification_url,
            icon_url,
            category,
        } => {
            let mut draft = gate.edit_catalog().await?;
            let id = draft.add_custom_skill(NewCustomSkill {
                name: name.clone(),
                icon_url: icon_url.clone(),
                certification_url: certification_url.clone(),
                category: category.clone(),
            })?;
            gate.save_catalog(draft).await?;
            println!("{id}");
        }
        LinkCommands::Remove { id } => {
            let mut draft = gate.edit_catalog().await?;
            let removed = draft.remove_custom_skill(id)?;
            gate.save_catalog(draft).await?;
            println!("Removed {}", removed.name);
        }
    }

    Ok(())
}

async fn projects(gate: &PortfolioGate<SqliteKeyValueStore>, command: &ProjectCommands) -> CliResult {
    match command {
        ProjectCommands::List => {
            let catalog = gate.projects().await?;
            for (id, links) in &catalog.links {
                println!(
                    "{id}\t{}\t{}",
                    links.github_url,
                    links.live_url.as_deref().unwrap_or("-")
                );
            }
            for project in &catalog.projects {
                println!(
                    "{}\t{}\t{}\t{}{}",
                    project.id,
                    project.category,
                    project.title,
                    project.github_url,
                    if project.featured { "\tfeatured" } else { "" }
                );
            }
        }
        ProjectCommands::SetLinks {
            id,
            github_url,
            live_url,
        } => {
            let mut draft = gate.edit_projects().await?;
            if let Some(url) = github_url {
                draft.set_github_url(id, url)?;
            }
            if let Some(url) = live_url {
                draft.set_live_url(id, url)?;
            }
            gate.save_projects(&draft).await?;
            println!("Updated {id}");
        }
        ProjectCommands::Add {
            title,
            description,
            github_url,
            live_url,
            media_url,
            category,
            featured,
            skills,
        } => {
            let mut draft = gate.edit_projects().await?;
            let id = draft.add_project();
            let form = draft.project_mut(&id)?;
            form.title = title.clone();
            form.description = description.clone();
            form.github_url = github_url.clone();
            form.live_url = live_url.clone();
            form.media_url = media_url.clone();
            form.category = category.parse()?;
            form.featured = *featured;
            for skill in skills {
                form.add_skill(skill)?;
            }
            gate.save_projects(&draft).await?;
            println!("{id}");
        }
        ProjectCommands::Remove { id } => {
            let mut draft = gate.edit_projects().await?;
            draft.remove_project(id)?;
            gate.save_projects(&draft).await?;
            println!("Removed {id}");
        }
    }

    Ok(())
}
