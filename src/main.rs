use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use release_train::cli::{ActionRequest, ReleaseTrainController, TrainSettings};
use release_train::config::{self, Config};
use release_train::git::Git2Worktree;
use release_train::host::GitHubClient;
use release_train::release_log::{FileReleaseLog, MemoryReleaseLog, ReleaseLog};
use release_train::ui;

#[derive(clap::Parser)]
#[command(
    name = "release-train",
    version,
    about = "Cut, update and finalize release candidates of a named release train"
)]
struct Args {
    #[arg(
        short,
        long,
        env = "RELEASE_ACTION",
        help = "Release action: create, update, finalize or hotfix (\"Create release\" style labels also work)"
    )]
    action: String,

    #[arg(
        long,
        env = "RELEASE_VERSION",
        help = "Version component a new release bumps: Major or Minor"
    )]
    release_version: Option<String>,

    #[arg(
        long,
        env = "COMMIT_HASHES",
        help = "Comma separated commits to cherry-pick into the next release candidate"
    )]
    commits: Option<String>,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(long, help = "Release name, overriding configuration and RELEASE_NAME")]
    release_name: Option<String>,

    #[arg(short, long, help = "Skip confirmation prompts")]
    force: bool,

    #[arg(long, help = "Preview what would happen without making changes")]
    dry_run: bool,
}

fn main() {
    init_tracing();
    let args = Args::parse();

    if let Err(e) = run(args) {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "release_train=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load(args: &Args) -> Result<Config> {
    let mut config = config::load_config(args.config.as_deref())?;
    config.apply_env();
    if let Some(name) = &args.release_name {
        config.release_name = name.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: Args) -> Result<()> {
    let config = load(&args)?;

    // Inputs are checked before anything touches the network.
    let request = ActionRequest::from_inputs(
        &args.action,
        args.release_version.as_deref(),
        args.commits.as_deref(),
    )?;

    let token = std::env::var("GITHUB_TOKEN").context("GITHUB_TOKEN is not set")?;
    let client = GitHubClient::new(&config.github.api_url, config.repository()?, &token)?;
    let worktree = Git2Worktree::new(&config.git.path, config.git.remote.clone()).with_token(token);
    let settings = TrainSettings::from(&config);

    if args.dry_run {
        let log = MemoryReleaseLog::new();
        let controller = ReleaseTrainController::new(&client, &worktree, &log, settings);
        let plan = controller.plan(&request)?;
        ui::display_plan(&plan);
        ui::display_status("Dry run, nothing was changed");
        return Ok(());
    }

    let log = FileReleaseLog::create(&config.log_file)
        .with_context(|| format!("Cannot create release log {}", config.log_file))?;
    let controller = ReleaseTrainController::new(&client, &worktree, &log, settings);
    controller.start(request.action())?;

    ui::display_status(&format!(
        "Planning '{}' for release train '{}'",
        request.action(),
        controller.settings().release_name
    ));
    let plan = controller.plan(&request)?;
    ui::display_plan(&plan);

    if !args.force && !ui::confirm_action("Proceed with these steps?")? {
        log.append_line("Release action cancelled by user.")?;
        println!("Operation cancelled by user.");
        return Ok(());
    }

    let outcome = controller.execute(plan)?;
    ui::display_outcome(&outcome);
    ui::display_success(&format!("Release log written to {}", log.path().display()));
    Ok(())
}
