//! anno - annotation review tracker.

use anyhow::Result;
use clap::Parser;
use std::env;

use anno_cli::cli::commands::{
    run_init, run_items_add, run_items_list, run_lock, run_members_add, run_members_list,
    run_payment_calc, run_payment_syllables, run_projects_create, run_projects_list, run_review,
    run_start, run_stats_annotators, run_stats_export, run_stats_reviewers, run_stats_summary,
    run_status, run_submit, run_unlock, ReviewAction,
};
use anno_cli::cli::{
    Cli, Commands, ItemsCommands, MembersCommands, PaymentCommands, ProjectsCommands,
    StatsCommands, TrackingCommands,
};
use anno_cli::output::OutputFormat;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_root = env::current_dir()?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Commands::Init => {
            run_init(&data_root)?;
        }

        Commands::Projects(cmd) => match cmd {
            ProjectsCommands::Create { name, description } => {
                run_projects_create(&data_root, &name, description.as_deref(), format)?;
            }
            ProjectsCommands::List => {
                run_projects_list(&data_root, format)?;
            }
        },

        Commands::Members(cmd) => match cmd {
            MembersCommands::Add {
                project,
                username,
                role,
            } => {
                run_members_add(&data_root, project, &username, role, format)?;
            }
            MembersCommands::List { project } => {
                run_members_list(&data_root, project, format)?;
            }
        },

        Commands::Items(cmd) => match cmd {
            ItemsCommands::Add {
                project,
                text,
                audio_minutes,
            } => {
                run_items_add(&data_root, project, text.as_deref(), audio_minutes, format)?;
            }
            ItemsCommands::List { project } => {
                let user = cli.user.as_deref();
                run_items_list(&data_root, project, user, format)?;
            }
        },

        Commands::Tracking(cmd) => match cmd {
            TrackingCommands::Status { project, item } => {
                run_status(&data_root, project, item, format)?;
            }
            TrackingCommands::Start { project, item } => {
                run_start(&data_root, project, item, cli.user.as_deref(), format)?;
            }
            TrackingCommands::Submit { project, item } => {
                run_submit(&data_root, project, item, cli.user.as_deref(), format)?;
            }
            TrackingCommands::Approve {
                project,
                item,
                notes,
            } => {
                run_review(
                    &data_root,
                    project,
                    item,
                    ReviewAction::Approve,
                    notes,
                    cli.user.as_deref(),
                    format,
                )?;
            }
            TrackingCommands::Reject {
                project,
                item,
                notes,
            } => {
                run_review(
                    &data_root,
                    project,
                    item,
                    ReviewAction::Reject,
                    Some(notes),
                    cli.user.as_deref(),
                    format,
                )?;
            }
            TrackingCommands::Lock { project, item } => {
                run_lock(&data_root, project, item, cli.user.as_deref(), format)?;
            }
            TrackingCommands::Unlock { project, item } => {
                run_unlock(&data_root, project, item, cli.user.as_deref(), format)?;
            }
        },

        Commands::Stats(cmd) => match cmd {
            StatsCommands::Summary { project } => {
                run_stats_summary(&data_root, project, format)?;
            }
            StatsCommands::Annotators { project } => {
                run_stats_annotators(&data_root, project, format)?;
            }
            StatsCommands::Reviewers { project } => {
                run_stats_reviewers(&data_root, project, format)?;
            }
            StatsCommands::Export { project } => {
                run_stats_export(&data_root, project)?;
            }
        },

        Commands::Payment(cmd) => match cmd {
            PaymentCommands::Calc {
                project,
                minutes,
                segments,
                syllables,
            } => {
                run_payment_calc(&data_root, &project, minutes, segments, syllables, format)?;
            }
            PaymentCommands::Syllables { text } => {
                run_payment_syllables(&text, format)?;
            }
        },
    }

    Ok(())
}
