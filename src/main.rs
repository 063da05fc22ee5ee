//! taskdag CLI entry point.
//!
//! Thin boundary layer: parses arguments, resolves the acting user, and
//! dispatches to the service. All graph, status, and permission logic
//! lives in the library.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use taskdag::cli::{Cli, Command};
use taskdag::db::Database;
use taskdag::error::CoreError;
use taskdag::service::TaskService;
use taskdag::types::{Actor, NewTask, TaskPatch, TaskStatus};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<CoreError>() {
                Some(core) if core.is_warning() => {
                    eprintln!("warning: {}", core);
                    eprintln!("(re-run with --force to confirm and latch the override flag)");
                }
                _ => eprintln!("error: {}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn database_path(arg: Option<String>) -> Result<PathBuf> {
    if let Some(path) = arg {
        return Ok(PathBuf::from(path));
    }
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskdag");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("taskdag.db"))
}

/// Resolve the acting user from `--as`.
fn resolve_actor(service: &TaskService, act_as: Option<&str>) -> Result<Actor> {
    let username =
        act_as.ok_or_else(|| anyhow!("this command requires --as <username>"))?;
    let user = service
        .database()
        .get_user_by_username(username)?
        .ok_or_else(|| anyhow!("no such user: {}", username))?;
    Ok(Actor {
        id: user.id,
        role: user.role,
    })
}

fn run(cli: Cli) -> Result<()> {
    let db = Database::open(database_path(cli.database)?)?;
    let service = TaskService::new(db);

    // Bootstrap is the one command that can run before any user exists.
    if let Command::Bootstrap {
        username,
        credential,
    } = &cli.command
    {
        return match service.bootstrap_admin(username, credential)? {
            Some(user) => {
                println!("created admin user {}", user.username);
                Ok(())
            }
            None => Err(anyhow!("database already has users")),
        };
    }

    let actor = resolve_actor(&service, cli.act_as.as_deref())?;

    match cli.command {
        Command::Bootstrap { .. } => unreachable!("handled above"),

        Command::List => {
            let views = service.list_tasks(&actor)?;
            println!("{}", serde_json::to_string_pretty(&views)?);
        }

        Command::Show { id } => {
            let detail = service.get_task(&actor, &id)?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }

        Command::Create {
            title,
            description,
            parents,
        } => {
            let task = service.create_task(
                &actor,
                NewTask {
                    title,
                    description,
                    parent_ids: parents,
                },
            )?;
            println!("{}", task.id);
        }

        Command::Edit {
            id,
            title,
            description,
        } => {
            service.update_task(
                &actor,
                &id,
                TaskPatch {
                    title,
                    description,
                    ..TaskPatch::default()
                },
            )?;
        }

        Command::Status { id, status, force } => {
            let status = TaskStatus::parse(&status)
                .ok_or_else(|| anyhow!("unknown status: {}", status))?;
            service.update_task(
                &actor,
                &id,
                TaskPatch {
                    status: Some(status),
                    override_warning: force,
                    ..TaskPatch::default()
                },
            )?;
        }

        Command::Doc { id, content } => {
            service.update_task(
                &actor,
                &id,
                TaskPatch {
                    documentation: Some(content),
                    ..TaskPatch::default()
                },
            )?;
        }

        Command::Reparent { id, parents } => {
            service.update_task(
                &actor,
                &id,
                TaskPatch {
                    parent_ids: Some(parents),
                    ..TaskPatch::default()
                },
            )?;
        }

        Command::AttachParent { id, parent_id } => {
            service.add_parent(&actor, &id, &parent_id)?;
        }

        Command::AttachChild { id, child_id } => {
            service.add_child(&actor, &id, &child_id)?;
        }

        Command::DetachParent { id, parent_id } => {
            service.remove_parent(&actor, &id, &parent_id)?;
        }

        Command::Delete { id } => {
            service.delete_task(&actor, &id)?;
        }

        Command::Request { id } => {
            service.request_task(&actor, &id)?;
        }

        Command::Unassign { id } => {
            service.unassign_task(&actor, &id)?;
        }

        Command::Assign { id, username } => {
            let user = service
                .database()
                .get_user_by_username(&username)?
                .ok_or_else(|| anyhow!("no such user: {}", username))?;
            service.assign_task(&actor, &id, Some(&user.id))?;
        }

        Command::Search { query } => {
            let hits = service.search(&actor, &query)?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }

        Command::Users => {
            let users = service.list_users(&actor)?;
            println!("{}", serde_json::to_string_pretty(&users)?);
        }

        Command::AddUser {
            username,
            credential,
            role,
        } => {
            let user = service.add_user(&actor, &username, &credential, &role)?;
            println!("{}", user.id);
        }

        Command::DeleteUser { username } => {
            let user = service
                .database()
                .get_user_by_username(&username)?
                .ok_or_else(|| anyhow!("no such user: {}", username))?;
            service.delete_user(&actor, &user.id)?;
        }
    }

    Ok(())
}
