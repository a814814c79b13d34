use anyhow::{Context, anyhow, bail};
use chrono::Utc;
use regex::Regex;
use tracing::{debug, instrument};

use crate::api::{ApiClient, Backend};
use crate::cli::{Command, GlobalCli, LabelCommand};
use crate::config::{self, Config};
use crate::filter::TaskFilter;
use crate::form::TaskForm;
use crate::list::TaskList;
use crate::render::Renderer;
use crate::session::{Session, SessionState};
use crate::task::{LabelPatch, Signup};
use crate::token::TokenStore;

#[instrument(skip(cfg, renderer, cli))]
pub async fn dispatch(cfg: &Config, renderer: &mut Renderer, cli: GlobalCli) -> anyhow::Result<()> {
    let data_dir = config::resolve_data_dir(cfg, cli.data.as_deref())?;
    let tokens = TokenStore::new(&data_dir);
    let base_url = config::resolve_api_url(cfg, cli.api_url.as_deref());
    debug!(base_url = %base_url, "resolved API base URL");
    let api = ApiClient::new(base_url, tokens.clone());

    match cli.command {
        Command::Signup {
            email,
            password,
            full_name,
        } => {
            let user = api
                .signup(&Signup {
                    email,
                    password,
                    full_name,
                })
                .await?;
            println!("account created for {}; run `slate login`", user.email);
            Ok(())
        }

        Command::Login { username, password } => {
            let auth = api.login(&username, &password).await?;
            let mut session = Session::new(api.clone(), tokens);
            session.login(&auth.access_token).await?;
            if let Some(user) = session.user() {
                println!("logged in as {}", user.display_name());
            }
            Ok(())
        }

        Command::Logout => {
            let mut session = Session::new(api.clone(), tokens);
            session.logout().await;
            println!("logged out");
            Ok(())
        }

        Command::Whoami => {
            let mut session = Session::new(api.clone(), tokens);
            session.init().await;
            let user = require_login(&session)?;
            renderer.print_user(user)?;
            Ok(())
        }

        command => {
            // Task and label commands are reachable only with a resolved,
            // authenticated session.
            let mut session = Session::new(api.clone(), tokens);
            session.init().await;
            require_login(&session)?;

            let mut list = TaskList::new(api.clone());
            let result = task_command(&api, &mut list, renderer, command).await;

            let notices = list.take_notices();
            renderer.print_notices(&notices)?;
            result
        }
    }
}

fn require_login<B: Backend>(session: &Session<B>) -> anyhow::Result<&crate::task::User> {
    match session.state() {
        SessionState::Authenticated(user) => Ok(user),
        SessionState::Anonymous => Err(anyhow!("not logged in; run `slate login` first")),
        SessionState::Unknown => Err(anyhow!("session state has not been resolved")),
    }
}

async fn task_command(
    api: &ApiClient,
    list: &mut TaskList<ApiClient>,
    renderer: &mut Renderer,
    command: Command,
) -> anyhow::Result<()> {
    let now = Utc::now();

    match command {
        Command::List { terms } => {
            let filter = TaskFilter::parse(&terms)?;
            list.set_filter(filter).await?;
            renderer.print_task_table(list.tasks(), now)?;
            renderer.print_summary(list.summary(now))?;
            Ok(())
        }

        Command::Add {
            title,
            description,
            priority,
            deadline,
            labels,
        } => {
            let mut form = TaskForm::create(now);
            form.title = title;
            form.description = description.unwrap_or_default();
            form.priority = priority.parse()?;
            if let Some(deadline) = deadline {
                form.deadline = deadline;
            }
            form.labels = labels;

            let task = form.submit(list).await?;
            println!("created {}", task.id);
            Ok(())
        }

        Command::Edit {
            id,
            title,
            description,
            priority,
            deadline,
            toggle_labels,
        } => {
            let task = api.get_task(&id).await?;
            let mut form = TaskForm::edit(&task);

            if let Some(title) = title {
                form.title = title;
            }
            if let Some(description) = description {
                form.description = description;
            }
            if let Some(priority) = priority {
                form.priority = priority.parse()?;
            }
            if let Some(deadline) = deadline {
                form.deadline = deadline;
            }
            for name in toggle_labels {
                form.toggle_label(&name);
            }

            let task = form.submit(list).await?;
            println!("updated {}", task.id);
            Ok(())
        }

        Command::Done { id } => {
            if list.toggle_complete(&id, true).await {
                println!("completed {id}");
            }
            Ok(())
        }

        Command::Undone { id } => {
            if list.toggle_complete(&id, false).await {
                println!("reopened {id}");
            }
            Ok(())
        }

        Command::Rm { id } => {
            list.delete(&id).await;
            Ok(())
        }

        Command::Labels { command } => label_command(api, renderer, command).await,

        _ => unreachable!("auth commands are handled in dispatch"),
    }
}

async fn label_command(
    api: &ApiClient,
    renderer: &mut Renderer,
    command: LabelCommand,
) -> anyhow::Result<()> {
    match command {
        LabelCommand::List => {
            let labels = api.list_labels().await?;
            renderer.print_label_table(&labels)?;
            Ok(())
        }

        LabelCommand::Add { name, color } => {
            validate_color(&color)?;
            let label = api
                .create_label(&crate::task::LabelCreate { name, color })
                .await?;
            println!("created label {} ({})", label.name, label.id);
            Ok(())
        }

        LabelCommand::Edit { id, name, color } => {
            if let Some(color) = color.as_ref() {
                validate_color(color)?;
            }
            let label = api.update_label(&id, &LabelPatch { name, color }).await?;
            println!("updated label {}", label.name);
            Ok(())
        }

        LabelCommand::Rm { id } => {
            api.delete_label(&id).await?;
            println!("deleted label {id}");
            Ok(())
        }
    }
}

/// Mirror of the server's hex color constraint, checked before the
/// request goes out.
fn validate_color(color: &str) -> anyhow::Result<()> {
    let pattern =
        Regex::new("^#([0-9A-Fa-f]{6}|[0-9A-Fa-f]{3})$").context("invalid color pattern")?;
    if !pattern.is_match(color) {
        bail!("invalid color: {color} (expected hex like #3B82F6)");
    }
    Ok(())
}
