use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use mentorhub_core::config::{AppConfig, CliConfig, FileConfig};
use mentorhub_core::resume::Resume;
use mentorhub_core::{
    Clock, CoreResult, FsObjectStorage, ResumeStore, ResumeWorkflow, RetryPolicy, SessionManager,
    SqliteStore, SystemClock, UserManager, UserRole,
};
use std::path::PathBuf;
use std::sync::Arc;

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file.
    #[clap(value_parser = parse_path)]
    pub path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override the CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a user with the given email and password.
    AddUser {
        email: String,
        password: String,
        /// Admin or Regular.
        #[clap(default_value = "Regular")]
        role: String,
    },

    /// Replaces the password of a user.
    SetPassword { email: String, password: String },

    /// Changes the role of a user.
    SetRole { email: String, role: String },

    /// Re-enables a deactivated user.
    Activate { email: String },

    /// Disables a user and ends their session.
    Deactivate { email: String },

    /// Shows account and session information of a given user.
    Show { email: String },

    /// Verifies the password of a given user, it doesn't make any
    /// persistent change, nor it creates any session, it just
    /// compares the password hash.
    CheckPassword { email: String, password: String },

    /// Shows all users.
    Users,

    /// Shows all available roles and their permissions.
    ListRoles,

    /// Ends every session of a given user.
    Logout { email: String },

    /// Removes all expired sessions now.
    Sweep,

    /// Shows the PENDING resumes, oldest first, as seen by the given reviewer.
    ReviewQueue {
        reviewer_email: String,
        #[clap(default_value_t = 1)]
        page: usize,
        #[clap(default_value_t = 20)]
        limit: usize,
    },

    /// Shows the path of the current db.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

const PROMPT: &str = ">> ";

struct AdminContext {
    users: UserManager,
    sessions: SessionManager,
    workflow: ResumeWorkflow,
    resumes: Arc<dyn ResumeStore>,
    retry: RetryPolicy,
    db_path: String,
}

impl AdminContext {
    fn open(config: &AppConfig) -> Result<Self> {
        let store = Arc::new(SqliteStore::new(&config.db_path)?);
        let retry = RetryPolicy::new(&config.retry);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Ok(AdminContext {
            users: UserManager::new(store.clone(), retry.clone(), clock.clone()),
            sessions: SessionManager::new(
                store.clone(),
                retry.clone(),
                clock.clone(),
                config.session.ttl(),
            ),
            workflow: ResumeWorkflow::new(
                store.clone(),
                store.clone(),
                Arc::new(FsObjectStorage::new(config.storage_dir.clone())),
                retry.clone(),
                clock,
                config.resume.clone(),
            ),
            resumes: store,
            retry,
            db_path: config.db_path.display().to_string(),
        })
    }

    /// Read from the store directly, the owner may be deactivated.
    fn resumes_of(&self, user_id: usize) -> CoreResult<Vec<Resume>> {
        Ok(self.retry.execute("list_resumes_for_user", || {
            self.resumes.list_resumes_for_user(user_id)
        })?)
    }
}

fn parse_role(role: &str) -> std::result::Result<UserRole, CommandExecutionResult> {
    UserRole::from_str(role).ok_or_else(|| {
        CommandExecutionResult::Error(format!(
            "Invalid role '{}'. Valid roles are: Admin, Regular",
            role
        ))
    })
}

fn execute_command(line: String, ctx: &AdminContext) -> CommandExecutionResult {
    if line.is_empty() {
        return CommandExecutionResult::Ok;
    }

    let args =
        shlex::split(&line).unwrap_or_else(|| line.split_whitespace().map(String::from).collect());

    let cli = InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str)));

    match cli {
        Ok(cli) => {
            println!("{} {}", PROMPT, &line);
            match cli.command {
                InnerCommand::AddUser {
                    email,
                    password,
                    role,
                } => {
                    let role = match parse_role(&role) {
                        Ok(r) => r,
                        Err(err) => return err,
                    };
                    match ctx.users.add_user(&email, &password, role) {
                        Ok(user) => println!("Created user {} ({})", user.id, user.email),
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::SetPassword { email, password } => {
                    if let Err(err) = ctx.users.set_password(&email, &password) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    println!("Password updated for {}", email);
                }
                InnerCommand::SetRole { email, role } => {
                    let role = match parse_role(&role) {
                        Ok(r) => r,
                        Err(err) => return err,
                    };
                    if let Err(err) = ctx.users.set_role(&email, role) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    println!("User '{}' is now {}", email, role.as_str());
                }
                InnerCommand::Activate { email } => {
                    if let Err(err) = ctx.users.set_active(&email, true) {
                        return CommandExecutionResult::Error(format!("{}", err));
                    }
                    println!("User '{}' activated", email);
                }
                InnerCommand::Deactivate { email } => {
                    let user = match ctx.users.set_active(&email, false) {
                        Ok(user) => user,
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    match ctx.sessions.invalidate_all(user.id) {
                        Ok(count) => {
                            println!("User '{}' deactivated, {} session(s) ended", email, count)
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::Show { email } => {
                    let user = match ctx.users.get_user_by_email(&email) {
                        Ok(Some(user)) => user,
                        Ok(None) => {
                            return CommandExecutionResult::Error(format!(
                                "User '{}' not found",
                                email
                            ))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    println!("User:");
                    println!("{:#?}", user);

                    match ctx.sessions.sessions_for_user(user.id) {
                        Ok(sessions) => {
                            println!("\nSessions:");
                            if sessions.is_empty() {
                                println!("  (no sessions)");
                            }
                            for session in sessions.iter() {
                                println!(
                                    "  - #{} {} created {} expires {}",
                                    session.id,
                                    session.device_class.as_str(),
                                    session.created_at,
                                    session.expires_at
                                );
                            }
                        }
                        Err(err) => println!("\nFailed to get sessions: {}", err),
                    }

                    match ctx.resumes_of(user.id) {
                        Ok(resumes) => {
                            println!("\nResumes:");
                            if resumes.is_empty() {
                                println!("  (no resumes)");
                            }
                            for resume in resumes.iter() {
                                println!(
                                    "  - #{} {} [{}] uploaded {}",
                                    resume.id,
                                    resume.file_name,
                                    resume.status.as_str(),
                                    resume.uploaded_at
                                );
                            }
                        }
                        Err(err) => println!("\nFailed to get resumes: {}", err),
                    }
                }
                InnerCommand::CheckPassword { email, password } => {
                    let msg = match ctx.users.check_password(&email, &password) {
                        Ok(true) => "The password provided is correct!".to_string(),
                        Ok(false) => "Wrong password or unknown user.".to_string(),
                        Err(err) => format!(
                            "Could not verify the password, something went wrong: {}",
                            err
                        ),
                    };
                    println!("{}", msg);
                }
                InnerCommand::Users => match ctx.users.list_users() {
                    Ok(users) => {
                        for user in users.iter() {
                            println!(
                                "{:>5}  {:<40} {:<8} {}",
                                user.id,
                                user.email,
                                user.role.as_str(),
                                if user.is_active { "active" } else { "inactive" }
                            );
                        }
                    }
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::ListRoles => {
                    println!("Available Roles:\n");
                    for role in &[UserRole::Admin, UserRole::Regular] {
                        println!("Role: {}", role.as_str());
                        println!("Permissions:");
                        for permission in role.permissions() {
                            println!("  - {:?}", permission);
                        }
                        println!();
                    }
                }
                InnerCommand::Logout { email } => {
                    let user = match ctx.users.get_user_by_email(&email) {
                        Ok(Some(user)) => user,
                        Ok(None) => {
                            return CommandExecutionResult::Error(format!(
                                "User '{}' not found",
                                email
                            ))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    match ctx.sessions.invalidate_all(user.id) {
                        Ok(count) => println!("Ended {} session(s) of '{}'", count, email),
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::Sweep => match ctx.sessions.cleanup_expired() {
                    Ok(count) => println!("Removed {} expired session(s)", count),
                    Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                },
                InnerCommand::ReviewQueue {
                    reviewer_email,
                    page,
                    limit,
                } => {
                    let reviewer = match ctx.users.get_user_by_email(&reviewer_email) {
                        Ok(Some(user)) => user,
                        Ok(None) => {
                            return CommandExecutionResult::Error(format!(
                                "User '{}' not found",
                                reviewer_email
                            ))
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    };
                    match ctx.workflow.list_for_review(reviewer.id, page, limit) {
                        Ok(queue) => {
                            println!(
                                "Page {} ({} per page), {} pending in total",
                                queue.page, queue.limit, queue.total
                            );
                            for resume in queue.items.iter() {
                                println!(
                                    "  - #{} user {} {} uploaded {}",
                                    resume.id, resume.user_id, resume.file_name, resume.uploaded_at
                                );
                            }
                        }
                        Err(err) => return CommandExecutionResult::Error(format!("{}", err)),
                    }
                }
                InnerCommand::Where => {
                    println!("{}", ctx.db_path);
                }
                InnerCommand::Exit => return CommandExecutionResult::Exit,
            }
        }

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct AdminHelper {
    commands_names: Vec<String>,
}

impl AdminHelper {
    pub fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        AdminHelper { commands_names }
    }
}

impl Completer for AdminHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .map(|c| c.to_string())
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for AdminHelper {}
impl Validator for AdminHelper {}
impl Helper for AdminHelper {}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();
    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.path.clone(),
        ..Default::default()
    };
    let config = AppConfig::resolve(&cli_config, file_config)
        .with_context(|| "Could not resolve the configuration, please specify the db path.")?;

    let ctx = AdminContext::open(&config)?;

    InnerCli::command().print_long_help()?;

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<AdminHelper, FileHistory>::with_config(rl_config)?;
    rl.set_helper(Some(AdminHelper::new()));
    let _ = rl.clear_screen();

    loop {
        let readline = rl.readline(PROMPT);

        let _ = rl.clear_screen();
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &ctx) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => {
                        break;
                    }
                    CommandExecutionResult::Error(err) => {
                        eprintln!("Error: {}", err);
                        continue;
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                println!("Error: {:?}", e);
                break;
            }
        }
    }
    Ok(())
}
