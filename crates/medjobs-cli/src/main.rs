// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod listing;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use listing::ListRequest;
use medjobs_api::Client;
use medjobs_app::{AppCommand, AppState, LoginFormInput, ResourceKind, SessionService};
use medjobs_store::Store;
use runtime::ApiRuntime;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `medjobs --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let db_path = config.db_path()?;
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    logging::init(&config.log_filter(), &config.log_path()?)?;

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or MEDJOBS_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    let sessions = SessionService::new(store);
    sessions.restore()?;

    let client = Client::new(config.base_url(), config.timeout()?, sessions.handle())
        .with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;
    let poll_interval = config.poll_interval()?;
    if options.check_only {
        return Ok(());
    }

    if options.logout {
        sessions.clear()?;
        println!("signed out");
        return Ok(());
    }

    if let Some(email) = &options.login_email {
        let form = LoginFormInput {
            email: email.clone(),
            password: read_password()?,
        };
        let session = medjobs_api::login(&client, &form)
            .with_context(|| format!("sign in as {email} at {}", client.base_url()))?;
        let name = session.display_name().to_owned();
        sessions.set(session)?;
        println!("signed in as {name}");
        return Ok(());
    }

    if let Some(request) = &options.list {
        if !sessions.handle().is_signed_in() {
            bail!("not signed in -- run `medjobs --login <email>` first");
        }
        let controller = listing::fetch_listing(&client, request)?;
        print!("{}", listing::render_listing(&controller));
        return Ok(());
    }

    let mut state = if sessions.handle().is_signed_in() {
        AppState::signed_in()
    } else {
        AppState::default()
    };
    state.dispatch(AppCommand::Navigate(config.start_screen()));

    let mut runtime = ApiRuntime::new(client, sessions, poll_interval);
    medjobs_tui::run_app(&mut state, &mut runtime)
}

/// `MEDJOBS_PASSWORD` when set, otherwise one line from stdin.
fn read_password() -> Result<String> {
    if let Ok(password) = env::var("MEDJOBS_PASSWORD") {
        return Ok(password);
    }
    eprint!("password: ");
    io::stderr().flush().context("flush prompt")?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    login_email: Option<String>,
    logout: bool,
    list: Option<ListRequest>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        login_email: None,
        logout: false,
        list: None,
    };
    let mut list_kind = None;
    let mut search = None;
    let mut filters = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--login" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--login requires an email address"))?;
                options.login_email = Some(value.as_ref().to_owned());
            }
            "--logout" => {
                options.logout = true;
            }
            "--list" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow!("--list requires a resource: jobs, drugs, applications or plans")
                })?;
                let kind = ResourceKind::parse(value.as_ref()).ok_or_else(|| {
                    anyhow!(
                        "unknown resource {:?}; use jobs, drugs, applications or plans",
                        value.as_ref()
                    )
                })?;
                list_kind = Some(kind);
            }
            "--search" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--search requires a term"))?;
                search = Some(value.as_ref().to_owned());
            }
            "--filter" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--filter requires field=value"))?;
                let (field, selected) = value.as_ref().split_once('=').ok_or_else(|| {
                    anyhow!("--filter {:?} must look like field=value", value.as_ref())
                })?;
                filters.push((field.trim().to_owned(), selected.trim().to_owned()));
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    match list_kind {
        Some(kind) => {
            options.list = Some(ListRequest {
                kind,
                search: search.unwrap_or_default(),
                filters,
            });
        }
        None if search.is_some() || !filters.is_empty() => {
            bail!("--search and --filter only apply with --list <resource>");
        }
        None => {}
    }
    if options.login_email.is_some() && options.logout {
        bail!("--login and --logout cannot be combined");
    }

    Ok(options)
}

fn print_help() {
    println!("medjobs: employer portal client");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config, database and API settings");
    println!("  --login <email>          Sign in (password from MEDJOBS_PASSWORD or stdin)");
    println!("  --logout                 Forget the stored session");
    println!("  --list <resource>        Print jobs, drugs, applications or plans");
    println!("  --search <term>          With --list: match the first column");
    println!("  --filter <field=value>   With --list: exact filter, repeatable");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use crate::listing::ListRequest;
    use anyhow::Result;
    use medjobs_app::ResourceKind;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/medjobs-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_db_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
                login_email: None,
                logout: false,
                list: None,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_values() {
        for flag in ["--config", "--login", "--list", "--search", "--filter"] {
            let error = parse_cli_args(vec![flag], default_options_path())
                .expect_err("missing value should fail");
            assert!(error.to_string().contains("requires"), "{flag}: {error}");
        }
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_builds_list_request() -> Result<()> {
        let options = parse_cli_args(
            vec![
                "--list",
                "cvs",
                "--search",
                "nur",
                "--filter",
                "status=pending",
                "--filter",
                "job_title = Nurse",
            ],
            default_options_path(),
        )?;
        assert_eq!(
            options.list,
            Some(ListRequest {
                kind: ResourceKind::Applications,
                search: "nur".to_owned(),
                filters: vec![
                    ("status".to_owned(), "pending".to_owned()),
                    ("job_title".to_owned(), "Nurse".to_owned()),
                ],
            })
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_bad_list_usage() {
        let cases = [
            (vec!["--list", "vendors"], "unknown resource"),
            (vec!["--search", "x"], "only apply with --list"),
            (vec!["--list", "jobs", "--filter", "status"], "field=value"),
            (vec!["--login", "a@b.example", "--logout"], "cannot be combined"),
        ];
        for (args, expected) in cases {
            let error = parse_cli_args(args.clone(), default_options_path())
                .expect_err("bad usage should fail");
            assert!(error.to_string().contains(expected), "{args:?}: {error}");
        }
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(!options.print_db_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
