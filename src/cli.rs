//! # Command-Line Interface / 命令行接口
//!
//! Builds the clap command tree with localized help and dispatches to the
//! `run`, `list` and `init` commands.
//!
//! 构建带有本地化帮助信息的 clap 命令树，并分发到 `run`、`list` 和 `init` 命令。

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::config::RunOptions;
use crate::infra::t;

pub mod commands {
    pub mod init;
    pub mod list;
    pub mod run;
}

/// Default suite file name.
pub const DEFAULT_SUITE_FILE: &str = "EditorSuite.toml";

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

fn suite_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("arg_config", locale = locale).to_string())
        .value_name("SUITE")
        .default_value(DEFAULT_SUITE_FILE)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

/// Options shared by `run` and `list`, since both collect the suite.
fn collection_args(cmd: Command, locale: &str) -> Command {
    cmd.arg(suite_arg(locale))
        .arg(
            Arg::new("no-test-batch")
                .long("no-test-batch")
                .help(t!("arg_no_test_batch", locale = locale).to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-test-parallel")
                .long("no-test-parallel")
                .help(t!("arg_no_test_parallel", locale = locale).to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("parallel-executables")
                .long("parallel-executables")
                .help(t!("arg_parallel_executables", locale = locale).to_string())
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("filter")
                .short('k')
                .long("filter")
                .help(t!("arg_filter", locale = locale).to_string())
                .value_name("SUBSTRING")
                .action(ArgAction::Set),
        )
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("editor-test-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli_about", locale = locale).to_string())
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            collection_args(
                Command::new("run").about(t!("cmd_run_about", locale = locale).to_string()),
                locale,
            )
            .arg(
                Arg::new("extra-args")
                    .long("extra-args")
                    .help(t!("arg_extra_args", locale = locale).to_string())
                    .value_name("ARGS")
                    .allow_hyphen_values(true)
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("bisect-depth")
                    .long("bisect-depth")
                    .help(t!("arg_bisect_depth", locale = locale).to_string())
                    .value_name("N")
                    .value_parser(clap::value_parser!(u32))
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("html")
                    .long("html")
                    .help(t!("arg_html", locale = locale).to_string())
                    .value_name("HTML")
                    .value_parser(clap::value_parser!(PathBuf))
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("json")
                    .long("json")
                    .help(t!("arg_json", locale = locale).to_string())
                    .value_name("JSON")
                    .value_parser(clap::value_parser!(PathBuf))
                    .action(ArgAction::Set),
            ),
        )
        .subcommand(
            collection_args(
                Command::new("list").about(t!("cmd_list_about", locale = locale).to_string()),
                locale,
            )
            .arg(
                Arg::new("show-runners")
                    .long("show-runners")
                    .help(t!("arg_show_runners", locale = locale).to_string())
                    .action(ArgAction::SetTrue),
            ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Reads the collection options out of `run` or `list` matches.
fn run_options(matches: &ArgMatches) -> Result<RunOptions> {
    let extra_args = match matches.try_get_one::<String>("extra-args").ok().flatten() {
        Some(raw) => shlex::split(raw)
            .ok_or_else(|| anyhow::anyhow!("Failed to parse --extra-args: {}", raw))?,
        None => vec![],
    };
    Ok(RunOptions {
        no_batch: matches.get_flag("no-test-batch"),
        no_parallel: matches.get_flag("no-test-parallel"),
        parallel_executables: matches.get_one::<usize>("parallel-executables").copied(),
        filter: matches.get_one::<String>("filter").cloned(),
        extra_args,
        bisect_depth: matches.try_get_one::<u32>("bisect-depth").ok().flatten().copied(),
    })
}

fn suite_path(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SUITE_FILE))
}

pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_lang = pre_parse_language();
    match &explicit_lang {
        Some(lang) => crate::set_language(lang),
        None => crate::init(),
    }
    let language = rust_i18n::locale().to_string();

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let options = run_options(run_matches)?;
            let args = commands::run::RunArgs {
                suite: suite_path(run_matches),
                options,
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                json: run_matches.get_one::<PathBuf>("json").cloned(),
                explicit_lang,
            };
            commands::run::execute(args).await?;
        }
        Some(("list", list_matches)) => {
            let options = run_options(list_matches)?;
            commands::list::execute(
                &suite_path(list_matches),
                &options,
                list_matches.get_flag("show-runners"),
                &language,
            )?;
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            if explicit_lang.is_none() && !non_interactive {
                println!(
                    "{}",
                    t!("system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::run_init_wizard(&language, non_interactive)?;
        }
        _ => {
            // Clap has already printed help info.
        }
    }
    Ok(())
}
