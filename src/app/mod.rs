use crate::advisory::{AdvisoryService, AnthropicAdvisory};
use crate::config::{load_config, ConfigDocument, ConfigKey, PlsPaths};
use crate::executor::{CancellationToken, ShellExecutor};
use crate::session::{Session, SessionContext};
use crate::shared::Logger;
use crate::skills::SkillLibrary;

pub mod cli;
pub mod interaction;
pub mod keys;
pub mod render;

use cli::{help_text, parse_cli_args, version_text, CliVerb};
use interaction::{Console, Interaction};

fn service_keys() -> Vec<ConfigKey> {
    crate::config::core_config_keys()
        .into_iter()
        .filter(|key| key.path.starts_with("anthropic."))
        .collect()
}

fn load(paths: &PlsPaths) -> Result<(ConfigDocument, Logger), String> {
    let config = load_config(&paths.config_file()).map_err(|err| err.to_string())?;
    let logger = Logger::new(paths.log_file(), config.debug_level());
    Ok((config, logger))
}

/// Lists skills with validity markers.
pub fn skills_listing(library: &SkillLibrary) -> String {
    if library.is_empty() {
        return "No skills found.".to_string();
    }
    library
        .skills()
        .iter()
        .map(|skill| {
            let marker = if !skill.is_valid {
                " (invalid)"
            } else if skill.is_incomplete {
                " (incomplete)"
            } else {
                ""
            };
            format!("- {}{marker}", skill.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn run_session(
    paths: &PlsPaths,
    interaction: &mut dyn Interaction,
    advisory: Option<&dyn AdvisoryService>,
    config: ConfigDocument,
    logger: &Logger,
    submit: impl FnOnce(&mut Session<'_>),
) -> Result<(i32, ConfigDocument), String> {
    let library =
        SkillLibrary::load_dir(&paths.skills_dir(), logger).map_err(|err| err.to_string())?;
    let executor = ShellExecutor::new(logger.clone());
    let mut session = Session::new(SessionContext {
        advisory,
        executor: &executor,
        interaction,
        library: &library,
        config,
        config_path: paths.config_file(),
        cancel: CancellationToken::new(),
        logger: logger.clone(),
    });
    submit(&mut session);
    let code = session.run();
    Ok((code, session.config().clone()))
}

/// Runs one invocation against `paths`, talking to the user through
/// `interaction`. Returns the process exit code.
pub fn run_with(
    args: &[String],
    paths: &PlsPaths,
    interaction: &mut dyn Interaction,
) -> Result<i32, String> {
    let (verb, request) = parse_cli_args(args);
    match verb {
        CliVerb::Help => {
            interaction.show(&help_text());
            Ok(0)
        }
        CliVerb::Version => {
            interaction.show(&version_text());
            Ok(0)
        }
        CliVerb::Skills => {
            let (_, logger) = load(paths)?;
            let library = SkillLibrary::load_dir(&paths.skills_dir(), &logger)
                .map_err(|err| err.to_string())?;
            interaction.show(&skills_listing(&library));
            Ok(0)
        }
        CliVerb::Config => {
            let (config, logger) = load(paths)?;
            let (code, _) = run_session(paths, interaction, None, config, &logger, |session| {
                session.submit_config(crate::config::core_config_keys())
            })?;
            Ok(code)
        }
        CliVerb::Request => {
            let (mut config, logger) = load(paths)?;
            let mut service = config.service().map_err(|err| err.to_string())?;
            if service.api_key().is_none() {
                interaction.show("No Anthropic API key is configured yet.");
                let (code, updated) =
                    run_session(paths, interaction, None, config, &logger, |session| {
                        session.submit_config(service_keys())
                    })?;
                if code != 0 {
                    return Ok(code);
                }
                config = updated;
                service = config.service().map_err(|err| err.to_string())?;
                if service.api_key().is_none() {
                    return Ok(code);
                }
            }
            let logger = Logger::new(paths.log_file(), config.debug_level());
            let advisory =
                AnthropicAdvisory::new(&service, logger.clone()).map_err(|err| err.to_string())?;
            let (code, _) = run_session(
                paths,
                interaction,
                Some(&advisory as &dyn AdvisoryService),
                config,
                &logger,
                |session| session.submit_request(&request),
            )?;
            Ok(code)
        }
    }
}

pub fn run_cli(args: Vec<String>) -> Result<i32, String> {
    let paths = PlsPaths::from_home().map_err(|err| err.to_string())?;
    let mut console = Console::stdio();
    run_with(&args, &paths, &mut console)
}
