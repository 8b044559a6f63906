#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Help,
    Version,
    Config,
    Skills,
    Request,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "-h" | "--help" | "help" => CliVerb::Help,
        "-V" | "--version" => CliVerb::Version,
        "config" => CliVerb::Config,
        "skills" => CliVerb::Skills,
        _ => CliVerb::Request,
    }
}

/// `config` and `skills` are verbs only on their own; with more words they
/// start an ordinary request.
pub fn parse_cli_args(args: &[String]) -> (CliVerb, String) {
    let request = args.join(" ").trim().to_string();
    let Some(first) = args.first() else {
        return (CliVerb::Help, request);
    };
    match parse_cli_verb(first) {
        CliVerb::Config | CliVerb::Skills if args.len() > 1 => (CliVerb::Request, request),
        CliVerb::Request if request.is_empty() => (CliVerb::Help, request),
        verb => (verb, request),
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: pls <request>".to_string(),
        String::new(),
        "Describe what you want in plain words; pls plans it, asks for confirmation and runs it."
            .to_string(),
        String::new(),
        "Commands:".to_string(),
        "  <request...>                         Plan and run a request".to_string(),
        "  config                               Set the API key, model and debug level"
            .to_string(),
        "  skills                               List skills from ~/.pls/skills".to_string(),
        "  --help                               Show this help".to_string(),
        "  --version                            Show the version".to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

pub fn version_text() -> String {
    format!("pls {}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    #[test]
    fn verbs_only_apply_to_single_words() {
        assert_eq!(parse_cli_args(&args(&["config"])).0, CliVerb::Config);
        assert_eq!(
            parse_cli_args(&args(&["config", "the", "proxy"])),
            (CliVerb::Request, "config the proxy".to_string())
        );
        assert_eq!(parse_cli_args(&args(&["--version"])).0, CliVerb::Version);
        assert_eq!(parse_cli_args(&[]).0, CliVerb::Help);
        assert_eq!(parse_cli_args(&args(&["  "])).0, CliVerb::Help);
    }
}
