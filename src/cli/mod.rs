use clap::Parser;
use std::fmt;

/// Routes a command name to its handler.
pub mod dispatcher;
/// One module per command.
pub mod handlers;

/// Builds the colored command list shown after the generated help.
fn build_commands_help() -> &'static str {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();
    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    let mut help = format!("{title}Commands:{reset}\n");
    for (name, aliases, about) in dispatcher::command_summaries() {
        help.push_str(&format!("  {cmd}{name:<22}{reset}{about}"));
        if !aliases.is_empty() {
            help.push_str(&format!(" {dim}(alias: {}){reset}", aliases.join(", ")));
        }
        help.push('\n');
    }
    help.push_str(&format!(
        "\n{dim}Commands may be prefixed with `dash` or `dashboard`. \
         Run `grafctl <command> --help` for its options.{reset}"
    ));

    Box::leak(help.into_boxed_str())
}

/// grafctl: keeps Grafana dashboards and the queries they run in sync with files.
#[derive(Parser)]
#[command(
    author,
    version,
    about,
    after_help = { build_commands_help() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Grafana base URL (overrides GRAFCTL_URL and the profile).
    #[arg(long)]
    pub url: Option<String>,

    /// Grafana API key (overrides GRAFCTL_API_KEY and the profile).
    #[arg(long)]
    pub key: Option<String>,

    /// Profile of the config file to use (overrides GRAFCTL_PROFILE).
    #[arg(long)]
    pub profile: Option<String>,

    /// Log every reconciliation step.
    #[arg(short, long)]
    pub verbose: bool,

    /// The command and its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    pub args: Vec<String>,
}

/// Shows whether a key was given, never the key itself.
impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("url", &self.url)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("profile", &self.profile)
            .field("verbose", &self.verbose)
            .field("args", &self.args)
            .finish()
    }
}
