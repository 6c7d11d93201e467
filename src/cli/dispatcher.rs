use anyhow::{Result, anyhow};

use crate::{cli::handlers, state::AppContext};

/// Optional group words accepted in front of a dashboard command
/// (`grafctl dash sync ...` is the same as `grafctl sync ...`).
const GROUP_PREFIXES: &[&str] = &["dash", "dashboard"];

// --- Command Definition and Registry ---

/// Defines a command, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    about: &'static str,
    handler: fn(Vec<String>, &AppContext) -> Result<()>,
}

/// The single source of truth for all commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "ls",
        aliases: &["list"],
        about: "List dashboards",
        handler: handlers::ls::handle,
    },
    CommandDefinition {
        name: "inspect",
        aliases: &[],
        about: "Print a dashboard as JSON",
        handler: handlers::inspect::handle,
    },
    CommandDefinition {
        name: "sync",
        aliases: &[],
        about: "Rewrite dashboard queries from query files",
        handler: handlers::sync::handle,
    },
    CommandDefinition {
        name: "export",
        aliases: &["export-queries"],
        about: "Write dashboard queries to query files",
        handler: handlers::export::handle,
    },
    CommandDefinition {
        name: "update-descriptions",
        aliases: &["update-panels-descriptions"],
        about: "Regenerate panel descriptions from the dashboard layout",
        handler: handlers::update_descriptions::handle,
    },
    CommandDefinition {
        name: "backup",
        aliases: &[],
        about: "Back up datasources, folders and dashboards",
        handler: handlers::backup::handle,
    },
    CommandDefinition {
        name: "import",
        aliases: &["restore"],
        about: "Restore a backup into the server",
        handler: handlers::import::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// `(name, aliases, about)` of every command, for the help screen.
pub fn command_summaries() -> impl Iterator<Item = (&'static str, &'static [&'static str], &'static str)> {
    COMMAND_REGISTRY
        .iter()
        .map(|cmd| (cmd.name, cmd.aliases, cmd.about))
}

/// Splits the trailing arguments into the command name and its own arguments,
/// dropping an optional `dash`/`dashboard` group word.
fn split_command(all_args: &[String]) -> Option<(&str, Vec<String>)> {
    let args = match all_args.split_first() {
        Some((first, rest)) if GROUP_PREFIXES.contains(&first.as_str()) => rest,
        _ => all_args,
    };
    let (name, rest) = args.split_first()?;
    Some((name.as_str(), rest.to_vec()))
}

/// Routes the arguments that follow the global flags to a command handler.
pub fn dispatch(all_args: Vec<String>, context: &AppContext) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let Some((name, handler_args)) = split_command(&all_args) else {
        return Err(anyhow!(
            "No command given. Run `grafctl --help` to see the available commands."
        ));
    };

    let command = find_command(name).ok_or_else(|| {
        let known: Vec<&str> = COMMAND_REGISTRY.iter().map(|cmd| cmd.name).collect();
        anyhow!(
            "Unknown command '{name}' (available: {})",
            known.join(", ")
        )
    })?;

    (command.handler)(handler_args, context)
}
