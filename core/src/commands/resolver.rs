//! Longest-prefix command resolution

use super::table::{CommandDefinition, CommandTable};

/// A command matched against a message, with its positional arguments
#[derive(Debug, Clone)]
pub struct ResolvedCommand<'a> {
    pub definition: &'a CommandDefinition,
    /// Tokens after the command name, indexed from 0
    pub args: Vec<String>,
    /// Number of tokens forming the command name
    pub consumed: usize,
}

/// Find the longest registered command that prefixes `tokens`
///
/// Every prefix length is tried; a longer match always replaces a shorter one,
/// so `camera snapshot` wins over `camera` when both are registered.
pub fn resolve<'a, S: AsRef<str>>(
    tokens: &[S],
    table: &'a CommandTable,
) -> Option<ResolvedCommand<'a>> {
    let mut candidate = String::new();
    let mut best: Option<(usize, &'a CommandDefinition)> = None;

    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            candidate.push(' ');
        }
        candidate.push_str(token.as_ref());

        if let Some(definition) = table.get(&candidate) {
            best = Some((i + 1, definition));
        }
    }

    best.map(|(consumed, definition)| ResolvedCommand {
        definition,
        args: tokens[consumed..]
            .iter()
            .map(|t| t.as_ref().to_string())
            .collect(),
        consumed,
    })
}

/// The text following the first `consumed` whitespace-separated tokens, case preserved
pub fn raw_arguments(body: &str, consumed: usize) -> &str {
    let mut rest = body.trim_start();
    for _ in 0..consumed {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::table::CommandDefinition;
    use crate::config::CommandEntry;

    fn table(names: &[&str]) -> CommandTable {
        let mut table = CommandTable::new();
        for name in names {
            let entry = CommandEntry::Legacy(format!("ran {}", name));
            table.insert(CommandDefinition::from_entry(name, &entry, Some("all")).unwrap());
        }
        table
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = table(&["camera", "camera snapshot"]);
        let resolved = resolve(&["camera", "snapshot", "front"], &table).unwrap();
        assert_eq!(resolved.definition.name, "camera snapshot");
        assert_eq!(resolved.args, vec!["front".to_string()]);
        assert_eq!(resolved.consumed, 2);
    }

    #[test]
    fn test_shorter_match_keeps_remaining_tokens() {
        let table = table(&["camera", "camera snapshot"]);
        let resolved = resolve(&["camera", "list", "all"], &table).unwrap();
        assert_eq!(resolved.definition.name, "camera");
        assert_eq!(resolved.args, vec!["list".to_string(), "all".to_string()]);
    }

    #[test]
    fn test_match_through_unregistered_gap() {
        // "a b" is not registered but "a b c" is
        let table = table(&["a", "a b c"]);
        let resolved = resolve(&["a", "b", "c", "d"], &table).unwrap();
        assert_eq!(resolved.definition.name, "a b c");
        assert_eq!(resolved.args, vec!["d".to_string()]);
    }

    #[test]
    fn test_no_match() {
        let table = table(&["help"]);
        assert!(resolve(&["helpme"], &table).is_none());
        assert!(resolve::<&str>(&[], &table).is_none());
    }

    #[test]
    fn test_raw_arguments() {
        assert_eq!(raw_arguments("say  123 Hello World", 2), "Hello World");
        assert_eq!(raw_arguments("  listemoji", 1), "");
        assert_eq!(raw_arguments("say", 3), "");
        assert_eq!(raw_arguments("Edit 1 2 New Text", 1), "1 2 New Text");
    }
}
