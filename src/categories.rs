//! Static category tables behind the recommendation lookup. Plain constant
//! data keyed on canonical keys; loaded with the binary, never mutated.

pub struct Category {
    pub name: &'static str,
    pub commands: &'static [&'static str],
}

pub const CATEGORIES: &[Category] = &[
    Category {
        name: "System Information",
        commands: &["info", "man", "find", "lshw", "cat", "date"],
    },
    Category {
        name: "Networking",
        commands: &["tcpdump", "nmcli"],
    },
    Category {
        name: "Process Management",
        commands: &["ps", "kill", "awk"],
    },
    Category {
        name: "Four Letters",
        commands: &["tmux", "date", "comm", "file"],
    },
    Category {
        name: "Locale",
        commands: &["locale"],
    },
    Category {
        name: "Compression",
        commands: &["zip", "unzip"],
    },
];

/// Every category whose member list contains the canonical key.
pub fn matching(key: &str) -> Vec<&'static Category> {
    CATEGORIES
        .iter()
        .filter(|c| c.commands.contains(&key))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_command_can_sit_in_several_categories() {
        let names: Vec<&str> = matching("date").iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["System Information", "Four Letters"]);
    }

    #[test]
    fn unknown_commands_match_nothing() {
        assert!(matching("xyzzy").is_empty());
    }
}
