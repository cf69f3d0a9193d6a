use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Account roster as kept by the control panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_name: String,
    #[serde(default)]
    pub characters: Vec<AccountCharacter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountCharacter {
    #[serde(default)]
    pub character_name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    AccountConflict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub account: String,
    pub character: String,
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    pub conflicted_accounts: Vec<String>,
    pub running_characters: Vec<String>,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Lowercased character name -> owning account. Entries with a blank
/// account or character name are ignored; later accounts win on clashes.
pub fn character_account_map(accounts: &[Account]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for account in accounts {
        if account.account_name.is_empty() {
            continue;
        }
        for character in &account.characters {
            if character.character_name.is_empty() {
                continue;
            }
            map.insert(
                character.character_name.to_lowercase(),
                account.account_name.clone(),
            );
        }
    }
    map
}

/// Character name shown in a client window title, if the title belongs to a client.
pub fn character_from_title<'a>(title: &'a str, prefix: &str) -> Option<&'a str> {
    title.strip_prefix(prefix).filter(|name| !name.is_empty())
}

/// Running characters that belong to one of the selected accounts.
///
/// Characters the roster does not know are listed as running but never
/// reported as conflicts: their account cannot be determined.
pub fn find_conflicts(
    all_accounts: &[Account],
    selected_accounts: &[String],
    running_characters: &[String],
) -> ConflictReport {
    let owners = character_account_map(all_accounts);
    let mut conflicts = Vec::new();
    let mut conflicted = BTreeSet::new();

    for running in running_characters {
        let Some(account) = owners.get(&running.to_lowercase()) else {
            continue;
        };
        if !selected_accounts.iter().any(|s| s == account) {
            continue;
        }
        conflicted.insert(account.clone());
        conflicts.push(Conflict {
            account: account.clone(),
            character: running.clone(),
            kind: ConflictKind::AccountConflict,
            message: format!("Character '{running}' from account '{account}' is already running"),
        });
    }

    ConflictReport {
        conflicts,
        conflicted_accounts: conflicted.into_iter().collect(),
        running_characters: running_characters.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Account> {
        vec![
            Account {
                account_name: "alpha".into(),
                characters: vec![
                    AccountCharacter {
                        character_name: "Nanomage".into(),
                    },
                    AccountCharacter {
                        character_name: "Fixer".into(),
                    },
                ],
            },
            Account {
                account_name: "beta".into(),
                characters: vec![AccountCharacter {
                    character_name: "Doctor".into(),
                }],
            },
        ]
    }

    #[test]
    fn running_character_on_selected_account_conflicts() {
        let report = find_conflicts(
            &roster(),
            &["alpha".to_string()],
            &["nanomage".to_string(), "Doctor".to_string()],
        );
        assert!(report.has_conflicts());
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].account, "alpha");
        assert_eq!(report.conflicts[0].character, "nanomage");
        assert_eq!(report.conflicted_accounts, vec!["alpha".to_string()]);
        assert_eq!(report.running_characters.len(), 2);
    }

    #[test]
    fn unknown_running_characters_never_conflict() {
        let report = find_conflicts(
            &roster(),
            &["alpha".to_string(), "beta".to_string()],
            &["Stranger".to_string()],
        );
        assert!(!report.has_conflicts());
        assert_eq!(report.running_characters, vec!["Stranger".to_string()]);
    }

    #[test]
    fn titles_are_split_on_the_client_prefix() {
        assert_eq!(
            character_from_title("Anarchy Online - Fixer", "Anarchy Online - "),
            Some("Fixer")
        );
        assert_eq!(character_from_title("Anarchy Online - ", "Anarchy Online - "), None);
        assert_eq!(character_from_title("Notepad", "Anarchy Online - "), None);
    }

    #[test]
    fn roster_deserializes_with_extra_fields() {
        let json = r#"[{"accountName":"alpha","password":"x",
            "characters":[{"characterName":"Fixer","characterId":7}]}]"#;
        let accounts: Vec<Account> = serde_json::from_str(json).unwrap();
        assert_eq!(accounts[0].characters[0].character_name, "Fixer");
    }
}
