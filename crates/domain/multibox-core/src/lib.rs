pub mod accounts;
pub mod catalog;
pub mod identity;
pub mod path_utils;

pub use accounts::{find_conflicts, Account, AccountCharacter, Conflict, ConflictKind, ConflictReport};
pub use catalog::{Catalog, CatalogError, ItemKind, PreferenceItem, Selection};
pub use identity::{resolve_character_dir, CharacterIdentity, IdentityError, CHARACTER_DIR_PREFIX};
