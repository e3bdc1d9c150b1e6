//! Command handlers

pub mod author;
pub mod capsule;
pub mod config;
pub mod content;
pub mod status;
pub mod study;
pub mod transfer;

use anyhow::{bail, Result};

use pocket_core::{Capsule, KvStore, Store};

/// Resolve a capsule id given in full or as a unique prefix
pub fn resolve_capsule_id<K: KvStore>(id: &str, store: &Store<K>) -> Result<String> {
    // Full ids resolve even when the index is missing or unreadable
    if store.contains(id) {
        return Ok(id.to_string());
    }

    let capsules = store.list_all();
    let matches: Vec<_> = capsules.iter().filter(|c| c.id.starts_with(id)).collect();

    match matches.len() {
        0 => bail!("No capsule found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple capsules match '{}':", id);
            for capsule in &matches {
                eprintln!("  {} - {}", capsule.id, capsule.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

/// Resolve the id of a note, flashcard, question or attachment given in
/// full or as a unique prefix
pub fn resolve_item_id<'a>(
    kind: &str,
    ids: impl IntoIterator<Item = &'a str>,
    given: &str,
) -> Result<String> {
    let ids: Vec<&str> = ids.into_iter().collect();
    if ids.contains(&given) {
        return Ok(given.to_string());
    }

    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(given)).collect();
    match matches.len() {
        0 => bail!("No {} found matching: {}", kind, given),
        1 => Ok(matches[0].to_string()),
        _ => bail!("Ambiguous {} ID '{}'. Please provide more characters.", kind, given),
    }
}

/// Load a capsule by full id or prefix
pub fn load_capsule<K: KvStore>(id: &str, store: &Store<K>) -> Result<Capsule> {
    let resolved = resolve_capsule_id(id, store)?;
    store
        .get(&resolved)
        .ok_or_else(|| anyhow::anyhow!("Capsule not found: {}", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocket_core::MemoryKv;

    fn store_with(ids: &[&str]) -> Store<MemoryKv> {
        let mut store = Store::new(MemoryKv::new());
        for id in ids {
            store.put(&Capsule::with_id(*id)).unwrap();
        }
        store
    }

    #[test]
    fn test_full_id_wins_over_prefix() {
        let store = store_with(&["abc", "abcdef"]);
        assert_eq!(resolve_capsule_id("abc", &store).unwrap(), "abc");
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let store = store_with(&["lw3k9x0a", "mq81zz00"]);
        assert_eq!(resolve_capsule_id("mq8", &store).unwrap(), "mq81zz00");
    }

    #[test]
    fn test_ambiguous_and_unknown_prefixes_fail() {
        let store = store_with(&["ab12", "ab34"]);
        assert!(resolve_capsule_id("ab", &store).is_err());
        assert!(resolve_capsule_id("zz", &store).is_err());
    }

    #[test]
    fn test_full_id_resolves_with_damaged_index() {
        let mut kv = MemoryKv::new();
        let mut store = Store::new(kv.clone());
        store.put(&Capsule::with_id("lw3k9x0a")).unwrap();
        kv.set("pc_capsules_index", "{not json").unwrap();

        assert!(store.list_all().is_empty());
        assert_eq!(resolve_capsule_id("lw3k9x0a", &store).unwrap(), "lw3k9x0a");
        assert_eq!(load_capsule("lw3k9x0a", &store).unwrap().id, "lw3k9x0a");
        assert!(resolve_capsule_id("lw3", &store).is_err());
    }

    #[test]
    fn test_resolve_item_id() {
        let ids = ["n1aaaa", "n1bbbb", "z9"];
        assert_eq!(resolve_item_id("note", ids, "z9").unwrap(), "z9");
        assert_eq!(resolve_item_id("note", ids, "n1b").unwrap(), "n1bbbb");
        let err = resolve_item_id("note", ids, "n1").unwrap_err();
        assert!(err.to_string().contains("Ambiguous note"));
        assert!(resolve_item_id("note", ids, "q").is_err());
        assert!(resolve_item_id("note", [], "").is_err());
    }

    #[test]
    fn test_load_capsule() {
        let store = store_with(&["sample-xyz"]);
        assert_eq!(load_capsule("sample", &store).unwrap().id, "sample-xyz");
    }
}
