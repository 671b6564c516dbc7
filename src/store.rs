use anyhow::Result;
use async_trait::async_trait;

/// Object storage the job reads from and writes to.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<()>;
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()>;
}

/// `{prefix}*{extension}` glob: direct children only, hidden files (`_x`, `.x`) skipped.
pub fn matches_glob(key: &str, prefix: &str, extension: &str) -> bool {
    let Some(name) = key.strip_prefix(prefix) else {
        return false;
    };

    !name.is_empty()
        && !name.contains('/')
        && !name.starts_with('_')
        && !name.starts_with('.')
        && name.ends_with(extension)
}

/// Keys under `prefix` matching the input glob, in lexicographic order.
pub async fn list_matching<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    prefix: &str,
    extension: &str,
) -> Result<Vec<String>> {
    let mut keys: Vec<String> = store
        .list_keys(bucket, prefix)
        .await?
        .into_iter()
        .filter(|k| matches_glob(k, prefix, extension))
        .collect();
    keys.sort();
    Ok(keys)
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    #[test]
    fn glob_matches_direct_csv_children_only() {
        assert!(matches_glob("input/people.csv", "input/", ".csv"));
        assert!(!matches_glob("input/archive/people.csv", "input/", ".csv"));
        assert!(!matches_glob("input/people.CSV", "input/", ".csv"));
        assert!(!matches_glob("input/people.json", "input/", ".csv"));
        assert!(!matches_glob("input/", "input/", ".csv"));
        assert!(!matches_glob("other/people.csv", "input/", ".csv"));
    }

    #[test]
    fn glob_skips_hidden_files() {
        assert!(!matches_glob("input/_tmp.csv", "input/", ".csv"));
        assert!(!matches_glob("input/.people.csv", "input/", ".csv"));
    }

    #[tokio::test]
    async fn list_matching_sorts_and_filters() {
        let store = MemoryStore::default();
        store.insert("raw", "input/b.csv", b"");
        store.insert("raw", "input/a.csv", b"");
        store.insert("raw", "input/nested/c.csv", b"");
        store.insert("raw", "input/readme.txt", b"");
        store.insert("other", "input/z.csv", b"");

        let keys = list_matching(&store, "raw", "input/", ".csv").await.unwrap();
        assert_eq!(keys, vec!["input/a.csv", "input/b.csv"]);
    }
}
