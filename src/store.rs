//! Invariant store driver
//!
//! Ties the pieces together around a baseline directory. Every state a
//! crawler reaches is identified by the hash of the click path that led
//! there; the store keeps one baseline file per identity
//! (`inv-<hash>.txt`) plus the pretty-printed snapshot it was last
//! checked against (`dom-<hash>.txt`).
//!
//! `check_state` is the learning path: load or derive the baseline,
//! prune what no longer holds, persist the survivors. `test_state` is
//! the strict path: the baseline must exist and every expression must
//! hold. Batches of distinct identities check in parallel.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use log::{debug, info};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::dom::Document;
use crate::error::Error;
use crate::invariant::{derive_all, CheckReport, InvariantTree, MatchConfig};
use crate::query::QueryCache;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding `inv-*.txt` and `dom-*.txt` files
    pub output_dir: PathBuf,
    /// Capacity of the compiled path-query cache
    pub query_cache_size: usize,
    /// Fuzzy re-matching tunables
    pub match_config: MatchConfig,
}

impl StoreConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            output_dir: output_dir.into(),
            query_cache_size: 1024,
            match_config: MatchConfig::default(),
        }
    }
}

/// Outcome of a learning-mode check
#[derive(Debug)]
pub struct CheckOutcome {
    /// Identity hash of the click path
    pub identity: String,
    /// Expressions that still hold, as persisted tab-indented lines
    pub surviving: IndexSet<String>,
    /// Whether the baseline was derived from this document rather than
    /// loaded from disk
    pub fresh_baseline: bool,
}

/// Driver owning the baseline directory and the shared query cache
#[derive(Debug)]
pub struct InvariantStore {
    config: StoreConfig,
    cache: QueryCache,
}

/// Hash the ordered click-path events into a state identity. Two paths
/// with equal string forms share a baseline; the empty path hashes the
/// empty string.
pub fn identity_hash<E: Display>(events: &[E]) -> String {
    let mut hasher = Sha256::new();
    for event in events {
        hasher.update(event.to_string().as_bytes());
    }
    hex::encode(hasher.finalize())
}

impl InvariantStore {
    pub fn new(config: StoreConfig) -> Self {
        let cache = QueryCache::new(config.query_cache_size);
        InvariantStore { config, cache }
    }

    fn baseline_path(&self, identity: &str) -> PathBuf {
        self.config.output_dir.join(format!("inv-{identity}.txt"))
    }

    fn snapshot_path(&self, identity: &str) -> PathBuf {
        self.config.output_dir.join(format!("dom-{identity}.txt"))
    }

    /// Learning mode: load the baseline for this click path (deriving
    /// one from the document on first sight), prune expressions that no
    /// longer hold and persist the surviving set alongside a snapshot
    /// of the document.
    pub fn check_state<E: Display>(
        &self,
        events: &[E],
        doc: &Document,
    ) -> Result<CheckOutcome, Error> {
        let identity = identity_hash(events);
        let baseline_path = self.baseline_path(&identity);

        let (lines, fresh_baseline) = match read_lines(&baseline_path)? {
            Some(lines) => (lines, false),
            None => {
                info!("deriving fresh baseline for state {identity}");
                (derive_all(doc).into_iter().collect(), true)
            }
        };

        let surviving = if lines.is_empty() {
            // Nothing to check against (empty document on first sight,
            // or a baseline already pruned to nothing)
            IndexSet::new()
        } else {
            let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
            let tree = InvariantTree::parse(&refs)?;
            tree.check_and_remove_failures(doc, &self.cache, &self.config.match_config)
        };

        debug!(
            "state {identity}: {} of {} expressions survive",
            surviving.len(),
            lines.len()
        );

        self.persist(&identity, &surviving, doc)?;

        Ok(CheckOutcome {
            identity,
            surviving,
            fresh_baseline,
        })
    }

    /// Strict mode: check the stored baseline against the document and
    /// report every expression that no longer holds. The baseline must
    /// have been learned before.
    pub fn test_state<E: Display>(
        &self,
        events: &[E],
        doc: &Document,
    ) -> Result<CheckReport, Error> {
        let identity = identity_hash(events);
        let baseline_path = self.baseline_path(&identity);

        let lines = read_lines(&baseline_path)?.ok_or(Error::MissingBaseline {
            identity: identity.clone(),
        })?;
        if lines.is_empty() {
            return Ok(CheckReport::new());
        }

        let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
        let tree = InvariantTree::parse(&refs)?;
        Ok(tree.check(doc, &self.cache, &self.config.match_config))
    }

    /// Check a batch of states in parallel. Identities in the batch
    /// must be distinct; checks on different identities are
    /// independent.
    pub fn check_states<E: Display + Sync>(
        &self,
        batch: &[(&[E], &Document)],
    ) -> Vec<Result<CheckOutcome, Error>> {
        batch
            .par_iter()
            .map(|(events, doc)| self.check_state(events, doc))
            .collect()
    }

    fn persist(
        &self,
        identity: &str,
        surviving: &IndexSet<String>,
        doc: &Document,
    ) -> Result<(), Error> {
        fs::create_dir_all(&self.config.output_dir).map_err(|source| Error::Storage {
            path: self.config.output_dir.clone(),
            source,
        })?;

        let mut baseline = String::new();
        for line in surviving {
            baseline.push_str(line);
            baseline.push('\n');
        }
        write_file(&self.baseline_path(identity), &baseline)?;
        write_file(&self.snapshot_path(identity), &doc.to_pretty_string("\t"))?;
        Ok(())
    }
}

/// Read a baseline file into its non-empty lines; None when the file
/// does not exist.
fn read_lines(path: &Path) -> Result<Option<Vec<String>>, Error> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(
            content
                .split('\n')
                .filter(|line| !line.trim().is_empty())
                .map(|line| line.to_string())
                .collect(),
        )),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Storage {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), Error> {
    fs::write(path, content).map_err(|source| Error::Storage {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> InvariantStore {
        InvariantStore::new(StoreConfig::new(dir.path()))
    }

    #[test]
    fn identity_hash_is_deterministic_and_order_sensitive() {
        let a = identity_hash(&["click button", "enter text"]);
        let b = identity_hash(&["click button", "enter text"]);
        let c = identity_hash(&["enter text", "click button"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn empty_path_hashes_the_empty_string() {
        let empty: [&str; 0] = [];
        assert_eq!(
            identity_hash(&empty),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn first_sight_derives_and_persists_a_baseline() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let doc = Document::parse("<html><body><div id=\"x\"/></body></html>");

        let outcome = store.check_state(&["go"], &doc).unwrap();
        assert!(outcome.fresh_baseline);
        assert_eq!(outcome.surviving.len(), 3);

        let baseline = dir.path().join(format!("inv-{}.txt", outcome.identity));
        let content = fs::read_to_string(baseline).unwrap();
        assert!(content.contains("\t//html\n"));
        assert!(content.contains("\t\t\t//div[@id=\"x\"]\n"));

        let snapshot = dir.path().join(format!("dom-{}.txt", outcome.identity));
        assert!(fs::read_to_string(snapshot).unwrap().contains("<div id=\"x\"/>"));
    }

    #[test]
    fn revisits_prune_invariants_that_stopped_holding() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let first = Document::parse("<html><body><div id=\"x\"/><p id=\"gone-for-good\"/></body></html>");
        let outcome = store.check_state(&["go"], &first).unwrap();
        assert_eq!(outcome.surviving.len(), 4);

        let second = Document::parse("<html><body><div id=\"x\"/></body></html>");
        let outcome = store.check_state(&["go"], &second).unwrap();
        assert!(!outcome.fresh_baseline);
        let lines: Vec<&String> = outcome.surviving.iter().collect();
        assert_eq!(
            lines,
            vec!["\t//html", "\t\t//body", "\t\t\t//div[@id=\"x\"]"]
        );
    }

    #[test]
    fn empty_document_on_first_sight_yields_empty_baseline() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let doc = Document::parse("");

        let outcome = store.check_state(&["go"], &doc).unwrap();
        assert!(outcome.surviving.is_empty());

        // The empty baseline persists and later checks stay empty
        let outcome = store.check_state(&["go"], &doc).unwrap();
        assert!(!outcome.fresh_baseline);
        assert!(outcome.surviving.is_empty());
    }

    #[test]
    fn test_state_requires_a_stored_baseline() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let doc = Document::parse("<html/>");

        let err = store.test_state(&["never seen"], &doc).unwrap_err();
        assert!(matches!(err, Error::MissingBaseline { .. }));
    }

    #[test]
    fn test_state_reports_against_the_stored_baseline() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let learned = Document::parse("<html><body><div id=\"x\"/></body></html>");
        store.check_state(&["go"], &learned).unwrap();

        let same = store.test_state(&["go"], &learned).unwrap();
        assert!(same.passed());

        let changed = Document::parse("<html><body/></html>");
        let report = store.test_state(&["go"], &changed).unwrap();
        assert_eq!(report.failures().len(), 1);
    }

    #[test]
    fn batches_check_in_parallel() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let docs: Vec<Document> = (0..8)
            .map(|i| Document::parse(&format!("<html><body><div id=\"s{i}\"/></body></html>")))
            .collect();
        let events: Vec<Vec<String>> = (0..8).map(|i| vec![format!("step {i}")]).collect();
        let batch: Vec<(&[String], &Document)> = events
            .iter()
            .zip(&docs)
            .map(|(e, d)| (e.as_slice(), d))
            .collect();

        let outcomes = store.check_states(&batch);
        assert_eq!(outcomes.len(), 8);
        for outcome in outcomes {
            let outcome = outcome.unwrap();
            assert!(outcome.fresh_baseline);
            assert_eq!(outcome.surviving.len(), 3);
        }
    }
}
