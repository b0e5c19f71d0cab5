use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;
use std::{env, fs};

use toml_edit::{Document, Item, Table};

const FACADE: &str = "und_core";
const PREFIX: &str = "und_";

/// The parsed Cargo.toml of the crate being compiled.
///
/// Generated code must name `und_*` crates by a path that resolves from
/// the invoking crate. Resolution, for `dependencies` and then
/// `dev-dependencies`:
///
/// 1. a direct dependency on `und_meta` yields `::und_meta`;
/// 2. a dependency on the `und_core` facade yields `::und_core::meta`.
///
/// Anything else falls back to `::und_meta`. A crate naming itself should
/// declare `extern crate self as und_meta;` so the fallback resolves.
///
/// ```
/// # use und_macro_utils::Manifest;
/// let path: syn::Path = Manifest::shared(|m| m.get_crate_path("und_meta"));
/// assert_eq!(path.segments.len(), 1);
/// ```
#[derive(Debug)]
pub struct Manifest {
    pub manifest: Document<Box<str>>,
    pub modified_time: SystemTime,
}

impl Manifest {
    fn locate() -> PathBuf {
        let dir = env::var_os("CARGO_MANIFEST_DIR")
            .expect("CARGO_MANIFEST_DIR is set by cargo for every build");
        let path = PathBuf::from(dir).join("Cargo.toml");
        assert!(path.exists(), "no Cargo.toml at {}", path.display());
        path
    }

    fn load(path: &Path, modified_time: SystemTime) -> Self {
        let text = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
        let manifest = Document::parse(text.into_boxed_str())
            .unwrap_or_else(|e| panic!("cannot parse {}: {e}", path.display()));
        Self {
            manifest,
            modified_time,
        }
    }

    fn path_of(segments: &[&str]) -> syn::Path {
        let text: String = segments.iter().map(|s| format!("::{s}")).collect();
        syn::parse_str(&text).expect("crate names are valid paths")
    }

    fn lookup(table: &Table, name: &str) -> Option<syn::Path> {
        if table.contains_key(name) {
            return Some(Self::path_of(&[name]));
        }
        let short = name.strip_prefix(PREFIX)?;
        table
            .contains_key(FACADE)
            .then(|| Self::path_of(&[FACADE, short]))
    }

    /// Path of crate `name` as seen from the invoking crate.
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        ["dependencies", "dev-dependencies"]
            .into_iter()
            .filter_map(|key| match self.manifest.get(key) {
                Some(Item::Table(table)) => Some(table),
                _ => None,
            })
            .find_map(|table| Self::lookup(table, name))
            .unwrap_or_else(|| Self::path_of(&[name]))
    }

    /// Runs `func` against the invoking crate's manifest.
    ///
    /// Manifests are cached per path and reloaded when the file changes.
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static CACHE: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let path = Self::locate();
        let modified_time = fs::metadata(&path)
            .and_then(|m| m.modified())
            .expect("Cargo.toml has a modification time");

        {
            let cache = CACHE.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(found) = cache.get(&path)
                && found.modified_time == modified_time
            {
                return func(found);
            }
        }

        let fresh = Self::load(&path, modified_time);
        let result = func(&fresh);
        CACHE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, fresh);
        result
    }
}
