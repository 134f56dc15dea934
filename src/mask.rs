//! Run-length encoded opacity masks and their process-lifetime cache.
//!
//! A mask stores one column per sprite pixel column; each column is a list of
//! maximal runs of equal opacity whose lengths sum to the sprite height.
//! Masks are persisted one line per column as `opaque:len` pairs separated by
//! commas, at `<root>/<identity>.csv`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::api::AlphaSource;
use crate::error::{MaskError, MaskResult};

/// One maximal run of equal opacity within a column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Run {
    pub opaque: bool,
    pub len: u32,
}

/// Column-major run-length encoded opacity mask for one sprite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollisionMask {
    columns: Vec<Vec<Run>>,
    height: u32,
}

impl CollisionMask {
    /// Scan `width x height` pixels column by column. A pixel is opaque iff its
    /// alpha is exactly `u8::MAX`.
    pub fn scan<S: AlphaSource + ?Sized>(source: &S, width: u32, height: u32) -> Self {
        let mut columns = Vec::with_capacity(width as usize);
        for x in 0..width {
            let mut runs: Vec<Run> = Vec::new();
            for y in 0..height {
                let opaque = source.alpha(x, y) == u8::MAX;
                match runs.last_mut() {
                    Some(run) if run.opaque == opaque => run.len += 1,
                    _ => runs.push(Run { opaque, len: 1 }),
                }
            }
            columns.push(runs);
        }
        Self { columns, height }
    }

    /// Build directly from run columns. Height is taken from the first column.
    pub fn from_columns(columns: Vec<Vec<Run>>) -> Self {
        let height = columns
            .first()
            .map(|c| c.iter().map(|r| r.len).sum())
            .unwrap_or(0);
        Self { columns, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.columns.len() as u32
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn columns(&self) -> &[Vec<Run>] {
        &self.columns
    }

    /// Opacity at `(column, row)`. Anything outside the sprite is transparent.
    pub fn is_opaque_at(&self, column: usize, row: usize) -> bool {
        let Some(runs) = self.columns.get(column) else { return false };
        let mut end = 0usize;
        for run in runs {
            end += run.len as usize;
            if row < end {
                return run.opaque;
            }
        }
        false
    }

    /// Total number of runs across all columns.
    pub fn run_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Persisted text form: one line per column.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for runs in &self.columns {
            for (i, run) in runs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}:{}", run.opaque, run.len);
            }
            out.push('\n');
        }
        out
    }

    /// Parse the persisted form. Only boolean/integer syntax is checked; `path`
    /// is used for error reporting.
    pub fn from_csv(text: &str, path: &Path) -> MaskResult<Self> {
        let mut columns = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            let mut runs = Vec::new();
            if !line.is_empty() {
                for pair in line.split(',') {
                    let (opaque, len) = pair.split_once(':').ok_or_else(|| {
                        MaskError::parse(path, line_no + 1, format!("expected `opaque:len`, got `{pair}`"))
                    })?;
                    let opaque = opaque.trim().parse::<bool>().map_err(|e| {
                        MaskError::parse(path, line_no + 1, format!("bad opacity `{opaque}`: {e}"))
                    })?;
                    let len = len.trim().parse::<u32>().map_err(|e| {
                        MaskError::parse(path, line_no + 1, format!("bad run length `{len}`: {e}"))
                    })?;
                    runs.push(Run { opaque, len });
                }
            }
            columns.push(runs);
        }
        Ok(Self::from_columns(columns))
    }
}

/// Cache of masks keyed by sprite identity, optionally backed by a directory.
///
/// Building takes `&mut self`, so first-build is serialized by the borrow
/// checker; once built, masks are shared as `Arc` and never mutated.
#[derive(Debug, Default)]
pub struct MaskCache {
    root: Option<PathBuf>,
    masks: FxHashMap<String, Arc<CollisionMask>>,
}

impl MaskCache {
    /// `root = None` keeps masks in memory only.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root, masks: FxHashMap::default() }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Memory-only lookup.
    pub fn get(&self, identity: &str) -> Option<Arc<CollisionMask>> {
        self.masks.get(identity).cloned()
    }

    /// Storage path mirroring the identity (`a/b/c` -> `<root>/a/b/c.csv`).
    pub fn path_for(&self, identity: &str) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        let mut path = root.clone();
        let parts: Vec<&str> = identity
            .split(['/', '\\'])
            .filter(|p| !p.is_empty() && *p != "." && *p != "..")
            .collect();
        let (last, dirs) = parts.split_last()?;
        for dir in dirs {
            path.push(dir);
        }
        path.push(format!("{last}.csv"));
        Some(path)
    }

    /// Return the cached mask for `identity`, loading it from storage or
    /// scanning `source` on first reference.
    pub fn get_or_build<S: AlphaSource + ?Sized>(
        &mut self,
        identity: &str,
        source: &S,
        width: u32,
        height: u32,
    ) -> MaskResult<Arc<CollisionMask>> {
        if let Some(mask) = self.masks.get(identity) {
            return Ok(Arc::clone(mask));
        }
        if let Some(mask) = self.load_persisted(identity)? {
            return Ok(mask);
        }

        let mask = Arc::new(CollisionMask::scan(source, width, height));
        log::info!(
            "[MaskCache] scanned `{}` ({}x{}, {} runs)",
            identity,
            width,
            height,
            mask.run_count()
        );
        if let Some(path) = self.path_for(identity) {
            match write_mask(&path, &mask) {
                Ok(()) => log::info!("[MaskCache] persisted `{}` to {}", identity, path.display()),
                Err(e) => log::warn!("[MaskCache] could not persist `{}`: {}", identity, e),
            }
        }
        self.masks.insert(identity.to_owned(), Arc::clone(&mask));
        Ok(mask)
    }

    /// Load a persisted mask into memory. `Ok(None)` when no record exists.
    pub fn load_persisted(&mut self, identity: &str) -> MaskResult<Option<Arc<CollisionMask>>> {
        let Some(path) = self.path_for(identity) else { return Ok(None) };
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|e| MaskError::io(&path, e))?;
        let mask = Arc::new(CollisionMask::from_csv(&text, &path)?);
        log::debug!("[MaskCache] loaded `{}` from {}", identity, path.display());
        self.masks.insert(identity.to_owned(), Arc::clone(&mask));
        Ok(Some(mask))
    }

    /// Build a batch of sprites up front; returns how many were newly cached.
    pub fn prewarm<'a, I>(&mut self, sprites: I) -> MaskResult<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a dyn AlphaSource, u32, u32)>,
    {
        let before = self.masks.len();
        for (identity, source, width, height) in sprites {
            self.get_or_build(identity, source, width, height)?;
        }
        Ok(self.masks.len() - before)
    }
}

fn write_mask(path: &Path, mask: &CollisionMask) -> MaskResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MaskError::io(parent, e))?;
    }
    let temp_path = path.with_extension("csv.tmp");
    fs::write(&temp_path, mask.to_csv()).map_err(|e| MaskError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| MaskError::io(path, e))?;
    Ok(())
}
