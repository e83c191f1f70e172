//! On-disk shard set
//!
//! Layout: one file per shard directly under the store directory, named by
//! the hex seed, holding raw generated bytes with no header. Shards are
//! written to `<seed>.tmp`, synced, then renamed into place, so a reader or
//! a crash only ever observes a shard as absent or complete.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::crypto::{HashScope, HashingWriter, TeeWriter};
use crate::error::{Error, Result};
use crate::generator::generate_into;
use crate::seed::{Seed, SeedChain};
use crate::spec::ShardSpec;

/// Extension of in-progress shard files
pub const TEMP_EXTENSION: &str = "tmp";

/// Notification for a newly generated shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardEvent {
    /// Height claim reached by this shard (index + 1)
    pub height: u64,
    /// Seed (and file name) of the shard
    pub seed: Seed,
    /// Content hash of the shard
    pub content_hash: String,
}

/// Receiver of per-shard build events.
///
/// Called synchronously, once per newly written shard, in ascending height
/// order.
pub trait ShardSink {
    fn on_shard(&mut self, event: ShardEvent);
}

impl<F: FnMut(ShardEvent)> ShardSink for F {
    fn on_shard(&mut self, event: ShardEvent) {
        self(event)
    }
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ShardSink for NullSink {
    fn on_shard(&mut self, _event: ShardEvent) {}
}

/// Build behaviour switches
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Regenerate every shard, present or not
    pub rebuild: bool,
    /// Delete all managed shards once the build finishes
    pub cleanup: bool,
    /// Regenerate present shards whose size or content hash is wrong.
    /// Without it, presence alone is enough to skip a shard.
    pub verify: bool,
}

/// A shard confirmed present by a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedShard {
    pub index: u64,
    pub seed: Seed,
    pub content_hash: String,
}

/// Result of a build: every confirmed shard, ascending by index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GeneratedMap {
    shards: Vec<GeneratedShard>,
}

impl GeneratedMap {
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Content hash recorded for `seed`
    pub fn get(&self, seed: &Seed) -> Option<&str> {
        self.shards
            .iter()
            .find(|shard| shard.seed == *seed)
            .map(|shard| shard.content_hash.as_str())
    }

    pub fn contains(&self, seed: &Seed) -> bool {
        self.get(seed).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedShard> {
        self.shards.iter()
    }

    /// Seeds in index order
    pub fn seeds(&self) -> impl Iterator<Item = &Seed> {
        self.shards.iter().map(|shard| &shard.seed)
    }

    fn push(&mut self, shard: GeneratedShard) {
        self.shards.push(shard);
    }
}

impl<'a> IntoIterator for &'a GeneratedMap {
    type Item = &'a GeneratedShard;
    type IntoIter = std::slice::Iter<'a, GeneratedShard>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.iter()
    }
}

/// Manager for the shard files of one store directory
#[derive(Debug, Clone)]
pub struct ShardStore {
    root: PathBuf,
    spec: ShardSpec,
    scope: HashScope,
}

impl ShardStore {
    /// Open a store, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>, spec: ShardSpec, scope: HashScope) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::write(&root, e))?;
        Ok(Self { root, spec, scope })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn spec(&self) -> &ShardSpec {
        &self.spec
    }

    pub fn scope(&self) -> HashScope {
        self.scope
    }

    /// Final location of the shard for `seed`
    pub fn shard_path(&self, seed: &Seed) -> PathBuf {
        self.root.join(seed.to_hex())
    }

    fn temp_path(&self, seed: &Seed) -> PathBuf {
        self.root.join(format!("{}.{}", seed.to_hex(), TEMP_EXTENSION))
    }

    /// Whether the shard file for `seed` exists. Content is not inspected.
    pub fn contains(&self, seed: &Seed) -> Result<bool> {
        let path = self.shard_path(seed);
        path.try_exists().map_err(|e| Error::read(path, e))
    }

    /// Open a stored shard for reading
    pub fn open_shard(&self, seed: &Seed) -> Result<File> {
        let path = self.shard_path(seed);
        File::open(&path).map_err(|e| Error::read(path, e))
    }

    /// Ensure shards `0..height` exist, generating the missing ones.
    ///
    /// Present shards are skipped without being opened for writing, unless
    /// `options.rebuild` is set (always regenerate) or `options.verify` is
    /// set and the shard's size or content hash is wrong. Every shard
    /// written triggers `sink.on_shard` before the next index is processed.
    /// A write failure aborts the build; shards committed before it stay
    /// in place, so calling `build` again resumes where it stopped.
    pub fn build(
        &self,
        chain: &SeedChain,
        options: BuildOptions,
        sink: &mut dyn ShardSink,
    ) -> Result<GeneratedMap> {
        let height = self.spec.height();
        info!(
            "Building {} shards of {} bytes in {}",
            height,
            self.spec.shard_size(),
            self.root.display()
        );

        let mut generated = GeneratedMap::default();
        let mut written = 0u64;

        for (index, seed) in (0..height).zip(chain.iter()) {
            let existing = if options.rebuild {
                None
            } else {
                self.existing_hash(&seed, options.verify)?
            };

            let content_hash = match existing {
                Some(content_hash) => {
                    debug!("Shard {} ({}) already present", index, seed.short());
                    content_hash
                }
                None => {
                    let content_hash = self.write_shard(&seed)?;
                    written += 1;
                    debug!("Wrote shard {} ({})", index, seed.short());
                    sink.on_shard(ShardEvent {
                        height: index + 1,
                        seed,
                        content_hash: content_hash.clone(),
                    });
                    content_hash
                }
            };

            generated.push(GeneratedShard {
                index,
                seed,
                content_hash,
            });
        }

        info!(
            "Build complete: {} shards present, {} written",
            generated.len(),
            written
        );

        if options.cleanup {
            self.clean(chain, height)?;
        }

        Ok(generated)
    }

    /// True iff every shard in `0..height` exists. Height 0 is trivially
    /// complete.
    pub fn checkup(&self, chain: &SeedChain, height: u64) -> Result<bool> {
        for (index, seed) in (0..height).zip(chain.iter()) {
            if !self.contains(&seed)? {
                debug!("Checkup: shard {} ({}) missing", index, seed.short());
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Delete shards `0..height` (and any leftover temp files for them).
    ///
    /// Missing files are skipped. Returns the number of shards removed.
    pub fn clean(&self, chain: &SeedChain, height: u64) -> Result<usize> {
        let mut removed = 0;
        for seed in chain.iter().take(usize::try_from(height).unwrap_or(usize::MAX)) {
            if remove_if_present(&self.shard_path(&seed))? {
                debug!("Removed shard {}", seed.short());
                removed += 1;
            }
            remove_if_present(&self.temp_path(&seed))?;
        }
        info!("Removed {} shards from {}", removed, self.root.display());
        Ok(removed)
    }

    /// Content hash of the shard for `seed` as it currently sits on disk
    pub fn content_hash(&self, seed: &Seed) -> Result<String> {
        let path = self.shard_path(seed);
        let file = self.open_shard(seed)?;
        let mut hash = HashingWriter::new(self.scope.limit());
        hash.consume(file).map_err(|e| Error::read(path, e))?;
        Ok(hash.finish_hex())
    }

    /// Content hash the shard for `seed` should have
    pub fn expected_content_hash(&self, seed: &Seed) -> String {
        let covered = self.scope.covered(self.spec.shard_size());
        let mut hash = HashingWriter::new(covered);
        // HashingWriter never fails
        let _ = generate_into(seed, covered, &mut hash);
        hash.finish_hex()
    }

    /// Hash of a present shard that may be kept, or `None` if it must be
    /// (re)generated.
    fn existing_hash(&self, seed: &Seed, verify: bool) -> Result<Option<String>> {
        if !self.contains(seed)? {
            return Ok(None);
        }

        let content_hash = self.content_hash(seed)?;
        if !verify {
            return Ok(Some(content_hash));
        }

        let path = self.shard_path(seed);
        let len = fs::metadata(&path)
            .map_err(|e| Error::read(&path, e))?
            .len();
        if len != self.spec.shard_size() || content_hash != self.expected_content_hash(seed) {
            warn!("Shard {} is corrupt, regenerating", seed.short());
            return Ok(None);
        }
        Ok(Some(content_hash))
    }

    /// Generate the shard for `seed` and atomically move it into place
    fn write_shard(&self, seed: &Seed) -> Result<String> {
        let temp = self.temp_path(seed);
        let content_hash = match self.write_temp(seed, &temp) {
            Ok(content_hash) => content_hash,
            Err(e) => {
                let _ = fs::remove_file(&temp);
                return Err(e);
            }
        };

        let path = self.shard_path(seed);
        fs::rename(&temp, &path).map_err(|e| Error::write(path, e))?;
        Ok(content_hash)
    }

    fn write_temp(&self, seed: &Seed, temp: &Path) -> Result<String> {
        let file = File::create(temp).map_err(|e| Error::write(temp, e))?;
        let mut tee = TeeWriter::new(
            BufWriter::new(file),
            HashingWriter::new(self.scope.limit()),
        );
        generate_into(seed, self.spec.shard_size(), &mut tee).map_err(|e| Error::write(temp, e))?;
        tee.flush().map_err(|e| Error::write(temp, e))?;

        let (writer, content_hash) = tee.into_parts();
        let file = writer
            .into_inner()
            .map_err(|e| Error::write(temp, e.into_error()))?;
        file.sync_all().map_err(|e| Error::write(temp, e))?;
        Ok(content_hash)
    }
}

/// Remove `path`, treating an already missing file as success
fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::write(path, e)),
    }
}
