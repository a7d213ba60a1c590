//! In-memory access engine.
//!
//! [`MemoryEngine`] keeps whole container images in memory and implements
//! [`VolumeEngine`] and [`VolumeHandle`] on top of them. It journals the
//! calls it receives and can be told to fail specific operations, which is
//! what the core's tests drive. In persistent mode images are read from and
//! written back to JSON files, which gives the CLI something to open. It
//! does not understand the HFS on-disk format.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::{
    EngineError, EngineResult, FileEntryInfo, PartitionMapEntry, PartitionSelector, TransferMode,
    VolumeEngine, VolumeHandle, VolumeInfo, HFS_PARTITION_TYPE,
};
use crate::path;

/// A container image: either one bare volume or a partition map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryImage {
    #[serde(default)]
    pub partitioned: bool,
    #[serde(default)]
    pub partitions: Vec<MemoryPartition>,
}

impl MemoryImage {
    /// An image holding a single volume and no partition map.
    pub fn unpartitioned(volume: MemoryVolume) -> Self {
        Self {
            partitioned: false,
            partitions: vec![MemoryPartition {
                map_index: 0,
                name: volume.name.clone(),
                partition_type: HFS_PARTITION_TYPE.to_string(),
                volume: Some(volume),
            }],
        }
    }

    /// An image with a partition map.
    pub fn partitioned(partitions: Vec<MemoryPartition>) -> Self {
        Self {
            partitioned: true,
            partitions,
        }
    }

    fn find_partition(&self, selector: PartitionSelector) -> Option<usize> {
        match selector {
            PartitionSelector::Whole => {
                if self.partitioned {
                    None
                } else {
                    self.partitions.iter().position(|p| p.volume.is_some())
                }
            }
            PartitionSelector::Automatic => self
                .partitions
                .iter()
                .position(|p| p.partition_type == HFS_PARTITION_TYPE && p.volume.is_some()),
            PartitionSelector::Number(n) => {
                if !self.partitioned {
                    return None;
                }
                self.partitions
                    .iter()
                    .position(|p| p.map_index == n && p.volume.is_some())
            }
        }
    }
}

/// One row of a [`MemoryImage`]'s partition map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPartition {
    pub map_index: u32,
    pub name: String,
    pub partition_type: String,
    /// `None` for partitions that hold no volume (drivers, the map itself).
    #[serde(default)]
    pub volume: Option<MemoryVolume>,
}

impl MemoryPartition {
    /// A partition map row that holds no volume.
    pub fn other(map_index: u32, name: &str, partition_type: &str) -> Self {
        Self {
            map_index,
            name: name.to_string(),
            partition_type: partition_type.to_string(),
            volume: None,
        }
    }

    /// An HFS partition holding `volume`.
    pub fn hfs(map_index: u32, volume: MemoryVolume) -> Self {
        Self {
            map_index,
            name: volume.name.clone(),
            partition_type: HFS_PARTITION_TYPE.to_string(),
            volume: Some(volume),
        }
    }
}

/// A volume's namespace, keyed by case-folded path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryVolume {
    pub name: String,
    pub capacity: u64,
    pub created: SystemTime,
    pub modified: SystemTime,
    #[serde(default)]
    pub entries: BTreeMap<String, MemoryEntry>,
}

/// One file or directory stored in a [`MemoryVolume`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    #[serde(default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub resource: Vec<u8>,
    pub created: SystemTime,
    pub modified: SystemTime,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_creator: String,
}

impl MemoryEntry {
    fn info(&self) -> FileEntryInfo {
        FileEntryInfo {
            name: self.name.clone(),
            path: self.path.clone(),
            is_directory: self.is_directory,
            data_fork_size: self.data.len() as u64,
            resource_fork_size: self.resource.len() as u64,
            created: self.created,
            modified: self.modified,
            file_type: self.file_type.clone(),
            file_creator: self.file_creator.clone(),
        }
    }
}

fn fold(path: &str) -> String {
    path.to_lowercase()
}

impl MemoryVolume {
    /// An empty volume.
    pub fn new(name: &str, capacity: u64) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.to_string(),
            capacity,
            created: now,
            modified: now,
            entries: BTreeMap::new(),
        }
    }

    /// Adds an empty directory at `path`. The parent must exist.
    pub fn add_directory(&mut self, path: &str) -> EngineResult<()> {
        self.insert(path, true, Vec::new())
    }

    /// Adds a file with `data` as its data fork. The parent must exist.
    pub fn add_file(&mut self, path: &str, data: &[u8]) -> EngineResult<()> {
        self.insert(path, false, data.to_vec())
    }

    /// Returns the entry at `path`, if any.
    pub fn entry(&self, path: &str) -> Option<&MemoryEntry> {
        self.entries.get(&fold(path))
    }

    fn entry_mut(&mut self, path: &str) -> EngineResult<&mut MemoryEntry> {
        self.entries
            .get_mut(&fold(path))
            .ok_or_else(|| EngineError::NotFound(path.to_string()))
    }

    fn is_directory(&self, path: &str) -> bool {
        path::is_root(path) || self.entry(path).is_some_and(|e| e.is_directory)
    }

    fn require_directory(&self, path: &str) -> EngineResult<()> {
        if path::is_root(path) {
            return Ok(());
        }
        match self.entry(path) {
            None => Err(EngineError::NotFound(path.to_string())),
            Some(e) if !e.is_directory => Err(EngineError::NotADirectory(path.to_string())),
            Some(_) => Ok(()),
        }
    }

    fn insert(&mut self, volume_path: &str, is_directory: bool, data: Vec<u8>) -> EngineResult<()> {
        let parent = path::parent_of(volume_path).to_string();
        self.require_directory(&parent)?;
        let key = fold(volume_path);
        if self.entries.contains_key(&key) {
            return Err(EngineError::AlreadyExists(volume_path.to_string()));
        }
        let now = SystemTime::now();
        self.entries.insert(
            key,
            MemoryEntry {
                name: path::name_of(volume_path).to_string(),
                path: volume_path.to_string(),
                is_directory,
                data,
                resource: Vec::new(),
                created: now,
                modified: now,
                file_type: String::new(),
                file_creator: String::new(),
            },
        );
        self.modified = now;
        Ok(())
    }

    fn children(&self, directory: &str) -> Vec<&MemoryEntry> {
        let folded = fold(directory);
        self.entries
            .values()
            .filter(|e| fold(path::parent_of(&e.path)) == folded)
            .collect()
    }

    fn remove_tree(&mut self, volume_path: &str) -> EngineResult<()> {
        let folded = fold(volume_path);
        if !self.entries.contains_key(&folded) {
            return Err(EngineError::NotFound(volume_path.to_string()));
        }
        self.entries
            .retain(|key, _| !path::is_within(key, &folded));
        self.modified = SystemTime::now();
        Ok(())
    }

    /// Moves the subtree at `old` to `new`, rewriting descendant paths.
    fn relocate(&mut self, old: &str, new: &str) -> EngineResult<()> {
        let old_key = fold(old);
        let new_key = fold(new);
        if new_key != old_key && self.entries.contains_key(&new_key) {
            return Err(EngineError::AlreadyExists(new.to_string()));
        }
        let keys: Vec<String> = self
            .entries
            .keys()
            .filter(|key| path::is_within(key, &old_key))
            .cloned()
            .collect();
        for key in keys {
            let Some(mut entry) = self.entries.remove(&key) else {
                continue;
            };
            let suffix = entry.path[old.len()..].to_string();
            entry.path = format!("{new}{suffix}");
            if suffix.is_empty() {
                entry.name = path::name_of(new).to_string();
            }
            self.entries.insert(fold(&entry.path), entry);
        }
        self.modified = SystemTime::now();
        Ok(())
    }

    fn used_bytes(&self) -> u64 {
        self.entries
            .values()
            .map(|e| (e.data.len() + e.resource.len()) as u64)
            .sum()
    }
}

/// Calls the engine has received, for assertions in tests.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    pub open_attempts: Vec<PartitionSelector>,
    pub partition_listings: usize,
    pub listings: Vec<String>,
    pub modes: Vec<TransferMode>,
    pub writes: usize,
    pub closes: usize,
}

#[derive(Debug, Default)]
struct Failures {
    partition_listing: bool,
    listing: HashSet<String>,
    copy_in: HashSet<String>,
}

#[derive(Debug, Default)]
struct EngineState {
    images: HashMap<PathBuf, Arc<Mutex<MemoryImage>>>,
    journal: Journal,
    failures: Failures,
    persistent: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> EngineResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| EngineError::Other("engine state poisoned".to_string()))
}

/// An access engine that keeps images in memory.
///
/// Cloning shares the same image registry and journal.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MemoryEngine {
    /// A purely in-memory engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine that loads images from JSON files on first open and writes
    /// them back when a writable handle closes.
    pub fn persistent() -> Self {
        let engine = Self::default();
        if let Ok(mut state) = engine.state.lock() {
            state.persistent = true;
        }
        engine
    }

    /// Registers `image` under `path`, replacing any previous image.
    pub fn insert_image(&self, path: impl Into<PathBuf>, image: MemoryImage) {
        if let Ok(mut state) = self.state.lock() {
            state.images.insert(path.into(), Arc::new(Mutex::new(image)));
        }
    }

    /// Returns a snapshot of the image registered under `path`.
    pub fn image(&self, path: &Path) -> Option<MemoryImage> {
        let shared = self.state.lock().ok()?.images.get(path).cloned()?;
        let image = shared.lock().ok()?.clone();
        Some(image)
    }

    /// Returns a snapshot of the call journal.
    pub fn journal(&self) -> Journal {
        self.state
            .lock()
            .map(|state| state.journal.clone())
            .unwrap_or_default()
    }

    /// Makes `list_partitions` fail.
    pub fn fail_partition_listing(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.partition_listing = true;
        }
    }

    /// Makes listing `directory` fail until [`MemoryEngine::heal_listing`].
    pub fn fail_listing(&self, directory: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.listing.insert(fold(directory));
        }
    }

    /// Undoes [`MemoryEngine::fail_listing`].
    pub fn heal_listing(&self, directory: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.listing.remove(&fold(directory));
        }
    }

    /// Makes copying into `volume_path` fail.
    pub fn fail_copy_in(&self, volume_path: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.copy_in.insert(fold(volume_path));
        }
    }

    fn record(&self, f: impl FnOnce(&mut Journal)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state.journal);
        }
    }

    fn shared_image(&self, image: &Path) -> EngineResult<Arc<Mutex<MemoryImage>>> {
        let mut state = lock(&self.state)?;
        if let Some(shared) = state.images.get(image) {
            return Ok(shared.clone());
        }
        if !state.persistent {
            return Err(EngineError::NotFound(image.display().to_string()));
        }
        let content = std::fs::read_to_string(image)?;
        let parsed: MemoryImage = serde_json::from_str(&content)
            .map_err(|e| EngineError::Unrecognized(format!("{}: {e}", image.display())))?;
        let shared = Arc::new(Mutex::new(parsed));
        state.images.insert(image.to_path_buf(), shared.clone());
        Ok(shared)
    }

    fn is_persistent(&self) -> bool {
        self.state.lock().map(|s| s.persistent).unwrap_or(false)
    }

    fn listing_fails(&self, directory: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.failures.listing.contains(&fold(directory)))
            .unwrap_or(false)
    }

    fn copy_in_fails(&self, volume_path: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.failures.copy_in.contains(&fold(volume_path)))
            .unwrap_or(false)
    }
}

fn save_image(path: &Path, image: &MemoryImage) -> EngineResult<()> {
    let json = serde_json::to_string_pretty(image)
        .map_err(|e| EngineError::Other(format!("failed to encode image: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}

impl VolumeEngine for MemoryEngine {
    type Handle = MemoryHandle;

    fn open(
        &self,
        image: &Path,
        writable: bool,
        partition: PartitionSelector,
    ) -> EngineResult<MemoryHandle> {
        self.record(|j| j.open_attempts.push(partition));
        let shared = self.shared_image(image)?;
        let index = lock(&shared)?
            .find_partition(partition)
            .ok_or_else(|| {
                EngineError::Unrecognized(format!("{} ({partition:?})", image.display()))
            })?;
        Ok(MemoryHandle {
            engine: self.clone(),
            image_path: image.to_path_buf(),
            image: shared,
            partition: index,
            writable,
        })
    }

    fn list_partitions(&self, image: &Path) -> EngineResult<Vec<PartitionMapEntry>> {
        self.record(|j| j.partition_listings += 1);
        if self
            .state
            .lock()
            .map(|s| s.failures.partition_listing)
            .unwrap_or(false)
        {
            return Err(EngineError::Other("partition map unreadable".to_string()));
        }
        let shared = self.shared_image(image)?;
        let image_state = lock(&shared)?;
        if !image_state.partitioned {
            return Err(EngineError::Unrecognized("no partition map".to_string()));
        }
        Ok(image_state
            .partitions
            .iter()
            .map(|p| PartitionMapEntry {
                map_index: p.map_index,
                name: p.name.clone(),
                partition_type: p.partition_type.clone(),
            })
            .collect())
    }

    fn create_image(&self, image: &Path, size_bytes: u64, volume_name: &str) -> EngineResult<()> {
        let created = MemoryImage::unpartitioned(MemoryVolume::new(volume_name, size_bytes));
        if self.is_persistent() {
            save_image(image, &created)?;
        }
        self.insert_image(image, created);
        Ok(())
    }
}

/// One volume opened from a [`MemoryEngine`] image.
#[derive(Debug)]
pub struct MemoryHandle {
    engine: MemoryEngine,
    image_path: PathBuf,
    image: Arc<Mutex<MemoryImage>>,
    partition: usize,
    writable: bool,
}

impl MemoryHandle {
    fn read<R>(&self, f: impl FnOnce(&MemoryVolume) -> EngineResult<R>) -> EngineResult<R> {
        let image = lock(&self.image)?;
        let volume = image.partitions[self.partition]
            .volume
            .as_ref()
            .ok_or_else(|| EngineError::Unrecognized("partition has no volume".to_string()))?;
        f(volume)
    }

    fn write<R>(&self, f: impl FnOnce(&mut MemoryVolume) -> EngineResult<R>) -> EngineResult<R> {
        if !self.writable {
            return Err(EngineError::ReadOnly);
        }
        self.engine.record(|j| j.writes += 1);
        let mut image = lock(&self.image)?;
        let volume = image.partitions[self.partition]
            .volume
            .as_mut()
            .ok_or_else(|| EngineError::Unrecognized("partition has no volume".to_string()))?;
        f(volume)
    }
}

fn encode_in(data: Vec<u8>, mode: TransferMode) -> Vec<u8> {
    match mode {
        TransferMode::Text => data
            .into_iter()
            .map(|b| if b == b'\n' { b'\r' } else { b })
            .collect(),
        _ => data,
    }
}

fn encode_out(data: &[u8], mode: TransferMode) -> Vec<u8> {
    match mode {
        TransferMode::Text => data
            .iter()
            .map(|&b| if b == b'\r' { b'\n' } else { b })
            .collect(),
        _ => data.to_vec(),
    }
}

fn copy_host_tree(
    volume: &mut MemoryVolume,
    host: &Path,
    volume_path: &str,
    mode: TransferMode,
) -> EngineResult<()> {
    volume.insert(volume_path, true, Vec::new())?;
    let mut children: Vec<_> = std::fs::read_dir(host)?.collect::<Result<_, _>>()?;
    children.sort_by_key(|entry| entry.file_name());
    for child in children {
        let name = path::sanitize(&child.file_name().to_string_lossy());
        let target = path::join(volume_path, &name);
        if child.file_type()?.is_dir() {
            copy_host_tree(volume, &child.path(), &target, mode)?;
        } else {
            let data = std::fs::read(child.path())?;
            volume.insert(&target, false, encode_in(data, mode))?;
        }
    }
    Ok(())
}

fn copy_volume_tree(
    volume: &MemoryVolume,
    volume_path: &str,
    host: &Path,
    mode: TransferMode,
) -> EngineResult<()> {
    std::fs::create_dir_all(host)?;
    for child in volume.children(volume_path) {
        let target = host.join(path::host_name(&child.name));
        if child.is_directory {
            copy_volume_tree(volume, &child.path, &target, mode)?;
        } else {
            std::fs::write(&target, encode_out(&child.data, mode))?;
        }
    }
    Ok(())
}

impl VolumeHandle for MemoryHandle {
    fn list(&mut self, directory: &str) -> EngineResult<Vec<FileEntryInfo>> {
        self.engine.record(|j| j.listings.push(directory.to_string()));
        if self.engine.listing_fails(directory) {
            return Err(EngineError::Other(format!("cannot read directory {directory}")));
        }
        self.read(|volume| {
            volume.require_directory(directory)?;
            Ok(volume.children(directory).into_iter().map(MemoryEntry::info).collect())
        })
    }

    fn copy_in(&mut self, host: &Path, volume_path: &str, mode: TransferMode) -> EngineResult<()> {
        self.engine.record(|j| j.modes.push(mode));
        if self.engine.copy_in_fails(volume_path) {
            return Err(EngineError::Other(format!("disk full writing {volume_path}")));
        }
        let data = std::fs::read(host)?;
        self.write(|volume| {
            volume.insert(volume_path, false, encode_in(data, mode))?;
            if mode == TransferMode::Text {
                let entry = volume.entry_mut(volume_path)?;
                entry.file_type = "TEXT".to_string();
                entry.file_creator = "ttxt".to_string();
            }
            Ok(())
        })
    }

    fn copy_in_directory(
        &mut self,
        host: &Path,
        volume_path: &str,
        mode: TransferMode,
    ) -> EngineResult<()> {
        self.engine.record(|j| j.modes.push(mode));
        if self.engine.copy_in_fails(volume_path) {
            return Err(EngineError::Other(format!("disk full writing {volume_path}")));
        }
        self.write(|volume| copy_host_tree(volume, host, volume_path, mode))
    }

    fn copy_out(&mut self, volume_path: &str, host: &Path, mode: TransferMode) -> EngineResult<()> {
        self.engine.record(|j| j.modes.push(mode));
        let data = self.read(|volume| {
            let entry = volume
                .entry(volume_path)
                .ok_or_else(|| EngineError::NotFound(volume_path.to_string()))?;
            if entry.is_directory {
                return Err(EngineError::Other(format!("{volume_path} is a directory")));
            }
            Ok(encode_out(&entry.data, mode))
        })?;
        if let Some(parent) = host.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(host, data)?;
        Ok(())
    }

    fn copy_out_directory(
        &mut self,
        volume_path: &str,
        host: &Path,
        mode: TransferMode,
    ) -> EngineResult<()> {
        self.engine.record(|j| j.modes.push(mode));
        self.read(|volume| {
            volume.require_directory(volume_path)?;
            copy_volume_tree(volume, volume_path, host, mode)
        })
    }

    fn delete(&mut self, entry: &FileEntryInfo) -> EngineResult<()> {
        self.write(|volume| volume.remove_tree(&entry.path))
    }

    fn rename(&mut self, volume_path: &str, new_name: &str) -> EngineResult<()> {
        let target = path::join(path::parent_of(volume_path), new_name);
        self.write(|volume| {
            volume.entry_mut(volume_path)?;
            volume.relocate(volume_path, &target)
        })
    }

    fn move_entry(&mut self, volume_path: &str, new_parent: &str) -> EngineResult<()> {
        let target = path::join(new_parent, path::name_of(volume_path));
        self.write(|volume| {
            volume.entry_mut(volume_path)?;
            if !volume.is_directory(new_parent) {
                return Err(EngineError::NotADirectory(new_parent.to_string()));
            }
            if path::is_within(&fold(new_parent), &fold(volume_path)) {
                return Err(EngineError::Other(format!(
                    "cannot move {volume_path} into itself"
                )));
            }
            volume.relocate(volume_path, &target)
        })
    }

    fn set_type_creator(
        &mut self,
        volume_path: &str,
        file_type: &str,
        creator: &str,
    ) -> EngineResult<()> {
        self.write(|volume| {
            let entry = volume.entry_mut(volume_path)?;
            entry.file_type = file_type.to_string();
            entry.file_creator = creator.to_string();
            Ok(())
        })
    }

    fn attributes(&mut self, volume_path: &str) -> EngineResult<FileEntryInfo> {
        self.read(|volume| {
            if path::is_root(volume_path) {
                return Ok(FileEntryInfo {
                    name: volume.name.clone(),
                    path: path::ROOT.to_string(),
                    is_directory: true,
                    data_fork_size: 0,
                    resource_fork_size: 0,
                    created: volume.created,
                    modified: volume.modified,
                    file_type: String::new(),
                    file_creator: String::new(),
                });
            }
            volume
                .entry(volume_path)
                .map(MemoryEntry::info)
                .ok_or_else(|| EngineError::NotFound(volume_path.to_string()))
        })
    }

    fn volume_info(&mut self) -> EngineResult<VolumeInfo> {
        self.read(|volume| {
            let block = allocation_block_size(volume.capacity);
            let used = volume.used_bytes();
            let folders = volume.entries.values().filter(|e| e.is_directory).count() as u64;
            Ok(VolumeInfo {
                name: volume.name.clone(),
                total_bytes: volume.capacity,
                used_bytes: used,
                free_bytes: volume.capacity.saturating_sub(used),
                file_count: volume.entries.len() as u64 - folders,
                folder_count: folders,
                allocation_block_size: block,
                clump_size: block * 4,
                modified: volume.modified,
                backup: super::epoch_floor(),
                flags: 0,
                blessed_folder_id: 0,
            })
        })
    }

    fn close(self) {
        self.engine.record(|j| j.closes += 1);
        if self.writable && self.engine.is_persistent() {
            let result = lock(&self.image).and_then(|image| save_image(&self.image_path, &image));
            if let Err(e) = result {
                tracing::error!("failed to save {}: {e}", self.image_path.display());
            }
        }
    }
}

/// HFS addresses at most 65 535 allocation blocks, each a multiple of 512
/// bytes.
fn allocation_block_size(capacity: u64) -> u32 {
    let blocks_of_512 = capacity.div_ceil(512 * 65_535).max(1);
    (blocks_of_512 * 512).min(u64::from(u32::MAX)) as u32
}
