use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use strata_types::ChunkPos;

const SECTOR_BYTES: usize = 4096;
const HEADER_SECTORS: usize = 2;
const COLUMNS: usize = 1024;
/// Sector counts are stored in one byte.
const MAX_CHUNK_SECTORS: usize = 255;
/// Length (4 bytes) and compression type (1 byte) ahead of every payload.
const PAYLOAD_HEADER: usize = 5;
const COMPRESSION_GZIP: u8 = 1;
const COMPRESSION_ZLIB: u8 = 2;

/// Where a column lives: `offset << 8 | count`, in sectors. Zero means absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Location(u32);

impl Location {
    fn new(offset: usize, count: usize) -> Self {
        Location(((offset as u32) << 8) | (count as u32 & 0xFF))
    }

    fn is_present(self) -> bool {
        self.0 != 0
    }

    fn offset(self) -> usize {
        (self.0 >> 8) as usize
    }

    fn count(self) -> usize {
        (self.0 & 0xFF) as usize
    }

    fn sectors(self) -> std::ops::Range<usize> {
        self.offset()..self.offset() + self.count()
    }
}

/// Column slot inside its region.
fn slot(local_x: usize, local_z: usize) -> usize {
    local_x + local_z * 32
}

fn invalid(kind: io::ErrorKind, msg: String) -> io::Error {
    io::Error::new(kind, msg)
}

/// Occupancy of every sector in the file, header included.
struct SectorMap(Vec<bool>);

impl SectorMap {
    fn new(file_sectors: usize, locations: &[Location]) -> Self {
        let mut used = vec![false; file_sectors.max(HEADER_SECTORS)];
        used[..HEADER_SECTORS].fill(true);
        let mut map = SectorMap(used);
        for &location in locations.iter().filter(|l| l.is_present()) {
            map.mark(location, true);
        }
        map
    }

    fn mark(&mut self, location: Location, used: bool) {
        for sector in location.sectors() {
            if let Some(flag) = self.0.get_mut(sector) {
                *flag = used;
            }
        }
    }

    /// First run of `count` free sectors, growing the file if none fits.
    fn allocate(&mut self, count: usize) -> usize {
        let mut start = HEADER_SECTORS;
        while start + count <= self.0.len() {
            match (start..start + count).find(|&s| self.0[s]) {
                Some(taken) => start = taken + 1,
                None => break,
            }
        }
        if start + count > self.0.len() {
            self.0.resize(start + count, false);
        }
        self.0[start..start + count].fill(true);
        start
    }
}

fn read_table(file: &mut File) -> io::Result<[u32; COLUMNS]> {
    let mut raw = [0u8; SECTOR_BYTES];
    file.read_exact(&mut raw)?;
    let mut table = [0u32; COLUMNS];
    for (entry, bytes) in table.iter_mut().zip(raw.chunks_exact(4)) {
        *entry = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    Ok(table)
}

fn encode_table(values: impl Iterator<Item = u32>) -> Vec<u8> {
    values.flat_map(u32::to_be_bytes).collect()
}

/// One `.mca` file: 32x32 columns, each zlib-compressed NBT in whole sectors.
pub struct RegionFile {
    file: File,
    locations: [Location; COLUMNS],
    timestamps: [u32; COLUMNS],
    sectors: SectorMap,
}

impl RegionFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let mut locations = [Location::default(); COLUMNS];
        let mut timestamps = [0u32; COLUMNS];
        let len = file.metadata()?.len() as usize;
        if len >= HEADER_SECTORS * SECTOR_BYTES {
            file.seek(SeekFrom::Start(0))?;
            for (location, raw) in locations.iter_mut().zip(read_table(&mut file)?) {
                *location = Location(raw);
            }
            timestamps = read_table(&mut file)?;
        } else {
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&[0u8; HEADER_SECTORS * SECTOR_BYTES])?;
            file.flush()?;
        }

        let file_sectors = (file.metadata()?.len() as usize).div_ceil(SECTOR_BYTES);
        let sectors = SectorMap::new(file_sectors, &locations);
        Ok(Self {
            file,
            locations,
            timestamps,
            sectors,
        })
    }

    pub fn contains(&self, local_x: usize, local_z: usize) -> bool {
        self.locations[slot(local_x, local_z)].is_present()
    }

    /// Decompressed NBT of a column.
    pub fn read_chunk(&mut self, local_x: usize, local_z: usize) -> io::Result<Option<Vec<u8>>> {
        let location = self.locations[slot(local_x, local_z)];
        if !location.is_present() {
            return Ok(None);
        }
        self.file
            .seek(SeekFrom::Start((location.offset() * SECTOR_BYTES) as u64))?;

        let mut header = [0u8; PAYLOAD_HEADER];
        self.file.read_exact(&mut header)?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if length <= 1 {
            return Ok(None);
        }
        if length > location.count() * SECTOR_BYTES {
            return Err(invalid(
                io::ErrorKind::InvalidData,
                format!("column length {} exceeds its {} sectors", length, location.count()),
            ));
        }

        let mut compressed = vec![0u8; length - 1];
        self.file.read_exact(&mut compressed)?;
        let mut nbt = Vec::new();
        match header[4] {
            COMPRESSION_ZLIB => ZlibDecoder::new(&compressed[..]).read_to_end(&mut nbt)?,
            COMPRESSION_GZIP => GzDecoder::new(&compressed[..]).read_to_end(&mut nbt)?,
            other => {
                return Err(invalid(
                    io::ErrorKind::InvalidData,
                    format!("unsupported compression type {}", other),
                ))
            }
        };
        Ok(Some(nbt))
    }

    /// Replace a column. The new payload goes to free sectors and the old run
    /// is only released once the header points away from it, so a failed
    /// write leaves the column and the sector map as they were.
    pub fn write_chunk(&mut self, local_x: usize, local_z: usize, nbt: &[u8]) -> io::Result<()> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(nbt)?;
        let compressed = encoder.finish()?;

        let count = (PAYLOAD_HEADER + compressed.len()).div_ceil(SECTOR_BYTES);
        if count > MAX_CHUNK_SECTORS {
            return Err(invalid(
                io::ErrorKind::InvalidInput,
                format!("column needs {} sectors, at most {} fit", count, MAX_CHUNK_SECTORS),
            ));
        }

        let mut payload = Vec::with_capacity(count * SECTOR_BYTES);
        payload.extend_from_slice(&((compressed.len() + 1) as u32).to_be_bytes());
        payload.push(COMPRESSION_ZLIB);
        payload.extend_from_slice(&compressed);
        payload.resize(count * SECTOR_BYTES, 0);

        let index = slot(local_x, local_z);
        let previous = (self.locations[index], self.timestamps[index]);
        let fresh = Location::new(self.sectors.allocate(count), count);
        if let Err(e) = self.commit(index, fresh, &payload) {
            self.sectors.mark(fresh, false);
            (self.locations[index], self.timestamps[index]) = previous;
            return Err(e);
        }
        self.sectors.mark(previous.0, false);
        Ok(())
    }

    fn commit(&mut self, index: usize, location: Location, payload: &[u8]) -> io::Result<()> {
        self.file
            .seek(SeekFrom::Start((location.offset() * SECTOR_BYTES) as u64))?;
        self.file.write_all(payload)?;

        self.locations[index] = location;
        self.timestamps[index] = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as u32);
        self.write_header()?;
        self.file.flush()
    }

    fn write_header(&mut self) -> io::Result<()> {
        let mut header = encode_table(self.locations.iter().map(|l| l.0));
        header.extend(encode_table(self.timestamps.iter().copied()));
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header)
    }
}

/// Region handles kept open per dimension; the least recently used one is
/// closed when another is needed.
const MAX_OPEN_REGIONS: usize = 16;

/// The region files of one dimension, opened on first use.
pub struct RegionStorage {
    dir: PathBuf,
    open: HashMap<(i32, i32), RegionFile>,
    /// Keys of `open`, most recently used last.
    recent: VecDeque<(i32, i32)>,
}

impl RegionStorage {
    pub fn new(dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            open: HashMap::new(),
            recent: VecDeque::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contains(&mut self, pos: ChunkPos) -> io::Result<bool> {
        let (x, z) = local(pos);
        Ok(match self.existing(pos)? {
            Some(region) => region.contains(x, z),
            None => false,
        })
    }

    pub fn read_chunk(&mut self, pos: ChunkPos) -> io::Result<Option<Vec<u8>>> {
        let (x, z) = local(pos);
        match self.existing(pos)? {
            Some(region) => region.read_chunk(x, z),
            None => Ok(None),
        }
    }

    pub fn write_chunk(&mut self, pos: ChunkPos, nbt: &[u8]) -> io::Result<()> {
        let (x, z) = local(pos);
        self.region(pos)?.write_chunk(x, z, nbt)
    }

    fn region_path(&self, key: (i32, i32)) -> PathBuf {
        self.dir.join(format!("r.{}.{}.mca", key.0, key.1))
    }

    /// The region holding `pos`, without creating a file that is not there.
    fn existing(&mut self, pos: ChunkPos) -> io::Result<Option<&mut RegionFile>> {
        let key = region_key(pos);
        if !self.open.contains_key(&key) && !self.region_path(key).exists() {
            return Ok(None);
        }
        self.region(pos).map(Some)
    }

    fn region(&mut self, pos: ChunkPos) -> io::Result<&mut RegionFile> {
        let key = region_key(pos);
        if let Some(at) = self.recent.iter().position(|k| *k == key) {
            self.recent.remove(at);
        } else {
            let region = RegionFile::open(&self.region_path(key))?;
            if self.open.len() >= MAX_OPEN_REGIONS {
                if let Some(stale) = self.recent.pop_front() {
                    self.open.remove(&stale);
                }
            }
            self.open.insert(key, region);
        }
        self.recent.push_back(key);
        self.open
            .get_mut(&key)
            .ok_or_else(|| io::Error::other("region handle vanished"))
    }

    #[cfg(test)]
    fn open_regions(&self) -> usize {
        self.open.len()
    }
}

fn region_key(pos: ChunkPos) -> (i32, i32) {
    (pos.x >> 5, pos.z >> 5)
}

fn local(pos: ChunkPos) -> (usize, usize) {
    ((pos.x & 31) as usize, (pos.z & 31) as usize)
}
