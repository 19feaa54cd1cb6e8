use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Largest id that still packs into a handle with its orientation bit.
const MAX_NODE_ID: usize = (u64::MAX >> 1) as usize;

/// Append-only mapping from duplicated node ids to the original ids.
/// Ids below `first_node` map to themselves. The mapping persists across
/// components and across runs; it only ever grows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMapping {
    first_node: usize,
    next_node: usize,
    mapping: Vec<usize>,
}

impl NodeMapping {
    /// Start allocating duplicate ids at `first_node`, usually
    /// `max_node_id + 1` of the original graph.
    pub fn new(first_node: usize) -> Self {
        NodeMapping {
            first_node,
            next_node: first_node,
            mapping: Vec::new(),
        }
    }

    pub fn first_node(&self) -> usize {
        self.first_node
    }

    pub fn next_node(&self) -> usize {
        self.next_node
    }

    /// Number of duplicate ids allocated so far
    pub fn size(&self) -> usize {
        self.mapping.len()
    }

    /// Allocate a fresh duplicate id for an original node id
    pub fn insert(&mut self, original_id: usize) -> usize {
        assert!(
            self.next_node < MAX_NODE_ID,
            "node id space exhausted at {}",
            self.next_node
        );
        let id = self.next_node;
        self.mapping.push(original_id);
        self.next_node += 1;
        id
    }

    /// The original id behind a node id: identity below `first_node`,
    /// table lookup for allocated duplicates.
    pub fn get(&self, id: usize) -> usize {
        if id < self.first_node || id >= self.next_node {
            id
        } else {
            self.mapping[id - self.first_node]
        }
    }

    /// Serialize as a fixed header {first_node, next_node, mapping_size}
    /// followed by one u64 entry per duplicate, all little-endian.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&(self.first_node as u64).to_le_bytes())?;
        writer.write_all(&(self.next_node as u64).to_le_bytes())?;
        writer.write_all(&(self.mapping.len() as u64).to_le_bytes())?;
        for &original_id in &self.mapping {
            writer.write_all(&(original_id as u64).to_le_bytes())?;
        }
        Ok(())
    }

    /// Load a mapping previously written by `serialize`
    pub fn load<R: Read>(reader: &mut R) -> io::Result<Self> {
        let first_node = read_u64(reader)? as usize;
        let next_node = read_u64(reader)? as usize;
        let mapping_size = read_u64(reader)? as usize;
        if next_node < first_node || mapping_size != next_node - first_node {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "inconsistent node mapping header",
            ));
        }
        let mut mapping = Vec::with_capacity(mapping_size);
        for _ in 0..mapping_size {
            mapping.push(read_u64(reader)? as usize);
        }
        Ok(NodeMapping {
            first_node,
            next_node,
            mapping,
        })
    }

    /// Write the mapping to a file. Errors are logged to standard error and
    /// swallowed; a failed save never aborts an unfolding run.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref();
        let file = match File::create(path) {
            Ok(file) => file,
            Err(_) => {
                eprintln!(
                    "[node_mapping] cannot create mapping file {}",
                    path.display()
                );
                return;
            }
        };
        let mut writer = BufWriter::new(file);
        if self.serialize(&mut writer).and_then(|_| writer.flush()).is_err() {
            eprintln!(
                "[node_mapping] cannot write mapping file {}",
                path.display()
            );
        }
    }

    /// Replace this mapping with one loaded from a file. Errors are logged
    /// to standard error and leave the current mapping untouched.
    pub fn read_from_file<P: AsRef<Path>>(&mut self, path: P) {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(_) => {
                eprintln!(
                    "[node_mapping] cannot open mapping file {}",
                    path.display()
                );
                return;
            }
        };
        match Self::load(&mut BufReader::new(file)) {
            Ok(loaded) => *self = loaded,
            Err(err) => {
                eprintln!(
                    "[node_mapping] cannot load mapping file {}: {}",
                    path.display(),
                    err
                );
            }
        }
    }
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
