//! Map tree ordering block.

use std::io::Write;

use lcf_common::{ber_size, BinaryReader, WriteLcfExt};

use crate::Result;

/// Display order of the map tree plus the selected node.
///
/// On disk: `[BER count][BER node]*count[BER active_node]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapTree {
    /// Map ids in tree display order.
    pub nodes: Vec<u32>,
    /// Map id selected in the editor.
    pub active_node: u32,
}

impl MapTree {
    /// Read a map tree block.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let count = reader.read_ber()? as usize;
        if count > reader.remaining() {
            return Err(lcf_common::Error::TruncatedStream {
                needed: count,
                available: reader.remaining(),
            }
            .into());
        }

        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(reader.read_ber()?);
        }
        let active_node = reader.read_ber()?;

        Ok(Self { nodes, active_node })
    }

    /// Exact number of bytes [`MapTree::write`] produces.
    pub fn byte_size(&self) -> usize {
        ber_size(self.nodes.len() as u32)
            + self.nodes.iter().map(|&node| ber_size(node)).sum::<usize>()
            + ber_size(self.active_node)
    }

    /// Write the block.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_ber(self.nodes.len() as u32)?;
        for &node in &self.nodes {
            writer.write_ber(node)?;
        }
        writer.write_ber(self.active_node)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_scenario() {
        let data = [0x02, 0x05, 0x07, 0x03];
        let mut reader = BinaryReader::new(&data);
        let tree = MapTree::read(&mut reader).unwrap();

        assert_eq!(tree.nodes, vec![5, 7]);
        assert_eq!(tree.active_node, 3);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_write_matches_size() {
        let tree = MapTree {
            nodes: vec![0, 1, 200, 3],
            active_node: 200,
        };
        let mut out = Vec::new();
        tree.write(&mut out).unwrap();
        assert_eq!(out.len(), tree.byte_size());

        let mut reader = BinaryReader::new(&out);
        assert_eq!(MapTree::read(&mut reader).unwrap(), tree);
    }

    #[test]
    fn test_missing_active_node() {
        let data = [0x01, 0x05];
        let mut reader = BinaryReader::new(&data);
        assert!(MapTree::read(&mut reader).is_err());
    }
}
