//! Event command lists.
//!
//! An event is a flat list of commands. Each command is laid out as:
//!
//! ```text
//! [BER code][BER nest][BER len][len string bytes][BER argc][BER arg]*argc
//! ```
//!
//! There is no terminator or count: commands are read until the owning
//! chunk is exhausted.

use std::io::Write;

use lcf_common::{ber_size, writing_string_size, BinaryReader, WriteLcfExt};

use crate::Result;

/// A single event command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventCommand {
    /// Command code.
    pub code: u32,
    /// Indentation (nesting) level.
    pub nest: u32,
    /// String parameter.
    pub string: String,
    /// Integer parameters.
    pub args: Vec<i32>,
}

impl EventCommand {
    /// Read one command.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let code = reader.read_ber()?;
        let nest = reader.read_ber()?;
        let string = reader.read_prefixed_string()?;
        let argc = reader.read_ber()? as usize;

        // Each argument takes at least one byte; reject counts the chunk cannot hold.
        if argc > reader.remaining() {
            return Err(lcf_common::Error::TruncatedStream {
                needed: argc,
                available: reader.remaining(),
            }
            .into());
        }

        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(reader.read_ber_i32()?);
        }

        Ok(Self {
            code,
            nest,
            string,
            args,
        })
    }

    /// Exact number of bytes [`EventCommand::write`] produces.
    pub fn byte_size(&self) -> Result<usize> {
        let string_len = writing_string_size(&self.string)?;
        let args: usize = self.args.iter().map(|&arg| ber_size(arg as u32)).sum();
        Ok(ber_size(self.code)
            + ber_size(self.nest)
            + ber_size(string_len as u32)
            + string_len
            + ber_size(self.args.len() as u32)
            + args)
    }

    /// Write this command.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        writer.write_ber(self.code)?;
        writer.write_ber(self.nest)?;
        writer.write_lcf_string(&self.string)?;
        writer.write_ber(self.args.len() as u32)?;
        for &arg in &self.args {
            writer.write_ber_i32(arg)?;
        }
        Ok(())
    }
}

/// An ordered list of event commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Commands in execution order.
    pub commands: Vec<EventCommand>,
}

impl Event {
    /// Read commands until `reader` is exhausted.
    pub fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let mut commands = Vec::new();
        while !reader.is_empty() {
            commands.push(EventCommand::read(reader)?);
        }
        Ok(Self { commands })
    }

    /// Exact number of bytes [`Event::write`] produces.
    pub fn byte_size(&self) -> Result<usize> {
        self.commands.iter().map(EventCommand::byte_size).sum()
    }

    /// Write every command back to back.
    pub fn write<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        for command in &self.commands {
            command.write(writer)?;
        }
        Ok(())
    }

    /// Number of commands.
    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the event has no commands.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate over the commands.
    pub fn iter(&self) -> std::slice::Iter<'_, EventCommand> {
        self.commands.iter()
    }
}

impl<'a> IntoIterator for &'a Event {
    type Item = &'a EventCommand;
    type IntoIter = std::slice::Iter<'a, EventCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        Event {
            commands: vec![
                EventCommand {
                    code: 10110,
                    nest: 0,
                    string: "こんにちは".to_string(),
                    args: vec![],
                },
                EventCommand {
                    code: 10220,
                    nest: 1,
                    string: String::new(),
                    args: vec![0, 1, -5, 70000],
                },
                EventCommand {
                    code: 10,
                    nest: 0,
                    string: String::new(),
                    args: vec![],
                },
            ],
        }
    }

    #[test]
    fn test_write_read() {
        let event = sample();
        let mut out = Vec::new();
        event.write(&mut out).unwrap();
        assert_eq!(out.len(), event.byte_size().unwrap());

        let mut reader = BinaryReader::new(&out);
        assert_eq!(Event::read(&mut reader).unwrap(), event);
    }

    #[test]
    fn test_known_bytes() {
        let command = EventCommand {
            code: 10,
            nest: 0,
            string: String::new(),
            args: vec![3],
        };
        let mut out = Vec::new();
        command.write(&mut out).unwrap();
        assert_eq!(out, vec![0x0A, 0x00, 0x00, 0x01, 0x03]);
    }

    #[test]
    fn test_truncated_command() {
        // code, nest, empty string, claims 3 args but only has one
        let data = [0x0A, 0x00, 0x00, 0x03, 0x01];
        let mut reader = BinaryReader::new(&data);
        assert!(Event::read(&mut reader).is_err());
    }

    #[test]
    fn test_empty_event() {
        let mut reader = BinaryReader::new(&[]);
        assert!(Event::read(&mut reader).unwrap().is_empty());
    }
}
