//! Custom command dispatch for the ROM ISO15693 stack.
//!
//! The ROM finds custom command handlers through a table of 16 bit words that grows downwards
//! from [`DRIVER_TABLE_START`]:
//!
//! ```text
//! 0xFFCE  key      0xCECE
//! 0xFFCC  id       command ID of the first handler
//! 0xFFCA  address  first handler
//! ...
//!         key      0xCECE
//! ```
//!
//! [`DispatchTable`] is the validated, host testable view of that table. [`RomDriverTable`] is
//! its in-memory layout for placement at [`table_base_address`] on the target.

use crate::{config, Error};
use core::ops::RangeInclusive;
use heapless::Vec;
use log::{debug, warn};

pub const DRIVER_TABLE_START: u16 = 0xFFCE;
pub const DRIVER_TABLE_KEY: u16 = 0xCECE;

/// Command codes the ROM forwards to the table, rather than handling or rejecting itself.
pub const COMMAND_ID_RANGE: RangeInclusive<u16> = 0x00A0..=0x00D0;

/// Reads one sample and returns it in the reply.
pub const CUSTOM_COMMAND_ID: u16 = 0x00AA;

/// Most entries a table can hold, one per command ID in [`COMMAND_ID_RANGE`].
pub const MAX_TABLE_ENTRIES: usize =
    (*COMMAND_ID_RANGE.end() - *COMMAND_ID_RANGE.start() + 1) as usize;

/// Lowest address of a table holding `entries` entries.
pub const fn table_base_address(entries: usize) -> Option<u16> {
    if entries > MAX_TABLE_ENTRIES {
        return None;
    }
    word_address(2 * entries + 1)
}

/// Address of the `index`th word, counted from the start key.
pub const fn word_address(index: usize) -> Option<u16> {
    if index > 2 * MAX_TABLE_ENTRIES + 1 {
        return None;
    }
    Some(DRIVER_TABLE_START - 2 * index as u16)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchEntry<H> {
    pub command_id: u16,
    pub handler: H,
}

#[derive(Debug, Clone)]
pub struct DispatchTable<H, const N: usize> {
    entries: Vec<DispatchEntry<H>, N>,
}

impl<H, const N: usize> DispatchTable<H, N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = DispatchEntry<H>>,
    ) -> Result<Self, Error> {
        let mut table = Self::new();
        for entry in entries {
            table.register(entry.command_id, entry.handler)?;
        }
        table.validate()?;
        Ok(table)
    }

    pub fn register(&mut self, command_id: u16, handler: H) -> Result<(), Error> {
        if !COMMAND_ID_RANGE.contains(&command_id) {
            return Err(Error::CommandIdOutOfRange(command_id));
        }
        if self.lookup(command_id).is_some() {
            return Err(Error::DuplicateCommandId(command_id));
        }

        self.entries
            .push(DispatchEntry {
                command_id,
                handler,
            })
            .map_err(|_| Error::TableFull)?;

        debug!("Registered handler for command {:#06x}", command_id);
        Ok(())
    }

    /// Checks what the ROM relies on: at least one entry, IDs in range and unique.
    pub fn validate(&self) -> Result<(), Error> {
        if self.entries.is_empty() {
            return Err(Error::EmptyTable);
        }

        for (i, entry) in self.entries.iter().enumerate() {
            if !COMMAND_ID_RANGE.contains(&entry.command_id) {
                return Err(Error::CommandIdOutOfRange(entry.command_id));
            }
            if self.entries[..i]
                .iter()
                .any(|e| e.command_id == entry.command_id)
            {
                return Err(Error::DuplicateCommandId(entry.command_id));
            }
        }

        Ok(())
    }

    pub fn lookup(&self, command_id: u16) -> Option<&H> {
        self.entries
            .iter()
            .find(|e| e.command_id == command_id)
            .map(|e| &e.handler)
    }

    pub fn entries(&self) -> &[DispatchEntry<H>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the handler registered for `command_id` to completion.
    pub fn dispatch<C>(&self, command_id: u16, context: &mut C) -> Result<(), Error>
    where
        H: Fn(&mut C),
    {
        match self.lookup(command_id) {
            Some(handler) => {
                handler(context);
                Ok(())
            }
            None => {
                warn!("No handler for command {:#06x}", command_id);
                Err(Error::UnknownCommand(command_id))
            }
        }
    }

    /// Produces the table words from the start key down, `address_of` resolving each handler.
    pub fn encode<const W: usize>(
        &self,
        address_of: impl Fn(&H) -> u16,
    ) -> Result<Vec<u16, W>, Error> {
        let mut words = Vec::new();

        words
            .push(DRIVER_TABLE_KEY)
            .map_err(|_| Error::ImageTooSmall)?;
        for entry in &self.entries {
            words
                .extend_from_slice(&[entry.command_id, address_of(&entry.handler)])
                .map_err(|_| Error::ImageTooSmall)?;
        }
        words
            .push(DRIVER_TABLE_KEY)
            .map_err(|_| Error::ImageTooSmall)?;

        Ok(words)
    }
}

impl<H, const N: usize> Default for DispatchTable<H, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A driver table read back from memory, as the ROM walks it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverTableImage<const N: usize> {
    entries: Vec<(u16, u16), N>,
}

impl<const N: usize> DriverTableImage<N> {
    /// Walks `words` from the start key to the next key.
    pub fn parse(words: &[u16]) -> Result<Self, Error> {
        let Some((&DRIVER_TABLE_KEY, mut rest)) = words.split_first() else {
            return Err(Error::MissingStartKey);
        };

        let mut entries = Vec::new();
        loop {
            match rest {
                [DRIVER_TABLE_KEY, ..] => break,
                [command_id, address, tail @ ..] => {
                    entries
                        .push((*command_id, *address))
                        .map_err(|_| Error::TableFull)?;
                    rest = tail;
                }
                _ => return Err(Error::UnterminatedTable),
            }
        }

        Ok(Self { entries })
    }

    /// `(command ID, handler address)` pairs in table order.
    pub fn entries(&self) -> &[(u16, u16)] {
        &self.entries
    }

    pub fn lookup(&self, command_id: u16) -> Option<u16> {
        self.entries
            .iter()
            .find(|(id, _)| *id == command_id)
            .map(|(_, address)| *address)
    }
}

/// Handlers are called by the ROM with no arguments.
pub type DriverFunction = extern "C" fn();

#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RomDriverEntry {
    pub handler: DriverFunction,
    pub command_id: u16,
}

/// The driver table as laid out in memory, lowest address first.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RomDriverTable<const N: usize> {
    end_key: u16,
    entries: [RomDriverEntry; N],
    start_key: u16,
}

impl<const N: usize> RomDriverTable<N> {
    /// Builds the table from entries in dispatch order.
    pub const fn new(mut entries: [RomDriverEntry; N]) -> Self {
        let mut i = 0;
        while i < N / 2 {
            let swapped = entries[i];
            entries[i] = entries[N - 1 - i];
            entries[N - 1 - i] = swapped;
            i += 1;
        }

        Self {
            end_key: DRIVER_TABLE_KEY,
            entries,
            start_key: DRIVER_TABLE_KEY,
        }
    }

    /// Entries in the order the ROM visits them.
    pub fn dispatch_order(&self) -> impl Iterator<Item = &RomDriverEntry> {
        self.entries.iter().rev()
    }

    /// Checks the sentinels and entries, giving the lookup view of the table.
    pub fn validate(&self) -> Result<DispatchTable<DriverFunction, N>, Error> {
        if self.start_key != DRIVER_TABLE_KEY {
            return Err(Error::MissingStartKey);
        }
        if self.end_key != DRIVER_TABLE_KEY {
            return Err(Error::UnterminatedTable);
        }

        DispatchTable::from_entries(self.dispatch_order().map(|entry| DispatchEntry {
            command_id: entry.command_id,
            handler: entry.handler,
        }))
    }
}

/// The driver table of this firmware: `handler` under the configured custom command ID.
pub const fn driver_table(handler: DriverFunction) -> RomDriverTable<1> {
    RomDriverTable::new([RomDriverEntry {
        handler,
        command_id: config::CUSTOM_COMMAND.command_id,
    }])
}

/// Host side counterpart of [`driver_table`].
pub fn command_table<H>(
    handler: H,
) -> Result<DispatchTable<H, { config::MAX_CUSTOM_COMMANDS }>, Error> {
    DispatchTable::from_entries([DispatchEntry {
        command_id: config::CUSTOM_COMMAND.command_id,
        handler,
    }])
}

#[cfg(test)]
mod test {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn single_entry_layout() {
        assert_eq!(table_base_address(1), Some(0xFFC8));
        assert_eq!(word_address(0), Some(0xFFCE));
        assert_eq!(word_address(3), Some(0xFFC8));
    }

    #[test]
    fn addresses_of_oversized_tables() {
        assert_eq!(MAX_TABLE_ENTRIES, 49);
        assert_eq!(table_base_address(MAX_TABLE_ENTRIES), Some(0xFF08));
        assert_eq!(word_address(2 * MAX_TABLE_ENTRIES + 1), Some(0xFF08));

        assert_eq!(table_base_address(MAX_TABLE_ENTRIES + 1), None);
        assert_eq!(table_base_address(usize::MAX), None);
        assert_eq!(word_address(2 * MAX_TABLE_ENTRIES + 2), None);
        assert_eq!(word_address(usize::MAX), None);
    }

    #[test]
    fn firmware_tables() {
        let table = driver_table(first);
        assert_eq!(table.entries[0].command_id, config::CUSTOM_COMMAND.command_id);
        assert_eq!(table.validate().map(|t| t.len()), Ok(1));

        let table = command_table("sample").unwrap();
        assert_eq!(table.lookup(CUSTOM_COMMAND_ID), Some(&"sample"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn one_entry_between_keys() {
        let table = DispatchTable::<&str, 1>::from_entries([DispatchEntry {
            command_id: CUSTOM_COMMAND_ID,
            handler: "sample",
        }])
        .unwrap();

        let words: Vec<u16, 8> = table.encode(|_| 0x4400).unwrap();
        assert_eq!(words, [0xCECE, 0x00AA, 0x4400, 0xCECE]);

        let image = DriverTableImage::<4>::parse(&words).unwrap();
        assert_eq!(image.entries(), &[(0x00AA, 0x4400)]);
        assert_eq!(image.lookup(CUSTOM_COMMAND_ID), Some(0x4400));
        assert_eq!(image.lookup(0x00AB), None);
    }

    #[test]
    fn encode_into_short_buffer() {
        let table =
            DispatchTable::<(), 2>::from_entries([DispatchEntry {
                command_id: 0xA0,
                handler: (),
            }])
            .unwrap();

        assert_eq!(table.encode::<3>(|_| 0), Err(Error::ImageTooSmall));
    }

    #[test]
    fn register_rejects_out_of_range() {
        let mut table = DispatchTable::<(), 4>::new();

        assert_eq!(
            table.register(0x009F, ()),
            Err(Error::CommandIdOutOfRange(0x009F))
        );
        assert_eq!(
            table.register(0x00D1, ()),
            Err(Error::CommandIdOutOfRange(0x00D1))
        );
        assert!(table.register(0x00A0, ()).is_ok());
        assert!(table.register(0x00D0, ()).is_ok());
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut table = DispatchTable::<u8, 4>::new();
        table.register(CUSTOM_COMMAND_ID, 1).unwrap();

        assert_eq!(
            table.register(CUSTOM_COMMAND_ID, 2),
            Err(Error::DuplicateCommandId(CUSTOM_COMMAND_ID))
        );
        assert_eq!(table.lookup(CUSTOM_COMMAND_ID), Some(&1));
    }

    #[test]
    fn register_full_table() {
        let mut table = DispatchTable::<(), 1>::new();
        table.register(0x00A1, ()).unwrap();

        assert_eq!(table.register(0x00A2, ()), Err(Error::TableFull));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn empty_table_is_invalid() {
        let table = DispatchTable::<(), 1>::new();
        assert!(table.is_empty());
        assert_eq!(table.validate(), Err(Error::EmptyTable));
        assert_eq!(
            DispatchTable::<(), 1>::from_entries([]).map(|t| t.len()),
            Err(Error::EmptyTable)
        );
    }

    #[test]
    fn dispatch_runs_handler() {
        let table = DispatchTable::<fn(&mut Vec<u16, 4>), 2>::from_entries([
            DispatchEntry {
                command_id: 0x00AA,
                handler: (|log: &mut Vec<u16, 4>| log.push(0xAA).unwrap()) as fn(&mut _),
            },
            DispatchEntry {
                command_id: 0x00AB,
                handler: (|log: &mut Vec<u16, 4>| log.push(0xAB).unwrap()) as fn(&mut _),
            },
        ])
        .unwrap();

        let mut log = Vec::new();
        table.dispatch(0x00AB, &mut log).unwrap();
        table.dispatch(0x00AA, &mut log).unwrap();

        assert_eq!(
            table.dispatch(0x00AC, &mut log),
            Err(Error::UnknownCommand(0x00AC))
        );
        assert_eq!(log, [0xAB, 0xAA]);
    }

    #[test]
    fn parse_rejects_missing_start_key() {
        assert_eq!(
            DriverTableImage::<4>::parse(&[0x00AA, 0x4400, 0xCECE]),
            Err(Error::MissingStartKey)
        );
        assert_eq!(
            DriverTableImage::<4>::parse(&[]),
            Err(Error::MissingStartKey)
        );
    }

    #[test]
    fn parse_rejects_unterminated_table() {
        assert_eq!(
            DriverTableImage::<4>::parse(&[0xCECE, 0x00AA, 0x4400]),
            Err(Error::UnterminatedTable)
        );
        assert_eq!(
            DriverTableImage::<4>::parse(&[0xCECE, 0x00AA, 0x4400, 0x00AB]),
            Err(Error::UnterminatedTable)
        );
    }

    #[test]
    fn parse_empty_table() {
        let image = DriverTableImage::<4>::parse(&[0xCECE, 0xCECE]).unwrap();
        assert!(image.entries().is_empty());
    }

    static FIRST_CALLS: AtomicUsize = AtomicUsize::new(0);
    static SECOND_CALLS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn first() {
        FIRST_CALLS.fetch_add(1, Ordering::Relaxed);
    }

    extern "C" fn second() {
        SECOND_CALLS.fetch_add(1, Ordering::Relaxed);
    }

    const TABLE: RomDriverTable<2> = RomDriverTable::new([
        RomDriverEntry {
            handler: first,
            command_id: 0x00AA,
        },
        RomDriverEntry {
            handler: second,
            command_id: 0x00B0,
        },
    ]);

    #[test]
    fn rom_table_memory_order() {
        assert_eq!(TABLE.entries[0].command_id, 0x00B0);
        assert_eq!(TABLE.entries[1].command_id, 0x00AA);

        let ids: std::vec::Vec<u16> = TABLE.dispatch_order().map(|e| e.command_id).collect();
        assert_eq!(ids, [0x00AA, 0x00B0]);
    }

    #[test]
    fn rom_table_validates_and_dispatches() {
        let table = TABLE.validate().unwrap();
        assert_eq!(table.len(), 2);

        let handler = table.lookup(0x00AA).unwrap();
        handler();
        assert_eq!(FIRST_CALLS.load(Ordering::Relaxed), 1);
        assert_eq!(SECOND_CALLS.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn rom_table_with_bad_keys() {
        let mut table = TABLE;
        table.start_key = 0;
        assert_eq!(table.validate().map(|t| t.len()), Err(Error::MissingStartKey));

        let mut table = TABLE;
        table.end_key = 0xCECF;
        assert_eq!(
            table.validate().map(|t| t.len()),
            Err(Error::UnterminatedTable)
        );
    }

    #[test]
    fn rom_table_with_invalid_entry() {
        let table = RomDriverTable::new([RomDriverEntry {
            handler: first,
            command_id: 0x0020,
        }]);

        assert_eq!(
            table.validate().map(|t| t.len()),
            Err(Error::CommandIdOutOfRange(0x0020))
        );
    }
}
