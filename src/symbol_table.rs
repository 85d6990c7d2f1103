//! Per-slot compile information.
//!
//! There is no separate name table: every arena slot a line owns gets a [SymbolInfo] entry, and
//! symbols are matched by comparing slot contents.

use std::fmt;

use crate::arena::{Handle, StringArena};

/// Byte or word typing of a definition or a use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Width::Byte => write!(f, "byte"),
            Width::Word => write!(f, "word"),
        }
    }
}

/// What a slot holds, from the point of view of the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Label of a line.
    Definition,
    /// Symbolic operand of an instruction.
    Use,
    /// Fragment of a comment.
    Comment,
    /// `.DB` values.
    Bytes,
    /// `.DW` values.
    Words,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub role: Role,
    pub width: Width,
    /// Address or constant of a definition.
    pub value: u16,
    /// The line that owns the slot.
    pub line: usize,
    /// The first definition with the same name, found by symbol resolution.
    pub definition: Option<Handle>,
    /// A definition that some use resolved to.
    pub referenced: bool,
}

impl SymbolInfo {
    pub fn is_definition(&self) -> bool {
        self.role == Role::Definition
    }

    pub fn is_use(&self) -> bool {
        self.role == Role::Use
    }
}

/// Slot indexed table of [SymbolInfo].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    slots: Vec<Option<SymbolInfo>>,
}

impl SymbolTable {
    pub fn new(capacity: usize) -> SymbolTable {
        SymbolTable {
            slots: vec![None; capacity],
        }
    }

    fn set(&mut self, handle: Handle, info: SymbolInfo) {
        let index = handle.index();

        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }

        self.slots[index] = Some(info);
    }

    /// Records a label definition.
    pub fn define(&mut self, handle: Handle, line: usize, width: Width, value: u16) {
        self.set(
            handle,
            SymbolInfo {
                role: Role::Definition,
                width,
                value,
                line,
                definition: None,
                referenced: false,
            },
        );
    }

    /// Records a symbolic operand.
    pub fn reference(&mut self, handle: Handle, line: usize, width: Width) {
        self.set(
            handle,
            SymbolInfo {
                role: Role::Use,
                width,
                value: 0,
                line,
                definition: None,
                referenced: false,
            },
        );
    }

    /// Records a slot that is neither a definition nor a use.
    pub fn other(&mut self, handle: Handle, line: usize, role: Role) {
        self.set(
            handle,
            SymbolInfo {
                role,
                width: Width::Byte,
                value: 0,
                line,
                definition: None,
                referenced: false,
            },
        );
    }

    pub fn get(&self, handle: Handle) -> Option<&SymbolInfo> {
        self.slots.get(handle.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut SymbolInfo> {
        self.slots.get_mut(handle.index()).and_then(Option::as_mut)
    }

    /// Entries in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &SymbolInfo)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, info)| {
            let info = info.as_ref()?;
            let handle = Handle::from_slot(index)?;
            Some((handle, info))
        })
    }

    /// Entries ordered by owning line, then by slot.
    pub fn in_line_order(&self) -> Vec<(Handle, &SymbolInfo)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|(handle, info)| (info.line, *handle));
        entries
    }

    /// Links every definition and use to the first definition, in line order, with the same
    /// name, and marks definitions that a use resolved to as referenced.
    pub fn resolve(&mut self, arena: &StringArena) {
        let definitions: Vec<Handle> = self
            .in_line_order()
            .into_iter()
            .filter(|(_, info)| info.is_definition())
            .map(|(handle, _)| handle)
            .collect();

        let symbols: Vec<Handle> = self
            .iter()
            .filter(|(_, info)| info.is_definition() || info.is_use())
            .map(|(handle, _)| handle)
            .collect();

        for handle in symbols {
            let first = definitions
                .iter()
                .copied()
                .find(|definition| arena.equals(*definition, handle));

            let is_use = match self.get_mut(handle) {
                Some(info) => {
                    info.definition = first;
                    info.is_use()
                }
                None => continue,
            };

            if let (true, Some(first)) = (is_use, first) {
                if let Some(definition) = self.get_mut(first) {
                    definition.referenced = true;
                }
            }
        }
    }

    /// The value a use resolves to.
    pub fn resolved_value(&self, handle: Handle) -> Option<u16> {
        let definition = self.get(handle)?.definition?;
        self.get(definition).map(|info| info.value)
    }
}
