//! Pool de memoria simulado.
//!
//! Las directivas `memory allocate` y `memory deallocate` operan sobre
//! este pool durante el análisis sintáctico. Las asignaciones se
//! distribuyen sobre un espacio de direcciones ficticio a partir de
//! [`BASE_ADDRESS`], alineadas a [`ALIGNMENT`] bytes. El pool nunca
//! reutiliza una dirección, de forma que cada asignación tiene un
//! handle distinto.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    str::FromStr,
};

use thiserror::Error;

/// Primera dirección asignable.
pub const BASE_ADDRESS: u64 = 0x1000;

/// Alineamiento de toda asignación.
pub const ALIGNMENT: u64 = 16;

/// Dirección de una asignación viva.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Display for Handle {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "0x{:x}", self.0)
    }
}

impl FromStr for Handle {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let digits = string
            .strip_prefix("0x")
            .or_else(|| string.strip_prefix("0X"))
            .ok_or(())?;

        u64::from_str_radix(digits, 16).map(Handle).map_err(|_| ())
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("No live allocation at `{0}`")]
    UnknownHandle(String),

    #[error("Address space exhausted")]
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct MemoryPool {
    allocations: BTreeMap<Handle, usize>,
    next: u64,
}

impl Default for MemoryPool {
    fn default() -> Self {
        MemoryPool {
            allocations: BTreeMap::new(),
            next: BASE_ADDRESS,
        }
    }
}

impl MemoryPool {
    pub fn new() -> Self {
        MemoryPool::default()
    }

    /// Reserva `size` bytes y retorna el handle de la asignación.
    ///
    /// Una asignación de tamaño cero igualmente ocupa una dirección.
    pub fn allocate(&mut self, size: usize) -> Result<Handle, MemoryError> {
        let handle = Handle(self.next);
        let footprint = (size as u64).max(1);
        let aligned = footprint
            .checked_add(ALIGNMENT - 1)
            .map(|bytes| bytes / ALIGNMENT * ALIGNMENT)
            .ok_or(MemoryError::Exhausted)?;

        self.next = self.next.checked_add(aligned).ok_or(MemoryError::Exhausted)?;
        self.allocations.insert(handle, size);

        Ok(handle)
    }

    /// Libera una asignación, retornando su tamaño.
    pub fn free(&mut self, handle: &str) -> Result<usize, MemoryError> {
        handle
            .parse::<Handle>()
            .ok()
            .and_then(|parsed| self.allocations.remove(&parsed))
            .ok_or_else(|| MemoryError::UnknownHandle(handle.to_string()))
    }

    pub fn size_of(&self, handle: Handle) -> Option<usize> {
        self.allocations.get(&handle).copied()
    }

    /// Asignaciones vivas, en orden de dirección.
    pub fn live(&self) -> impl Iterator<Item = (Handle, usize)> + '_ {
        self.allocations.iter().map(|(&handle, &size)| (handle, size))
    }

    pub fn total_bytes(&self) -> usize {
        self.allocations.values().sum()
    }
}
