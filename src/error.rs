// Copyright (c) 2025-present, quadmap
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Represents errors that can occur in the map engines or the driver
#[derive(Debug)]
pub enum Error {
    /// A lookup, update or removal targeted a key that is not present
    KeyNotFound,

    /// A maximum load factor outside `(0, +inf)` was supplied
    InvalidLoadFactor(f32),

    /// An open-addressing insertion found no free slot, even after rehashing
    SlotsExhausted,

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MapError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Map result
pub type Result<T> = std::result::Result<T, Error>;
