/*!
Module containing shared scalar types of the translation hierarchy.
*/

pub mod address;
pub use address::Address;

/// Page-offset bit width of a 4 KiB page.
pub const PAGE_BITS_4K: u32 = 12;

/// Cache-line offset bit width of a 64-byte line.
pub const LINE_BITS_64B: u32 = 6;

/// 4 KiB page size in bytes.
pub const PAGE_SIZE_4K: u64 = 4096;

/// 2 MiB page size in bytes.
pub const PAGE_SIZE_2M: u64 = 2 * 1024 * 1024;
