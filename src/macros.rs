//! # Internal Macros
//!
//! Boilerplate-reduction macros shared across the crate.
//!
//! ## `zerocopy_accessors!`
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! little-endian wrapper types (U16, U32, U64).
//!
//! ```ignore
//! use zerocopy::little_endian::U32;
//!
//! #[repr(C)]
//! struct Header {
//!     root_page: U32,
//! }
//!
//! impl Header {
//!     zerocopy_accessors! {
//!         root_page: u32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn root_page(&self) -> u32 { self.root_page.get() }
//! // pub fn set_root_page(&mut self, val: u32) { self.root_page = U32::new(val); }
//! ```
//!
//! ## `corrupted!`
//!
//! Builds a [`DirError::Corrupted`](crate::error::DirError) with a formatted
//! description, for use as the error operand of `ensure!`/`bail!` or
//! `Option::ok_or`.

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u16) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u16 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u16) {
                self.$field = ::zerocopy::little_endian::U16::new(val);
            }
        }
    };
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, u64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u64) {
                self.$field = ::zerocopy::little_endian::U64::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}

/// Builds a `DirError::Corrupted` with a formatted description.
#[macro_export]
macro_rules! corrupted {
    ($($arg:tt)*) => {
        $crate::error::DirError::Corrupted {
            details: format!($($arg)*),
        }
    };
}
