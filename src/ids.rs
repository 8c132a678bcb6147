//! Dense integer identifiers for the four entity tables.
//!
//! Every table is addressed by a newtype wrapping `usize`, following the same
//! discipline the solver side of this crate's ancestry used for train/resource
//! ids: cheap `Copy` handles that index straight into a `TiVec`, with no risk
//! of mixing up a stream index and a room index at a call site.

use std::fmt;

use typed_index_collections::TiVec;

macro_rules! dense_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
        pub struct $name(pub u32);

        impl From<$name> for usize {
            fn from(id: $name) -> Self {
                id.0 as usize
            }
        }

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                $name(index as u32)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0 as i32
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

dense_id!(StreamID);
dense_id!(RoomID);
dense_id!(TimeblockID);
dense_id!(AbstractID);

pub type StreamTable<T> = TiVec<StreamID, T>;
pub type RoomTable<T> = TiVec<RoomID, T>;
pub type TimeblockTable<T> = TiVec<TimeblockID, T>;
pub type AbstractTable<T> = TiVec<AbstractID, T>;
