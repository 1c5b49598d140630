pub mod r#box;
pub use r#box::{find_box, find_box_range, BoxDispatcher, BoxHandler, BoxHeader};
pub mod reader;
pub use reader::{BoxReader, MediaDataHeader, ReadEvent};
pub mod ftyp;
pub mod mdhd;
pub mod mvhd;
pub mod tkhd;
pub mod ctts;
pub mod stco;
pub use stco::{ChunkOffsetBox, OffsetWidth};
pub mod stsc;
pub use stsc::{ChunkPosition, SampleToChunkBox, SampleToChunkEntry};
pub mod stss;
pub use stss::SyncSampleBox;
pub mod stsz;
pub use stsz::SampleSizeBox;
pub mod stts;
pub use stts::{SttsEntry, TimeToSampleBox};
pub mod trak;
pub use trak::{Track, TrimBounds};
pub mod trim;
pub mod assemble;
pub use assemble::SeekOutput;
pub mod meta;
pub use meta::{MetaStatus, Mp4Meta};

#[cfg(test)]
pub(crate) mod fixtures;
