use bytes::{Buf, Bytes};

/// Represents an item in the request body stream handed from the reactor to a worker.
///
/// The reactor produces `Chunk`s in body byte order and terminates the stream with a
/// single `Eof`. Consumers switch on the tag; there is no sentinel buffer to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data
    Chunk(Data),
    /// Marks the end of the payload stream
    Eof,
}

impl<D: Buf> PayloadItem<D> {
    /// Number of bytes still readable from this item, zero for `Eof`
    #[inline]
    pub fn remaining(&self) -> usize {
        match self {
            PayloadItem::Chunk(data) => data.remaining(),
            PayloadItem::Eof => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_tracks_the_chunk() {
        let mut item = PayloadItem::Chunk(Bytes::from_static(b"abcd"));
        assert_eq!(item.remaining(), 4);

        if let PayloadItem::Chunk(data) = &mut item {
            data.advance(3);
        }
        assert_eq!(item.remaining(), 1);
        assert_eq!(PayloadItem::<Bytes>::Eof.remaining(), 0);
    }
}
