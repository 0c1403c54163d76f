//! Streaming digest over chunked input.
//!
//! [`digest_stream`] turns a stream of byte chunks into a stream holding
//! exactly one chunk: the digest of every input byte in order. Input is fed
//! incrementally, so nothing is buffered; the accumulator is built fresh on
//! each consumption, so one call site can digest any number of independent
//! streams.
//!
//! The result depends only on the logical byte sequence, never on chunk
//! boundaries: `digest(chunks)` equals `digest(concatenation of the chunks)`.

use std::marker::PhantomData;

use bytes::Bytes;
use digest::Digest;

/// Iterator yielding a single chunk: the digest of all input chunks.
///
/// All work is deferred until the first `next()` call, which constructs the
/// accumulator, drains the input, and finalizes. Later calls return `None`;
/// the iterator is not restartable. Call [`digest_stream`] again for a fresh
/// accumulator.
pub struct DigestChunks<D, I> {
    input: Option<I>,
    _alg: PhantomData<fn() -> D>,
}

/// Reduce `input` to its digest under algorithm `D`.
///
/// Each chunk is fed exactly as its `as_ref()` byte range, in arrival order.
/// An empty input still yields one chunk (the algorithm's empty-input digest).
pub fn digest_stream<D, I>(input: I) -> DigestChunks<D, I::IntoIter>
where
    D: Digest,
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    DigestChunks {
        input: Some(input.into_iter()),
        _alg: PhantomData,
    }
}

impl<D, I> Iterator for DigestChunks<D, I>
where
    D: Digest,
    I: Iterator,
    I::Item: AsRef<[u8]>,
{
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        let input = self.input.take()?;
        let mut hasher = D::new();
        for chunk in input {
            hasher.update(chunk.as_ref());
        }
        let out = hasher.finalize();
        Some(Bytes::copy_from_slice(out.as_slice()))
    }
}

/// MD2 digest of a chunk stream (16 bytes).
pub fn md2<I>(input: I) -> DigestChunks<::md2::Md2, I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    digest_stream(input)
}

/// MD5 digest of a chunk stream (16 bytes).
pub fn md5<I>(input: I) -> DigestChunks<::md5::Md5, I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    digest_stream(input)
}

/// SHA-1 digest of a chunk stream (20 bytes).
pub fn sha1<I>(input: I) -> DigestChunks<::sha1::Sha1, I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    digest_stream(input)
}

/// SHA-256 digest of a chunk stream (32 bytes).
pub fn sha256<I>(input: I) -> DigestChunks<::sha2::Sha256, I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    digest_stream(input)
}

/// SHA-384 digest of a chunk stream (48 bytes).
pub fn sha384<I>(input: I) -> DigestChunks<::sha2::Sha384, I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    digest_stream(input)
}

/// SHA-512 digest of a chunk stream (64 bytes).
pub fn sha512<I>(input: I) -> DigestChunks<::sha2::Sha512, I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    digest_stream(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(mut it: impl Iterator<Item = Bytes>) -> Bytes {
        let out = it.next().expect("digest stream yields one chunk");
        assert!(it.next().is_none(), "digest stream yields exactly one chunk");
        out
    }

    #[test]
    fn sha256_ignores_chunk_boundaries() {
        let chunked = one(sha256(vec![
            Bytes::from_static(b"abc"),
            Bytes::from_static(b""),
            Bytes::from_static(b"def"),
        ]));
        let whole = one(sha256(vec![Bytes::from_static(b"abcdef")]));
        assert_eq!(chunked, whole);
    }

    #[test]
    fn sha256_of_empty_input_is_the_known_constant() {
        let out = one(sha256(Vec::<Bytes>::new()));
        assert_eq!(
            hex::encode(&out),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn known_vectors() {
        assert_eq!(
            hex::encode(one(md5(vec![b"abc"]))),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            hex::encode(one(sha1(vec![b"abc"]))),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(one(sha256(vec![b"abc"]))),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_lengths_match_algorithms() {
        let input = || vec![Bytes::from_static(b"hello")];
        assert_eq!(one(md2(input())).len(), 16);
        assert_eq!(one(md5(input())).len(), 16);
        assert_eq!(one(sha1(input())).len(), 20);
        assert_eq!(one(sha256(input())).len(), 32);
        assert_eq!(one(sha384(input())).len(), 48);
        assert_eq!(one(sha512(input())).len(), 64);
    }

    #[test]
    fn consumptions_are_independent() {
        // Two streams built from the same function get fresh accumulators.
        let a = one(sha256(vec![b"abc" as &[u8]]));
        let b = one(sha256(vec![b"abc" as &[u8]]));
        assert_eq!(a, b);
    }

    #[test]
    fn exhausted_stream_stays_exhausted() {
        let mut it = sha256(vec![b"abc" as &[u8]]);
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }
}
