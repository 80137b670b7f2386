//! Error types produced by the ABI codec and interface loader.

use alloy_primitives::B256;
use thiserror::Error;

/// Top-level error for every fallible ABI operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// A type string or JSON type description could not be understood.
    #[error("invalid type `{ty}`: {reason}")]
    InvalidType {
        /// The offending type text.
        ty: String,
        /// Why it was rejected.
        reason: &'static str,
    },
    /// A function signature string could not be parsed.
    #[error("invalid signature `{0}`")]
    InvalidSignature(String),
    /// An event declares more indexed arguments than fit in a log.
    #[error("event `{event}` has {count} indexed arguments, at most {max} allowed")]
    TooManyIndexed {
        /// Event name.
        event: String,
        /// Declared indexed arguments.
        count: usize,
        /// Limit for this event (3, or 4 when anonymous).
        max: usize,
    },
    /// A value could not be encoded against its type.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    /// Wire bytes could not be decoded against the expected types.
    #[error(transparent)]
    Decoding(#[from] DecodingError),
    /// A JSON interface definition was malformed.
    #[error("invalid ABI JSON: {0}")]
    Json(String),
    /// The interface does not contain the requested item.
    #[error("no {kind} named `{name}` in interface")]
    NotFound {
        /// Item category (`method`, `event`, `error`).
        kind: &'static str,
        /// Requested name.
        name: String,
    },
}

/// A value does not fit the type it is encoded as.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Number of values differs from the number of types.
    #[error("argument count mismatch: expected {expected}, got {actual}")]
    ArgumentCount {
        /// Number of types.
        expected: usize,
        /// Number of values.
        actual: usize,
    },
    /// The value variant cannot represent the type at all.
    #[error("cannot encode {value} as `{ty}`")]
    TypeMismatch {
        /// Canonical type name.
        ty: String,
        /// Variant name of the supplied value.
        value: &'static str,
    },
    /// A negative number was supplied for an unsigned type.
    #[error("negative value for unsigned type `{ty}`")]
    NegativeUnsigned {
        /// Canonical type name.
        ty: String,
    },
    /// The integer magnitude does not fit the declared bit width.
    #[error("integer overflows `{ty}`")]
    IntegerOverflow {
        /// Canonical type name.
        ty: String,
    },
    /// A byte string is longer than its fixed-size type allows.
    #[error("{len} bytes do not fit `{ty}`")]
    FixedBytesTooLong {
        /// Canonical type name.
        ty: String,
        /// Supplied length.
        len: usize,
    },
    /// A fixed-length array received the wrong number of elements.
    #[error("array length mismatch for `{ty}`: expected {expected}, got {actual}")]
    ArrayLength {
        /// Canonical type name.
        ty: String,
        /// Declared length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
}

/// Wire bytes are inconsistent with the expected types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingError {
    /// A read would run past the end of the buffer.
    #[error("buffer too short at offset {offset}: need {needed} bytes, have {available}")]
    BufferTooShort {
        /// Position of the read relative to the enclosing region.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes available from `offset`.
        available: usize,
    },
    /// Strict mode requires a whole number of 32-byte words.
    #[error("input length {len} is not a multiple of 32")]
    NotWordAligned {
        /// Input length.
        len: usize,
    },
    /// An offset word points back into the static head.
    #[error("offset {offset} points into the static head (head size {head})")]
    OffsetIntoHead {
        /// Offset read from the wire.
        offset: usize,
        /// Size of the head already consumed.
        head: usize,
    },
    /// An offset or length word does not fit in the address space or buffer.
    #[error("{what} word {value:#x} exceeds buffer of {len} bytes")]
    OutOfBounds {
        /// `offset` or `length`.
        what: &'static str,
        /// Low 64 bits of the value read, saturated.
        value: u64,
        /// Available buffer length.
        len: usize,
    },
    /// An integer word is outside the range of its declared width.
    #[error("value out of range for `{ty}`")]
    IntegerOverflow {
        /// Canonical type name.
        ty: String,
    },
    /// A boolean word other than 0 or 1.
    #[error("invalid boolean word")]
    InvalidBool,
    /// A `string` payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,
    /// Strict mode found non-zero padding.
    #[error("non-zero padding in `{ty}` word")]
    DirtyPadding {
        /// Canonical type name.
        ty: String,
    },
    /// Call data did not start with the expected selector.
    #[error("selector mismatch: expected {expected:02x?}, got {actual:02x?}")]
    SelectorMismatch {
        /// Selector of the descriptor.
        expected: [u8; 4],
        /// Leading bytes of the input.
        actual: Vec<u8>,
    },
    /// The first log topic is not the event's signature hash.
    #[error("event signature mismatch: expected {expected}, got {actual}")]
    EventSignatureMismatch {
        /// Topic hash of the descriptor.
        expected: B256,
        /// First topic of the log.
        actual: B256,
    },
    /// Log topics did not match the event descriptor.
    #[error("expected {expected} topics, got {actual}")]
    TopicCount {
        /// Expected number of topics.
        expected: usize,
        /// Number supplied.
        actual: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = AbiError> = std::result::Result<T, E>;
