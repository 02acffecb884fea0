//! Byte classification: strict ASCII, valid UTF-8, or invalid
//!
//! UTF-8 validation is pluggable through [`Utf8Validator`]. The reference
//! implementation is a byte-level state machine following the RFC 3629
//! grammar; with the `simd` feature `simdutf8` is used instead. Both report
//! the same offset for any input (the start of the first invalid sequence,
//! as `std::str::Utf8Error::valid_up_to` does).

use crate::verdict::Classification;

/// UTF-8 byte order mark
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// True iff the buffer starts with the UTF-8 BOM
pub fn has_utf8_bom(data: &[u8]) -> bool {
    data.starts_with(&UTF8_BOM)
}

/// Strategy for validating UTF-8
pub trait Utf8Validator: Send + Sync {
    /// `Err(offset)` points at the start of the first invalid sequence
    fn validate(&self, data: &[u8]) -> Result<(), usize>;

    fn name(&self) -> &'static str;
}

/// Hand-written state machine decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceValidator;

/// Decoder state between bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Between characters
    Ground,
    /// Inside a multi-byte sequence; the next byte must be in `lo..=hi`
    Tail { remaining: u8, lo: u8, hi: u8 },
}

impl DecodeState {
    /// Transition out of `Ground` for a lead byte, `None` if it cannot start a sequence
    fn lead(byte: u8) -> Option<Self> {
        let tail = |remaining, lo, hi| Some(DecodeState::Tail { remaining, lo, hi });
        match byte {
            0x00..=0x7F => Some(DecodeState::Ground),
            0xC2..=0xDF => tail(1, 0x80, 0xBF),
            // E0 below A0 would be overlong
            0xE0 => tail(2, 0xA0, 0xBF),
            0xE1..=0xEC | 0xEE..=0xEF => tail(2, 0x80, 0xBF),
            // ED A0..BF would be a surrogate
            0xED => tail(2, 0x80, 0x9F),
            // F0 below 90 would be overlong
            0xF0 => tail(3, 0x90, 0xBF),
            0xF1..=0xF3 => tail(3, 0x80, 0xBF),
            // past U+10FFFF
            0xF4 => tail(3, 0x80, 0x8F),
            // C0, C1 (overlong 2-byte), F5..FF, bare continuation bytes
            _ => None,
        }
    }
}

impl Utf8Validator for ReferenceValidator {
    fn validate(&self, data: &[u8]) -> Result<(), usize> {
        let mut state = DecodeState::Ground;
        let mut seq_start = 0;

        for (i, &byte) in data.iter().enumerate() {
            state = match state {
                DecodeState::Ground => {
                    seq_start = i;
                    DecodeState::lead(byte).ok_or(i)?
                }
                DecodeState::Tail { remaining, lo, hi } => {
                    if !(lo..=hi).contains(&byte) {
                        return Err(seq_start);
                    }
                    if remaining == 1 {
                        DecodeState::Ground
                    } else {
                        DecodeState::Tail { remaining: remaining - 1, lo: 0x80, hi: 0xBF }
                    }
                }
            };
        }

        match state {
            DecodeState::Ground => Ok(()),
            // Truncated sequence at end of buffer
            DecodeState::Tail { .. } => Err(seq_start),
        }
    }

    fn name(&self) -> &'static str {
        "reference"
    }
}

/// SIMD validator backed by `simdutf8`
#[cfg(feature = "simd")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SimdValidator;

#[cfg(feature = "simd")]
impl Utf8Validator for SimdValidator {
    fn validate(&self, data: &[u8]) -> Result<(), usize> {
        simdutf8::compat::from_utf8(data)
            .map(|_| ())
            .map_err(|e| e.valid_up_to())
    }

    fn name(&self) -> &'static str {
        "simd"
    }
}

static REFERENCE: ReferenceValidator = ReferenceValidator;

#[cfg(feature = "simd")]
static SIMD: SimdValidator = SimdValidator;

/// The fastest validator compiled into this build
pub fn select_validator() -> &'static dyn Utf8Validator {
    #[cfg(feature = "simd")]
    {
        &SIMD
    }

    #[cfg(not(feature = "simd"))]
    {
        &REFERENCE
    }
}

/// The reference validator, always available
pub fn reference_validator() -> &'static dyn Utf8Validator {
    &REFERENCE
}

/// Look up a validator by name (`reference`, `simd` or `auto`)
pub fn validator_by_name(name: &str) -> Option<&'static dyn Utf8Validator> {
    match name {
        "auto" => Some(select_validator()),
        "reference" => Some(&REFERENCE),
        #[cfg(feature = "simd")]
        "simd" => Some(&SIMD),
        _ => None,
    }
}

/// Classifies byte buffers using one validator picked at construction
#[derive(Clone, Copy)]
pub struct Classifier {
    validator: &'static dyn Utf8Validator,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("validator", &self.validator.name())
            .finish()
    }
}

impl Classifier {
    /// Create a classifier with the best available validator
    pub fn new() -> Self {
        Self::with_validator(select_validator())
    }

    pub fn with_validator(validator: &'static dyn Utf8Validator) -> Self {
        Self { validator }
    }

    pub fn validator_name(&self) -> &'static str {
        self.validator.name()
    }

    /// Classify a buffer
    pub fn classify(&self, data: &[u8]) -> Classification {
        if data.is_ascii() {
            return Classification::StrictAscii;
        }

        match self.validator.validate(data) {
            Ok(()) => Classification::ValidUtf8,
            Err(offset) => Classification::InvalidUtf8 { offset },
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
