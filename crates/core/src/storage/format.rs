use crate::errors::CoreError;
use super::encryption::KdfParams;

/// Magic bytes identifying a PFLD (portfolio ledger) file.
pub const MAGIC: &[u8; 4] = b"PFLD";

/// Current file format version.
pub const CURRENT_VERSION: u16 = 1;

/// Minimum header size in bytes:
/// magic(4) + version(2) + kdf_params(12) + salt(16) + nonce(12) + ciphertext_len(8) = 54
pub const MIN_HEADER_SIZE: usize = 54;

// Bounds on KDF params accepted from a file header, so a crafted file
// cannot drive key derivation into resource exhaustion.
const MEMORY_COST_RANGE: std::ops::RangeInclusive<u32> = 8..=1_048_576; // KiB
const TIME_COST_RANGE: std::ops::RangeInclusive<u32> = 1..=20;
const PARALLELISM_RANGE: std::ops::RangeInclusive<u32> = 1..=16;

/// File header read from an encrypted ledger file.
#[derive(Debug)]
pub struct FileHeader {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext_len: u64,
}

/// Assemble a complete encrypted ledger file as bytes.
///
/// Layout:
/// ```text
/// [PFLD: 4B] [version: 2B LE] [memory_cost: 4B LE] [time_cost: 4B LE]
/// [parallelism: 4B LE] [salt: 16B] [nonce: 12B] [ciphertext_len: 8B LE]
/// [ciphertext: variable]
/// ```
pub fn write_file(
    version: u16,
    kdf_params: &KdfParams,
    salt: &[u8; 16],
    nonce: &[u8; 12],
    ciphertext: &[u8],
) -> Vec<u8> {
    let ciphertext_len = ciphertext.len() as u64;
    let mut buf = Vec::with_capacity(MIN_HEADER_SIZE + ciphertext.len());

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&version.to_le_bytes());
    buf.extend_from_slice(&kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(salt);
    buf.extend_from_slice(nonce);
    buf.extend_from_slice(&ciphertext_len.to_le_bytes());
    // Ciphertext (includes the AES-GCM auth tag)
    buf.extend_from_slice(ciphertext);

    buf
}

/// Parse the header from raw file bytes.
/// Returns the header and the ciphertext slice.
pub fn read_file(data: &[u8]) -> Result<(FileHeader, &[u8]), CoreError> {
    if data.len() < MIN_HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(
            "File too small to be a valid ledger file".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes — not a portfolio ledger file".into(),
        ));
    }

    let mut offset = 4;

    let version = u16::from_le_bytes([data[offset], data[offset + 1]]);
    offset += 2;

    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let read_u32 = |field: &str, offset: &mut usize| -> Result<u32, CoreError> {
        let value = u32::from_le_bytes(
            data[*offset..*offset + 4]
                .try_into()
                .map_err(|_| CoreError::InvalidFileFormat(format!("Failed to read KDF {field}")))?,
        );
        *offset += 4;
        Ok(value)
    };

    let memory_cost = read_u32("memory_cost", &mut offset)?;
    let time_cost = read_u32("time_cost", &mut offset)?;
    let parallelism = read_u32("parallelism", &mut offset)?;

    if !MEMORY_COST_RANGE.contains(&memory_cost) {
        return Err(CoreError::InvalidFileFormat(format!(
            "KDF memory_cost out of safe range: {memory_cost} KiB"
        )));
    }
    if !TIME_COST_RANGE.contains(&time_cost) {
        return Err(CoreError::InvalidFileFormat(format!(
            "KDF time_cost out of safe range: {time_cost}"
        )));
    }
    if !PARALLELISM_RANGE.contains(&parallelism) {
        return Err(CoreError::InvalidFileFormat(format!(
            "KDF parallelism out of safe range: {parallelism}"
        )));
    }

    let mut salt = [0u8; 16];
    salt.copy_from_slice(&data[offset..offset + 16]);
    offset += 16;

    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&data[offset..offset + 12]);
    offset += 12;

    let ciphertext_len = u64::from_le_bytes(
        data[offset..offset + 8]
            .try_into()
            .map_err(|_| CoreError::InvalidFileFormat("Failed to read ciphertext length".into()))?,
    );
    offset += 8;

    let expected_end = offset + ciphertext_len as usize;
    if data.len() < expected_end {
        return Err(CoreError::InvalidFileFormat(format!(
            "File truncated: expected {} bytes of ciphertext, got {}",
            ciphertext_len,
            data.len() - offset
        )));
    }

    let ciphertext = &data[offset..expected_end];

    let header = FileHeader {
        version,
        kdf_params: KdfParams {
            memory_cost,
            time_cost,
            parallelism,
        },
        salt,
        nonce,
        ciphertext_len,
    };

    Ok((header, ciphertext))
}
