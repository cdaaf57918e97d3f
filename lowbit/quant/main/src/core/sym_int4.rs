use crate::api::error::{QuantError, QuantResult};
use crate::api::types::{SYM_INT4_BLOCK_BYTES, SYM_INT4_BLOCK_SIZE};
use half::f16;

/// Quantize an f32 slice to sym_int4 blocks.
///
/// Each block of 32 elements is stored as:
/// - 2 bytes: f16 scale (little-endian)
/// - 16 bytes: 32 x 4-bit packed values (low nibble = even index, high nibble = odd)
///
/// Values are mapped to [0, 15] representing [-8, 7] (subtract 8 to dequant).
/// Requires element count divisible by 32.
pub fn quantize_sym_int4(data: &[f32]) -> QuantResult<Vec<u8>> {
    let n_elements = data.len();
    if n_elements % SYM_INT4_BLOCK_SIZE != 0 {
        return Err(QuantError::BlockAlignment(format!(
            "sym_int4 requires element count divisible by {}, got {}",
            SYM_INT4_BLOCK_SIZE, n_elements
        )));
    }

    let n_blocks = n_elements / SYM_INT4_BLOCK_SIZE;
    let mut output = vec![0u8; n_blocks * SYM_INT4_BLOCK_BYTES];

    for (block, dst) in data
        .chunks_exact(SYM_INT4_BLOCK_SIZE)
        .zip(output.chunks_exact_mut(SYM_INT4_BLOCK_BYTES))
    {
        let amax = block.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()));
        let scale = if amax == 0.0 { 0.0 } else { amax / 8.0 };
        let inv_scale = if scale == 0.0 { 0.0 } else { 1.0 / scale };

        let scale_bytes = f16::from_f32(scale).to_le_bytes();
        dst[0] = scale_bytes[0];
        dst[1] = scale_bytes[1];

        for i in 0..SYM_INT4_BLOCK_SIZE / 2 {
            let even_q = (block[2 * i] * inv_scale).round().clamp(-8.0, 7.0) as i8;
            let odd_q = (block[2 * i + 1] * inv_scale).round().clamp(-8.0, 7.0) as i8;

            let even_u = (even_q + 8) as u8;
            let odd_u = (odd_q + 8) as u8;

            dst[2 + i] = (odd_u << 4) | (even_u & 0x0F);
        }
    }

    Ok(output)
}

/// Dequantize sym_int4 bytes back to f32.
pub fn dequantize_sym_int4(raw: &[u8], n_elements: usize) -> QuantResult<Vec<f32>> {
    if n_elements % SYM_INT4_BLOCK_SIZE != 0 {
        return Err(QuantError::BlockAlignment(format!(
            "sym_int4 requires element count divisible by {}, got {}",
            SYM_INT4_BLOCK_SIZE, n_elements
        )));
    }
    let n_blocks = n_elements / SYM_INT4_BLOCK_SIZE;
    if raw.len() != n_blocks * SYM_INT4_BLOCK_BYTES {
        return Err(QuantError::ShapeMismatch {
            expected: vec![n_blocks * SYM_INT4_BLOCK_BYTES],
            actual: vec![raw.len()],
        });
    }

    let mut out_f32 = Vec::with_capacity(n_elements);
    for block in raw.chunks_exact(SYM_INT4_BLOCK_BYTES) {
        let scale = f16::from_le_bytes([block[0], block[1]]).to_f32();

        for &packed in &block[2..] {
            let even_u = packed & 0x0F;
            let odd_u = (packed >> 4) & 0x0F;

            out_f32.push((even_u as i8 - 8) as f32 * scale);
            out_f32.push((odd_u as i8 - 8) as f32 * scale);
        }
    }

    Ok(out_f32)
}

/// Dot product of one packed sym_int4 row with an f32 vector.
///
/// `row` must hold exactly `x.len() / 32` blocks; callers validate shapes
/// once per matrix, not per row.
#[inline]
pub fn dot_sym_int4(row: &[u8], x: &[f32]) -> f32 {
    debug_assert_eq!(row.len() / SYM_INT4_BLOCK_BYTES * SYM_INT4_BLOCK_SIZE, x.len());

    let mut acc = 0.0f32;
    for (block, xs) in row
        .chunks_exact(SYM_INT4_BLOCK_BYTES)
        .zip(x.chunks_exact(SYM_INT4_BLOCK_SIZE))
    {
        let scale = f16::from_le_bytes([block[0], block[1]]).to_f32();
        if scale == 0.0 {
            continue;
        }
        let mut block_sum = 0.0f32;
        for (i, &packed) in block[2..].iter().enumerate() {
            let even = ((packed & 0x0F) as i8 - 8) as f32;
            let odd = (((packed >> 4) & 0x0F) as i8 - 8) as f32;
            block_sum += even * xs[2 * i] + odd * xs[2 * i + 1];
        }
        acc += scale * block_sum;
    }
    acc
}
