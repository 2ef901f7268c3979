//! PNG (10..=15) and TIFF (2) predictors applied after a filter.
//!
//! Cross-reference streams almost always use PNG Up (`/Predictor 12`).

use crate::error::{Error, Result};

/// `/DecodeParms` values relevant to predictors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeParams {
    /// 1 = none, 2 = TIFF, 10..=15 = PNG
    pub predictor: i64,
    /// Samples per row
    pub columns: usize,
    /// Components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl DecodeParams {
    /// Bytes of sample data per row, `None` on overflow.
    pub fn row_bytes(&self) -> Option<usize> {
        let bits = self
            .columns
            .checked_mul(self.colors)?
            .checked_mul(self.bits_per_component)?;
        Some(bits.div_ceil(8))
    }

    /// Bytes per complete pixel, at least 1.
    pub fn pixel_bytes(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Undo the predictor described by `params`.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row_bytes = match params.row_bytes() {
        Some(0) => return Err(Error::Decode("Predictor row width is zero".to_string())),
        Some(n) => n,
        None => {
            return Err(Error::Decode(format!(
                "Predictor row of {} x {} x {} bits overflows",
                params.columns, params.colors, params.bits_per_component
            )))
        },
    };
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => decode_tiff(data, params, row_bytes),
        10..=15 => decode_png(data, params, row_bytes),
        other => Err(Error::Decode(format!("Unsupported predictor {}", other))),
    }
}

fn decode_tiff(data: &[u8], params: &DecodeParams, row_bytes: usize) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor with {} bits per component",
            params.bits_per_component
        )));
    }
    let bpp = params.pixel_bytes();
    let mut output = data.to_vec();

    for row in output.chunks_mut(row_bytes) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    Ok(output)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn decode_png(data: &[u8], params: &DecodeParams, row_bytes: usize) -> Result<Vec<u8>> {
    let stride = row_bytes + 1;
    let bpp = params.pixel_bytes();

    if data.len() % stride != 0 {
        log::warn!(
            "Predictor data length {} is not a multiple of {}, dropping the partial row",
            data.len(),
            stride
        );
    }

    let mut output: Vec<u8> = Vec::with_capacity(data.len() / stride * row_bytes);
    let mut prev_row = vec![0u8; row_bytes];

    for chunk in data.chunks_exact(stride) {
        let tag = chunk[0];
        let mut row = chunk[1..].to_vec();

        for i in 0..row_bytes {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row[i];
            let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
            let predicted = match tag {
                0 => 0,
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                other => {
                    return Err(Error::Decode(format!("Invalid PNG predictor tag {}", other)))
                },
            };
            row[i] = row[i].wrapping_add(predicted);
        }

        output.extend_from_slice(&row);
        prev_row = row;
    }

    Ok(output)
}
