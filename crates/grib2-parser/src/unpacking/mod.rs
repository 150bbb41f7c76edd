//! GRIB2 data unpacking algorithms.
//!
//! Simple packing (template 5.0) is decoded here. Every other data
//! representation template is handed to the `grib` crate decoder.

use std::io::Cursor;

use crate::sections::Bitmap;
use crate::Grib2Error;

/// Unpack simple packed GRIB2 data
///
/// Simple packing formula: value = (reference_value + packed_value * 2^E) * 10^(-D)
///
/// `num_points` is the number of grid points. When a bitmap is given, only
/// points flagged present consume a packed value; the rest are `None`.
pub fn unpack_simple(
    packed_data: &[u8],
    num_points: u32,
    bits_per_value: u8,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    bitmap: Option<&Bitmap>,
) -> Result<Vec<Option<f64>>, Grib2Error> {
    let binary_scale = 2.0_f64.powi(binary_scale_factor as i32);
    let decimal_scale = 10.0_f64.powi(decimal_scale_factor.unsigned_abs() as i32);
    let reference = reference_value as f64;
    let bits_per_value = bits_per_value as usize;

    let mut values = Vec::with_capacity(num_points as usize);
    let mut bit_position = 0;

    for i in 0..(num_points as usize) {
        if let Some(bm) = bitmap {
            if !bm.is_present(i) {
                values.push(None);
                continue;
            }
        }

        let packed_value = if bits_per_value == 0 {
            0
        } else {
            let packed = extract_bits(packed_data, bit_position, bits_per_value)
                .map_err(|e| Grib2Error::UnpackingError(format!("Failed to extract bits: {}", e)))?;
            bit_position += bits_per_value;
            packed
        };

        let scaled = reference + packed_value as f64 * binary_scale;
        let value = if decimal_scale_factor >= 0 {
            scaled / decimal_scale
        } else {
            scaled * decimal_scale
        };
        values.push(Some(value));
    }

    Ok(values)
}

/// Decode the first field of `message` with the `grib` crate.
///
/// Missing points come back as NaN.
pub fn unpack_with_grib_crate(message: &[u8]) -> Result<Vec<f64>, Grib2Error> {
    let grib_file = grib::from_reader(Cursor::new(message))
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoder rejected message: {:?}", e)))?;

    let (_index, submessage) = grib_file
        .iter()
        .next()
        .ok_or_else(|| Grib2Error::UnpackingError("grib decoder found no field".to_string()))?;

    let decoder = grib::Grib2SubmessageDecoder::from(submessage)
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoder setup failed: {:?}", e)))?;
    let values = decoder
        .dispatch()
        .map_err(|e| Grib2Error::UnpackingError(format!("grib decoding failed: {:?}", e)))?;

    Ok(values.map(|v| v as f64).collect())
}

/// Extract bits from a byte array
/// Returns the bits as a 32-bit unsigned integer
fn extract_bits(data: &[u8], start_bit: usize, num_bits: usize) -> Result<u32, String> {
    if num_bits > 32 || num_bits == 0 {
        return Err(format!("Invalid number of bits: {}", num_bits));
    }

    let end_bit = start_bit + num_bits;
    if end_bit.div_ceil(8) > data.len() {
        return Err("Not enough data to extract bits".to_string());
    }

    // Byte-aligned fast paths cover the common 8/16/24/32-bit widths
    if start_bit % 8 == 0 && num_bits % 8 == 0 {
        let first = start_bit / 8;
        return Ok(data[first..first + num_bits / 8]
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32));
    }

    let mut result = 0u32;
    for absolute_bit in start_bit..end_bit {
        let byte_idx = absolute_bit / 8;
        let bit_idx = 7 - (absolute_bit % 8); // MSB first
        let bit = (data[byte_idx] >> bit_idx) & 1;
        result = (result << 1) | (bit as u32);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_extract_bits() {
        // Test with simple byte: 0b10110101
        let data = vec![0b10110101];

        // Extract first 2 bits (should be 0b10 = 2)
        let result = extract_bits(&data, 0, 2).unwrap();
        assert_eq!(result, 0b10);

        // Extract bits 2-4 (should be 0b11 = 3)
        let result = extract_bits(&data, 2, 2).unwrap();
        assert_eq!(result, 0b11);

        // Extract all 8 bits
        let result = extract_bits(&data, 0, 8).unwrap();
        assert_eq!(result, 0b10110101);
    }

    #[test]
    fn test_extract_bits_across_bytes() {
        let data = vec![0b0000_0001, 0b1000_0000];
        assert_eq!(extract_bits(&data, 7, 2).unwrap(), 0b11);
        assert_eq!(extract_bits(&data, 0, 16).unwrap(), 0x0180);
        assert!(extract_bits(&data, 10, 8).is_err());
    }

    #[test]
    fn test_simple_unpacking() {
        // Simple test: 2 data points, 8 bits per value
        let packed = vec![100, 200];
        let vals = unpack_simple(&packed, 2, 8, 0.0, 0, 0, None).unwrap();

        assert_eq!(vals, vec![Some(100.0), Some(200.0)]);
    }

    #[test]
    fn test_simple_unpacking_with_decimal_scale() {
        // R = 280000, D = 3: values are (280000 + X) / 1000
        let packed = 128u16.to_be_bytes();
        let vals = unpack_simple(&packed, 1, 16, 280_000.0, 0, 3, None).unwrap();
        test_utils::assert_approx_eq!(vals[0].unwrap(), 280.128, 1e-9);
    }

    #[test]
    fn test_bitmap_skips_missing_without_consuming_bits() {
        // Points 0 and 2 present, point 1 missing
        let bitmap = Bitmap {
            indicator: 0,
            data: Bytes::from_static(&[0b1010_0000]),
        };
        let packed = vec![10, 20];
        let vals = unpack_simple(&packed, 3, 8, 0.0, 0, 0, Some(&bitmap)).unwrap();

        assert_eq!(vals, vec![Some(10.0), None, Some(20.0)]);
    }

    #[test]
    fn test_constant_field() {
        let vals = unpack_simple(&[], 4, 0, 5.5, 0, 0, None).unwrap();
        assert_eq!(vals, vec![Some(5.5); 4]);
    }

    #[test]
    fn test_truncated_data_is_error() {
        let result = unpack_simple(&[1], 2, 8, 0.0, 0, 0, None);
        assert!(matches!(result, Err(Grib2Error::UnpackingError(_))));
    }
}
