//! GRIB2 Test Data Generator
//!
//! Creates synthetic GRIB2 messages with valid structure for testing the
//! parser and the table builders. Values are simple packed with 16 bits,
//! optionally after decimal scaling, with a bitmap when any point is
//! missing.

/// Product definition template to emit in section 4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProductTemplate {
    /// 4.0: analysis or forecast at a horizontal level
    Forecast,
    /// 4.1: individual ensemble forecast
    Ensemble {
        type_of_ensemble: u8,
        perturbation_number: u8,
        number_in_ensemble: u8,
    },
    /// 4.8: statistically processed over a time interval
    Statistical {
        process: u8,
        time_unit: u8,
        length: u32,
    },
}

/// Build a minimal GRIB2 message with the specified parameters
#[derive(Debug, Clone)]
pub struct Grib2Builder {
    discipline: u8,
    center: u16,
    type_of_processed_data: u8,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    // Grid definition
    ni: u32,       // columns
    nj: u32,       // rows
    la1: i32,      // first lat (microdegrees)
    lo1: i32,      // first lon (microdegrees)
    la2: i32,      // last lat (microdegrees)
    lo2: i32,      // last lon (microdegrees)
    di: u32,       // lon increment (microdegrees)
    dj: u32,       // lat increment (microdegrees)
    scanning_mode: u8,
    // Product definition
    template: ProductTemplate,
    param_category: u8,
    param_number: u8,
    level_type: u8,
    level_scale: i8,
    level_value: u32,
    time_unit: u8,
    forecast_time: i32,
    // Data
    decimal_scale: i16,
    data_values: Vec<Option<f64>>,
}

impl Grib2Builder {
    /// Create a new builder with defaults for GFS-like data
    pub fn new_gfs() -> Self {
        // Small 10x10 grid over the north-east Pacific
        let ni = 10;
        let nj = 10;
        Self {
            discipline: 0, // Meteorological
            center: 7,     // NCEP
            type_of_processed_data: 1, // Forecast
            year: 2025,
            month: 12,
            day: 10,
            hour: 12,
            minute: 0,
            ni,
            nj,
            la1: 45_000_000,   // 45.0°N (microdegrees)
            lo1: 230_000_000,  // 230.0°E = -130°W (microdegrees, 0-360 range)
            la2: 36_000_000,   // 36.0°N
            lo2: 239_000_000,  // 239.0°E = -121°W
            di: 1_000_000,     // 1.0° increment
            dj: 1_000_000,     // 1.0° increment
            scanning_mode: 0b00000000, // +i, -j, i consecutive
            template: ProductTemplate::Forecast,
            param_category: 0,
            param_number: 0, // Temperature
            level_type: 103, // m above ground
            level_scale: 0,
            level_value: 2,  // 2m
            time_unit: 1,    // hours
            forecast_time: 0,
            decimal_scale: 0,
            data_values: vec![Some(288.15); (ni * nj) as usize], // 15°C in Kelvin
        }
    }

    /// Create a builder for a global 0.5° ensemble member, laid out like the
    /// ECMWF open-data and GEFS products: 720 x 361 points from 90°N/0°E to
    /// 90°S/359.5°E.
    pub fn global_half_degree() -> Self {
        let ni = 720;
        let nj = 361;
        Self {
            center: 98, // ECMWF
            type_of_processed_data: 4, // Perturbed forecast
            year: 2023,
            month: 12,
            day: 8,
            hour: 0,
            ni,
            nj,
            la1: 90_000_000,
            lo1: 0,
            la2: -90_000_000,
            lo2: 359_500_000,
            di: 500_000,
            dj: 500_000,
            template: ProductTemplate::Ensemble {
                type_of_ensemble: 3,
                perturbation_number: 1,
                number_in_ensemble: 30,
            },
            param_category: 3,
            param_number: 5, // Geopotential height
            level_type: 100,
            level_value: 50_000, // 500 hPa
            forecast_time: 3,
            data_values: vec![Some(5_500.0); (ni * nj) as usize],
            ..Self::new_gfs()
        }
    }

    pub fn with_reference_time(mut self, year: u16, month: u8, day: u8, hour: u8) -> Self {
        self.year = year;
        self.month = month;
        self.day = day;
        self.hour = hour;
        self
    }

    pub fn with_reference_minute(mut self, minute: u8) -> Self {
        self.minute = minute;
        self
    }

    pub fn with_discipline(mut self, discipline: u8) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn with_center(mut self, center: u16) -> Self {
        self.center = center;
        self
    }

    /// Type of processed data (Code table 1.4), e.g. 1 forecast, 4 perturbed.
    pub fn with_processed_data_type(mut self, data_type: u8) -> Self {
        self.type_of_processed_data = data_type;
        self
    }

    /// Resize the grid, keeping the first point and increments.
    pub fn with_grid(mut self, ni: u32, nj: u32) -> Self {
        self.ni = ni;
        self.nj = nj;
        self.update_last_point();
        self.data_values = vec![Some(0.0); (ni * nj) as usize];
        self
    }

    /// Place the grid: first point and increments in degrees.
    pub fn with_origin(mut self, lat: f64, lon: f64, di: f64, dj: f64) -> Self {
        self.la1 = to_micro(lat);
        self.lo1 = to_micro(lon);
        self.di = to_micro(di).unsigned_abs();
        self.dj = to_micro(dj).unsigned_abs();
        self.update_last_point();
        self
    }

    /// Scanning mode flags (Flag table 3.4). The last point is recomputed.
    pub fn with_scanning_mode(mut self, scanning_mode: u8) -> Self {
        self.scanning_mode = scanning_mode;
        self.update_last_point();
        self
    }

    pub fn with_parameter(mut self, category: u8, number: u8) -> Self {
        self.param_category = category;
        self.param_number = number;
        self
    }

    pub fn with_level(mut self, level_type: u8, level_value: u32) -> Self {
        self.level_type = level_type;
        self.level_scale = 0;
        self.level_value = level_value;
        self
    }

    pub fn with_scaled_level(mut self, level_type: u8, scale: i8, scaled_value: u32) -> Self {
        self.level_type = level_type;
        self.level_scale = scale;
        self.level_value = scaled_value;
        self
    }

    pub fn with_forecast_hour(mut self, hour: u32) -> Self {
        self.time_unit = 1;
        self.forecast_time = hour as i32;
        self
    }

    /// Forecast time in an arbitrary unit (Code table 4.4).
    pub fn with_forecast_time(mut self, unit: u8, value: i32) -> Self {
        self.time_unit = unit;
        self.forecast_time = value;
        self
    }

    /// Emit product template 4.1 for one ensemble member.
    pub fn with_ensemble(mut self, perturbation_number: u8, number_in_ensemble: u8) -> Self {
        self.template = ProductTemplate::Ensemble {
            type_of_ensemble: 3,
            perturbation_number,
            number_in_ensemble,
        };
        self
    }

    /// Emit product template 4.8 covering `length` units after the
    /// forecast time.
    pub fn with_statistical(mut self, process: u8, time_unit: u8, length: u32) -> Self {
        self.template = ProductTemplate::Statistical {
            process,
            time_unit,
            length,
        };
        self
    }

    pub fn with_decimal_scale(mut self, decimal_scale: i16) -> Self {
        self.decimal_scale = decimal_scale;
        self
    }

    pub fn with_constant_value(mut self, value: f64) -> Self {
        self.data_values = vec![Some(value); self.num_points()];
        self
    }

    pub fn with_gradient(mut self, min_val: f64, max_val: f64) -> Self {
        let n = self.num_points();
        self.data_values = (0..n)
            .map(|i| Some(min_val + (max_val - min_val) * (i as f64 / n as f64)))
            .collect();
        self
    }

    pub fn with_data(mut self, data: Vec<f64>) -> Self {
        self.data_values = data.into_iter().map(Some).collect();
        self
    }

    /// Values with gaps; `None` points are written as missing in a bitmap.
    pub fn with_optional_data(mut self, data: Vec<Option<f64>>) -> Self {
        self.data_values = data;
        self
    }

    /// Set a single point's value, in storage order.
    pub fn with_value_at(mut self, index: usize, value: Option<f64>) -> Self {
        self.data_values[index] = value;
        self
    }

    fn num_points(&self) -> usize {
        (self.ni * self.nj) as usize
    }

    fn update_last_point(&mut self) {
        let i_sign: i64 = if self.scanning_mode & 0x80 != 0 { -1 } else { 1 };
        let j_sign: i64 = if self.scanning_mode & 0x40 != 0 { 1 } else { -1 };
        let i_span = self.di as i64 * (self.ni.max(1) as i64 - 1);
        let j_span = self.dj as i64 * (self.nj.max(1) as i64 - 1);
        self.lo2 = (self.lo1 as i64 + i_sign * i_span) as i32;
        self.la2 = (self.la1 as i64 + j_sign * j_span) as i32;
    }

    /// Build the complete GRIB2 message bytes
    pub fn build(&self) -> Vec<u8> {
        let mut message = Vec::new();

        // Build sections
        let section1 = self.build_section1();
        let section3 = self.build_section3();
        let section4 = self.build_section4();
        let packing = self.packing();
        let section5 = self.build_section5(&packing);
        let section6 = self.build_section6();
        let section7 = self.build_section7(&packing);

        // Calculate total message length
        let message_length = 16 // Section 0
            + section1.len()
            + section3.len()
            + section4.len()
            + section5.len()
            + section6.len()
            + section7.len()
            + 4; // Section 8 (end)

        // Section 0: Indicator
        message.extend_from_slice(b"GRIB"); // Magic
        message.extend_from_slice(&[0, 0]); // Reserved
        message.push(self.discipline);
        message.push(2); // Edition 2
        message.extend_from_slice(&(message_length as u64).to_be_bytes());

        // Add all sections
        message.extend_from_slice(&section1);
        message.extend_from_slice(&section3);
        message.extend_from_slice(&section4);
        message.extend_from_slice(&section5);
        message.extend_from_slice(&section6);
        message.extend_from_slice(&section7);

        // Section 8: End
        message.extend_from_slice(b"7777");

        message
    }

    fn build_section1(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let section_length: u32 = 21;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(1); // Section number

        section.extend_from_slice(&self.center.to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Sub-center
        section.push(2);  // Master table version
        section.push(1);  // Local table version
        section.push(1);  // Significance of reference time (start of forecast)

        // Reference time
        section.extend_from_slice(&self.year.to_be_bytes());
        section.push(self.month);
        section.push(self.day);
        section.push(self.hour);
        section.push(self.minute);
        section.push(0); // Second

        section.push(0); // Production status (operational)
        section.push(self.type_of_processed_data);

        section
    }

    fn build_section3(&self) -> Vec<u8> {
        let mut section = Vec::new();

        // Template 3.0: Latitude/Longitude
        let template_data_len = 58;
        let section_length: u32 = 14 + template_data_len;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(3); // Section number

        section.push(0); // Source of grid definition
        let num_data_points = self.ni * self.nj;
        section.extend_from_slice(&num_data_points.to_be_bytes());
        section.push(0); // Number of octets for optional list
        section.push(0); // Interpretation of optional list
        section.extend_from_slice(&0u16.to_be_bytes()); // Grid definition template (0 = lat/lon)

        // Template 3.0 data (58 bytes)
        section.push(6); // Shape of Earth (spherical with radius 6371229m)
        section.push(0); // Scale factor of radius
        section.extend_from_slice(&0u32.to_be_bytes()); // Scaled value of radius
        section.push(0); // Scale factor of major axis
        section.extend_from_slice(&0u32.to_be_bytes()); // Scaled value of major axis
        section.push(0); // Scale factor of minor axis
        section.extend_from_slice(&0u32.to_be_bytes()); // Scaled value of minor axis

        section.extend_from_slice(&self.ni.to_be_bytes()); // Ni
        section.extend_from_slice(&self.nj.to_be_bytes()); // Nj
        section.extend_from_slice(&0u32.to_be_bytes()); // Basic angle
        section.extend_from_slice(&0xFFFFFFFFu32.to_be_bytes()); // Subdivisions

        section.extend_from_slice(&encode_signed(self.la1)); // La1
        section.extend_from_slice(&encode_signed(self.lo1)); // Lo1
        section.push(48); // Resolution and component flags (increments given)
        section.extend_from_slice(&encode_signed(self.la2)); // La2
        section.extend_from_slice(&encode_signed(self.lo2)); // Lo2
        section.extend_from_slice(&self.di.to_be_bytes()); // Di
        section.extend_from_slice(&self.dj.to_be_bytes()); // Dj
        section.push(self.scanning_mode); // Scanning mode

        section
    }

    fn build_section4(&self) -> Vec<u8> {
        let (template_number, generating_process): (u16, u8) = match self.template {
            ProductTemplate::Forecast => (0, 2),
            ProductTemplate::Ensemble { .. } => (1, 4),
            ProductTemplate::Statistical { .. } => (8, 2),
        };

        let mut section = Vec::new();
        section.extend_from_slice(&0u32.to_be_bytes()); // Length, patched below
        section.push(4); // Section number

        section.extend_from_slice(&0u16.to_be_bytes()); // Number of coordinate values
        section.extend_from_slice(&template_number.to_be_bytes());

        section.push(self.param_category);
        section.push(self.param_number);
        section.push(generating_process);
        section.push(0); // Background generating process
        section.push(0); // Analysis or forecast process
        section.extend_from_slice(&0u16.to_be_bytes()); // Hours of cutoff
        section.push(0); // Minutes of cutoff
        section.push(self.time_unit);
        section.extend_from_slice(&encode_signed(self.forecast_time)); // Forecast time

        section.push(self.level_type); // Type of first fixed surface
        section.push(encode_signed_i8(self.level_scale));
        section.extend_from_slice(&self.level_value.to_be_bytes()); // Scaled value

        section.push(255); // Type of second fixed surface (none)
        section.push(0);   // Scale factor
        section.extend_from_slice(&0u32.to_be_bytes()); // Scaled value

        match self.template {
            ProductTemplate::Forecast => {}
            ProductTemplate::Ensemble {
                type_of_ensemble,
                perturbation_number,
                number_in_ensemble,
            } => {
                section.push(type_of_ensemble);
                section.push(perturbation_number);
                section.push(number_in_ensemble);
            }
            ProductTemplate::Statistical {
                process,
                time_unit,
                length,
            } => {
                // End of overall time interval; readers derive it from the
                // forecast time and length instead.
                section.extend_from_slice(&self.year.to_be_bytes());
                section.extend_from_slice(&[self.month, self.day, self.hour, self.minute, 0]);
                section.push(1); // Number of time range specifications
                section.extend_from_slice(&0u32.to_be_bytes()); // Missing values
                section.push(process);
                section.push(2); // Successive times, same start of forecast
                section.push(time_unit);
                section.extend_from_slice(&length.to_be_bytes());
                section.push(255); // Increment unit (missing)
                section.extend_from_slice(&0u32.to_be_bytes()); // Increment
            }
        }

        let section_length = section.len() as u32;
        section[..4].copy_from_slice(&section_length.to_be_bytes());
        section
    }

    fn build_section5(&self, packing: &Packing) -> Vec<u8> {
        let mut section = Vec::new();
        let section_length: u32 = 21;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(5); // Section number

        section.extend_from_slice(&(packing.packed.len() as u32).to_be_bytes());
        section.extend_from_slice(&0u16.to_be_bytes()); // Template 5.0

        section.extend_from_slice(&packing.reference_value.to_be_bytes()); // Reference value
        section.extend_from_slice(&encode_signed_i16(packing.binary_scale_factor)); // E
        section.extend_from_slice(&encode_signed_i16(self.decimal_scale)); // D
        section.push(packing.bits_per_value);
        section.push(0); // Original field type (floating point)

        section
    }

    fn build_section6(&self) -> Vec<u8> {
        let mut section = Vec::new();

        if self.data_values.iter().all(Option::is_some) {
            section.extend_from_slice(&6u32.to_be_bytes());
            section.push(6); // Section number
            section.push(255); // Bitmap indicator (255 = no bitmap, all data present)
            return section;
        }

        let mut bitmap = vec![0u8; self.data_values.len().div_ceil(8)];
        for (i, value) in self.data_values.iter().enumerate() {
            if value.is_some() {
                bitmap[i / 8] |= 0x80 >> (i % 8);
            }
        }

        section.extend_from_slice(&(6 + bitmap.len() as u32).to_be_bytes());
        section.push(6); // Section number
        section.push(0); // Bitmap follows
        section.extend_from_slice(&bitmap);
        section
    }

    fn build_section7(&self, packing: &Packing) -> Vec<u8> {
        let mut section = Vec::new();

        let mut packed_data = Vec::new();
        if packing.bits_per_value > 0 {
            for &value in &packing.packed {
                packed_data.extend_from_slice(&value.to_be_bytes());
            }
        }

        let section_length: u32 = 5 + packed_data.len() as u32;

        section.extend_from_slice(&section_length.to_be_bytes());
        section.push(7); // Section number
        section.extend_from_slice(&packed_data);

        section
    }

    fn packing(&self) -> Packing {
        let decimal = 10f64.powi(self.decimal_scale as i32);
        let scaled: Vec<f64> = self
            .data_values
            .iter()
            .flatten()
            .map(|v| v * decimal)
            .collect();

        let (min_val, max_val) = scaled.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(min, max), &v| (min.min(v), max.max(v)),
        );

        if scaled.is_empty() || max_val == min_val {
            // All values are the same - no data needed (0 bits per value)
            return Packing {
                reference_value: if scaled.is_empty() { 0.0 } else { floor_f32(min_val) },
                binary_scale_factor: 0,
                bits_per_value: 0,
                packed: vec![0; scaled.len()],
            };
        }

        let reference_value = floor_f32(min_val);
        let range = max_val - reference_value as f64;

        // Unpacking formula: value = reference_value + packed_value * 2^E
        // For 16-bit packing with max packed value of 65535:
        //   E = ceil(log2(range / 65535))
        let binary_scale_factor = (range / 65535.0).log2().ceil() as i16;
        let binary_scale = 2f64.powi(binary_scale_factor as i32);

        let packed = scaled
            .iter()
            .map(|&v| ((v - reference_value as f64) / binary_scale).round().clamp(0.0, 65535.0) as u16)
            .collect();

        Packing {
            reference_value,
            binary_scale_factor,
            bits_per_value: 16,
            packed,
        }
    }
}

struct Packing {
    reference_value: f32,
    binary_scale_factor: i16,
    bits_per_value: u8,
    packed: Vec<u16>,
}

/// Concatenate messages into one file image.
pub fn concat_messages(messages: &[Vec<u8>]) -> Vec<u8> {
    messages.concat()
}

/// Encode a GRIB2 4-byte sign-magnitude integer.
pub fn encode_signed(value: i32) -> [u8; 4] {
    let magnitude = value.unsigned_abs() & 0x7FFF_FFFF;
    let sign = if value < 0 { 0x8000_0000 } else { 0 };
    (magnitude | sign).to_be_bytes()
}

fn encode_signed_i16(value: i16) -> [u8; 2] {
    let magnitude = value.unsigned_abs() & 0x7FFF;
    let sign = if value < 0 { 0x8000 } else { 0 };
    (magnitude | sign).to_be_bytes()
}

fn encode_signed_i8(value: i8) -> u8 {
    let magnitude = value.unsigned_abs() & 0x7F;
    if value < 0 {
        magnitude | 0x80
    } else {
        magnitude
    }
}

fn to_micro(degrees: f64) -> i32 {
    (degrees * 1e6).round() as i32
}

/// Largest f32 not above `value`, so no packed value goes negative.
fn floor_f32(value: f64) -> f32 {
    let candidate = value as f32;
    if candidate as f64 <= value {
        candidate
    } else if candidate > 0.0 {
        f32::from_bits(candidate.to_bits() - 1)
    } else if candidate < 0.0 {
        f32::from_bits(candidate.to_bits() + 1)
    } else {
        -f32::from_bits(1)
    }
}
