//! GRIB2 section parsing.
//!
//! This module handles parsing of individual GRIB2 message sections.
//! Each GRIB2 message consists of multiple sections containing
//! metadata, grid information, and packed data. Only the first field of a
//! multi-field message is read.

use crate::Grib2Error;
use bytes::Bytes;
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};

/// Value used by GRIB2 for "missing" in 4-octet unsigned fields.
pub const MISSING_U32: u32 = 0xFFFF_FFFF;

/// Section 0: Indicator Section (16 bytes)
#[derive(Debug, Clone)]
pub struct Indicator {
    pub discipline: u8,
    pub edition: u8,
    pub message_length: u64,
}

/// Reference time as encoded in section 1.
///
/// Kept as raw calendar fields so that an out-of-range date still exposes
/// its `date`/`time` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl ReferenceTime {
    /// `YYYYMMDD` as an integer.
    pub fn date(&self) -> i64 {
        self.year as i64 * 10_000 + self.month as i64 * 100 + self.day as i64
    }

    /// `HHMM` as an integer.
    pub fn time(&self) -> i64 {
        self.hour as i64 * 100 + self.minute as i64
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
            .and_then(|date| {
                date.and_hms_opt(self.hour as u32, self.minute as u32, self.second as u32)
            })
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
    }
}

/// Section 1: Identification Section
#[derive(Debug, Clone)]
pub struct Identification {
    pub center: u16,
    pub sub_center: u16,
    pub table_version: u8,
    pub local_table_version: u8,
    pub significance_of_reference_time: u8,
    pub reference_time: ReferenceTime,
    pub production_status: u8,
    pub data_type: u8,
}

/// Scanning mode flags (Flag table 3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScanningMode(pub u8);

impl ScanningMode {
    pub fn i_scans_negatively(&self) -> bool {
        self.0 & 0x80 != 0
    }

    pub fn j_scans_positively(&self) -> bool {
        self.0 & 0x40 != 0
    }

    pub fn j_points_consecutive(&self) -> bool {
        self.0 & 0x20 != 0
    }

    pub fn alternating_rows(&self) -> bool {
        self.0 & 0x10 != 0
    }
}

/// Section 3: Grid Definition Section
///
/// Coordinates are in degrees. Corner points a template does not define
/// are NaN.
#[derive(Debug, Clone)]
pub struct GridDefinition {
    pub template_number: u16,
    pub num_data_points: u32,
    pub shape_of_earth: u8,
    pub ni: u32,
    pub nj: u32,
    pub first_latitude: f64,
    pub first_longitude: f64,
    pub last_latitude: f64,
    pub last_longitude: f64,
    pub i_increment: Option<f64>,
    pub j_increment: Option<f64>,
    pub resolution_flags: u8,
    pub scanning_mode: ScanningMode,
}

/// Indicator of unit of time range (Code table 4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Month,
    Year,
    Decade,
    Normal,
    Century,
    ThreeHours,
    SixHours,
    TwelveHours,
    Second,
    Missing,
    Other(u8),
}

impl TimeUnit {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => TimeUnit::Minute,
            1 => TimeUnit::Hour,
            2 => TimeUnit::Day,
            3 => TimeUnit::Month,
            4 => TimeUnit::Year,
            5 => TimeUnit::Decade,
            6 => TimeUnit::Normal,
            7 => TimeUnit::Century,
            10 => TimeUnit::ThreeHours,
            11 => TimeUnit::SixHours,
            12 => TimeUnit::TwelveHours,
            13 => TimeUnit::Second,
            255 => TimeUnit::Missing,
            other => TimeUnit::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            TimeUnit::Minute => 0,
            TimeUnit::Hour => 1,
            TimeUnit::Day => 2,
            TimeUnit::Month => 3,
            TimeUnit::Year => 4,
            TimeUnit::Decade => 5,
            TimeUnit::Normal => 6,
            TimeUnit::Century => 7,
            TimeUnit::ThreeHours => 10,
            TimeUnit::SixHours => 11,
            TimeUnit::TwelveHours => 12,
            TimeUnit::Second => 13,
            TimeUnit::Missing => 255,
            TimeUnit::Other(code) => *code,
        }
    }

    /// The `stepUnits` spelling of this unit.
    pub fn abbreviation(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "m",
            TimeUnit::Hour => "h",
            TimeUnit::Day => "D",
            TimeUnit::Month => "M",
            TimeUnit::Year => "Y",
            TimeUnit::Decade => "10Y",
            TimeUnit::Normal => "30Y",
            TimeUnit::Century => "C",
            TimeUnit::ThreeHours => "3h",
            TimeUnit::SixHours => "6h",
            TimeUnit::TwelveHours => "12h",
            TimeUnit::Second => "s",
            TimeUnit::Missing | TimeUnit::Other(_) => "unknown",
        }
    }

    /// Length of one unit in seconds, for fixed-length units.
    pub fn seconds(&self) -> Option<i64> {
        match self {
            TimeUnit::Second => Some(1),
            TimeUnit::Minute => Some(60),
            TimeUnit::Hour => Some(3_600),
            TimeUnit::ThreeHours => Some(3 * 3_600),
            TimeUnit::SixHours => Some(6 * 3_600),
            TimeUnit::TwelveHours => Some(12 * 3_600),
            TimeUnit::Day => Some(86_400),
            _ => None,
        }
    }

    fn months(&self) -> Option<i64> {
        match self {
            TimeUnit::Month => Some(1),
            TimeUnit::Year => Some(12),
            TimeUnit::Decade => Some(120),
            TimeUnit::Normal => Some(360),
            TimeUnit::Century => Some(1_200),
            _ => None,
        }
    }

    /// Offset `base` by `amount` of this unit. Calendar units use calendar
    /// arithmetic.
    pub fn offset(&self, base: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
        if let Some(seconds) = self.seconds() {
            let delta = Duration::try_seconds(amount.checked_mul(seconds)?)?;
            return base.checked_add_signed(delta);
        }
        let months = amount.checked_mul(self.months()?)?;
        let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
        if months >= 0 {
            base.checked_add_months(magnitude)
        } else {
            base.checked_sub_months(magnitude)
        }
    }

    /// Express `amount` of `from` in this unit, when it divides exactly.
    pub fn convert(&self, amount: i64, from: TimeUnit) -> Option<i64> {
        if *self == from {
            return Some(amount);
        }
        match (self.seconds(), from.seconds()) {
            (Some(to), Some(from)) => {
                let total = amount.checked_mul(from)?;
                (total % to == 0).then_some(total / to)
            }
            _ => match (self.months(), from.months()) {
                (Some(to), Some(from)) => {
                    let total = amount.checked_mul(from)?;
                    (total % to == 0).then_some(total / to)
                }
                _ => None,
            },
        }
    }
}

/// A fixed surface (level) from section 4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSurface {
    pub surface_type: u8,
    pub scale_factor: i8,
    pub scaled_value: u32,
}

impl FixedSurface {
    /// Physical value of the surface, `None` when the surface is absent.
    pub fn value(&self) -> Option<f64> {
        if self.surface_type == 255 || self.scaled_value == MISSING_U32 {
            return None;
        }
        let scale = 10f64.powi(self.scale_factor.unsigned_abs() as i32);
        if self.scale_factor >= 0 {
            Some(self.scaled_value as f64 / scale)
        } else {
            Some(self.scaled_value as f64 * scale)
        }
    }
}

/// Ensemble description carried by product templates 4.1 and 4.11.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsembleInfo {
    pub type_of_ensemble: u8,
    pub perturbation_number: u8,
    pub number_in_ensemble: u8,
}

/// Statistical processing description carried by product templates 4.8,
/// 4.11 and 4.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticalInfo {
    pub process: u8,
    pub time_range_unit: TimeUnit,
    pub length: u32,
}

/// Section 4: Product Definition Section
#[derive(Debug, Clone)]
pub struct ProductDefinition {
    pub template_number: u16,
    pub parameter_category: u8,
    pub parameter_number: u8,
    pub generating_process: u8,
    pub time_range_unit: TimeUnit,
    pub forecast_time: i64,
    pub first_surface: FixedSurface,
    pub second_surface: FixedSurface,
    pub ensemble: Option<EnsembleInfo>,
    pub statistical: Option<StatisticalInfo>,
}

impl ProductDefinition {
    /// Start of the forecast range in `time_range_unit`.
    pub fn start_step(&self) -> i64 {
        self.forecast_time
    }

    /// End of the forecast range in `time_range_unit`; equals the start step
    /// for instantaneous products.
    pub fn end_step(&self) -> i64 {
        match self.statistical {
            Some(stat) => match self
                .time_range_unit
                .convert(stat.length as i64, stat.time_range_unit)
            {
                Some(length) => self.forecast_time + length,
                None => {
                    tracing::debug!(
                        unit = ?stat.time_range_unit,
                        forecast_unit = ?self.time_range_unit,
                        "Statistical range unit not convertible, using start step"
                    );
                    self.forecast_time
                }
            },
            None => self.forecast_time,
        }
    }
}

/// Section 5: Data Representation Section
#[derive(Debug, Clone)]
pub struct DataRepresentation {
    pub num_data_points: u32,
    pub template_number: u16,
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub bits_per_value: u8,
    pub original_data_type: u8,
}

impl DataRepresentation {
    /// The `packingType` spelling of the data representation template.
    pub fn packing_type(&self) -> &'static str {
        match self.template_number {
            0 => "grid_simple",
            1 => "grid_simple_matrix",
            2 => "grid_complex",
            3 => "grid_complex_spatial_differencing",
            4 => "grid_ieee",
            40 => "grid_jpeg",
            41 => "grid_png",
            42 => "grid_ccsds",
            50 => "spectral_simple",
            51 => "spectral_complex",
            200 => "grid_run_length",
            _ => "unknown",
        }
    }
}

/// Section 6: Bitmap Section
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub indicator: u8,
    pub data: Bytes,
}

impl Bitmap {
    /// Whether the point at `index` carries a value.
    pub fn is_present(&self, index: usize) -> bool {
        match self.data.get(index / 8) {
            Some(byte) => (byte >> (7 - (index % 8))) & 1 == 1,
            None => false,
        }
    }
}

/// Section 7: Data Section
#[derive(Debug, Clone)]
pub struct DataSection {
    pub data: Bytes,
}

// ===== Parsing Functions =====

/// Parse Section 0 (Indicator) from start of message
pub fn parse_indicator(data: &[u8]) -> Result<Indicator, Grib2Error> {
    if data.len() < 8 {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    if &data[0..4] != b"GRIB" {
        return Err(Grib2Error::InvalidFormat(
            "Invalid GRIB magic bytes".to_string(),
        ));
    }

    // Octets 5-6 reserved, octet 7 discipline, octet 8 edition,
    // octets 9-16 total length (GRIB2 only)
    let discipline = data[6];
    let edition = data[7];
    if edition != 2 {
        return Err(Grib2Error::UnsupportedEdition(edition));
    }
    if data.len() < 16 {
        return Err(Grib2Error::InvalidFormat(
            "Not enough data for indicator section".to_string(),
        ));
    }

    let message_length = u64::from_be_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]);

    Ok(Indicator {
        discipline,
        edition,
        message_length,
    })
}

/// Parse Section 1 (Identification)
/// Located at offset 16 in the message
pub fn parse_identification(data: &[u8]) -> Result<Identification, Grib2Error> {
    const OFFSET: usize = 16;

    if data.len() < OFFSET + 21 || data[OFFSET + 4] != 1 {
        return Err(Grib2Error::InvalidSection {
            section: 1,
            reason: "Identification section missing or truncated".to_string(),
        });
    }

    let sec_data = &data[OFFSET + 5..];

    let reference_time = ReferenceTime {
        year: u16::from_be_bytes([sec_data[7], sec_data[8]]),
        month: sec_data[9],
        day: sec_data[10],
        hour: sec_data[11],
        minute: sec_data[12],
        second: sec_data[13],
    };

    Ok(Identification {
        center: u16::from_be_bytes([sec_data[0], sec_data[1]]),
        sub_center: u16::from_be_bytes([sec_data[2], sec_data[3]]),
        table_version: sec_data[4],
        local_table_version: sec_data[5],
        significance_of_reference_time: sec_data[6],
        reference_time,
        production_status: sec_data[14],
        data_type: sec_data[15],
    })
}

/// Parse Section 3 (Grid Definition)
pub fn parse_grid_definition(data: &[u8]) -> Result<GridDefinition, Grib2Error> {
    let section_offset = find_section(data, 3)?;
    let section_data = section_slice(data, section_offset);

    if section_data.len() < 14 {
        return Err(Grib2Error::InvalidSection {
            section: 3,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 6-9: number of data points, 12-13: template number, 14+: template
    let num_data_points = read_u32(section_data, 6);
    let template_number = u16::from_be_bytes([section_data[12], section_data[13]]);
    let gd = &section_data[14..];

    match template_number {
        // 3.0 regular lat/lon, 3.1 rotated lat/lon, 3.40 Gaussian share
        // the same leading layout.
        0 | 1 | 40 => {
            if gd.len() < 58 {
                return Err(Grib2Error::InvalidSection {
                    section: 3,
                    reason: format!(
                        "Template {} needs at least 58 bytes, got {}",
                        template_number,
                        gd.len()
                    ),
                });
            }

            let ni = read_u32(gd, 16);
            let nj = read_u32(gd, 20);
            let unit = AngleUnit::new(read_u32(gd, 24), read_u32(gd, 28));
            let resolution_flags = gd[40];

            let increment = |raw: u32, given: bool| {
                (given && raw != MISSING_U32).then(|| unit.degrees(raw as i64))
            };
            let i_increment = increment(read_u32(gd, 49), resolution_flags & 0x20 != 0);
            // Template 3.40 stores N (parallels between pole and equator)
            // where 3.0 stores Dj.
            let j_increment = if template_number == 40 {
                None
            } else {
                increment(read_u32(gd, 53), resolution_flags & 0x10 != 0)
            };

            Ok(GridDefinition {
                template_number,
                num_data_points,
                shape_of_earth: gd[0],
                ni,
                nj,
                first_latitude: unit.degrees(decode_grib2_signed(&gd[32..36]) as i64),
                first_longitude: unit.degrees(decode_grib2_signed(&gd[36..40]) as i64),
                last_latitude: unit.degrees(decode_grib2_signed(&gd[41..45]) as i64),
                last_longitude: unit.degrees(decode_grib2_signed(&gd[45..49]) as i64),
                i_increment,
                j_increment,
                resolution_flags,
                scanning_mode: ScanningMode(gd[57]),
            })
        }
        // 3.30 Lambert conformal: only the first point is defined
        30 => {
            if gd.len() < 51 {
                return Err(Grib2Error::InvalidSection {
                    section: 3,
                    reason: format!("Template 30 needs at least 51 bytes, got {}", gd.len()),
                });
            }
            Ok(GridDefinition {
                template_number,
                num_data_points,
                shape_of_earth: gd[0],
                ni: read_u32(gd, 16),
                nj: read_u32(gd, 20),
                first_latitude: AngleUnit::Micro.degrees(decode_grib2_signed(&gd[24..28]) as i64),
                first_longitude: AngleUnit::Micro.degrees(decode_grib2_signed(&gd[28..32]) as i64),
                last_latitude: f64::NAN,
                last_longitude: f64::NAN,
                i_increment: None,
                j_increment: None,
                resolution_flags: gd[32],
                scanning_mode: ScanningMode(gd[50]),
            })
        }
        _ => {
            // Other templates: keep the point count so the field can still
            // be unpacked, geometry is unknown.
            tracing::debug!(template = template_number, "Grid template without geometry support");
            Ok(GridDefinition {
                template_number,
                num_data_points,
                shape_of_earth: gd.first().copied().unwrap_or(255),
                ni: 0,
                nj: 0,
                first_latitude: f64::NAN,
                first_longitude: f64::NAN,
                last_latitude: f64::NAN,
                last_longitude: f64::NAN,
                i_increment: None,
                j_increment: None,
                resolution_flags: 0,
                scanning_mode: ScanningMode::default(),
            })
        }
    }
}

/// Parse Section 4 (Product Definition)
pub fn parse_product_definition(data: &[u8]) -> Result<ProductDefinition, Grib2Error> {
    let section_offset = find_section(data, 4)?;
    let section_data = section_slice(data, section_offset);

    if section_data.len() < 9 {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 5-6: number of coordinate values, 7-8: template number
    let template_number = u16::from_be_bytes([section_data[7], section_data[8]]);

    // Offset of the statistical block and presence of ensemble fields
    let (ensemble_at, statistical_at) = match template_number {
        0 | 2 | 15 => (None, None),
        1 => (Some(34), None),
        8 => (None, Some(34)),
        11 => (Some(34), Some(37)),
        12 => (None, Some(36)),
        other => {
            return Err(Grib2Error::UnsupportedTemplate {
                section: 4,
                template: other,
            })
        }
    };

    let required = statistical_at.map(|at| at + 19).unwrap_or(34).max(
        ensemble_at.map(|at| at + 3).unwrap_or(34),
    );
    if section_data.len() < required {
        return Err(Grib2Error::InvalidSection {
            section: 4,
            reason: format!(
                "Template 4.{} needs {} bytes, got {}",
                template_number,
                required,
                section_data.len()
            ),
        });
    }

    // Byte 17: time range unit, 18-21: forecast time,
    // 22-27 first fixed surface, 28-33 second fixed surface
    let surface = |at: usize| FixedSurface {
        surface_type: section_data[at],
        scale_factor: decode_grib2_signed_i8(section_data[at + 1]),
        scaled_value: read_u32(section_data, at + 2),
    };

    let ensemble = ensemble_at.map(|at| EnsembleInfo {
        type_of_ensemble: section_data[at],
        perturbation_number: section_data[at + 1],
        number_in_ensemble: section_data[at + 2],
    });

    // Statistical block: 7 bytes end time, count, missing count, then the
    // first time range specification.
    let statistical = statistical_at.map(|at| StatisticalInfo {
        process: section_data[at + 12],
        time_range_unit: TimeUnit::from_code(section_data[at + 14]),
        length: read_u32(section_data, at + 15),
    });

    Ok(ProductDefinition {
        template_number,
        parameter_category: section_data[9],
        parameter_number: section_data[10],
        generating_process: section_data[11],
        time_range_unit: TimeUnit::from_code(section_data[17]),
        forecast_time: decode_grib2_signed(&section_data[18..22]) as i64,
        first_surface: surface(22),
        second_surface: surface(28),
        ensemble,
        statistical,
    })
}

/// Parse Section 5 (Data Representation)
pub fn parse_data_representation(data: &[u8]) -> Result<DataRepresentation, Grib2Error> {
    let section_offset = find_section(data, 5)?;
    let section_data = section_slice(data, section_offset);

    if section_data.len() < 11 {
        return Err(Grib2Error::InvalidSection {
            section: 5,
            reason: "Not enough data".to_string(),
        });
    }

    // Bytes 5-8: number of packed values, 9-10: template number,
    // 11+: template. Templates 5.0, 5.2, 5.3, 5.40, 5.41 and 5.42 share
    // reference value, E, D and bit width at the same offsets.
    let num_data_points = read_u32(section_data, 5);
    let template_number = u16::from_be_bytes([section_data[9], section_data[10]]);
    let template_data = &section_data[11..];

    let (reference_value, binary_scale_factor, decimal_scale_factor, bits_per_value, original) =
        if template_data.len() >= 10 {
            (
                f32::from_be_bytes([
                    template_data[0],
                    template_data[1],
                    template_data[2],
                    template_data[3],
                ]),
                decode_grib2_signed_i16(&template_data[4..6]),
                decode_grib2_signed_i16(&template_data[6..8]),
                template_data[8],
                template_data[9],
            )
        } else if template_number == 0 {
            return Err(Grib2Error::InvalidSection {
                section: 5,
                reason: "Simple packing template truncated".to_string(),
            });
        } else {
            (0.0, 0, 0, 0, 0)
        };

    Ok(DataRepresentation {
        num_data_points,
        template_number,
        reference_value,
        binary_scale_factor,
        decimal_scale_factor,
        bits_per_value,
        original_data_type: original,
    })
}

/// Parse Section 6 (Bitmap). Returns `None` when the message carries no
/// bitmap (indicator 255).
pub fn parse_bitmap(data: &Bytes) -> Result<Option<Bitmap>, Grib2Error> {
    let section_offset = find_section(data, 6)?;
    let section_data = section_slice(data, section_offset);

    if section_data.len() < 6 {
        return Err(Grib2Error::InvalidSection {
            section: 6,
            reason: "Not enough data".to_string(),
        });
    }

    let indicator = section_data[5];
    match indicator {
        255 => Ok(None),
        0 => Ok(Some(Bitmap {
            indicator,
            data: data.slice(section_offset + 6..section_offset + section_data.len()),
        })),
        other => Err(Grib2Error::InvalidSection {
            section: 6,
            reason: format!("Unsupported bitmap indicator {}", other),
        }),
    }
}

/// Parse Section 7 (Data)
pub fn parse_data_section(data: &Bytes) -> Result<DataSection, Grib2Error> {
    let section_offset = find_section(data, 7)?;
    let section_len = section_slice(data, section_offset).len();

    if section_len < 5 {
        return Err(Grib2Error::InvalidSection {
            section: 7,
            reason: "Not enough data".to_string(),
        });
    }

    Ok(DataSection {
        data: data.slice(section_offset + 5..section_offset + section_len),
    })
}

// ===== Helper Functions =====

/// Decode a 4-byte GRIB2 sign-magnitude integer (MSB is the sign bit).
///
/// Returns 0 when `bytes` is not exactly four bytes long.
pub fn decode_grib2_signed(bytes: &[u8]) -> i32 {
    let Ok(raw) = <[u8; 4]>::try_from(bytes) else {
        return 0;
    };
    let raw = u32::from_be_bytes(raw);
    let magnitude = (raw & 0x7FFF_FFFF) as i32;
    if raw & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 2-byte GRIB2 sign-magnitude integer.
pub fn decode_grib2_signed_i16(bytes: &[u8]) -> i16 {
    let Ok(raw) = <[u8; 2]>::try_from(bytes) else {
        return 0;
    };
    let raw = u16::from_be_bytes(raw);
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Decode a 1-byte GRIB2 sign-magnitude integer.
pub fn decode_grib2_signed_i8(byte: u8) -> i8 {
    let magnitude = (byte & 0x7F) as i8;
    if byte & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Unit of grid angles: microdegrees unless section 3 gives a basic angle
/// and its subdivisions.
#[derive(Debug, Clone, Copy)]
enum AngleUnit {
    Micro,
    Fraction { basic: u32, subdivisions: u32 },
}

impl AngleUnit {
    fn new(basic: u32, subdivisions: u32) -> Self {
        if basic == 0 || basic == MISSING_U32 || subdivisions == 0 || subdivisions == MISSING_U32 {
            AngleUnit::Micro
        } else {
            AngleUnit::Fraction {
                basic,
                subdivisions,
            }
        }
    }

    fn degrees(&self, raw: i64) -> f64 {
        match self {
            AngleUnit::Micro => raw as f64 / 1e6,
            AngleUnit::Fraction {
                basic,
                subdivisions,
            } => raw as f64 * *basic as f64 / *subdivisions as f64,
        }
    }
}

/// The bytes of the section starting at `offset`; `find_section` has
/// already validated its length.
fn section_slice(data: &[u8], offset: usize) -> &[u8] {
    let length = read_u32(data, offset) as usize;
    &data[offset..offset + length]
}

/// Find a section by number within a message
pub(crate) fn find_section(data: &[u8], section_num: u8) -> Result<usize, Grib2Error> {
    let mut offset = 16; // After Section 0

    loop {
        if offset + 4 <= data.len() && &data[offset..offset + 4] == b"7777" {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Reached end of message without finding section".to_string(),
            });
        }

        if offset + 5 > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Section not found".to_string(),
            });
        }

        let section_length = read_u32(data, offset) as usize;

        if section_length < 5 || offset + section_length > data.len() {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Invalid section length".to_string(),
            });
        }

        let current_section = data[offset + 4];

        if current_section == section_num {
            return Ok(offset);
        }

        // Sections 2-7 repeat for multi-field messages; stop at the first
        // field's data section.
        if current_section == 7 && section_num < 7 {
            return Err(Grib2Error::InvalidSection {
                section: section_num,
                reason: "Section not present in first field".to_string(),
            });
        }

        offset += section_length;
    }
}

/// Count the fields (data sections) in a message.
pub(crate) fn count_fields(data: &[u8]) -> usize {
    let mut offset = 16;
    let mut fields = 0;
    while offset + 5 <= data.len() && &data[offset..offset + 4] != b"7777" {
        let length = read_u32(data, offset) as usize;
        if length < 5 {
            break;
        }
        if data[offset + 4] == 7 {
            fields += 1;
        }
        offset += length;
    }
    fields
}

/// `typeOfLevel` name for a first fixed surface type (Code table 4.5).
pub fn type_of_level(surface_type: u8) -> &'static str {
    match surface_type {
        1 => "surface",
        2 => "cloudBase",
        3 => "cloudTop",
        4 => "isothermZero",
        5 => "adiabaticCondensation",
        6 => "maxWind",
        7 => "tropopause",
        8 => "nominalTop",
        10 => "entireAtmosphere",
        20 => "isothermal",
        100 => "isobaricInhPa",
        101 => "meanSea",
        102 => "heightAboveSea",
        103 => "heightAboveGround",
        104 => "sigma",
        105 => "hybrid",
        106 => "depthBelowLand",
        107 => "theta",
        108 => "pressureFromGroundLayer",
        109 => "potentialVorticity",
        151 => "soil",
        160 => "depthBelowSea",
        200 => "entireAtmosphere",
        220 => "planetaryBoundaryLayer",
        _ => "unknown",
    }
}

/// `dataType` spelling of the type of processed data (Code table 1.4).
pub fn data_type_name(type_of_processed_data: u8) -> &'static str {
    match type_of_processed_data {
        0 => "an",
        1 => "fc",
        2 => "af",
        3 => "cf",
        4 => "pf",
        5 => "cp",
        6 => "sa",
        7 => "ra",
        8 => "ep",
        _ => "unknown",
    }
}
