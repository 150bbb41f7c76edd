//! Test support shared by the grib-arrow workspace crates.
//!
//! [`Grib2Builder`] writes byte-exact GRIB2 messages so most tests need no
//! sample data on disk. The few tests that exercise real model output use
//! [`require_test_file!`] and skip when the file cannot be located.

pub mod fixtures;
pub mod generators;
pub mod grib2_builder;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use grib2_builder::*;
pub use paths::*;

/// Resolves a sample file through [`find_test_file`], or prints a skip
/// notice and returns from the calling test.
///
/// ```ignore
/// let path = test_utils::require_test_file!("gep01.t00z.pgrb2a.0p50.f003");
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: sample '{}' not found. Set TEST_DATA_DIR to a directory containing it.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Asserts two numbers are within `epsilon` of each other.
///
/// Decoded GRIB values carry packing error, so joined and converted values
/// are compared with a tolerance rather than `==`.
///
/// ```ignore
/// test_utils::assert_approx_eq!(280.128 - 273.15, 6.978, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
    ($left:expr, $right:expr, $epsilon:expr, $($arg:tt)+) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        if !((left - right).abs() <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)` left: `{:?}`, right: `{:?}`: {}",
                left, right, format_args!($($arg)+)
            );
        }
    }};
}
