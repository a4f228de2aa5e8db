#[allow(clippy::excessive_precision)]
#[allow(clippy::approx_constant)]
pub const PI: f64 = 3.141592653589793238462643;

pub const DEG_TO_RAD: f64 = PI / 180.0;

pub const RAD_TO_DEG: f64 = 180.0 / PI;

pub const DEGREES_PER_HOUR: f64 = 15.0;

pub const FULL_CIRCLE_DEG: f64 = 360.0;
