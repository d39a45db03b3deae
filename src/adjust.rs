//! Place-value rollover arithmetic for knob-edited fields.
//!
//! Each field is edited one place at a time. Turning the knob changes only
//! the selected place and wraps inside that place instead of carrying into
//! its neighbours. Place 0 is the most significant adjustable place.
//!
//! Values use fixed integer encodings:
//!
//! | Field    | Encoding                                   |
//! |----------|--------------------------------------------|
//! | Com      | kHz, 118.275 MHz is `118_275`              |
//! | Nav      | hundredths of MHz, 110.50 MHz is `11_050`  |
//! | Adf      | kHz, 100 to 1799                           |
//! | Squawk   | four octal digits, one per nibble          |
//! | Airspeed | knots                                      |
//! | Mach     | mach × 100                                 |
//! | Heading  | degrees, 0 to 359                          |
//! | Altitude | feet, never negative                       |

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Com,
    Nav,
    Adf,
    Squawk,
    Airspeed,
    Mach,
    Heading,
    Altitude,
}

impl Field {
    /// Number of independently adjustable places.
    pub const fn place_count(self) -> usize {
        match self {
            Field::Com | Field::Adf => 3,
            Field::Squawk => 4,
            Field::Nav | Field::Airspeed | Field::Mach | Field::Heading | Field::Altitude => 2,
        }
    }
}

/// 25 kHz channels the COM radios do not tune to.
const COM_SKIPPED: [i32; 4] = [20, 45, 70, 95];

/// Step `value` by `step` detents at `place`.
pub fn adjust(field: Field, value: i32, place: usize, step: i32) -> i32 {
    match field {
        Field::Com => adjust_com(value, place, step),
        Field::Nav => adjust_nav(value, place, step),
        Field::Adf => adjust_adf(value, place, step),
        Field::Squawk => adjust_squawk(value, place, step),
        Field::Airspeed => adjust_airspeed(value, place, step),
        Field::Mach => adjust_mach(value, place, step),
        Field::Heading => adjust_heading(value, place, step),
        Field::Altitude => adjust_altitude(value, place, step),
    }
}

/// Single digit step, wrapping within `0..modulus`.
pub fn adjust_digit(digit: i32, step: i32, modulus: i32) -> i32 {
    (digit + step).rem_euclid(modulus)
}

/// Wrap `value` into `low..low + span`.
fn wrap(value: i32, low: i32, span: i32) -> i32 {
    low + (value - low).rem_euclid(span)
}

/// Replace the decimal digit worth `unit` (1, 10, 100, ...).
fn replace_digit(value: i32, unit: i32, step: i32) -> i32 {
    let digit = (value / unit) % 10;
    value - digit * unit + adjust_digit(digit, step, 10) * unit
}

pub fn adjust_com(khz: i32, place: usize, step: i32) -> i32 {
    let whole = khz / 1000;
    let tenths = (khz % 1000) / 100;
    let channel = khz % 100;
    let (whole, tenths, channel) = match place {
        0 => (wrap(whole + step, 118, 19), tenths, channel),
        1 => (whole, adjust_digit(tenths, step, 10), channel),
        _ => {
            let mut channel = (channel + step * 5).rem_euclid(100);
            if COM_SKIPPED.contains(&channel) {
                channel = (channel + step * 5).rem_euclid(100);
            }
            (whole, tenths, channel)
        }
    };
    whole * 1000 + tenths * 100 + channel
}

pub fn adjust_nav(hundredths: i32, place: usize, step: i32) -> i32 {
    let whole = hundredths / 100;
    let frac = hundredths % 100;
    match place {
        0 => wrap(whole + step, 108, 10) * 100 + frac,
        _ => whole * 100 + (frac + step * 5).rem_euclid(100),
    }
}

pub fn adjust_adf(khz: i32, place: usize, step: i32) -> i32 {
    match place {
        0 => wrap(khz + step * 100, 100, 1700),
        1 => replace_digit(khz, 10, step),
        _ => replace_digit(khz, 1, step),
    }
}

/// Split a packed squawk into its four octal digits, most significant first.
pub fn squawk_digits(code: i32) -> [i32; 4] {
    [
        (code >> 12) & 0xf,
        (code >> 8) & 0xf,
        (code >> 4) & 0xf,
        code & 0xf,
    ]
}

pub fn adjust_squawk(code: i32, place: usize, step: i32) -> i32 {
    let mut digits = squawk_digits(code);
    let place = place.min(3);
    digits[place] = adjust_digit(digits[place], step, 8);
    digits.iter().fold(0, |acc, d| (acc << 4) | d)
}

pub fn adjust_airspeed(knots: i32, place: usize, step: i32) -> i32 {
    match place {
        0 => knots + step * 10,
        _ => replace_digit(knots, 1, step),
    }
}

pub fn adjust_mach(mach_x100: i32, place: usize, step: i32) -> i32 {
    let whole = mach_x100 / 100;
    let frac = mach_x100 % 100;
    match place {
        0 => whole * 100 + (frac + step).rem_euclid(100),
        _ => (whole + step).rem_euclid(3) * 100 + frac,
    }
}

pub fn adjust_heading(degrees: i32, place: usize, step: i32) -> i32 {
    match place {
        0 => (degrees + step * 10).rem_euclid(360),
        _ => replace_digit(degrees, 1, step),
    }
}

pub fn adjust_altitude(feet: i32, place: usize, step: i32) -> i32 {
    match place {
        0 => {
            let mut feet = feet + step * 1000;
            // Lift back above zero keeping the hundreds and below
            while feet < 0 {
                feet += 1000;
            }
            feet
        }
        _ => replace_digit(feet, 100, step),
    }
}

/// Whether an altitude-change target moved from `previous` to `adjusted` is
/// now close enough to, or on the other side of, the current altitude for
/// the change to be considered complete.
pub fn alt_change_settled(previous: i32, adjusted: i32, current: i32) -> bool {
    (adjusted - current).abs() < 210
        || (adjusted < current && previous > current)
        || (adjusted > current && previous < current)
}
