//! Scalar formatting for display.
//!
//! An SI-style formatter (`k`, base, `m`, `µ`) plus a scientific variant,
//! with `~0` for magnitudes below a floor and `∞`/`>` markers for non-finite
//! and saturated values. Collaborator UIs use these for labels and readouts.

/// Output style for [`format_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    /// SI prefixes with three significant digits.
    Si,
    /// Exponent notation.
    Sci,
}

/// Options for [`format_value`].
#[derive(Debug, Clone)]
pub struct FormatOptions {
    pub style: FormatStyle,
    /// Magnitudes above this render as a `>`-prefixed cap.
    pub max_abs: f64,
    /// Nonzero magnitudes below this render as `~0`.
    pub min_abs: f64,
    /// Significant digits (SI) or mantissa decimals (Sci).
    pub sig: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            style: FormatStyle::Si,
            max_abs: 1e12,
            min_abs: 1e-15,
            sig: 3,
        }
    }
}

/// Format with SI prefixes and three significant digits: `1.23kΩ`, `50mA`.
pub fn format_si(x: f64, unit: &str) -> String {
    let ax = x.abs();
    if ax >= 1e3 {
        format!("{}k{}", format_sig(x / 1e3, 3), unit)
    } else if ax >= 1.0 {
        format!("{}{}", format_sig(x, 3), unit)
    } else if ax >= 1e-3 {
        format!("{}m{}", format_sig(x * 1e3, 3), unit)
    } else if ax >= 1e-6 {
        format!("{}µ{}", format_sig(x * 1e6, 3), unit)
    } else {
        format!("{}{}", format_sig(x, 3), unit)
    }
}

/// Scientific-notation convenience wrapper around [`format_value`].
pub fn format_sci(x: f64, unit: &str) -> String {
    format_value(
        x,
        unit,
        &FormatOptions {
            style: FormatStyle::Sci,
            ..FormatOptions::default()
        },
    )
}

/// Format a scalar with floor/cap markers.
///
/// Non-finite values render as `∞`; nonzero magnitudes below `min_abs` as
/// `~0`; magnitudes above `max_abs` as the signed cap prefixed with `>`.
pub fn format_value(x: f64, unit: &str, opts: &FormatOptions) -> String {
    if !x.is_finite() {
        return format!("∞{unit}");
    }
    let ax = x.abs();
    if ax > 0.0 && ax < opts.min_abs {
        return format!("~0{unit}");
    }
    if ax > opts.max_abs {
        let capped = if x >= 0.0 { opts.max_abs } else { -opts.max_abs };
        return match opts.style {
            FormatStyle::Sci => format!(">{:.*e}{}", opts.sig, capped, unit),
            FormatStyle::Si => format!(">{}", format_si(capped, unit)),
        };
    }
    match opts.style {
        FormatStyle::Sci => format!("{:.*e}{}", opts.sig, x, unit),
        FormatStyle::Si => format_si(x, unit),
    }
}

/// Round to `sig` significant digits, trimming trailing zeros. Falls back to
/// exponent notation outside the fixed-point range, like C's `%g`.
fn format_sig(x: f64, sig: usize) -> String {
    if x == 0.0 {
        return "0".to_string();
    }
    let sig = sig.max(1);
    // Let the formatter do the rounding, then read the decided exponent back;
    // this handles carries like 999.9 -> 1e3.
    let e_str = format!("{:.*e}", sig - 1, x);
    let (mantissa, exp_str) = match e_str.split_once('e') {
        Some(parts) => parts,
        None => return e_str,
    };
    let exp: i32 = exp_str.parse().unwrap_or(0);
    if exp < -4 || exp >= sig as i32 {
        format!("{}e{}", trim_zeros(mantissa), exp)
    } else {
        let decimals = (sig as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{x:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
