//! Expression presets offered next to the free-form parameter inputs.

pub const INITIAL_CONDITIONS: &[&str] = &[
    "sin(pi * x)",
    "exp(-((x-1)**2)/0.1)",
    "x * (1 - x)",
    "heaviside(x - 0.5)",
    "0.5 + 0.5 * sin(2*pi*x)",
    "[0.0, 0.25, 0.5, 0.25, 0.0]",
    "abs(x - 0.5)",
];

pub const BOUNDARY_VALUES: &[&str] = &[
    "0",
    "1",
    "sin(t)",
    "cos(pi*t)",
    "0.5*u + 1",
    "x + t",
    "exp(-t)",
];

pub const SOURCE_TERMS: &[&str] = &[
    "0",
    "x * cos(2*pi*t)",
    "sin(pi*x)*exp(-t)",
    "x**2 - t",
    "10 * exp(-((x-1)**2)/0.05)",
    "heaviside(x - 1)",
    "sin(5*pi*x)*cos(2*pi*t)",
];

/// Looks up a preset by position, `None` when out of range.
pub fn pick(presets: &[&'static str], index: usize) -> Option<&'static str> {
    presets.get(index).copied()
}
