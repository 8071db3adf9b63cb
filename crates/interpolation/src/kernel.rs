//! Radial basis kernels and the polynomial tail that accompanies them.

use field_common::{FieldError, Point2};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Radial basis kernel. `r` is the distance already scaled by epsilon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kernel {
    /// r² ln r
    #[default]
    ThinPlateSpline,
    /// -r
    Linear,
    /// r³
    Cubic,
    /// -r⁵
    Quintic,
    /// exp(-r²)
    Gaussian,
    /// -sqrt(1 + r²)
    Multiquadric,
    /// 1 / sqrt(1 + r²)
    InverseMultiquadric,
}

impl Kernel {
    pub const ALL: [Kernel; 7] = [
        Kernel::ThinPlateSpline,
        Kernel::Linear,
        Kernel::Cubic,
        Kernel::Quintic,
        Kernel::Gaussian,
        Kernel::Multiquadric,
        Kernel::InverseMultiquadric,
    ];

    #[inline]
    pub fn evaluate(&self, r: f64) -> f64 {
        match self {
            Kernel::ThinPlateSpline => {
                if r == 0.0 {
                    0.0
                } else {
                    r * r * r.ln()
                }
            }
            Kernel::Linear => -r,
            Kernel::Cubic => r * r * r,
            Kernel::Quintic => -(r.powi(5)),
            Kernel::Gaussian => (-(r * r)).exp(),
            Kernel::Multiquadric => -(1.0 + r * r).sqrt(),
            Kernel::InverseMultiquadric => 1.0 / (1.0 + r * r).sqrt(),
        }
    }

    /// Lowest polynomial degree for which the interpolant is well posed.
    /// `None` means no polynomial is required.
    pub fn min_degree(&self) -> Option<usize> {
        match self {
            Kernel::ThinPlateSpline | Kernel::Cubic => Some(1),
            Kernel::Quintic => Some(2),
            Kernel::Linear | Kernel::Multiquadric => Some(0),
            Kernel::Gaussian | Kernel::InverseMultiquadric => None,
        }
    }

    /// Polynomial degree used when none is configured.
    pub fn default_degree(&self) -> usize {
        self.min_degree().unwrap_or(0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kernel::ThinPlateSpline => "thin_plate_spline",
            Kernel::Linear => "linear",
            Kernel::Cubic => "cubic",
            Kernel::Quintic => "quintic",
            Kernel::Gaussian => "gaussian",
            Kernel::Multiquadric => "multiquadric",
            Kernel::InverseMultiquadric => "inverse_multiquadric",
        }
    }
}

impl FromStr for Kernel {
    type Err = FieldError;

    /// Parse from string (case-insensitive, `-` and spaces read as `_`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "" | "thin_plate_spline" | "tps" => Ok(Kernel::ThinPlateSpline),
            "linear" => Ok(Kernel::Linear),
            "cubic" => Ok(Kernel::Cubic),
            "quintic" => Ok(Kernel::Quintic),
            "gaussian" => Ok(Kernel::Gaussian),
            "multiquadric" => Ok(Kernel::Multiquadric),
            "inverse_multiquadric" => Ok(Kernel::InverseMultiquadric),
            _ => Err(FieldError::UnknownKernel(s.to_string())),
        }
    }
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Number of 2D monomials of total degree ≤ `degree`.
pub fn monomial_count(degree: usize) -> usize {
    (degree + 1) * (degree + 2) / 2
}

/// Append the monomials of `p` up to `degree`, in graded order
/// (1, x, y, x², xy, y², ...).
#[inline]
pub fn push_monomials(degree: usize, p: Point2, out: &mut Vec<f64>) {
    for total in 0..=degree {
        for y_pow in 0..=total {
            let x_pow = total - y_pow;
            out.push(p.x.powi(x_pow as i32) * p.y.powi(y_pow as i32));
        }
    }
}
