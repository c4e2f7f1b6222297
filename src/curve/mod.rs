use serde_json::{Map, Number, Value};

use crate::errors::Result;
use crate::reader::clean_float;

// Curve tags stored as a little-endian f32 ahead of the sample block.
pub const TAG_STEPPED: [u8; 4] = [0x00, 0x00, 0x80, 0x3F]; // 1.0
pub const TAG_LINEAR: [u8; 4] = [0x00, 0x00, 0x00, 0x00]; // 0.0

// Fractional digits kept for recovered control parameters.
pub const CURVE_PRECISION: usize = 6;

pub const SAMPLE_COUNT: usize = 9;

// The sample block is a 9-point trace of the curve at fixed parameters
// t = 0.1 .. 0.9. Fitting a cubic Bezier with endpoints (0,0) and (1,1)
// to those samples is a 9x2 least-squares problem per axis with the
// constant design matrix A[i] = [3(1-t)^2 t, 3(1-t) t^2] and residual
// b[i] = sample[i] - t^3, so the normal-equation inverse can be
// precomputed once.
struct Basis {
    rows: [[f64; 2]; SAMPLE_COUNT],
    t_cubed: [f64; SAMPLE_COUNT],
    inverse: Option<[[f64; 2]; 2]>,
}

impl Basis {
    fn new() -> Basis {
        let mut rows = [[0f64; 2]; SAMPLE_COUNT];
        let mut t_cubed = [0f64; SAMPLE_COUNT];

        for i in 0..SAMPLE_COUNT {
            let t = 0.1 + 0.1 * i as f64;
            rows[i][0] = 3.0 * (1.0 - t) * (1.0 - t) * t;
            rows[i][1] = 3.0 * (1.0 - t) * t * t;
            t_cubed[i] = t * t * t;
        }

        let mut ata = [[0f64; 2]; 2];

        for row in &rows {
            ata[0][0] += row[0] * row[0];
            ata[0][1] += row[0] * row[1];
            ata[1][0] += row[1] * row[0];
            ata[1][1] += row[1] * row[1];
        }

        let det = ata[0][0] * ata[1][1] - ata[0][1] * ata[1][0];

        let inverse = if det.abs() < 1e-12 {
            None
        } else {
            Some([
                [ata[1][1] / det, -ata[0][1] / det],
                [-ata[1][0] / det, ata[0][0] / det],
            ])
        };

        Basis {
            rows,
            t_cubed,
            inverse,
        }
    }

    // Least-squares solution for one axis, clamped to [0,1].
    fn solve(&self, samples: &[f64; SAMPLE_COUNT]) -> Option<(f64, f64)> {
        let inverse = self.inverse?;

        let mut atb = [0f64; 2];

        for i in 0..SAMPLE_COUNT {
            let b = samples[i] - self.t_cubed[i];
            atb[0] += self.rows[i][0] * b;
            atb[1] += self.rows[i][1] * b;
        }

        let c1 = inverse[0][0] * atb[0] + inverse[0][1] * atb[1];
        let c2 = inverse[1][0] * atb[0] + inverse[1][1] * atb[1];

        Some((clamp01(c1), clamp01(c2)))
    }
}

fn clamp01(v: f64) -> f64 {
    v.max(0.0).min(1.0)
}

lazy_static! {
    static ref BASIS: Basis = Basis::new();
}

/// Recovered curve parameters for one timeline frame.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveParams {
    /// Default interpolation; no fields are emitted.
    Linear,
    Stepped,
    Bezier {
        cx1: Number,
        cy1: Number,
        cx2: Number,
        cy2: Number,
    },
}

impl CurveParams {
    /// Classifies a curve tag and, for Bezier tags, fits the control
    /// parameters to the 9 sampled `(x, y)` points. A degenerate system
    /// degrades to [`CurveParams::Linear`], as does a fit that lands
    /// exactly on the default-linear parameters.
    pub fn fit(tag: [u8; 4], points: &[(f32, f32); SAMPLE_COUNT]) -> Result<CurveParams> {
        if tag == TAG_STEPPED {
            return Ok(CurveParams::Stepped);
        }
        if tag == TAG_LINEAR {
            return Ok(CurveParams::Linear);
        }

        let mut xs = [0f64; SAMPLE_COUNT];
        let mut ys = [0f64; SAMPLE_COUNT];

        for i in 0..SAMPLE_COUNT {
            xs[i] = points[i].0 as f64;
            ys[i] = points[i].1 as f64;
        }

        let (cx1, cx2) = match BASIS.solve(&xs) {
            Some(solution) => solution,
            None => return Ok(CurveParams::Linear),
        };
        let (cy1, cy2) = match BASIS.solve(&ys) {
            Some(solution) => solution,
            None => return Ok(CurveParams::Linear),
        };

        let cx1 = clean_float(cx1, CURVE_PRECISION)?;
        let cy1 = clean_float(cy1, CURVE_PRECISION)?;
        let cx2 = clean_float(cx2, CURVE_PRECISION)?;
        let cy2 = clean_float(cy2, CURVE_PRECISION)?;

        let zero = Number::from(0);
        let one = Number::from(1);

        if cx1 == zero && cy1 == zero && cx2 == one && cy2 == one {
            return Ok(CurveParams::Linear);
        }

        Ok(CurveParams::Bezier {
            cx1,
            cy1,
            cx2,
            cy2,
        })
    }

    /// Appends the curve fields to a frame object.
    pub fn apply(&self, frame: &mut Map<String, Value>) {
        match self {
            CurveParams::Linear => {}
            CurveParams::Stepped => {
                frame.insert("curve".into(), Value::String("stepped".into()));
            }
            CurveParams::Bezier {
                cx1,
                cy1,
                cx2,
                cy2,
            } => {
                frame.insert("curve".into(), Value::Number(cx1.clone()));
                frame.insert("c2".into(), Value::Number(cy1.clone()));
                frame.insert("c3".into(), Value::Number(cx2.clone()));
                frame.insert("c4".into(), Value::Number(cy2.clone()));
            }
        }
    }
}
