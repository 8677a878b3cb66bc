//! Writes `sample_data.nc` and a `sample_spectra/` folder of OPUS files for
//! trying out the checker without real retrieval output.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use byteorder::{LittleEndian, WriteBytesExt};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

const DAYS: [(i32, u32, u32); 3] = [(2020, 5, 1), (2020, 5, 2), (2020, 5, 4)];
const STEP_MINUTES: i64 = 10;
/// Every n-th spectrum file is left out so some points have no spectrum.
const MISSING_EVERY: usize = 7;
const SPECTRUM_POINTS: usize = 2000;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

struct Row {
    time: NaiveDateTime,
    spectrum: String,
    xluft: f64,
    xco2: f64,
    xco2_error: f64,
    xch4: f64,
    pout: f64,
    flag: i32,
}

fn generate_rows(rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::new();
    for (y, m, d) in DAYS {
        let Some(start) = NaiveDate::from_ymd_opt(y, m, d).and_then(|day| day.and_hms_opt(7, 30, 0)) else {
            continue;
        };
        let pout_base = rng.gauss(955.0, 3.0);
        for step in 0..=54 {
            let time = start + TimeDelta::minutes(step * STEP_MINUTES);
            // Fraction of the observing day, 0 at sunrise and 1 at sunset.
            let frac = step as f64 / 54.0;
            let airmass = 1.0 / (std::f64::consts::PI * frac).sin().max(0.15);

            // A few high-airmass outliers get flagged.
            let flag = if airmass > 4.0 && rng.next_f64() < 0.7 {
                3
            } else if rng.next_f64() < 0.03 {
                15
            } else {
                0
            };
            let spread = if flag == 0 { 1.0 } else { 4.0 };

            rows.push(Row {
                time,
                spectrum: format!("sa_{}.spc", time.format("%Y%m%d_%H%M%S")),
                xluft: rng.gauss(0.999 - 0.001 * (airmass - 1.0), 0.0015 * spread),
                xco2: rng.gauss(412.0 - 1.5 * frac, 0.4 * spread),
                xco2_error: 0.3 + 0.1 * airmass.min(5.0) + rng.next_f64() * 0.1,
                xch4: rng.gauss(1.88, 0.004 * spread),
                pout: pout_base + rng.gauss(0.0, 0.3) - frac,
                flag,
            });
        }
    }
    rows
}

fn write_netcdf(path: &Path, rows: &[Row]) -> anyhow::Result<()> {
    let mut file = netcdf::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    file.add_dimension("time", rows.len())?;

    let times: Vec<f64> = rows.iter().map(|r| r.time.and_utc().timestamp() as f64).collect();
    {
        let mut var = file.add_variable::<f64>("time", &["time"])?;
        var.put_attribute("units", "seconds since 1970-01-01 00:00:00")?;
        var.put_values(&times, ..)?;
    }

    let columns: [(&str, &str, &str, fn(&Row) -> f64); 5] = [
        ("xluft", "column average dry air mole fraction ratio", "1", |r| r.xluft),
        ("xco2", "column average CO2 mole fraction", "ppm", |r| r.xco2),
        ("xco2_error", "xco2 one-sigma precision", "ppm", |r| r.xco2_error),
        ("xch4", "column average CH4 mole fraction", "ppm", |r| r.xch4),
        ("pout", "surface pressure", "hPa", |r| r.pout),
    ];
    for (name, long_name, units, get) in columns {
        let values: Vec<f64> = rows.iter().map(get).collect();
        let mut var = file.add_variable::<f64>(name, &["time"])?;
        var.put_attribute("long_name", long_name)?;
        var.put_attribute("units", units)?;
        var.put_values(&values, ..)?;
    }

    let flags: Vec<i32> = rows.iter().map(|r| r.flag).collect();
    {
        let mut var = file.add_variable::<i32>("flag", &["time"])?;
        var.put_attribute("long_name", "quality flag, 0 = good")?;
        var.put_values(&flags, ..)?;
    }

    let mut var = file.add_string_variable("spectrum", &["time"])?;
    for (i, row) in rows.iter().enumerate() {
        var.put_string(&row.spectrum, [i])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// OPUS spectra
// ---------------------------------------------------------------------------

// Same layout as the `param_block` / `opus_file` helpers in
// `spectrum::opus::tests`; keep the two in step with `spectrum::opus::parse`.

const BLOCK_DATA: u8 = 7;
const BLOCK_DATA_PARAMETERS: u8 = 23;
const BLOCK_ACQUISITION: u8 = 48;
const CHANNEL_SPSM: u8 = 4;

enum Param {
    Int(i32),
    Float(f64),
    Text(String),
}

fn parameter_block(params: &[(&str, Param)]) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    for (tag, value) in params {
        let mut name = tag.as_bytes().to_vec();
        name.resize(4, 0);
        out.write_all(&name)?;
        let (ty, mut data): (u16, Vec<u8>) = match value {
            Param::Int(i) => (0, i.to_le_bytes().to_vec()),
            Param::Float(f) => (1, f.to_le_bytes().to_vec()),
            Param::Text(s) => (2, [s.as_bytes(), &[0]].concat()),
        };
        if data.len() % 2 == 1 {
            data.push(0);
        }
        out.write_u16::<LittleEndian>(ty)?;
        out.write_u16::<LittleEndian>((data.len() / 2) as u16)?;
        out.write_all(&data)?;
    }
    out.write_all(b"END\0")?;
    out.write_u32::<LittleEndian>(0)?;
    Ok(out)
}

fn opus_bytes(blocks: &[(u8, u8, Vec<u8>)]) -> anyhow::Result<Vec<u8>> {
    let dir_offset = 24usize;
    let mut offset = dir_offset + blocks.len() * 12;
    let mut out = Vec::new();
    out.write_all(&[0x0a, 0x0a, 0xfe, 0xfe])?;
    out.write_all(&[0; 8])?;
    out.write_i32::<LittleEndian>(dir_offset as i32)?;
    out.write_i32::<LittleEndian>(blocks.len() as i32)?;
    out.write_i32::<LittleEndian>(blocks.len() as i32)?;
    for (kind, channel, payload) in blocks {
        let words = payload.len().div_ceil(4);
        out.write_all(&[*kind, *channel, 0, 0])?;
        out.write_i32::<LittleEndian>(words as i32)?;
        out.write_i32::<LittleEndian>(offset as i32)?;
        offset += words * 4;
    }
    for (_, _, payload) in blocks {
        let mut padded = payload.clone();
        padded.resize(payload.len().div_ceil(4) * 4, 0);
        out.write_all(&padded)?;
    }
    Ok(out)
}

/// Solar-like spectrum: a sloped continuum with a few absorption lines.
fn spectrum_values(rng: &mut SimpleRng, depth: f64) -> Vec<f32> {
    let lines = [0.12, 0.31, 0.47, 0.52, 0.78, 0.9];
    (0..SPECTRUM_POINTS)
        .map(|i| {
            let u = i as f64 / (SPECTRUM_POINTS - 1) as f64;
            let continuum = 0.6 + 0.3 * u;
            let absorption: f64 = lines
                .iter()
                .map(|&c| depth * (-(u - c).powi(2) / (2.0 * 0.004f64.powi(2))).exp())
                .sum();
            (continuum * (1.0 - absorption.min(0.95)) + rng.gauss(0.0, 0.004)) as f32
        })
        .collect()
}

fn write_spectrum(path: &Path, row: &Row, rng: &mut SimpleRng) -> anyhow::Result<()> {
    let params = parameter_block(&[
        ("NPT", Param::Int(SPECTRUM_POINTS as i32)),
        ("FXV", Param::Float(6000.0)),
        ("LXV", Param::Float(6400.0)),
        ("DAT", Param::Text(row.time.format("%d/%m/%Y").to_string())),
        ("TIM", Param::Text(format!("{} (GMT+0)", row.time.format("%H:%M:%S%.3f")))),
    ])?;
    let acquisition = parameter_block(&[("RES", Param::Float(0.02))])?;
    let data: Vec<u8> = spectrum_values(rng, 0.3 + 0.1 * row.xco2_error)
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();

    let bytes = opus_bytes(&[
        (BLOCK_DATA_PARAMETERS, CHANNEL_SPSM, params),
        (BLOCK_ACQUISITION, 0, acquisition),
        (BLOCK_DATA, CHANNEL_SPSM, data),
    ])?;
    std::fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate_rows(&mut rng);

    let nc_path = Path::new("sample_data.nc");
    write_netcdf(nc_path, &rows)?;

    let spectra_dir = Path::new("sample_spectra");
    let mut written = 0;
    for (i, row) in rows.iter().enumerate() {
        if i % MISSING_EVERY == MISSING_EVERY - 1 {
            continue;
        }
        // One folder per day, like a processing tree.
        let day_dir = spectra_dir.join(row.time.format("%Y%m%d").to_string());
        std::fs::create_dir_all(&day_dir)?;
        write_spectrum(&day_dir.join(&row.spectrum), row, &mut rng)?;
        written += 1;
    }

    println!(
        "Wrote {} rows to {} and {written} spectra under {}/",
        rows.len(),
        nc_path.display(),
        spectra_dir.display()
    );
    Ok(())
}
