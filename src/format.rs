//! Delimited text rendering of diagrams, curves and matrices.
//!
//! Values are written with three decimals; NaN is written as `nan`. Output
//! goes to any [`std::io::Write`] sink the caller provides.

use crate::error::{Error, Result};
use crate::grid::Grid;
use std::io::Write;

/// Column separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    #[default]
    Tab,
    Space,
    Comma,
}

impl Separator {
    /// Parse a one-letter flag: `t` (tab), `s` (space) or `c` (comma).
    pub fn from_flag(flag: char) -> Result<Self> {
        match flag {
            't' => Ok(Separator::Tab),
            's' => Ok(Separator::Space),
            'c' => Ok(Separator::Comma),
            other => Err(Error::InvalidConfig(format!(
                "unknown separator flag '{other}', expected t, s or c"
            ))),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Separator::Tab => '\t',
            Separator::Space => ' ',
            Separator::Comma => ',',
        }
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.3}")
    }
}

fn write_row<W: Write>(writer: &mut W, values: &[f64], sep: Separator) -> Result<()> {
    let line = values
        .iter()
        .map(|&v| format_value(v))
        .collect::<Vec<_>>()
        .join(&sep.as_char().to_string());
    writeln!(writer, "{line}")?;
    Ok(())
}

/// Write a grid row by row.
pub fn write_grid<W: Write>(writer: &mut W, grid: &Grid, sep: Separator) -> Result<()> {
    for row in grid.rows() {
        write_row(writer, row, sep)?;
    }
    Ok(())
}

/// Write an efficiency curve as two columns: window width and efficiency.
///
/// # Errors
/// [`Error::DimensionMismatch`] if the two slices differ in length.
pub fn write_efficiency<W: Write>(
    writer: &mut W,
    widths: &[f64],
    efficiency: &[f64],
    sep: Separator,
) -> Result<()> {
    if widths.len() != efficiency.len() {
        return Err(Error::DimensionMismatch(format!(
            "{} widths for {} efficiency values",
            widths.len(),
            efficiency.len()
        )));
    }
    for (&w, &e) in widths.iter().zip(efficiency.iter()) {
        write_row(writer, &[w, e], sep)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_flags() {
        assert_eq!(Separator::from_flag('t').unwrap(), Separator::Tab);
        assert_eq!(Separator::from_flag('s').unwrap().as_char(), ' ');
        assert_eq!(Separator::from_flag('c').unwrap().as_char(), ',');
        assert!(Separator::from_flag('x').is_err());
    }

    #[test]
    fn test_write_grid() {
        let grid = Grid::from_rows(&[vec![0.12345, -1.0], vec![f64::NAN, 2.0]]).unwrap();
        let mut out = Vec::new();
        write_grid(&mut out, &grid, Separator::Comma).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0.123,-1.000\nnan,2.000\n");
    }

    #[test]
    fn test_write_efficiency() {
        let mut out = Vec::new();
        write_efficiency(&mut out, &[20.0, 40.0], &[0.25, 1.0], Separator::Tab).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "20.000\t0.250\n40.000\t1.000\n");
        assert!(write_efficiency(&mut Vec::new(), &[1.0], &[], Separator::Tab).is_err());
    }

    struct FailingSink;

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let grid = Grid::zeros(1, 1);
        assert!(matches!(
            write_grid(&mut FailingSink, &grid, Separator::Space),
            Err(Error::Io(_))
        ));
    }
}
