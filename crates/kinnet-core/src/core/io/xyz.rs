use super::traits::{MolecularFile, MoleculeRecord};
use crate::core::models::element;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Expected {expected} atoms but found {found}")]
    AtomCount { expected: usize, found: usize },
}

/// Plain XYZ files. The title line may carry `charge=<int>` and
/// `multiplicity=<int>` tokens; both default to a neutral singlet.
pub struct XyzFile;

fn parse_title(title: &str, line: usize) -> Result<(i32, u32), XyzError> {
    let mut charge = 0;
    let mut multiplicity = 1;
    for token in title.split_whitespace() {
        if let Some(value) = token.strip_prefix("charge=") {
            charge = value.parse().map_err(|_| XyzError::Parse {
                line,
                message: format!("invalid charge '{value}'"),
            })?;
        } else if let Some(value) = token.strip_prefix("multiplicity=") {
            multiplicity = value.parse().map_err(|_| XyzError::Parse {
                line,
                message: format!("invalid multiplicity '{value}'"),
            })?;
        }
    }
    Ok((charge, multiplicity))
}

impl MolecularFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<MoleculeRecord, Self::Error> {
        let mut lines = reader.lines();

        let count_line = lines.next().transpose()?.ok_or(XyzError::Parse {
            line: 1,
            message: "file is empty".to_string(),
        })?;
        let expected: usize = count_line.trim().parse().map_err(|_| XyzError::Parse {
            line: 1,
            message: format!("invalid atom count '{}'", count_line.trim()),
        })?;
        let title = lines.next().transpose()?.unwrap_or_default();
        let (charge, multiplicity) = parse_title(&title, 2)?;

        let mut atoms = Vec::with_capacity(expected);
        let mut geometry = Vec::with_capacity(expected);
        for (offset, line) in lines.enumerate() {
            let line = line?;
            let line_no = offset + 3;
            if line.trim().is_empty() {
                if atoms.len() == expected {
                    break;
                }
                continue;
            }
            if atoms.len() == expected {
                break;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(XyzError::Parse {
                    line: line_no,
                    message: "expected an element symbol and three coordinates".to_string(),
                });
            }
            let mut coords = [0.0; 3];
            for (k, value) in fields[1..4].iter().enumerate() {
                coords[k] = value.parse().map_err(|_| XyzError::Parse {
                    line: line_no,
                    message: format!("invalid coordinate '{value}'"),
                })?;
            }
            if !element::is_known(fields[0]) {
                tracing::warn!(line = line_no, symbol = fields[0], "Unknown element symbol");
            }
            atoms.push(fields[0].to_string());
            geometry.push(Point3::new(coords[0], coords[1], coords[2]));
        }

        if atoms.len() != expected {
            return Err(XyzError::AtomCount {
                expected,
                found: atoms.len(),
            });
        }
        Ok(MoleculeRecord {
            atoms,
            geometry,
            charge,
            multiplicity,
            title,
        })
    }

    fn write_to(record: &MoleculeRecord, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", record.atoms.len())?;
        let mut title = format!(
            "charge={} multiplicity={}",
            record.charge, record.multiplicity
        );
        let extra = record
            .title
            .split_whitespace()
            .filter(|t| !t.starts_with("charge=") && !t.starts_with("multiplicity="))
            .collect::<Vec<_>>()
            .join(" ");
        if !extra.is_empty() {
            title.push(' ');
            title.push_str(&extra);
        }
        writeln!(writer, "{title}")?;
        for (symbol, p) in record.atoms.iter().zip(&record.geometry) {
            writeln!(writer, "{:<3} {:>14.8} {:>14.8} {:>14.8}", symbol, p.x, p.y, p.z)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_atoms_and_electronic_state() {
        let text = "3\nwater charge=0 multiplicity=1\nO 0.0 0.0 0.0\nH 0.96 0.0 0.0\nH -0.24 0.93 0.0\n";
        let record = XyzFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(record.atoms, vec!["O", "H", "H"]);
        assert_eq!(record.geometry[1], Point3::new(0.96, 0.0, 0.0));
        assert_eq!(record.charge, 0);
        assert_eq!(record.multiplicity, 1);
    }

    #[test]
    fn title_without_tokens_defaults_to_neutral_singlet() {
        let record = XyzFile::read_from(&mut Cursor::new("1\n\nHe 0 0 0\n")).unwrap();
        assert_eq!((record.charge, record.multiplicity), (0, 1));
    }

    #[test]
    fn atom_count_mismatch_is_reported() {
        let err = XyzFile::read_from(&mut Cursor::new("2\n\nH 0 0 0\n")).unwrap_err();
        assert!(matches!(err, XyzError::AtomCount { expected: 2, found: 1 }));
    }

    #[test]
    fn malformed_coordinate_reports_line_number() {
        let err = XyzFile::read_from(&mut Cursor::new("1\n\nH 0 zero 0\n")).unwrap_err();
        assert!(matches!(err, XyzError::Parse { line: 3, .. }));
    }

    #[test]
    fn written_file_reads_back_with_state() {
        let record = MoleculeRecord {
            atoms: vec!["C".into(), "H".into()],
            geometry: vec![Point3::origin(), Point3::new(1.09, 0.0, 0.0)],
            charge: 0,
            multiplicity: 2,
            title: "chemid=42".into(),
        };
        let mut buffer = Vec::new();
        XyzFile::write_to(&record, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("charge=0 multiplicity=2 chemid=42"));
        let back = XyzFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(back.multiplicity, 2);
        assert_eq!(back.atoms, record.atoms);
    }
}
