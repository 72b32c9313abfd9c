//! Answer files: the dispatch plan as `(carId, startTime, roadId...)` lines.
//!
//! Reading shares the record rules of the input loaders (comments, optional
//! parentheses, trimmed comma-separated fields).  Non-positive road values
//! are padding and are skipped.

use std::io::{BufWriter, Read, Write};
use std::path::Path;

use td_core::{CarId, CoreError, CoreResult, RoadId, Tick};
use td_network::{parse_field, read_records};

/// One car's start tick and route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerRecord {
    pub car: CarId,
    pub start: Tick,
    pub roads: Vec<RoadId>,
}

pub fn read_answers_file(path: &Path) -> CoreResult<Vec<AnswerRecord>> {
    read_answers_reader(std::fs::File::open(path)?)
}

pub fn read_answers_reader<R: Read>(reader: R) -> CoreResult<Vec<AnswerRecord>> {
    read_records(reader)?
        .into_iter()
        .map(|(line, rec)| {
            if rec.len() < 2 {
                return Err(CoreError::Parse {
                    line,
                    msg: format!("answer record has {} fields, expected at least 2", rec.len()),
                });
            }
            let car = CarId(parse_field(&rec, line, 0, "car id")?);
            let start = Tick(parse_field(&rec, line, 1, "start time")?);
            let mut roads = Vec::with_capacity(rec.len() - 2);
            for idx in 2..rec.len() {
                let v: i64 = parse_field(&rec, line, idx, "road id")?;
                if v <= 0 {
                    continue;
                }
                let id = u32::try_from(v).map_err(|_| CoreError::Parse {
                    line,
                    msg: format!("road id {v} out of range"),
                })?;
                roads.push(RoadId(id));
            }
            Ok(AnswerRecord { car, start, roads })
        })
        .collect()
}

/// Write `answers` in the parenthesised contest layout.
pub fn write_answers<W: Write>(writer: W, answers: &[AnswerRecord]) -> CoreResult<()> {
    let mut w = BufWriter::new(writer);
    writeln!(w, "#(carId,StartTime,RoadId...)")?;
    for a in answers {
        write!(w, "({}, {}", a.car.0, a.start.0)?;
        for road in &a.roads {
            write!(w, ", {}", road.0)?;
        }
        writeln!(w, ")")?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_answers_file(path: &Path, answers: &[AnswerRecord]) -> CoreResult<()> {
    write_answers(std::fs::File::create(path)?, answers)?;
    log::info!("wrote {} answers to {}", answers.len(), path.display());
    Ok(())
}
