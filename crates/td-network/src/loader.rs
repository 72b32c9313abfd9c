//! Input record loaders.
//!
//! # Record format
//!
//! All input files share one line-oriented shape:
//!
//! ```text
//! #(id,start,end,length,topSpeed,laneCount,bidirectional)
//! (5000, 1, 2, 10, 5, 2, 1)
//! (5001, 2, 3, 10, 5, 2, 0)
//! ```
//!
//! - Blank lines and lines starting with `#` are ignored.
//! - Surrounding parentheses are optional.
//! - Fields are comma-separated and whitespace-trimmed.
//!
//! | File   | Fields                                                      |
//! |--------|-------------------------------------------------------------|
//! | roads  | `id, start, end, length, topSpeed, laneCount, bidirectional` |
//! | crosses| `id, north, east, south, west` (non-positive = empty slot)   |
//! | cars   | `id, from, to, planTime, preset[, maxSpeed]`                 |
//!
//! Errors report the 1-based line number in the original file.

use std::fmt::Display;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::StringRecord;

use td_core::{Car, CarId, CoreError, CoreResult, CrossId, RoadId, Tick};

use crate::network::{Cross, Road, RoadNetwork, RoadNetworkBuilder};
use crate::NetworkResult;

// ── Generic record reading ────────────────────────────────────────────────────

/// Read every data record from `reader`, paired with its 1-based source line.
pub fn read_records<R: Read>(mut reader: R) -> CoreResult<Vec<(usize, StringRecord)>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    // Strip comments and parentheses; remember where each kept line came from.
    let mut cleaned = String::with_capacity(text.len());
    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let body = line.trim_start_matches('(').trim_end_matches(')').trim();
        if body.is_empty() {
            continue;
        }
        cleaned.push_str(body);
        cleaned.push('\n');
        lines.push(i + 1);
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    csv_reader
        .records()
        .zip(lines)
        .map(|(result, line)| {
            result
                .map(|rec| (line, rec))
                .map_err(|e| CoreError::Parse { line, msg: e.to_string() })
        })
        .collect()
}

/// Parse field `idx` of `record`, naming it `what` in errors.
pub fn parse_field<T>(record: &StringRecord, line: usize, idx: usize, what: &str) -> CoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = record.get(idx).ok_or_else(|| CoreError::Parse {
        line,
        msg: format!("missing field {what} (column {})", idx + 1),
    })?;
    raw.parse::<T>().map_err(|e| CoreError::Parse {
        line,
        msg: format!("invalid {what} {raw:?}: {e}"),
    })
}

fn expect_len(record: &StringRecord, line: usize, min: usize, max: usize, kind: &str) -> CoreResult<()> {
    let n = record.len();
    if n < min || n > max {
        let expected = if min == max { min.to_string() } else { format!("{min}..={max}") };
        return Err(CoreError::Parse {
            line,
            msg: format!("{kind} record has {n} fields, expected {expected}"),
        });
    }
    Ok(())
}

fn parse_flag(record: &StringRecord, line: usize, idx: usize, what: &str) -> CoreResult<bool> {
    match parse_field::<i64>(record, line, idx, what)? {
        0 => Ok(false),
        1 => Ok(true),
        v => Err(CoreError::Parse { line, msg: format!("{what} must be 0 or 1, got {v}") }),
    }
}

fn open(path: &Path) -> CoreResult<std::fs::File> {
    Ok(std::fs::File::open(path)?)
}

// ── Roads ─────────────────────────────────────────────────────────────────────

pub fn load_roads_file(path: &Path) -> CoreResult<Vec<Road>> {
    load_roads_reader(open(path)?)
}

pub fn load_roads_reader<R: Read>(reader: R) -> CoreResult<Vec<Road>> {
    read_records(reader)?
        .into_iter()
        .map(|(line, rec)| {
            expect_len(&rec, line, 7, 7, "road")?;
            Ok(Road {
                id:            RoadId(parse_field(&rec, line, 0, "road id")?),
                start:         CrossId(parse_field(&rec, line, 1, "start")?),
                end:           CrossId(parse_field(&rec, line, 2, "end")?),
                length:        parse_field(&rec, line, 3, "length")?,
                top_speed:     parse_field(&rec, line, 4, "top speed")?,
                lanes:         parse_field(&rec, line, 5, "lane count")?,
                bidirectional: parse_flag(&rec, line, 6, "bidirectional")?,
            })
        })
        .collect()
}

// ── Crosses ───────────────────────────────────────────────────────────────────

pub fn load_crosses_file(path: &Path) -> CoreResult<Vec<Cross>> {
    load_crosses_reader(open(path)?)
}

pub fn load_crosses_reader<R: Read>(reader: R) -> CoreResult<Vec<Cross>> {
    read_records(reader)?
        .into_iter()
        .map(|(line, rec)| {
            expect_len(&rec, line, 5, 5, "cross")?;
            let id = CrossId(parse_field(&rec, line, 0, "cross id")?);
            let mut slots = [None; 4];
            for (i, slot) in slots.iter_mut().enumerate() {
                let v: i64 = parse_field(&rec, line, i + 1, "road slot")?;
                if v > 0 {
                    let road = u32::try_from(v).map_err(|_| CoreError::Parse {
                        line,
                        msg: format!("road slot {v} out of range"),
                    })?;
                    *slot = Some(RoadId(road));
                }
            }
            Ok(Cross::new(id, slots))
        })
        .collect()
}

// ── Cars ──────────────────────────────────────────────────────────────────────

pub fn load_cars_file(path: &Path) -> CoreResult<Vec<Car>> {
    load_cars_reader(open(path)?)
}

pub fn load_cars_reader<R: Read>(reader: R) -> CoreResult<Vec<Car>> {
    read_records(reader)?
        .into_iter()
        .map(|(line, rec)| {
            expect_len(&rec, line, 5, 6, "car")?;
            let max_speed = if rec.len() == 6 {
                Some(parse_field::<u32>(&rec, line, 5, "max speed")?)
                    .filter(|&v| v > 0)
            } else {
                None
            };
            Ok(Car {
                id:        CarId(parse_field(&rec, line, 0, "car id")?),
                from:      CrossId(parse_field(&rec, line, 1, "from")?),
                to:        CrossId(parse_field(&rec, line, 2, "to")?),
                plan_time: Tick(parse_field(&rec, line, 3, "plan time")?),
                preset:    parse_flag(&rec, line, 4, "preset")?,
                max_speed,
            })
        })
        .collect()
}

// ── Network ───────────────────────────────────────────────────────────────────

/// Load roads and crosses and build the validated network.
pub fn load_network(road_path: &Path, cross_path: &Path) -> NetworkResult<RoadNetwork> {
    let roads = load_roads_file(road_path)?;
    let crosses = load_crosses_file(cross_path)?;
    let mut builder = RoadNetworkBuilder::with_capacity(crosses.len(), roads.len());
    for road in roads {
        builder.add_road(road);
    }
    for cross in crosses {
        builder.add_cross(cross);
    }
    let network = builder.build()?;
    log::info!(
        "loaded network: {} crosses, {} roads, {} directed links",
        network.cross_count(),
        network.road_count(),
        network.edge_count()
    );
    Ok(network)
}
