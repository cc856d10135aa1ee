use crate::error::MapError;

use super::vlq;

/// Where a generated position came from in the original sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    pub source_index: u32,
    pub line: u32,
    pub column: u32,
    pub name_index: Option<u32>,
}

/// One decoded mapping entry. Positions are 0-based and absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_line: u32,
    pub generated_column: u32,
    // None for output-only tokens, which mark a position but map to nothing
    pub origin: Option<Origin>,
}

impl Segment {
    pub fn generated_position(&self) -> (u32, u32) {
        (self.generated_line, self.generated_column)
    }
}

// Running totals for the delta-encoded fields. Only the generated column is per-line,
// everything else carries across lines and segments for the whole parse.
#[derive(Default)]
struct Accumulator {
    generated_column: i64,
    source_index: i64,
    original_line: i64,
    original_column: i64,
    name_index: i64,
}

impl Accumulator {
    fn start_line(&mut self) {
        self.generated_column = 0;
    }

    fn apply(
        &mut self,
        generated_line: u32,
        fields: &[i32],
        sources_len: usize,
        names_len: usize,
    ) -> Result<Segment, MapError> {
        self.generated_column += i64::from(fields[0]);
        let generated_column = non_negative(self.generated_column, "generated column")?;

        let origin = match fields.len() {
            1 => None,
            4 | 5 => {
                self.source_index += i64::from(fields[1]);
                self.original_line += i64::from(fields[2]);
                self.original_column += i64::from(fields[3]);

                let source_index = in_table(self.source_index, sources_len).ok_or(
                    MapError::SourceIndexOutOfRange {
                        index: self.source_index,
                        len: sources_len,
                    },
                )?;

                let name_index = if fields.len() == 5 {
                    self.name_index += i64::from(fields[4]);
                    let index = in_table(self.name_index, names_len).ok_or(
                        MapError::NameIndexOutOfRange {
                            index: self.name_index,
                            len: names_len,
                        },
                    )?;
                    Some(index)
                } else {
                    None
                };

                Some(Origin {
                    source_index,
                    line: non_negative(self.original_line, "original line")?,
                    column: non_negative(self.original_column, "original column")?,
                    name_index,
                })
            }
            n => {
                return Err(MapError::MalformedVlq(format!(
                    "segment on line {} has {} fields, expected 1, 4 or 5",
                    generated_line, n
                )))
            }
        };

        Ok(Segment {
            generated_line,
            generated_column,
            origin,
        })
    }
}

fn non_negative(value: i64, field: &str) -> Result<u32, MapError> {
    u32::try_from(value)
        .map_err(|_| MapError::MalformedVlq(format!("{} out of range: {}", field, value)))
}

fn in_table(index: i64, len: usize) -> Option<u32> {
    let as_usize = usize::try_from(index).ok()?;
    if as_usize >= len {
        return None;
    }
    u32::try_from(index).ok()
}

/// Decode a `mappings` string into a segment table, ordered by generated line and then
/// generated column.
///
/// The encoding only stores deltas, so a line's segments aren't guaranteed to come out
/// in column order. Each line is sorted once decoded, and if two segments land on the same
/// generated column the first one wins.
pub fn parse_mappings(
    mappings: &str,
    sources_len: usize,
    names_len: usize,
) -> Result<Vec<Segment>, MapError> {
    let mut segments = Vec::new();
    let mut line_segments = Vec::new();
    let mut fields = Vec::with_capacity(5);
    let mut acc = Accumulator::default();

    for (line_index, line) in mappings.split(';').enumerate() {
        let generated_line = u32::try_from(line_index).map_err(|_| {
            MapError::MalformedVlq(format!("too many generated lines: {}", line_index))
        })?;
        acc.start_line();

        for encoded in line.split(',') {
            // Tolerate stray separators, e.g. a trailing comma
            if encoded.is_empty() {
                continue;
            }
            fields.clear();
            vlq::decode_into(encoded, &mut fields)?;
            if fields.is_empty() {
                continue;
            }
            line_segments.push(acc.apply(generated_line, &fields, sources_len, names_len)?);
        }

        line_segments.sort_by_key(|s: &Segment| s.generated_column);
        line_segments.dedup_by_key(|s| s.generated_column);
        segments.append(&mut line_segments);
    }

    Ok(segments)
}
