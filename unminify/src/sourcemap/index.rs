use super::mappings::{Origin, Segment};

/// Floor lookup over a segment table. Immutable once built, so a single index can
/// serve any number of concurrent queries.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    segments: Vec<Segment>,
}

impl PositionIndex {
    // Segments must already be ordered by (generated line, generated column), which is
    // what parse_mappings hands back.
    pub fn new(segments: Vec<Segment>) -> Self {
        debug_assert!(segments
            .windows(2)
            .all(|w| w[0].generated_position() <= w[1].generated_position()));
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The last segment starting at or before the given generated position, compared
    /// lexicographically on (line, column). This can land on an earlier line when the
    /// queried line has nothing before the column.
    pub fn floor(&self, line: u32, column: u32) -> Option<&Segment> {
        let key = (line, column);
        let after = self
            .segments
            .partition_point(|s| s.generated_position() <= key);
        after.checked_sub(1).map(|i| &self.segments[i])
    }

    /// The original position for a generated one, if the floor segment carries one.
    pub fn query(&self, line: u32, column: u32) -> Option<(&Segment, Origin)> {
        let segment = self.floor(line, column)?;
        segment.origin.map(|origin| (segment, origin))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sourcemap::mappings::parse_mappings;

    fn index(mappings: &str) -> PositionIndex {
        PositionIndex::new(parse_mappings(mappings, 2, 2).unwrap())
    }

    #[test]
    fn exact_and_floor_matches() {
        // (0,0) -> 0:0:0, (0,10) -> 0:1:0, (1,4) -> 1:1:0
        let idx = index("AAAA,UACA;ICAA");

        let (segment, origin) = idx.query(0, 0).unwrap();
        assert_eq!(segment.generated_position(), (0, 0));
        assert_eq!(origin.line, 0);

        let (segment, _) = idx.query(0, 9).unwrap();
        assert_eq!(segment.generated_position(), (0, 0));

        let (segment, origin) = idx.query(0, 10).unwrap();
        assert_eq!(segment.generated_position(), (0, 10));
        assert_eq!(origin.line, 1);

        let (segment, origin) = idx.query(1, 500).unwrap();
        assert_eq!(segment.generated_position(), (1, 4));
        assert_eq!(origin.source_index, 1);
    }

    #[test]
    fn floor_crosses_lines() {
        let idx = index("AAAA;;IAAA");
        let (segment, _) = idx.query(1, 100).unwrap();
        assert_eq!(segment.generated_position(), (0, 0));
        let (segment, _) = idx.query(2, 3).unwrap();
        assert_eq!(segment.generated_position(), (0, 0));
    }

    #[test]
    fn nothing_before_first_segment() {
        let idx = index("KAAA");
        assert!(idx.query(0, 4).is_none());
        assert!(idx.query(0, 5).is_some());
        assert!(index("").query(0, 0).is_none());
    }

    #[test]
    fn marker_segments_resolve_to_nothing() {
        // Source-bearing at 0, output-only marker at 6
        let idx = index("AAAA,M");
        assert!(idx.query(0, 3).is_some());
        assert!(idx.query(0, 6).is_none());
        assert!(idx.query(0, 20).is_none());
        assert_eq!(idx.floor(0, 20).unwrap().generated_position(), (0, 6));
    }

    #[test]
    fn queries_are_monotonic() {
        let idx = index("AAAA,GAAC,IAAE;ACAA,EAAC;;EAAA");
        let mut previous = None;
        for line in 0..5 {
            for column in 0..12 {
                let found = idx.floor(line, column).map(|s| s.generated_position());
                if let (Some(prev), Some(found)) = (previous, found) {
                    assert!(prev <= found);
                }
                if found.is_some() {
                    previous = found;
                }
            }
        }
    }
}
