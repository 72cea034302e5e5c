use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, digit1};
use nom::combinator::{map, map_res, opt};
use nom::multi::{many1, separated_list1};
use nom::sequence::{delimited, pair, preceded};

use crate::common::parser::{NomResult, consume_all};

/// Numeric range inside a bracket group of a Slurm hostlist, e.g. `001-012`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HostRange {
    start: u64,
    end: u64,
    /// Zero padding width taken from the lower bound
    width: usize,
}

impl HostRange {
    fn new(start: &str, end: Option<&str>) -> anyhow::Result<Self> {
        let width = start.len();
        let start: u64 = start.parse()?;
        let end: u64 = match end {
            Some(end) => end.parse()?,
            None => start,
        };
        if end < start {
            anyhow::bail!("Range end {end} is smaller than its start {start}");
        }
        Ok(Self { start, end, width })
    }

    fn iter(&self) -> impl Iterator<Item = String> + '_ {
        (self.start..=self.end).map(|value| format!("{value:0width$}", width = self.width))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Ranges(Vec<HostRange>),
}

fn p_range(input: &str) -> NomResult<'_, HostRange> {
    map_res(
        pair(digit1, opt(preceded(char('-'), digit1))),
        |(start, end)| HostRange::new(start, end),
    )(input)
}

fn p_segment(input: &str) -> NomResult<'_, Segment> {
    alt((
        map(
            delimited(char('['), separated_list1(char(','), p_range), char(']')),
            Segment::Ranges,
        ),
        map(
            take_while1(|c: char| !matches!(c, '[' | ']' | ',') && !c.is_whitespace()),
            |text: &str| Segment::Text(text.to_string()),
        ),
    ))(input)
}

fn p_hostlist(input: &str) -> NomResult<'_, Vec<Vec<Segment>>> {
    separated_list1(char(','), many1(p_segment))(input)
}

/// Expands one hostlist entry. Multiple bracket groups produce a cartesian product.
fn expand_entry(segments: &[Segment]) -> Vec<String> {
    let mut hosts = vec![String::new()];
    for segment in segments {
        hosts = match segment {
            Segment::Text(text) => hosts.into_iter().map(|h| h + text).collect(),
            Segment::Ranges(ranges) => hosts
                .iter()
                .flat_map(|prefix| {
                    ranges
                        .iter()
                        .flat_map(|range| range.iter())
                        .map(move |suffix| format!("{prefix}{suffix}"))
                })
                .collect(),
        };
    }
    hosts
}

/// Expands a compact Slurm hostlist (e.g. `cn[01-03,07],login1`) into individual hostnames.
///
/// The result is in the order of the expression and may contain duplicates.
pub fn expand_hostlist(value: &str) -> anyhow::Result<Vec<String>> {
    let entries = consume_all(p_hostlist, value.trim())?;
    Ok(entries.iter().flat_map(|e| expand_entry(e)).collect())
}

/// Parses `SLURM_NTASKS_PER_NODE`. Returns `None` if it is not a positive integer.
pub fn parse_tasks_per_node(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok().filter(|&count| count > 0)
}
