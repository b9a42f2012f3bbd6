use anyhow::Result;
use std::fmt;
use std::io::{BufRead, Write};

use crate::inventory::InstanceInfo;

/// What to do with the filtered instances.
#[derive(Debug, PartialEq, Eq)]
pub enum Selection<'a> {
    NoMatch,
    Interactive(&'a InstanceInfo),
    Batch(&'a [InstanceInfo]),
}

/// The operator's pick was not an index into the listed matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadInput;

impl fmt::Display for BadInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bad input")
    }
}

impl std::error::Error for BadInput {}

/// Decide the dispatch mode from the match count and whether a command was given.
///
/// Several matches without a command ask the operator to pick one on `input`.
pub fn select<'a, R: BufRead, W: Write>(
    matches: &'a [InstanceInfo],
    command: &[String],
    input: &mut R,
    out: &mut W,
) -> Result<Selection<'a>> {
    let selection = match (command.is_empty(), matches) {
        (_, []) => Selection::NoMatch,
        (false, all) => Selection::Batch(all),
        (true, [only]) => Selection::Interactive(only),
        (true, several) => Selection::Interactive(prompt_choice(several, input, out)?),
    };
    Ok(selection)
}

/// List the matches and read an index; an empty line picks the first one.
pub fn prompt_choice<'a, R: BufRead, W: Write>(
    matches: &'a [InstanceInfo],
    input: &mut R,
    out: &mut W,
) -> Result<&'a InstanceInfo> {
    writeln!(out, "Multiple matches:")?;
    for (index, instance) in matches.iter().enumerate() {
        writeln!(
            out,
            "[{}] {} {}",
            index,
            instance.name(),
            instance.private_ip.as_deref().unwrap_or("N/A")
        )?;
    }
    write!(out, "Pick [0]: ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let choice = line.trim();

    if choice.is_empty() {
        return Ok(&matches[0]);
    }

    match choice.parse::<usize>() {
        Ok(index) if index < matches.len() => Ok(&matches[index]),
        _ => Err(BadInput.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::TagInfo;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn instance(name: &str, ip: Option<&str>) -> InstanceInfo {
        InstanceInfo {
            instance_id: format!("i-{}", name),
            private_ip: ip.map(str::to_string),
            tags: vec![TagInfo::new("Name", name)],
        }
    }

    fn three() -> Vec<InstanceInfo> {
        vec![
            instance("web-1", Some("10.0.0.1")),
            instance("web-2", Some("10.0.0.2")),
            instance("web-3", Some("10.0.0.3")),
        ]
    }

    fn run(
        matches: &[InstanceInfo],
        command: &[String],
        input: &str,
    ) -> (Result<Option<String>>, String) {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        let result = select(matches, command, &mut reader, &mut out).map(|s| match s {
            Selection::NoMatch => None,
            Selection::Interactive(i) => Some(i.name().to_string()),
            Selection::Batch(all) => Some(format!("batch:{}", all.len())),
        });
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_no_match_regardless_of_command() {
        let (without, out) = run(&[], &[], "");
        assert_eq!(without.unwrap(), None);
        assert!(out.is_empty());

        let (with, _) = run(&[], &["uptime".to_string()], "");
        assert_eq!(with.unwrap(), None);
    }

    #[test]
    fn test_single_match_skips_prompt() {
        let matches = vec![instance("solo", Some("10.0.0.9"))];
        let (result, out) = run(&matches, &[], "");

        assert_eq!(result.unwrap(), Some("solo".to_string()));
        assert!(out.is_empty());
    }

    #[test]
    fn test_command_selects_all() {
        let matches = three();
        let mut reader = Cursor::new(Vec::new());
        let mut out = Vec::new();

        let selection = select(&matches, &["uptime".to_string()], &mut reader, &mut out).unwrap();

        assert_eq!(selection, Selection::Batch(&matches[..]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_command_with_single_match_is_batch() {
        let matches = vec![instance("solo", Some("10.0.0.9"))];
        let (result, _) = run(&matches, &["uptime".to_string()], "");

        assert_eq!(result.unwrap(), Some("batch:1".to_string()));
    }

    #[test]
    fn test_prompt_lists_matches() {
        let mut matches = three();
        matches.push(instance("pending", None));
        let (result, out) = run(&matches, &[], "\n");

        assert_eq!(result.unwrap(), Some("web-1".to_string()));
        assert_eq!(
            out,
            "Multiple matches:\n\
             [0] web-1 10.0.0.1\n\
             [1] web-2 10.0.0.2\n\
             [2] web-3 10.0.0.3\n\
             [3] pending N/A\n\
             Pick [0]: "
        );
    }

    #[test]
    fn test_empty_input_picks_first() {
        let (result, _) = run(&three(), &[], "");
        assert_eq!(result.unwrap(), Some("web-1".to_string()));
    }

    #[test]
    fn test_index_picks_entry() {
        let (result, _) = run(&three(), &[], "2\n");
        assert_eq!(result.unwrap(), Some("web-3".to_string()));

        let (padded, _) = run(&three(), &[], "  1  \n");
        assert_eq!(padded.unwrap(), Some("web-2".to_string()));
    }

    #[test]
    fn test_out_of_range_is_bad_input() {
        let (result, _) = run(&three(), &[], "99\n");
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Bad input");
        assert_eq!(err.downcast_ref::<BadInput>(), Some(&BadInput));

        let (edge, _) = run(&three(), &[], "3\n");
        assert!(edge.is_err());
    }

    #[test]
    fn test_unparseable_is_bad_input() {
        for input in ["abc\n", "-1\n", "1.5\n"] {
            let (result, _) = run(&three(), &[], input);
            assert_eq!(result.unwrap_err().to_string(), "Bad input", "input {:?}", input);
        }
    }
}
