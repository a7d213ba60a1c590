//! Questions answered on stdin.

use std::io::{self, BufRead, Write};

use hfsnav_core::PartitionCandidate;

fn read_line() -> Option<String> {
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

fn ask(question: &str) -> Option<String> {
    eprint!("{question}");
    let _ = io::stderr().flush();
    read_line()
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Parses a 1-based choice among `count` options.
pub fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let number: usize = answer.trim().parse().ok()?;
    (1..=count).contains(&number).then(|| number - 1)
}

/// Shows `title` and `message` and asks for a yes/no answer. Anything but
/// yes declines.
pub fn confirm((title, message): (String, String)) -> bool {
    eprintln!("{title}");
    eprintln!("{message}");
    ask("[y/N] ").is_some_and(|answer| is_yes(&answer))
}

/// Lists `candidates` and asks which one to open.
pub fn choose_partition(candidates: &[PartitionCandidate]) -> Option<PartitionCandidate> {
    eprintln!("This image contains {} HFS partitions:", candidates.len());
    for candidate in candidates {
        eprintln!(
            "  {}. {} (map entry {})",
            candidate.ordinal, candidate.name, candidate.map_index
        );
    }
    let answer = ask("Partition to open (empty to cancel): ")?;
    parse_choice(&answer, candidates.len()).map(|index| candidates[index].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }

    #[test]
    fn choices_are_one_based_and_bounded() {
        assert_eq!(parse_choice("1\n", 3), Some(0));
        assert_eq!(parse_choice("3", 3), Some(2));
        assert_eq!(parse_choice("0", 3), None);
        assert_eq!(parse_choice("4", 3), None);
        assert_eq!(parse_choice("", 3), None);
    }
}
