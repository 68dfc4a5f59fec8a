//! Command parsing for the interactive watch prompt

/// Parsed command from the watch prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Answer the question on screen: `a`..`d` or `answer <a-d>`
    Answer(String),
    /// Open the next lesson: `next`
    Next,
    /// Open the previous lesson: `prev`
    Previous,
    /// Open a lesson by id: `open <lesson-id>`
    Open(String),
    /// Pause the video: `pause`
    Pause,
    /// Resume the video: `play`
    Play,
    /// Change playback speed: `speed <rate>`
    Speed(f64),
    /// Jump to a position in seconds: `seek <secs>`
    Seek(f64),
    /// Open a question from the list: `quiz <id>`
    Quiz(u32),
    /// List the lesson's questions: `questions`
    Questions,
    /// Stop the pending auto-advance: `stay`
    Stay,
    /// Ask the assistant: `ask <message>`
    Ask(String),
    /// Show playback and course progress: `status`
    Status,
    /// List lessons of the course: `list`
    List,
    /// Show help: `help` or `h`
    Help,
    /// Quit: `q` or `quit`
    Quit,
    /// Empty input
    Nop,
}

/// Result of parsing a command
#[derive(Debug)]
pub enum ParseResult {
    /// Successfully parsed command
    Ok(Command),
    /// Unknown command
    UnknownCommand(String),
    /// Command needs an argument
    MissingArgument(String),
    /// Argument could not be parsed
    InvalidArgument(String),
}

fn required(name: &str, args: &str) -> Result<String, ParseResult> {
    if args.is_empty() {
        Err(ParseResult::MissingArgument(name.to_string()))
    } else {
        Ok(args.to_string())
    }
}

fn number<T: std::str::FromStr>(name: &str, args: &str) -> Result<T, ParseResult> {
    required(name, args)?
        .parse()
        .map_err(|_| ParseResult::InvalidArgument(format!("{} {}", name, args)))
}

/// Parse a line typed at the watch prompt
pub fn parse_command(input: &str) -> ParseResult {
    match parse_inner(input) {
        Ok(command) => ParseResult::Ok(command),
        Err(result) => result,
    }
}

fn parse_inner(input: &str) -> Result<Command, ParseResult> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(Command::Nop);
    }

    let mut parts = input.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("");
    let args = parts.next().map(|s| s.trim()).unwrap_or("");

    let command = match cmd.to_lowercase().as_str() {
        letter @ ("a" | "b" | "c" | "d") if args.is_empty() => Command::Answer(letter.to_string()),
        "answer" => Command::Answer(required("answer", args)?),
        "next" | "n" => Command::Next,
        "prev" | "previous" | "p" => Command::Previous,
        "open" | "o" => Command::Open(required("open", args)?),
        "pause" => Command::Pause,
        "play" => Command::Play,
        "speed" => {
            let rate: f64 = number("speed", args)?;
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ParseResult::InvalidArgument(format!("speed {}", args)));
            }
            Command::Speed(rate)
        }
        "seek" => Command::Seek(number("seek", args)?),
        "quiz" => Command::Quiz(number("quiz", args)?),
        "questions" => Command::Questions,
        "stay" => Command::Stay,
        "ask" => Command::Ask(required("ask", args)?),
        "status" | "s" => Command::Status,
        "list" | "ls" | "l" => Command::List,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => return Err(ParseResult::UnknownCommand(cmd.to_string())),
    };
    Ok(command)
}

/// Help text shown by `help`
pub const HELP: &str = "\
a..d            answer the question on screen
next | prev     move within the module
open <id>       open a lesson
pause | play    control the video
speed <rate>    change playback speed
seek <secs>     jump to a position
questions       list this lesson's questions
quiz <id>       open a question (after 80%)
stay            cancel the auto-advance countdown
ask <message>   ask the assistant about this lesson
status | list   show progress
q               quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_command() {
        assert!(matches!(parse_command("q"), ParseResult::Ok(Command::Quit)));
        assert!(matches!(parse_command("quit"), ParseResult::Ok(Command::Quit)));
        assert!(matches!(parse_command("Q"), ParseResult::Ok(Command::Quit)));
    }

    #[test]
    fn parse_answer_letters() {
        assert!(matches!(parse_command("b"), ParseResult::Ok(Command::Answer(c)) if c == "b"));
        assert!(matches!(parse_command("D"), ParseResult::Ok(Command::Answer(c)) if c == "d"));
        assert!(matches!(parse_command("answer c"), ParseResult::Ok(Command::Answer(c)) if c == "c"));
        assert!(matches!(parse_command("answer"), ParseResult::MissingArgument(_)));
    }

    #[test]
    fn parse_navigation() {
        assert!(matches!(parse_command("next"), ParseResult::Ok(Command::Next)));
        assert!(matches!(parse_command("p"), ParseResult::Ok(Command::Previous)));
        match parse_command("open lesson-3") {
            ParseResult::Ok(Command::Open(id)) => assert_eq!(id, "lesson-3"),
            _ => panic!("Expected Open command"),
        }
    }

    #[test]
    fn parse_speed_command() {
        assert!(matches!(parse_command("speed 1.5"), ParseResult::Ok(Command::Speed(r)) if r == 1.5));
        assert!(matches!(parse_command("speed fast"), ParseResult::InvalidArgument(_)));
        assert!(matches!(parse_command("speed 0"), ParseResult::InvalidArgument(_)));
        assert!(matches!(parse_command("speed"), ParseResult::MissingArgument(_)));
    }

    #[test]
    fn parse_quiz_command() {
        assert!(matches!(parse_command("quiz 12"), ParseResult::Ok(Command::Quiz(12))));
        assert!(matches!(parse_command("quiz x"), ParseResult::InvalidArgument(_)));
    }

    #[test]
    fn parse_ask_keeps_message() {
        match parse_command("ask o que é ownership?") {
            ParseResult::Ok(Command::Ask(message)) => assert_eq!(message, "o que é ownership?"),
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn parse_unknown_command() {
        assert!(matches!(parse_command("unknown"), ParseResult::UnknownCommand(_)));
        assert!(matches!(parse_command("a extra"), ParseResult::UnknownCommand(_)));
    }

    #[test]
    fn parse_empty_is_nop() {
        assert!(matches!(parse_command(""), ParseResult::Ok(Command::Nop)));
        assert!(matches!(parse_command("   "), ParseResult::Ok(Command::Nop)));
    }
}
